//! Deterministic vendor stand-in for tests and offline development.

use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;

use super::{SaveOutcome, TypingDnaClient, VendorVerdict};
use crate::error::{FidesError, Result};

const SAVE_OK: i64 = 10000;

/// Scripted [`TypingDnaClient`] implementation.
///
/// Starts with a configurable pattern count, increments it on every save
/// (so repeated requests walk the same enrollment-then-verify path a real
/// account would), and answers verifications with a fixed score.
pub struct MockTypingDna {
    count: AtomicU32,
    score: u32,
    vendor_result: i64,
    saves: AtomicU32,
    verifies: AtomicU32,
    fail: bool,
}

impl MockTypingDna {
    /// A user with no patterns on file and a passing score.
    pub fn new() -> Self {
        Self::with_count(0)
    }

    pub fn with_count(count: u32) -> Self {
        Self::with_score(count, 90)
    }

    pub fn with_score(count: u32, score: u32) -> Self {
        Self {
            count: AtomicU32::new(count),
            score,
            vendor_result: i64::from(score >= 50),
            saves: AtomicU32::new(0),
            verifies: AtomicU32::new(0),
            fail: false,
        }
    }

    /// A vendor that is down: every call errors.
    pub fn failing() -> Self {
        Self {
            count: AtomicU32::new(0),
            score: 0,
            vendor_result: 0,
            saves: AtomicU32::new(0),
            verifies: AtomicU32::new(0),
            fail: true,
        }
    }

    /// Override the advisory verdict the vendor reports alongside the score.
    pub fn with_vendor_result(mut self, vendor_result: i64) -> Self {
        self.vendor_result = vendor_result;
        self
    }

    pub fn saves(&self) -> u32 {
        self.saves.load(Ordering::SeqCst)
    }

    pub fn verifies(&self) -> u32 {
        self.verifies.load(Ordering::SeqCst)
    }

    fn check_available(&self) -> Result<()> {
        if self.fail {
            Err(FidesError::Vendor("mock vendor configured to fail".into()))
        } else {
            Ok(())
        }
    }
}

impl Default for MockTypingDna {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TypingDnaClient for MockTypingDna {
    async fn pattern_count(&self, user_id: &str) -> Result<u32> {
        self.check_available()?;
        let count = self.count.load(Ordering::SeqCst);
        tracing::debug!(user_id, count, "[MOCK] pattern count");
        Ok(count)
    }

    async fn save_pattern(&self, user_id: &str, _pattern: &str) -> Result<SaveOutcome> {
        self.check_available()?;
        self.saves.fetch_add(1, Ordering::SeqCst);
        self.count.fetch_add(1, Ordering::SeqCst);
        tracing::debug!(user_id, "[MOCK] pattern saved");
        Ok(SaveOutcome {
            message_code: Some(SAVE_OK),
            message: Some("Done".to_string()),
        })
    }

    async fn verify_pattern(
        &self,
        user_id: &str,
        _pattern: &str,
        _text_id: Option<&str>,
    ) -> Result<VendorVerdict> {
        self.check_available()?;
        self.verifies.fetch_add(1, Ordering::SeqCst);
        tracing::debug!(user_id, score = self.score, "[MOCK] pattern verified");
        Ok(VendorVerdict {
            result: self.vendor_result,
            score: self.score,
            net_score: Some(self.score),
            message_code: Some(SAVE_OK),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn saves_advance_the_pattern_count() {
        let mock = MockTypingDna::new();
        assert_eq!(mock.pattern_count("alice").await.unwrap(), 0);

        mock.save_pattern("alice", "tp").await.unwrap();
        mock.save_pattern("alice", "tp").await.unwrap();

        assert_eq!(mock.pattern_count("alice").await.unwrap(), 2);
        assert_eq!(mock.saves(), 2);
    }

    #[tokio::test]
    async fn verification_reports_the_configured_score() {
        let mock = MockTypingDna::with_score(5, 42);
        let verdict = mock.verify_pattern("alice", "tp", None).await.unwrap();
        assert_eq!(verdict.score, 42);
        assert_eq!(mock.verifies(), 1);
    }

    #[tokio::test]
    async fn failing_mock_errors_on_every_call() {
        let mock = MockTypingDna::failing();
        assert!(mock.pattern_count("alice").await.is_err());
        assert!(mock.save_pattern("alice", "tp").await.is_err());
        assert!(mock.verify_pattern("alice", "tp", None).await.is_err());
    }
}
