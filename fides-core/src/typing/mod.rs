//! Typing-biometric verification.
//!
//! The TypingDNA vendor scores how closely a captured typing pattern matches
//! the patterns enrolled for a user. This module owns the decision layer on
//! top of that API: route new users into enrollment until they have enough
//! patterns on file, then verify against a local score threshold. The
//! vendor's own pass/fail opinion is surfaced for diagnostics but never
//! trusted for the accept decision.
//!
//! ## Quick Start
//!
//! ```
//! use fides_core::typing::{self, GateDecision};
//!
//! assert_eq!(typing::route(1), GateDecision::Enroll);
//! assert_eq!(typing::route(4), GateDecision::Verify);
//! assert!(typing::accepts(82));
//! assert!(!typing::accepts(55));
//! ```

mod client;
mod mock;

pub use client::{TypingDnaConfig, TypingDnaHttp};
pub use mock::MockTypingDna;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Patterns a user must have on file before verification is attempted.
pub const ENROLLMENT_THRESHOLD: u32 = 3;
/// Minimum similarity score accepted as a match.
pub const VERIFY_THRESHOLD: u32 = 70;

/// Client for the typing-biometrics vendor API.
#[async_trait]
pub trait TypingDnaClient: Send + Sync {
    /// How many typing patterns the vendor has enrolled for this user.
    async fn pattern_count(&self, user_id: &str) -> Result<u32>;

    /// Enroll a captured typing pattern for the user.
    async fn save_pattern(&self, user_id: &str, pattern: &str) -> Result<SaveOutcome>;

    /// Score a captured typing pattern against the user's enrolled set.
    async fn verify_pattern(
        &self,
        user_id: &str,
        pattern: &str,
        text_id: Option<&str>,
    ) -> Result<VendorVerdict>;
}

/// Vendor acknowledgement of an enrollment request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveOutcome {
    /// Vendor message code (10000 means the pattern was saved).
    #[serde(default)]
    pub message_code: Option<i64>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Raw vendor response to a verification request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VendorVerdict {
    /// The vendor's own pass/fail opinion. Advisory only.
    #[serde(default)]
    pub result: i64,
    /// Similarity score in the 0..=100 range.
    #[serde(default)]
    pub score: u32,
    /// Score net of device and position effects, when the vendor reports one.
    #[serde(default)]
    pub net_score: Option<u32>,
    #[serde(default)]
    pub message_code: Option<i64>,
}

/// Which leg of the flow a request should take.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    /// Not enough patterns on file yet: enroll this one.
    Enroll,
    /// Enough patterns on file: verify against them.
    Verify,
}

/// Route a request by the user's enrolled pattern count.
pub fn route(pattern_count: u32) -> GateDecision {
    if pattern_count < ENROLLMENT_THRESHOLD {
        GateDecision::Enroll
    } else {
        GateDecision::Verify
    }
}

/// The authoritative accept decision for a verification score.
pub fn accepts(score: u32) -> bool {
    score >= VERIFY_THRESHOLD
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn routes_below_threshold_to_enrollment() {
        assert_eq!(route(0), GateDecision::Enroll);
        assert_eq!(route(2), GateDecision::Enroll);
    }

    #[test]
    fn routes_at_threshold_to_verification() {
        assert_eq!(route(3), GateDecision::Verify);
        assert_eq!(route(10), GateDecision::Verify);
    }

    #[test]
    fn accept_boundary_is_inclusive() {
        assert!(!accepts(69));
        assert!(accepts(70));
        assert!(accepts(100));
    }
}
