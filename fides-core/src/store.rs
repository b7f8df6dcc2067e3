//! Expiring single-use secret storage.
//!
//! Keyed records that can be redeemed at most once. Every verification flow
//! in this crate sits on top of this store: OTP codes are redeemed with
//! [`SecretStore::consume`] (the caller supplies a candidate to compare),
//! WebAuthn ceremony state is redeemed with [`SecretStore::take`] (the
//! cryptographic check happens elsewhere, so the fetch itself is the
//! consumption).
//!
//! Redemption is atomic per key. The inspect-and-remove happens under the
//! map's entry lock, so two racing callers can never both walk away with the
//! same secret.

use std::fmt;
use std::time::{Duration, Instant};

use dashmap::{DashMap, Entry};

/// Why a redemption failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ConsumeError {
    #[error("no record for key")]
    NotFound,
    #[error("record expired")]
    Expired,
    #[error("secret mismatch")]
    Mismatch,
}

struct SecretRecord<P> {
    secret: String,
    expires_at: Instant,
    payload: P,
}

/// Concurrent store of single-use secrets with per-record TTL.
pub struct SecretStore<P> {
    records: DashMap<String, SecretRecord<P>>,
}

impl<P> Default for SecretStore<P> {
    fn default() -> Self {
        Self {
            records: DashMap::new(),
        }
    }
}

impl<P> SecretStore<P> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a secret under `key`, replacing any previous record for that key
    /// and resetting its TTL. Takes the opportunity to sweep expired records.
    pub fn put(&self, key: impl Into<String>, secret: impl Into<String>, ttl: Duration, payload: P) {
        self.sweep_expired();
        self.records.insert(
            key.into(),
            SecretRecord {
                secret: secret.into(),
                expires_at: Instant::now() + ttl,
                payload,
            },
        );
    }

    /// Redeem the record under `key` by comparing `candidate` against the
    /// stored secret.
    ///
    /// On a match the record is removed and its payload returned. A mismatch
    /// leaves the record in place so the caller may retry until the TTL runs
    /// out. An expired record is removed on sight.
    pub fn consume(&self, key: &str, candidate: &str) -> Result<P, ConsumeError> {
        match self.records.entry(key.to_owned()) {
            Entry::Occupied(entry) => {
                if entry.get().expires_at <= Instant::now() {
                    entry.remove();
                    Err(ConsumeError::Expired)
                } else if entry.get().secret != candidate {
                    Err(ConsumeError::Mismatch)
                } else {
                    let (_, record) = entry.remove_entry();
                    Ok(record.payload)
                }
            }
            Entry::Vacant(_) => Err(ConsumeError::NotFound),
        }
    }

    /// Remove and return the record under `key` without comparing a secret.
    ///
    /// For flows where possession of the key is the whole claim and the real
    /// verification happens on the payload afterwards. The record is gone
    /// even if that later verification fails.
    pub fn take(&self, key: &str) -> Result<P, ConsumeError> {
        let (_, record) = self.records.remove(key).ok_or(ConsumeError::NotFound)?;
        if record.expires_at > Instant::now() {
            Ok(record.payload)
        } else {
            Err(ConsumeError::Expired)
        }
    }

    /// Drop every record whose TTL has lapsed. Returns how many were removed.
    pub fn sweep_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.records.len();
        self.records.retain(|_, record| record.expires_at > now);
        before.saturating_sub(self.records.len())
    }

    /// Whether a live (unexpired) record exists under `key`.
    pub fn contains(&self, key: &str) -> bool {
        self.records
            .get(key)
            .map(|record| record.expires_at > Instant::now())
            .unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl<P> fmt::Debug for SecretStore<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretStore")
            .field("records", &self.records.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    const TTL: Duration = Duration::from_secs(60);

    #[test]
    fn consume_returns_payload_once() {
        let store = SecretStore::new();
        store.put("alice", "123456", TTL, "payload");

        assert_eq!(store.consume("alice", "123456"), Ok("payload"));
        assert_eq!(store.consume("alice", "123456"), Err(ConsumeError::NotFound));
    }

    #[test]
    fn mismatch_retains_record() {
        let store = SecretStore::new();
        store.put("alice", "123456", TTL, ());

        assert_eq!(store.consume("alice", "000000"), Err(ConsumeError::Mismatch));
        assert!(store.contains("alice"));
        assert_eq!(store.consume("alice", "123456"), Ok(()));
    }

    #[test]
    fn unknown_key_is_not_found() {
        let store: SecretStore<()> = SecretStore::new();
        assert_eq!(store.consume("nobody", "123456"), Err(ConsumeError::NotFound));
        assert_eq!(store.take("nobody"), Err(ConsumeError::NotFound));
    }

    #[test]
    fn expired_record_is_removed_on_consume() {
        let store = SecretStore::new();
        store.put("alice", "123456", Duration::from_millis(5), ());
        thread::sleep(Duration::from_millis(20));

        assert_eq!(store.consume("alice", "123456"), Err(ConsumeError::Expired));
        // The expired record is deleted, not retained for further probing.
        assert_eq!(store.consume("alice", "123456"), Err(ConsumeError::NotFound));
    }

    #[test]
    fn put_supersedes_previous_record() {
        let store = SecretStore::new();
        store.put("alice", "first", TTL, 1);
        store.put("alice", "second", TTL, 2);

        assert_eq!(store.len(), 1);
        assert_eq!(store.consume("alice", "first"), Err(ConsumeError::Mismatch));
        assert_eq!(store.consume("alice", "second"), Ok(2));
    }

    #[test]
    fn take_is_destructive_and_compare_free() {
        let store = SecretStore::new();
        store.put("alice", "irrelevant", TTL, "state");

        assert_eq!(store.take("alice"), Ok("state"));
        assert_eq!(store.take("alice"), Err(ConsumeError::NotFound));
    }

    #[test]
    fn take_rejects_expired_record() {
        let store = SecretStore::new();
        store.put("alice", "irrelevant", Duration::from_millis(5), ());
        thread::sleep(Duration::from_millis(20));

        assert_eq!(store.take("alice"), Err(ConsumeError::Expired));
        assert!(store.is_empty());
    }

    #[test]
    fn sweep_removes_only_expired_records() {
        let store = SecretStore::new();
        store.put("old", "a", Duration::from_millis(5), ());
        store.put("fresh", "b", TTL, ());
        thread::sleep(Duration::from_millis(20));

        assert_eq!(store.sweep_expired(), 1);
        assert!(!store.contains("old"));
        assert!(store.contains("fresh"));
    }

    #[test]
    fn contains_respects_expiry() {
        let store = SecretStore::new();
        store.put("alice", "123456", Duration::from_millis(5), ());
        assert!(store.contains("alice"));
        thread::sleep(Duration::from_millis(20));
        assert!(!store.contains("alice"));
    }

    #[test]
    fn concurrent_consume_succeeds_exactly_once() {
        let store = SecretStore::new();
        store.put("alice", "123456", TTL, ());
        let successes = AtomicUsize::new(0);

        thread::scope(|scope| {
            for _ in 0..16 {
                scope.spawn(|| {
                    if store.consume("alice", "123456").is_ok() {
                        successes.fetch_add(1, Ordering::SeqCst);
                    }
                });
            }
        });

        assert_eq!(successes.load(Ordering::SeqCst), 1);
        assert!(store.is_empty());
    }
}
