//! One-time passcode issuance and verification.
//!
//! Codes are six decimal digits drawn uniformly, bound to a normalized
//! identity on a delivery channel, and valid for a single redemption within
//! their TTL. Issuing again for the same identity and channel replaces the
//! outstanding code.

use std::time::Duration;

use rand::Rng;

use crate::store::SecretStore;

/// Decimal digits in a generated code.
pub const OTP_LENGTH: usize = 6;
/// How long a code stays redeemable unless configured otherwise.
pub const DEFAULT_OTP_TTL: Duration = Duration::from_secs(5 * 60);

/// Delivery channel a code was issued on. Channels never share codes: a code
/// issued for email verification cannot be redeemed as a phone code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OtpChannel {
    Email,
    Phone,
}

impl OtpChannel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Email => "email",
            Self::Phone => "phone",
        }
    }

    /// Store key for an identity on this channel.
    pub fn key_for(&self, identity: &str) -> String {
        format!("{}:{}", self.as_str(), normalize_identity(identity))
    }
}

/// What an issued code was bound to. Returned on successful verification so
/// the caller can act on the proven contact point.
#[derive(Debug, Clone)]
pub struct OtpIssue {
    /// The contact the code was delivered to (an email address or a phone
    /// number in international format).
    pub contact: String,
}

/// Issues and redeems one-time codes across delivery channels.
pub struct OtpManager {
    store: SecretStore<OtpIssue>,
    ttl: Duration,
}

impl OtpManager {
    pub fn new() -> Self {
        Self::with_ttl(DEFAULT_OTP_TTL)
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            store: SecretStore::new(),
            ttl,
        }
    }

    /// Generate a fresh code for `identity` on `channel`, replacing any code
    /// still outstanding there. The code is returned for delivery; it is
    /// never logged.
    pub fn issue(&self, channel: OtpChannel, identity: &str, contact: &str) -> String {
        let code = generate_code();
        self.store.put(
            channel.key_for(identity),
            code.clone(),
            self.ttl,
            OtpIssue {
                contact: contact.to_string(),
            },
        );
        tracing::info!(
            channel = channel.as_str(),
            identity = %normalize_identity(identity),
            ttl_secs = self.ttl.as_secs(),
            "OTP issued"
        );
        code
    }

    /// Redeem `candidate` for `identity` on `channel`.
    ///
    /// Returns the issue record on a match and `None` otherwise. Absent,
    /// expired and mismatched codes are deliberately indistinguishable to the
    /// caller; the distinction only reaches telemetry.
    pub fn verify(&self, channel: OtpChannel, identity: &str, candidate: &str) -> Option<OtpIssue> {
        match self.store.consume(&channel.key_for(identity), candidate) {
            Ok(issue) => {
                tracing::info!(
                    channel = channel.as_str(),
                    identity = %normalize_identity(identity),
                    "OTP verified"
                );
                Some(issue)
            }
            Err(reason) => {
                tracing::debug!(
                    channel = channel.as_str(),
                    identity = %normalize_identity(identity),
                    %reason,
                    "OTP rejected"
                );
                None
            }
        }
    }

    /// Codes currently outstanding across all channels.
    pub fn outstanding(&self) -> usize {
        self.store.sweep_expired();
        self.store.len()
    }
}

impl Default for OtpManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Canonical form for identity keys: trimmed and lowercased. Applied before
/// any map lookup so that `User@Example.com ` and `user@example.com` address
/// the same record.
pub fn normalize_identity(identity: &str) -> String {
    identity.trim().to_lowercase()
}

fn generate_code() -> String {
    let n: u32 = rand::thread_rng().gen_range(0..=999_999);
    format!("{n:06}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_codes_are_six_digits() {
        let manager = OtpManager::new();
        for _ in 0..50 {
            let code = manager.issue(OtpChannel::Email, "alice@example.com", "alice@example.com");
            assert_eq!(code.len(), OTP_LENGTH);
            assert!(code.bytes().all(|b| b.is_ascii_digit()), "non-digit in {code}");
        }
    }

    #[test]
    fn code_verifies_exactly_once() {
        let manager = OtpManager::new();
        let code = manager.issue(OtpChannel::Email, "alice@example.com", "alice@example.com");

        let issue = manager.verify(OtpChannel::Email, "alice@example.com", &code);
        assert_eq!(issue.map(|i| i.contact).as_deref(), Some("alice@example.com"));
        assert!(manager.verify(OtpChannel::Email, "alice@example.com", &code).is_none());
    }

    #[test]
    fn wrong_code_leaves_the_real_one_redeemable() {
        let manager = OtpManager::new();
        let code = manager.issue(OtpChannel::Email, "alice@example.com", "alice@example.com");
        let wrong = if code == "000000" { "000001" } else { "000000" };

        assert!(manager.verify(OtpChannel::Email, "alice@example.com", wrong).is_none());
        assert!(manager.verify(OtpChannel::Email, "alice@example.com", &code).is_some());
    }

    #[test]
    fn expired_code_is_rejected() {
        let manager = OtpManager::with_ttl(Duration::from_millis(5));
        let code = manager.issue(OtpChannel::Email, "alice@example.com", "alice@example.com");
        std::thread::sleep(Duration::from_millis(20));

        assert!(manager.verify(OtpChannel::Email, "alice@example.com", &code).is_none());
    }

    #[test]
    fn reissue_invalidates_previous_code() {
        let manager = OtpManager::new();
        let first = manager.issue(OtpChannel::Email, "alice@example.com", "alice@example.com");
        let second = manager.issue(OtpChannel::Email, "alice@example.com", "alice@example.com");

        if first != second {
            assert!(manager.verify(OtpChannel::Email, "alice@example.com", &first).is_none());
        }
        assert!(manager.verify(OtpChannel::Email, "alice@example.com", &second).is_some());
    }

    #[test]
    fn channels_do_not_share_codes() {
        let manager = OtpManager::new();
        let code = manager.issue(OtpChannel::Email, "alice@example.com", "alice@example.com");

        assert!(manager.verify(OtpChannel::Phone, "alice@example.com", &code).is_none());
        assert!(manager.verify(OtpChannel::Email, "alice@example.com", &code).is_some());
    }

    #[test]
    fn identity_is_normalized_before_keying() {
        let manager = OtpManager::new();
        let code = manager.issue(OtpChannel::Email, "  Alice@Example.COM", "alice@example.com");

        assert!(manager.verify(OtpChannel::Email, "alice@example.com ", &code).is_some());
    }

    #[test]
    fn outstanding_counts_live_codes() {
        let manager = OtpManager::new();
        assert_eq!(manager.outstanding(), 0);
        manager.issue(OtpChannel::Email, "alice@example.com", "alice@example.com");
        manager.issue(OtpChannel::Phone, "alice@example.com", "+14155550123");
        assert_eq!(manager.outstanding(), 2);
    }
}
