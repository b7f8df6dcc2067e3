//! # Fides Core
//!
//! Building blocks for multi-factor session trust: single-use secrets,
//! one-time passcodes, typing-biometric gating, outbound delivery and a
//! login-attempt audit trail.
//!
//! ## Features
//!
//! - **Secret store**: expiring keyed secrets redeemable at most once, with
//!   atomic consumption under concurrency
//! - **OTP**: six-digit codes per identity and channel, uniform rejection of
//!   wrong, expired and absent codes
//! - **Typing biometrics**: enrollment/verification gate over the TypingDNA
//!   API with a locally owned accept threshold
//! - **Delivery**: SMTP email and HTTP SMS gateways behind async traits,
//!   with recording mocks for tests
//! - **Login attempts**: capped audit log with single-use confirm/report
//!   tokens delivered by email
//!
//! ## Example
//!
//! ```
//! use fides_core::{OtpChannel, OtpManager};
//!
//! let otp = OtpManager::new();
//! let code = otp.issue(OtpChannel::Email, "user@example.com", "user@example.com");
//!
//! // The first matching redemption wins; everything after that is refused.
//! assert!(otp.verify(OtpChannel::Email, "user@example.com", &code).is_some());
//! assert!(otp.verify(OtpChannel::Email, "user@example.com", &code).is_none());
//! ```

pub mod attempts;
pub mod delivery;
pub mod error;
pub mod otp;
pub mod store;
pub mod typing;

pub use attempts::{
    compose_alert, AttemptLog, AttemptPayload, AttemptStatus, DeviceInfo, LoginAttempt,
    ResolveDecision, ResolveError, RiskReport,
};
pub use delivery::{
    EmailMessage, HttpSmsSender, Mailer, MockMailer, MockSms, SmsSender, SmtpMailer,
};
pub use error::{FidesError, Result};
pub use otp::{normalize_identity, OtpChannel, OtpIssue, OtpManager};
pub use store::{ConsumeError, SecretStore};
pub use typing::{
    GateDecision, MockTypingDna, SaveOutcome, TypingDnaClient, TypingDnaHttp, VendorVerdict,
};

#[cfg(test)]
mod tests {
    use super::*;

    /// End-to-end pass over the alerting flow: record an attempt, pull the
    /// token out of the composed email, resolve through it.
    #[tokio::test]
    async fn alert_token_round_trip() {
        let log = AttemptLog::new();
        let mailer = MockMailer::new();

        // Step 1: record the attempt.
        let attempt = log.record(AttemptPayload {
            email: "alice@example.com".to_string(),
            ip: Some("203.0.113.9".to_string()),
            ..AttemptPayload::default()
        });

        // Step 2: dispatch the alert.
        let alert = compose_alert(&attempt, "http://localhost:3000");
        mailer.send(&alert).await.unwrap();

        // Step 3: the recipient follows the report link.
        let body = &mailer.sent()[0].body;
        let token = body
            .split("report?token=")
            .nth(1)
            .and_then(|rest| rest.lines().next())
            .unwrap()
            .to_string();

        let resolved = log.resolve(&token, ResolveDecision::Report).unwrap();
        assert_eq!(resolved.status, AttemptStatus::Reported);

        // Step 4: the link is dead now.
        assert_eq!(
            log.resolve(&token, ResolveDecision::Report),
            Err(ResolveError::AlreadyResolved)
        );
    }
}
