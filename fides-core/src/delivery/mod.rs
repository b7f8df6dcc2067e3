//! Outbound message delivery.
//!
//! Email and SMS transports sit behind async traits so callers stay
//! provider-agnostic and tests can swap in recording mocks. Delivery is
//! always attempted after the relevant state change has committed; a failed
//! send surfaces an error without unwinding what was stored.

mod email;
mod sms;

pub use email::{MockMailer, SmtpConfig, SmtpMailer};
pub use sms::{HttpSmsSender, MockSms, SmsGatewayConfig};

use async_trait::async_trait;

use crate::error::Result;

/// A composed email ready for dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// Sends email.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: &EmailMessage) -> Result<()>;
}

/// Sends SMS to a phone number in international format.
#[async_trait]
pub trait SmsSender: Send + Sync {
    async fn send(&self, to: &str, body: &str) -> Result<()>;
}

/// The standard one-time passcode email.
pub fn otp_email(to: &str, code: &str) -> EmailMessage {
    EmailMessage {
        to: to.to_string(),
        subject: "Your One-Time Password".to_string(),
        body: format!(
            "Your OTP is: {code}\n\nIt expires in 5 minutes. If you didn't request this, you can ignore this email."
        ),
    }
}

/// The standard one-time passcode SMS body.
pub fn otp_sms_body(code: &str) -> String {
    format!("Your verification code is {code}. It expires in 5 minutes.")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn otp_email_carries_the_code() {
        let message = otp_email("alice@example.com", "123456");
        assert_eq!(message.to, "alice@example.com");
        assert_eq!(message.subject, "Your One-Time Password");
        assert!(message.body.contains("Your OTP is: 123456"));
        assert!(message.body.contains("expires in 5 minutes"));
    }

    #[test]
    fn otp_sms_body_carries_the_code() {
        assert!(otp_sms_body("654321").contains("654321"));
    }
}
