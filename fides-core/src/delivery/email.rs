//! SMTP email delivery over lettre.

use std::fmt;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};

use super::{EmailMessage, Mailer};
use crate::error::{FidesError, Result};

const SMTP_PORT: u16 = 587;
const SMTP_TIMEOUT: Duration = Duration::from_secs(10);

/// SMTP relay configuration.
#[derive(Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub user: String,
    pub password: String,
}

impl fmt::Debug for SmtpConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SmtpConfig")
            .field("host", &self.host)
            .field("user", &self.user)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

impl SmtpConfig {
    /// Read configuration from the environment.
    ///
    /// Credentials come from `SMTP_USER`/`SMTP_PASS`, with
    /// `GMAIL_USER`/`GMAIL_APP_PASSWORD` accepted as fallbacks. `SMTP_HOST`
    /// defaults to Gmail's relay.
    pub fn from_env() -> Result<Self> {
        let user = std::env::var("SMTP_USER")
            .or_else(|_| std::env::var("GMAIL_USER"))
            .map_err(|_| FidesError::Unconfigured("SMTP_USER"))?;
        let password = std::env::var("SMTP_PASS")
            .or_else(|_| std::env::var("GMAIL_APP_PASSWORD"))
            .map_err(|_| FidesError::Unconfigured("SMTP_PASS"))?;
        let host = std::env::var("SMTP_HOST").unwrap_or_else(|_| "smtp.gmail.com".to_string());

        Ok(Self {
            host,
            user,
            password,
        })
    }
}

/// [`Mailer`] backed by an SMTP relay, upgrading to TLS via STARTTLS.
pub struct SmtpMailer {
    mailer: SmtpTransport,
    from: String,
}

impl SmtpMailer {
    pub fn new(config: &SmtpConfig) -> Result<Self> {
        let credentials = Credentials::new(config.user.clone(), config.password.clone());
        let mailer = SmtpTransport::starttls_relay(&config.host)
            .map_err(|e| FidesError::Delivery(format!("SMTP transport setup failed: {e}")))?
            .credentials(credentials)
            .port(SMTP_PORT)
            .timeout(Some(SMTP_TIMEOUT))
            .build();

        tracing::info!(host = %config.host, from = %config.user, "SMTP mailer initialized");
        Ok(Self {
            mailer,
            from: config.user.clone(),
        })
    }

    pub fn from_env() -> Result<Self> {
        Self::new(&SmtpConfig::from_env()?)
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, message: &EmailMessage) -> Result<()> {
        let email = Message::builder()
            .from(self
                .from
                .parse()
                .map_err(|e| FidesError::Delivery(format!("invalid sender address: {e}")))?)
            .to(message
                .to
                .parse()
                .map_err(|e| FidesError::Delivery(format!("invalid recipient address: {e}")))?)
            .subject(message.subject.clone())
            .header(ContentType::TEXT_PLAIN)
            .body(message.body.clone())
            .map_err(|e| FidesError::Delivery(format!("failed to build email: {e}")))?;

        // SmtpTransport is blocking; keep it off the async workers.
        let mailer = self.mailer.clone();
        let outcome = tokio::task::spawn_blocking(move || mailer.send(&email))
            .await
            .map_err(|e| FidesError::Delivery(format!("send task failed: {e}")))?;

        match outcome {
            Ok(_) => {
                tracing::info!(to = %message.to, subject = %message.subject, "Email sent");
                Ok(())
            }
            Err(e) => {
                tracing::error!(to = %message.to, error = %e, "Failed to send email");
                Err(FidesError::Delivery(format!("SMTP send failed: {e}")))
            }
        }
    }
}

/// [`Mailer`] that records messages instead of sending them.
#[derive(Debug, Default)]
pub struct MockMailer {
    sent: Mutex<Vec<EmailMessage>>,
    fail: bool,
}

impl MockMailer {
    pub fn new() -> Self {
        Self::default()
    }

    /// A mailer that rejects every send, for exercising delivery-failure
    /// paths.
    pub fn failing() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    /// Messages recorded so far, oldest first.
    pub fn sent(&self) -> Vec<EmailMessage> {
        self.sent.lock().unwrap().clone()
    }

    pub fn sent_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

#[async_trait]
impl Mailer for MockMailer {
    async fn send(&self, message: &EmailMessage) -> Result<()> {
        if self.fail {
            return Err(FidesError::Delivery("mock mailer configured to fail".into()));
        }
        tracing::info!(to = %message.to, subject = %message.subject, "[MOCK] email recorded");
        self.sent.lock().unwrap().push(message.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mailer_builds_from_config() {
        let config = SmtpConfig {
            host: "smtp.gmail.com".to_string(),
            user: "sender@example.com".to_string(),
            password: "app-password".to_string(),
        };
        assert!(SmtpMailer::new(&config).is_ok());
    }

    #[test]
    fn debug_output_redacts_the_password() {
        let config = SmtpConfig {
            host: "smtp.gmail.com".to_string(),
            user: "sender@example.com".to_string(),
            password: "app-password".to_string(),
        };
        let output = format!("{config:?}");
        assert!(output.contains("[REDACTED]"));
        assert!(!output.contains("app-password"));
    }

    #[tokio::test]
    async fn mock_mailer_records_messages() {
        let mailer = MockMailer::new();
        let message = EmailMessage {
            to: "alice@example.com".to_string(),
            subject: "Hello".to_string(),
            body: "World".to_string(),
        };

        mailer.send(&message).await.unwrap();

        assert_eq!(mailer.sent_count(), 1);
        assert_eq!(mailer.sent()[0], message);
    }

    #[tokio::test]
    async fn failing_mock_rejects_sends() {
        let mailer = MockMailer::failing();
        let message = EmailMessage {
            to: "alice@example.com".to_string(),
            subject: "Hello".to_string(),
            body: "World".to_string(),
        };

        assert!(mailer.send(&message).await.is_err());
        assert_eq!(mailer.sent_count(), 0);
    }
}
