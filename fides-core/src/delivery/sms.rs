//! SMS delivery through an HTTP gateway.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;

use super::SmsSender;
use crate::error::{FidesError, Result};

const GATEWAY_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_SENDER_ID: &str = "FIDES";

/// SMS gateway configuration.
#[derive(Clone)]
pub struct SmsGatewayConfig {
    pub url: String,
    pub auth_key: String,
    pub sender_id: String,
}

impl fmt::Debug for SmsGatewayConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SmsGatewayConfig")
            .field("url", &self.url)
            .field("auth_key", &"[REDACTED]")
            .field("sender_id", &self.sender_id)
            .finish()
    }
}

impl SmsGatewayConfig {
    /// Read configuration from the environment.
    ///
    /// Requires `SMS_GATEWAY_URL` and `SMS_GATEWAY_KEY`; `SMS_SENDER_ID`
    /// overrides the default sender label.
    pub fn from_env() -> Result<Self> {
        let url = std::env::var("SMS_GATEWAY_URL")
            .map_err(|_| FidesError::Unconfigured("SMS_GATEWAY_URL"))?;
        let auth_key = std::env::var("SMS_GATEWAY_KEY")
            .map_err(|_| FidesError::Unconfigured("SMS_GATEWAY_KEY"))?;
        let sender_id =
            std::env::var("SMS_SENDER_ID").unwrap_or_else(|_| DEFAULT_SENDER_ID.to_string());

        Ok(Self {
            url,
            auth_key,
            sender_id,
        })
    }
}

#[derive(Debug, Serialize)]
struct GatewayRequest<'a> {
    sender: &'a str,
    to: &'a str,
    message: &'a str,
}

/// [`SmsSender`] that posts to a JSON gateway authenticated by API key.
pub struct HttpSmsSender {
    client: Client,
    config: SmsGatewayConfig,
}

impl HttpSmsSender {
    pub fn new(config: SmsGatewayConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(GATEWAY_TIMEOUT)
            .build()
            .map_err(|e| FidesError::Delivery(format!("failed to create HTTP client: {e}")))?;

        tracing::info!(url = %config.url, "SMS gateway client created");
        Ok(Self { client, config })
    }

    pub fn from_env() -> Result<Self> {
        Self::new(SmsGatewayConfig::from_env()?)
    }
}

#[async_trait]
impl SmsSender for HttpSmsSender {
    async fn send(&self, to: &str, body: &str) -> Result<()> {
        let to = normalize_number(to);
        if to.is_empty() {
            return Err(FidesError::Delivery("empty phone number".into()));
        }

        let request = GatewayRequest {
            sender: &self.config.sender_id,
            to: &to,
            message: body,
        };

        let response = self
            .client
            .post(&self.config.url)
            .header("authkey", self.config.auth_key.as_str())
            .json(&request)
            .send()
            .await
            .map_err(|e| FidesError::Delivery(format!("SMS gateway unreachable: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            tracing::error!(%status, "SMS gateway rejected the message");
            return Err(FidesError::Delivery(format!(
                "SMS gateway returned {status}: {detail}"
            )));
        }

        tracing::info!(to = %to, "SMS sent");
        Ok(())
    }
}

/// Keep digits and a leading `+`; gateways reject formatted numbers.
fn normalize_number(to: &str) -> String {
    to.chars()
        .enumerate()
        .filter(|&(i, c)| c.is_ascii_digit() || (c == '+' && i == 0))
        .map(|(_, c)| c)
        .collect()
}

/// [`SmsSender`] that records messages instead of sending them.
#[derive(Debug, Default)]
pub struct MockSms {
    sent: Mutex<Vec<(String, String)>>,
    send_count: AtomicU64,
    fail: bool,
}

impl MockSms {
    pub fn new() -> Self {
        Self::default()
    }

    /// A sender that rejects every send.
    pub fn failing() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            send_count: AtomicU64::new(0),
            fail: true,
        }
    }

    /// `(recipient, body)` pairs recorded so far, oldest first.
    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn sent_count(&self) -> u64 {
        self.send_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SmsSender for MockSms {
    async fn send(&self, to: &str, body: &str) -> Result<()> {
        if self.fail {
            return Err(FidesError::Delivery("mock SMS sender configured to fail".into()));
        }
        tracing::info!(to = %to, "[MOCK] SMS recorded");
        self.sent
            .lock()
            .unwrap()
            .push((to.to_string(), body.to_string()));
        self.send_count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalization_strips_formatting() {
        assert_eq!(normalize_number("+1 (415) 555-0123"), "+14155550123");
        assert_eq!(normalize_number("07700 900123"), "07700900123");
        assert_eq!(normalize_number("--"), "");
    }

    #[test]
    fn normalization_keeps_plus_only_at_the_front() {
        assert_eq!(normalize_number("+44+7700"), "+447700");
    }

    #[test]
    fn debug_output_redacts_the_auth_key() {
        let config = SmsGatewayConfig {
            url: "https://sms.example.com/send".to_string(),
            auth_key: "gateway-key".to_string(),
            sender_id: DEFAULT_SENDER_ID.to_string(),
        };
        let output = format!("{config:?}");
        assert!(output.contains("[REDACTED]"));
        assert!(!output.contains("gateway-key"));
    }

    #[tokio::test]
    async fn mock_sender_records_messages() {
        let sms = MockSms::new();
        sms.send("+14155550123", "code 123456").await.unwrap();

        assert_eq!(sms.sent_count(), 1);
        assert_eq!(
            sms.sent(),
            vec![("+14155550123".to_string(), "code 123456".to_string())]
        );
    }

    #[tokio::test]
    async fn failing_mock_rejects_sends() {
        let sms = MockSms::failing();
        assert!(sms.send("+14155550123", "code").await.is_err());
        assert_eq!(sms.sent_count(), 0);
    }
}
