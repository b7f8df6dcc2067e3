//! HTTP client for the TypingDNA REST API.
//!
//! Authenticates with HTTP Basic (API key and secret), retries transient
//! failures with exponential backoff, and never logs credentials or typing
//! patterns.

use std::fmt;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use backoff::{future::retry_notify, ExponentialBackoff};
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;
use reqwest::{header, Client, StatusCode};
use serde::Deserialize;
use tracing::{debug, info, instrument, warn};

use super::{SaveOutcome, TypingDnaClient, VendorVerdict};
use crate::error::{FidesError, Result};

const DEFAULT_API_URL: &str = "https://api.typingdna.com";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_MAX_RETRIES: u32 = 3;

/// Configuration for the TypingDNA API client.
#[derive(Clone)]
pub struct TypingDnaConfig {
    pub api_url: String,
    pub api_key: String,
    pub api_secret: String,
    pub timeout: Duration,
    pub max_retries: u32,
}

impl fmt::Debug for TypingDnaConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypingDnaConfig")
            .field("api_url", &self.api_url)
            .field("api_key", &self.api_key)
            .field("api_secret", &"[REDACTED]")
            .field("timeout", &self.timeout)
            .field("max_retries", &self.max_retries)
            .finish()
    }
}

impl TypingDnaConfig {
    /// Read configuration from the environment.
    ///
    /// Requires `TYPINGDNA_API_KEY` and `TYPINGDNA_API_SECRET`;
    /// `TYPINGDNA_API_URL` overrides the public endpoint.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("TYPINGDNA_API_KEY")
            .map_err(|_| FidesError::Unconfigured("TYPINGDNA_API_KEY"))?;
        let api_secret = std::env::var("TYPINGDNA_API_SECRET")
            .map_err(|_| FidesError::Unconfigured("TYPINGDNA_API_SECRET"))?;
        let api_url =
            std::env::var("TYPINGDNA_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string());

        Ok(Self {
            api_url,
            api_key,
            api_secret,
            timeout: DEFAULT_TIMEOUT,
            max_retries: DEFAULT_MAX_RETRIES,
        })
    }
}

/// TypingDNA client over reqwest.
pub struct TypingDnaHttp {
    client: Client,
    config: TypingDnaConfig,
    auth_header: String,
}

impl fmt::Debug for TypingDnaHttp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypingDnaHttp")
            .field("config", &self.config)
            .field("auth_header", &"[REDACTED]")
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct UserResponse {
    #[serde(default)]
    count: u32,
}

#[derive(Debug, Deserialize)]
struct SaveResponse {
    #[serde(default)]
    message_code: Option<i64>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct VerifyResponse {
    #[serde(default)]
    result: i64,
    #[serde(default)]
    score: u32,
    #[serde(default)]
    net_score: Option<u32>,
    #[serde(default)]
    message_code: Option<i64>,
}

impl TypingDnaHttp {
    pub fn new(config: TypingDnaConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .https_only(true)
            .build()
            .map_err(|e| FidesError::Vendor(format!("failed to create HTTP client: {e}")))?;
        let auth_header = basic_auth_header(&config.api_key, &config.api_secret);

        info!(api_url = %config.api_url, "TypingDNA client created");
        Ok(Self {
            client,
            config,
            auth_header,
        })
    }

    pub fn from_env() -> Result<Self> {
        Self::new(TypingDnaConfig::from_env()?)
    }

    fn endpoint(&self, operation: &str, user_id: &str) -> String {
        format!(
            "{}/{}/{}",
            self.config.api_url.trim_end_matches('/'),
            operation,
            user_id
        )
    }

    /// Send a request built by `build`, retrying transient failures, and
    /// decode the JSON response.
    async fn request_json<R, F>(&self, build: F, op: &'static str) -> Result<R>
    where
        R: serde::de::DeserializeOwned,
        F: Fn() -> reqwest::RequestBuilder,
    {
        let backoff = ExponentialBackoff {
            initial_interval: Duration::from_millis(100),
            max_interval: Duration::from_secs(2),
            max_elapsed_time: Some(self.config.timeout * self.config.max_retries),
            ..Default::default()
        };

        retry_notify(
            backoff,
            || async {
                let started = Instant::now();
                let response = build()
                    .header(header::AUTHORIZATION, self.auth_header.as_str())
                    .send()
                    .await
                    .map_err(|e| {
                        if is_transient_error(&e) {
                            backoff::Error::transient(FidesError::Vendor(format!(
                                "transient error calling {op}: {e}"
                            )))
                        } else {
                            backoff::Error::permanent(FidesError::from(e))
                        }
                    })?;

                let status = response.status();
                if !status.is_success() {
                    let body = response.text().await.unwrap_or_default();
                    let error = FidesError::VendorStatus {
                        status: status.as_u16(),
                        body,
                    };
                    return Err(if is_transient_status(status) {
                        backoff::Error::transient(error)
                    } else {
                        backoff::Error::permanent(error)
                    });
                }

                debug!(
                    op,
                    latency_ms = started.elapsed().as_millis() as u64,
                    "Vendor call succeeded"
                );

                response.json::<R>().await.map_err(|e| {
                    backoff::Error::permanent(FidesError::Vendor(format!(
                        "failed to decode {op} response: {e}"
                    )))
                })
            },
            |error, duration: Duration| {
                warn!(
                    %error,
                    retry_after_ms = duration.as_millis() as u64,
                    "Vendor call failed, retry scheduled"
                );
            },
        )
        .await
    }
}

#[async_trait]
impl TypingDnaClient for TypingDnaHttp {
    #[instrument(level = "info", skip(self), fields(vendor = "typingdna"))]
    async fn pattern_count(&self, user_id: &str) -> Result<u32> {
        let url = self.endpoint("user", user_id);
        let response: UserResponse = self
            .request_json(|| self.client.get(&url), "pattern_count")
            .await?;
        debug!(count = response.count, "Pattern count fetched");
        Ok(response.count)
    }

    #[instrument(level = "info", skip(self, pattern), fields(vendor = "typingdna"))]
    async fn save_pattern(&self, user_id: &str, pattern: &str) -> Result<SaveOutcome> {
        let url = self.endpoint("save", user_id);
        let response: SaveResponse = self
            .request_json(
                || self.client.post(&url).form(&[("tp", pattern)]),
                "save_pattern",
            )
            .await?;
        info!(message_code = ?response.message_code, "Pattern saved");
        Ok(SaveOutcome {
            message_code: response.message_code,
            message: response.message,
        })
    }

    #[instrument(level = "info", skip(self, pattern, text_id), fields(vendor = "typingdna"))]
    async fn verify_pattern(
        &self,
        user_id: &str,
        pattern: &str,
        text_id: Option<&str>,
    ) -> Result<VendorVerdict> {
        let url = self.endpoint("verify", user_id);
        let mut form = vec![("tp", pattern)];
        if let Some(text_id) = text_id {
            form.push(("textid", text_id));
        }

        let response: VerifyResponse = self
            .request_json(|| self.client.post(&url).form(&form), "verify_pattern")
            .await?;
        info!(
            score = response.score,
            vendor_result = response.result,
            "Pattern verified"
        );
        Ok(VendorVerdict {
            result: response.result,
            score: response.score,
            net_score: response.net_score,
            message_code: response.message_code,
        })
    }
}

fn basic_auth_header(api_key: &str, api_secret: &str) -> String {
    format!(
        "Basic {}",
        BASE64_STANDARD.encode(format!("{api_key}:{api_secret}"))
    )
}

/// Connection-level failures worth retrying.
fn is_transient_error(error: &reqwest::Error) -> bool {
    error.is_timeout() || error.is_connect() || error.is_request()
}

/// Status codes that signal a temporarily unavailable vendor.
fn is_transient_status(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::TOO_MANY_REQUESTS
            | StatusCode::BAD_GATEWAY
            | StatusCode::SERVICE_UNAVAILABLE
            | StatusCode::GATEWAY_TIMEOUT
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic_auth_header_encodes_key_and_secret() {
        // base64("key:secret")
        assert_eq!(basic_auth_header("key", "secret"), "Basic a2V5OnNlY3JldA==");
    }

    #[test]
    fn debug_output_redacts_the_secret() {
        let config = TypingDnaConfig {
            api_url: DEFAULT_API_URL.to_string(),
            api_key: "public-key".to_string(),
            api_secret: "super-secret".to_string(),
            timeout: DEFAULT_TIMEOUT,
            max_retries: DEFAULT_MAX_RETRIES,
        };
        let output = format!("{config:?}");
        assert!(output.contains("[REDACTED]"));
        assert!(!output.contains("super-secret"));
    }

    #[test]
    fn transient_statuses_are_retryable() {
        assert!(is_transient_status(StatusCode::TOO_MANY_REQUESTS));
        assert!(is_transient_status(StatusCode::BAD_GATEWAY));
        assert!(is_transient_status(StatusCode::SERVICE_UNAVAILABLE));
        assert!(is_transient_status(StatusCode::GATEWAY_TIMEOUT));
        assert!(!is_transient_status(StatusCode::UNAUTHORIZED));
        assert!(!is_transient_status(StatusCode::NOT_FOUND));
        assert!(!is_transient_status(StatusCode::INTERNAL_SERVER_ERROR));
    }

    #[test]
    fn endpoint_joins_without_double_slashes() {
        let client = TypingDnaHttp::new(TypingDnaConfig {
            api_url: "https://api.typingdna.com/".to_string(),
            api_key: "k".to_string(),
            api_secret: "s".to_string(),
            timeout: DEFAULT_TIMEOUT,
            max_retries: DEFAULT_MAX_RETRIES,
        })
        .unwrap();
        assert_eq!(
            client.endpoint("user", "alice@example.com"),
            "https://api.typingdna.com/user/alice@example.com"
        );
    }

    #[test]
    fn from_env_requires_credentials() {
        std::env::remove_var("TYPINGDNA_API_KEY");
        std::env::remove_var("TYPINGDNA_API_SECRET");
        assert!(TypingDnaConfig::from_env().is_err());

        std::env::set_var("TYPINGDNA_API_KEY", "k");
        std::env::set_var("TYPINGDNA_API_SECRET", "s");
        let config = TypingDnaConfig::from_env().unwrap();
        assert_eq!(config.api_url, DEFAULT_API_URL);
        std::env::remove_var("TYPINGDNA_API_KEY");
        std::env::remove_var("TYPINGDNA_API_SECRET");
    }
}
