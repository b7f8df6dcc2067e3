//! Server configuration.
//!
//! Defaults suit local development and tests; `from_env` overlays the
//! environment for deployments. Provider credentials (SMTP, SMS gateway,
//! TypingDNA, credential snapshots) are read by the providers themselves.

use std::net::SocketAddr;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub host: [u8; 4],
    /// Allowed CORS origins. `None` allows any origin (development mode).
    pub allowed_origins: Option<Vec<String>>,
    pub body_limit_mb: usize,
    pub request_timeout_secs: u64,
    pub rate_limit_enabled: bool,
    pub rate_limit_per_sec: u64,
    pub rate_limit_burst: u32,
    /// External base URL used when composing links sent to account owners.
    pub public_base_url: String,
    pub otp_ttl_secs: u64,
    pub attempt_cap: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 3000,
            host: [127, 0, 0, 1],
            allowed_origins: None,
            body_limit_mb: 2,
            request_timeout_secs: 30,
            rate_limit_enabled: false,
            rate_limit_per_sec: 10,
            rate_limit_burst: 20,
            public_base_url: "http://localhost:3000".to_string(),
            otp_ttl_secs: 300,
            attempt_cap: 100,
        }
    }
}

impl Config {
    /// Load configuration from environment variables, falling back to
    /// defaults for anything unset or unparseable.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let port = std::env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(defaults.port);

        let host = match std::env::var("HOST").as_deref() {
            Ok("0.0.0.0") => [0, 0, 0, 0],
            _ => defaults.host,
        };

        let allowed_origins = std::env::var("ALLOWED_ORIGINS").ok().map(|origins| {
            origins
                .split(',')
                .map(|o| o.trim().to_string())
                .filter(|o| !o.is_empty())
                .collect()
        });

        let body_limit_mb = std::env::var("BODY_LIMIT_MB")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.body_limit_mb);

        let request_timeout_secs = std::env::var("REQUEST_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.request_timeout_secs);

        let rate_limit_enabled = std::env::var("RATE_LIMIT_ENABLED")
            .map(|v| v.to_lowercase() != "false")
            .unwrap_or(true);

        let rate_limit_per_sec = std::env::var("RATE_LIMIT_PER_SEC")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.rate_limit_per_sec);

        let rate_limit_burst = std::env::var("RATE_LIMIT_BURST")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.rate_limit_burst);

        let public_base_url = std::env::var("PUBLIC_BASE_URL")
            .map(|url| url.trim_end_matches('/').to_string())
            .unwrap_or(defaults.public_base_url);

        let otp_ttl_secs = std::env::var("OTP_TTL_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .filter(|&ttl| ttl > 0)
            .unwrap_or(defaults.otp_ttl_secs);

        let attempt_cap = std::env::var("LOGIN_ATTEMPT_CAP")
            .ok()
            .and_then(|v| v.parse().ok())
            .filter(|&cap| cap > 0)
            .unwrap_or(defaults.attempt_cap);

        Self {
            port,
            host,
            allowed_origins,
            body_limit_mb,
            request_timeout_secs,
            rate_limit_enabled,
            rate_limit_per_sec,
            rate_limit_burst,
            public_base_url,
            otp_ttl_secs,
            attempt_cap,
        }
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::from((self.host, self.port))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.port, 3000);
        assert_eq!(config.host, [127, 0, 0, 1]);
        assert!(config.allowed_origins.is_none());
        assert!(!config.rate_limit_enabled);
        assert_eq!(config.otp_ttl_secs, 300);
        assert_eq!(config.attempt_cap, 100);
        assert_eq!(config.public_base_url, "http://localhost:3000");
    }

    #[test]
    fn test_socket_addr() {
        let config = Config::default();
        assert_eq!(config.socket_addr().to_string(), "127.0.0.1:3000");
    }
}
