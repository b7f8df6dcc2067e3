//! WebAuthn relying-party configuration.

use std::fmt;

use thiserror::Error;
use url::Url;
use webauthn_rs::prelude::*;
use webauthn_rs::{Webauthn, WebauthnBuilder};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid origin URL: {0}")]
    InvalidOrigin(String),

    #[error("WebAuthn configuration error: {0}")]
    Webauthn(#[from] WebauthnError),
}

/// Wraps a configured [`Webauthn`] instance with its relying-party identity.
pub struct WebAuthnConfig {
    rp_id: String,
    rp_origin: Url,
    rp_name: String,
    webauthn: Webauthn,
}

impl WebAuthnConfig {
    pub fn new(rp_id: &str, rp_origin: &Url, rp_name: &str) -> Result<Self, ConfigError> {
        let webauthn = WebauthnBuilder::new(rp_id, rp_origin)?
            .rp_name(rp_name)
            .allow_subdomains(false)
            .build()?;

        Ok(Self {
            rp_id: rp_id.to_string(),
            rp_origin: rp_origin.clone(),
            rp_name: rp_name.to_string(),
            webauthn,
        })
    }

    /// Build from `WEBAUTHN_RP_ID`, `WEBAUTHN_RP_ORIGIN` and
    /// `WEBAUTHN_RP_NAME`, defaulting to localhost development values.
    pub fn from_env() -> Result<Self, ConfigError> {
        let rp_id = std::env::var("WEBAUTHN_RP_ID").unwrap_or_else(|_| "localhost".to_string());
        let rp_origin_raw = std::env::var("WEBAUTHN_RP_ORIGIN")
            .unwrap_or_else(|_| "http://localhost:3000".to_string());
        let rp_name = std::env::var("WEBAUTHN_RP_NAME").unwrap_or_else(|_| "Fides".to_string());

        let rp_origin = Url::parse(&rp_origin_raw)
            .map_err(|e| ConfigError::InvalidOrigin(format!("{rp_origin_raw}: {e}")))?;

        tracing::info!(rp_id = %rp_id, rp_origin = %rp_origin, "WebAuthn relying party configured");
        Self::new(&rp_id, &rp_origin, &rp_name)
    }

    pub fn webauthn(&self) -> &Webauthn {
        &self.webauthn
    }

    pub fn rp_id(&self) -> &str {
        &self.rp_id
    }

    pub fn rp_origin(&self) -> &Url {
        &self.rp_origin
    }

    pub fn rp_name(&self) -> &str {
        &self.rp_name
    }
}

impl fmt::Debug for WebAuthnConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WebAuthnConfig")
            .field("rp_id", &self.rp_id)
            .field("rp_origin", &self.rp_origin.as_str())
            .field("rp_name", &self.rp_name)
            .field("webauthn", &"<Webauthn instance>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_for_localhost() {
        let origin = Url::parse("http://localhost:3000").unwrap();
        let config = WebAuthnConfig::new("localhost", &origin, "Fides Test").unwrap();

        assert_eq!(config.rp_id(), "localhost");
        assert_eq!(config.rp_name(), "Fides Test");
        assert!(config
            .webauthn()
            .get_allowed_origins()
            .contains(&origin));
    }

    #[test]
    fn debug_does_not_dump_the_instance() {
        let origin = Url::parse("http://localhost:3000").unwrap();
        let config = WebAuthnConfig::new("localhost", &origin, "Fides Test").unwrap();
        assert!(format!("{config:?}").contains("<Webauthn instance>"));
    }
}
