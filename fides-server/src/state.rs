//! Shared application state.

use std::sync::Arc;
use std::time::Duration;

use fides_core::attempts::AttemptLog;
use fides_core::delivery::{HttpSmsSender, Mailer, SmsSender, SmtpMailer};
use fides_core::otp::OtpManager;
use fides_core::store::SecretStore;
use fides_core::typing::{TypingDnaClient, TypingDnaHttp};

use crate::accounts::{AccountDirectory, InMemoryAccounts};
use crate::config::Config;
use crate::error::ApiError;
use crate::webauthn::{AuthenticationCeremony, CredentialRegistry, RegistrationCeremony, WebAuthnConfig};

/// Everything the handlers share. Delivery and vendor providers are
/// optional: endpoints that need a missing one fail with `NOT_CONFIGURED`
/// instead of keeping the whole service from starting.
#[derive(Clone)]
pub struct AppState {
    pub otp: Arc<OtpManager>,
    pub attempts: Arc<AttemptLog>,
    pub accounts: Arc<dyn AccountDirectory>,
    pub mailer: Option<Arc<dyn Mailer>>,
    pub sms: Option<Arc<dyn SmsSender>>,
    pub typingdna: Option<Arc<dyn TypingDnaClient>>,
    pub webauthn: Arc<WebAuthnConfig>,
    pub registrations: Arc<SecretStore<RegistrationCeremony>>,
    pub authentications: Arc<SecretStore<AuthenticationCeremony>>,
    pub credentials: Arc<CredentialRegistry>,
    pub public_base_url: String,
}

impl AppState {
    /// Build production state: required pieces fail startup, optional
    /// providers log a warning and leave their endpoints unconfigured.
    pub fn from_env(config: &Config) -> Result<Self, ApiError> {
        let webauthn = WebAuthnConfig::from_env()
            .map_err(|e| ApiError::internal(format!("WebAuthn configuration failed: {e}")))?;
        let credentials = CredentialRegistry::from_env()
            .map_err(|e| ApiError::internal(format!("Credential storage failed: {e}")))?;

        let mailer: Option<Arc<dyn Mailer>> = match SmtpMailer::from_env() {
            Ok(mailer) => Some(Arc::new(mailer)),
            Err(e) => {
                tracing::warn!(error = %e, "Email delivery disabled");
                None
            }
        };

        let sms: Option<Arc<dyn SmsSender>> = match HttpSmsSender::from_env() {
            Ok(sender) => Some(Arc::new(sender)),
            Err(e) => {
                tracing::warn!(error = %e, "SMS delivery disabled");
                None
            }
        };

        let typingdna: Option<Arc<dyn TypingDnaClient>> = match TypingDnaHttp::from_env() {
            Ok(client) => Some(Arc::new(client)),
            Err(e) => {
                tracing::warn!(error = %e, "Typing-biometric verification disabled");
                None
            }
        };

        Ok(Self {
            otp: Arc::new(OtpManager::with_ttl(Duration::from_secs(config.otp_ttl_secs))),
            attempts: Arc::new(AttemptLog::with_cap(config.attempt_cap)),
            accounts: Arc::new(InMemoryAccounts::new()),
            mailer,
            sms,
            typingdna,
            webauthn: Arc::new(webauthn),
            registrations: Arc::new(SecretStore::new()),
            authentications: Arc::new(SecretStore::new()),
            credentials: Arc::new(credentials),
            public_base_url: config.public_base_url.clone(),
        })
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("mailer", &self.mailer.is_some())
            .field("sms", &self.sms.is_some())
            .field("typingdna", &self.typingdna.is_some())
            .field("credentials", &self.credentials)
            .field("public_base_url", &self.public_base_url)
            .finish()
    }
}
