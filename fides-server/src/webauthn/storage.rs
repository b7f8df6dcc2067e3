//! Credential registry.
//!
//! Registered passkeys partitioned by account, either purely in memory or
//! write-through to a JSON snapshot on disk. Ceremony state is not stored
//! here: live challenges sit in the single-use secret store and die with
//! the process.

use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use webauthn_rs::prelude::*;

use fides_core::normalize_identity;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Credential already registered: {0}")]
    Duplicate(String),

    #[error("Credential is not registered for this account")]
    UnknownCredential,

    #[error("Sign counter regressed: stored {stored}, asserted {asserted}")]
    CounterRegression { stored: u32, asserted: u32 },

    #[error("Snapshot error: {0}")]
    Snapshot(String),
}

/// A registered passkey plus registry metadata.
#[derive(Clone, Serialize, Deserialize)]
pub struct StoredCredential {
    pub passkey: Passkey,
    /// Highest authenticator signature counter seen so far.
    pub sign_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_label: Option<String>,
    pub registered_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_used_at: Option<DateTime<Utc>>,
}

/// Registration ceremony state awaiting the authenticator's attestation.
pub struct RegistrationCeremony {
    pub state: PasskeyRegistration,
    pub device_label: Option<String>,
}

/// Authentication ceremony state awaiting the authenticator's assertion.
pub struct AuthenticationCeremony {
    pub state: PasskeyAuthentication,
}

enum Backend {
    Memory,
    /// Every mutation rewrites the snapshot before returning.
    JsonFile(PathBuf),
}

/// Account-partitioned passkey store.
pub struct CredentialRegistry {
    credentials: DashMap<String, Vec<StoredCredential>>,
    backend: Backend,
}

impl CredentialRegistry {
    pub fn in_memory() -> Self {
        Self {
            credentials: DashMap::new(),
            backend: Backend::Memory,
        }
    }

    /// Open or create a JSON snapshot at `path` and load whatever it holds.
    pub fn with_snapshot(path: PathBuf) -> Result<Self, RegistryError> {
        let credentials = if path.exists() {
            let raw = std::fs::read(&path)
                .map_err(|e| RegistryError::Snapshot(format!("read {}: {e}", path.display())))?;
            let map: BTreeMap<String, Vec<StoredCredential>> = serde_json::from_slice(&raw)
                .map_err(|e| RegistryError::Snapshot(format!("parse {}: {e}", path.display())))?;
            map.into_iter().collect()
        } else {
            DashMap::new()
        };

        tracing::info!(
            path = %path.display(),
            accounts = credentials.len(),
            "Credential snapshot loaded"
        );
        Ok(Self {
            credentials,
            backend: Backend::JsonFile(path),
        })
    }

    /// Pick a backend from `CREDENTIAL_STORE` (`memory` or `file`, default
    /// memory). File mode reads the path from `CREDENTIAL_STORE_PATH`.
    pub fn from_env() -> Result<Self, RegistryError> {
        match std::env::var("CREDENTIAL_STORE").as_deref() {
            Ok("file") => {
                let path = std::env::var("CREDENTIAL_STORE_PATH")
                    .unwrap_or_else(|_| "credentials.json".to_string());
                Self::with_snapshot(PathBuf::from(path))
            }
            _ => {
                tracing::warn!("Using in-memory credential storage - credentials will be lost on restart!");
                Ok(Self::in_memory())
            }
        }
    }

    pub fn is_persistent(&self) -> bool {
        matches!(self.backend, Backend::JsonFile(_))
    }

    /// Store a newly attested passkey for `owner`. Registering the same
    /// credential id twice is refused.
    pub fn store_credential(
        &self,
        owner: &str,
        passkey: Passkey,
        device_label: Option<String>,
    ) -> Result<StoredCredential, RegistryError> {
        let key = normalize_identity(owner);
        let stored = {
            let mut entry = self.credentials.entry(key).or_default();
            if entry.iter().any(|c| c.passkey.cred_id() == passkey.cred_id()) {
                return Err(RegistryError::Duplicate(encode_credential_id(
                    passkey.cred_id(),
                )));
            }
            let stored = StoredCredential {
                passkey,
                sign_count: 0,
                device_label,
                registered_at: Utc::now(),
                last_used_at: None,
            };
            entry.push(stored.clone());
            stored
        };

        self.persist()?;
        Ok(stored)
    }

    /// All passkeys registered for `owner`.
    pub fn passkeys_for(&self, owner: &str) -> Vec<Passkey> {
        self.credentials
            .get(&normalize_identity(owner))
            .map(|entry| entry.iter().map(|c| c.passkey.clone()).collect())
            .unwrap_or_default()
    }

    pub fn has_credentials(&self, owner: &str) -> bool {
        self.credentials
            .get(&normalize_identity(owner))
            .map(|entry| !entry.is_empty())
            .unwrap_or(false)
    }

    pub fn credential_count(&self, owner: &str) -> usize {
        self.credentials
            .get(&normalize_identity(owner))
            .map(|entry| entry.len())
            .unwrap_or(0)
    }

    pub fn account_count(&self) -> usize {
        self.credentials.len()
    }

    /// Apply a finished authentication: enforce counter monotonicity, fold
    /// the authenticator's update into the stored passkey and stamp last
    /// use. A counter below the stored value is treated as a cloned
    /// authenticator and refused.
    pub fn apply_authentication(
        &self,
        owner: &str,
        result: &AuthenticationResult,
    ) -> Result<StoredCredential, RegistryError> {
        let key = normalize_identity(owner);
        let updated = {
            let mut entry = self
                .credentials
                .get_mut(&key)
                .ok_or(RegistryError::UnknownCredential)?;
            let credential = entry
                .iter_mut()
                .find(|c| c.passkey.cred_id() == result.cred_id())
                .ok_or(RegistryError::UnknownCredential)?;

            ensure_monotonic(credential.sign_count, result.counter())?;

            credential.passkey.update_credential(result);
            credential.sign_count = result.counter();
            credential.last_used_at = Some(Utc::now());
            credential.clone()
        };

        self.persist()?;
        Ok(updated)
    }

    fn persist(&self) -> Result<(), RegistryError> {
        let Backend::JsonFile(path) = &self.backend else {
            return Ok(());
        };

        let map: BTreeMap<String, Vec<StoredCredential>> = self
            .credentials
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect();
        let raw = serde_json::to_vec_pretty(&map)
            .map_err(|e| RegistryError::Snapshot(format!("serialize: {e}")))?;
        std::fs::write(path, raw)
            .map_err(|e| RegistryError::Snapshot(format!("write {}: {e}", path.display())))?;
        Ok(())
    }
}

impl std::fmt::Debug for CredentialRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let backend = match &self.backend {
            Backend::Memory => "memory".to_string(),
            Backend::JsonFile(path) => format!("file:{}", path.display()),
        };
        f.debug_struct("CredentialRegistry")
            .field("backend", &backend)
            .field("accounts", &self.credentials.len())
            .finish()
    }
}

/// Counters must never decrease. Authenticators without a counter report 0
/// on every assertion, which stays equal and passes.
fn ensure_monotonic(stored: u32, asserted: u32) -> Result<(), RegistryError> {
    if asserted < stored {
        Err(RegistryError::CounterRegression { stored, asserted })
    } else {
        Ok(())
    }
}

pub(crate) fn encode_credential_id(id: &[u8]) -> String {
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use base64::Engine;
    URL_SAFE_NO_PAD.encode(id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_may_hold_or_grow_but_never_shrink() {
        assert!(ensure_monotonic(0, 0).is_ok());
        assert!(ensure_monotonic(5, 5).is_ok());
        assert!(ensure_monotonic(5, 6).is_ok());
        assert!(ensure_monotonic(5, 100).is_ok());

        match ensure_monotonic(5, 4) {
            Err(RegistryError::CounterRegression { stored, asserted }) => {
                assert_eq!(stored, 5);
                assert_eq!(asserted, 4);
            }
            other => panic!("expected counter regression, got {other:?}"),
        }
    }

    #[test]
    fn fresh_registry_is_empty_and_volatile() {
        let registry = CredentialRegistry::in_memory();
        assert!(!registry.is_persistent());
        assert_eq!(registry.account_count(), 0);
        assert!(!registry.has_credentials("alice@example.com"));
        assert!(registry.passkeys_for("alice@example.com").is_empty());
        assert_eq!(registry.credential_count("alice@example.com"), 0);
    }

    #[test]
    fn from_env_defaults_to_memory() {
        std::env::remove_var("CREDENTIAL_STORE");
        let registry = CredentialRegistry::from_env().unwrap();
        assert!(!registry.is_persistent());
    }

    #[test]
    fn snapshot_backend_reports_persistent() {
        let path = std::env::temp_dir().join(format!("fides-creds-{}.json", uuid::Uuid::new_v4()));
        let registry = CredentialRegistry::with_snapshot(path.clone()).unwrap();
        assert!(registry.is_persistent());
        assert_eq!(registry.account_count(), 0);
        let _ = std::fs::remove_file(path);
    }
}
