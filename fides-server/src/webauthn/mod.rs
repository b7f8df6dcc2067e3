//! WebAuthn passkey registration and authentication.
//!
//! Architecture:
//! - `config`: relying-party identity wrapping the webauthn-rs instance
//! - `handlers`: the four ceremony endpoints
//! - `storage`: registered credentials (memory or JSON snapshot) and
//!   ceremony payload types
//! - `types`: request/response DTOs

mod config;
pub mod handlers;
pub mod storage;
mod types;

pub use config::{ConfigError, WebAuthnConfig};
pub use storage::{
    AuthenticationCeremony, CredentialRegistry, RegistrationCeremony, RegistryError,
    StoredCredential,
};
pub use types::{
    AuthenticationCompleteResponse, BeginAuthenticationRequest, BeginRegistrationRequest,
    CompleteAuthenticationRequest, CompleteRegistrationRequest, RegistrationCompleteResponse,
};
