//! WebAuthn request and response types.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use webauthn_rs_proto::{PublicKeyCredential, RegisterPublicKeyCredential};

/// Request to begin credential registration.
#[derive(Debug, Deserialize, ToSchema)]
pub struct BeginRegistrationRequest {
    /// Account the credential will belong to
    #[schema(example = "user@example.com")]
    pub user_id: String,
    /// Optional human-readable label for the authenticator
    #[schema(example = "Work laptop")]
    pub device_label: Option<String>,
}

/// Request to finish credential registration with the authenticator's
/// attestation.
#[derive(Debug, Deserialize)]
pub struct CompleteRegistrationRequest {
    pub user_id: String,
    /// Output of `navigator.credentials.create`
    pub credential: RegisterPublicKeyCredential,
}

/// Confirmation of a stored credential.
#[derive(Debug, Serialize, ToSchema)]
pub struct RegistrationCompleteResponse {
    pub registered: bool,
    /// base64url-encoded credential id
    #[schema(example = "kFbVoJ8GJGWbSTPv0Ai-ig")]
    pub credential_id: String,
}

/// Request to begin an authentication ceremony.
#[derive(Debug, Deserialize, ToSchema)]
pub struct BeginAuthenticationRequest {
    #[schema(example = "user@example.com")]
    pub user_id: String,
}

/// Request to finish authentication with the authenticator's assertion.
#[derive(Debug, Deserialize)]
pub struct CompleteAuthenticationRequest {
    pub user_id: String,
    /// Output of `navigator.credentials.get`
    pub credential: PublicKeyCredential,
}

/// Outcome of a verified authentication.
#[derive(Debug, Serialize, ToSchema)]
pub struct AuthenticationCompleteResponse {
    pub verified: bool,
    /// Authenticator signature counter after this assertion
    pub sign_count: u32,
}
