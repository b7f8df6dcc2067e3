//! WebAuthn ceremony endpoints.
//!
//! Two-step registration and authentication over webauthn-rs. Each account
//! has at most one live ceremony of each kind: beginning again supersedes
//! the outstanding challenge, and completion consumes the stored state
//! whether or not verification succeeds, so a failed attestation cannot be
//! replayed against the same challenge.

use std::time::Duration;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use uuid::Uuid;
use webauthn_rs::prelude::*;

use fides_core::normalize_identity;

use super::storage::{encode_credential_id, AuthenticationCeremony, RegistrationCeremony, RegistryError};
use super::types::{
    AuthenticationCompleteResponse, BeginAuthenticationRequest, BeginRegistrationRequest,
    CompleteAuthenticationRequest, CompleteRegistrationRequest, RegistrationCompleteResponse,
};
use crate::error::ApiError;
use crate::state::AppState;
use crate::validation;

/// How long a started ceremony stays completable.
const CEREMONY_TTL: Duration = Duration::from_secs(300);

/// Begin registering a new passkey.
///
/// Replaces any registration ceremony already outstanding for the account.
#[utoipa::path(
    post,
    path = "/webauthn/register",
    tag = "WebAuthn",
    request_body = BeginRegistrationRequest,
    responses(
        (status = 200, description = "Creation challenge for navigator.credentials.create"),
        (status = 400, description = "Invalid account identifier"),
    )
)]
pub async fn begin_registration(
    State(state): State<AppState>,
    Json(request): Json<BeginRegistrationRequest>,
) -> Result<Json<CreationChallengeResponse>, ApiError> {
    validation::validate_user_id(&request.user_id)?;
    let owner = normalize_identity(&request.user_id);

    // Stable user handle so re-registrations look like the same user to the
    // authenticator.
    let user_handle = Uuid::new_v5(&Uuid::NAMESPACE_OID, owner.as_bytes());

    // Credentials the account already has must not be offered again.
    let existing: Vec<CredentialID> = state
        .credentials
        .passkeys_for(&owner)
        .iter()
        .map(|passkey| passkey.cred_id().clone())
        .collect();
    let exclude = (!existing.is_empty()).then_some(existing);

    let (challenge, ceremony_state) = state
        .webauthn
        .webauthn()
        .start_passkey_registration(user_handle, &owner, &owner, exclude)
        .map_err(|e| ApiError::internal(format!("Failed to start registration: {e:?}")))?;

    let ceremony_id = Uuid::new_v4();
    state.registrations.put(
        owner.clone(),
        ceremony_id.to_string(),
        CEREMONY_TTL,
        RegistrationCeremony {
            state: ceremony_state,
            device_label: request.device_label,
        },
    );

    tracing::info!(owner = %owner, ceremony_id = %ceremony_id, "Registration ceremony started");
    Ok(Json(challenge))
}

/// Finish registering a passkey with the authenticator's attestation.
#[utoipa::path(
    post,
    path = "/webauthn/register/complete",
    tag = "WebAuthn",
    request_body(content_type = "application/json", description = "Account id and the credential from navigator.credentials.create"),
    responses(
        (status = 201, description = "Credential stored", body = RegistrationCompleteResponse),
        (status = 401, description = "No live ceremony, or attestation failed verification"),
        (status = 409, description = "Credential already registered"),
    )
)]
pub async fn complete_registration(
    State(state): State<AppState>,
    Json(request): Json<CompleteRegistrationRequest>,
) -> Result<(StatusCode, Json<RegistrationCompleteResponse>), ApiError> {
    validation::validate_user_id(&request.user_id)?;
    let owner = normalize_identity(&request.user_id);

    // The ceremony is spent from here on, even if verification fails below.
    let ceremony = state.registrations.take(&owner).map_err(|reason| {
        tracing::debug!(owner = %owner, %reason, "Registration completion without live ceremony");
        ApiError::unauthorized("No active registration ceremony for this account")
    })?;

    let passkey = state
        .webauthn
        .webauthn()
        .finish_passkey_registration(&request.credential, &ceremony.state)
        .map_err(|e| ApiError::unauthorized(format!("Attestation failed verification: {e:?}")))?;

    let credential_id = encode_credential_id(passkey.cred_id());
    state
        .credentials
        .store_credential(&owner, passkey, ceremony.device_label)
        .map_err(|e| match e {
            RegistryError::Duplicate(_) => {
                ApiError::conflict("Credential already registered for this account")
            }
            other => ApiError::internal(format!("Failed to store credential: {other}")),
        })?;

    tracing::info!(
        owner = %owner,
        credential_id = %credential_id,
        credentials = state.credentials.credential_count(&owner),
        "Registration ceremony completed"
    );
    Ok((
        StatusCode::CREATED,
        Json(RegistrationCompleteResponse {
            registered: true,
            credential_id,
        }),
    ))
}

/// Begin an authentication ceremony against the account's passkeys.
#[utoipa::path(
    post,
    path = "/webauthn/authenticate",
    tag = "WebAuthn",
    request_body = BeginAuthenticationRequest,
    responses(
        (status = 200, description = "Request challenge for navigator.credentials.get"),
        (status = 404, description = "No credentials registered for this account"),
    )
)]
pub async fn begin_authentication(
    State(state): State<AppState>,
    Json(request): Json<BeginAuthenticationRequest>,
) -> Result<Json<RequestChallengeResponse>, ApiError> {
    validation::validate_user_id(&request.user_id)?;
    let owner = normalize_identity(&request.user_id);

    let passkeys = state.credentials.passkeys_for(&owner);
    if passkeys.is_empty() {
        return Err(ApiError::not_found(
            "No credentials registered for this account",
        ));
    }

    let (challenge, ceremony_state) = state
        .webauthn
        .webauthn()
        .start_passkey_authentication(&passkeys)
        .map_err(|e| ApiError::internal(format!("Failed to start authentication: {e:?}")))?;

    let ceremony_id = Uuid::new_v4();
    state.authentications.put(
        owner.clone(),
        ceremony_id.to_string(),
        CEREMONY_TTL,
        AuthenticationCeremony {
            state: ceremony_state,
        },
    );

    tracing::info!(
        owner = %owner,
        ceremony_id = %ceremony_id,
        credentials = passkeys.len(),
        "Authentication ceremony started"
    );
    Ok(Json(challenge))
}

/// Finish authentication with the authenticator's assertion.
#[utoipa::path(
    post,
    path = "/webauthn/authenticate/complete",
    tag = "WebAuthn",
    request_body(content_type = "application/json", description = "Account id and the credential from navigator.credentials.get"),
    responses(
        (status = 200, description = "Assertion verified", body = AuthenticationCompleteResponse),
        (status = 401, description = "No live ceremony, failed verification, or counter regression"),
    )
)]
pub async fn complete_authentication(
    State(state): State<AppState>,
    Json(request): Json<CompleteAuthenticationRequest>,
) -> Result<Json<AuthenticationCompleteResponse>, ApiError> {
    validation::validate_user_id(&request.user_id)?;
    let owner = normalize_identity(&request.user_id);

    let ceremony = state.authentications.take(&owner).map_err(|reason| {
        tracing::debug!(owner = %owner, %reason, "Authentication completion without live ceremony");
        ApiError::unauthorized("No active authentication ceremony for this account")
    })?;

    let auth_result = state
        .webauthn
        .webauthn()
        .finish_passkey_authentication(&request.credential, &ceremony.state)
        .map_err(|e| ApiError::unauthorized(format!("Assertion failed verification: {e:?}")))?;

    let stored = state
        .credentials
        .apply_authentication(&owner, &auth_result)
        .map_err(|e| match e {
            RegistryError::CounterRegression { stored, asserted } => {
                tracing::warn!(
                    owner = %owner,
                    stored,
                    asserted,
                    "Sign counter regressed; possible cloned authenticator"
                );
                ApiError::unauthorized("Authenticator signature counter regressed")
            }
            RegistryError::UnknownCredential => {
                ApiError::unauthorized("Asserted credential is not registered for this account")
            }
            other => ApiError::internal(format!("Failed to update credential: {other}")),
        })?;

    tracing::info!(
        owner = %owner,
        sign_count = stored.sign_count,
        "Authentication ceremony completed"
    );
    Ok(Json(AuthenticationCompleteResponse {
        verified: true,
        sign_count: stored.sign_count,
    }))
}
