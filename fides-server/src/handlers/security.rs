//! Login-attempt recording and resolution endpoints.
//!
//! Recording appends to the audit log and then emails the account owner an
//! alert with single-use confirm/report links. The append commits first;
//! if the alert cannot be sent the caller gets an error but the attempt
//! stays recorded and queryable.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use fides_core::attempts::{
    compose_alert, AttemptPayload, AttemptStatus, DeviceInfo, LoginAttempt, ResolveDecision,
    ResolveError, RiskReport,
};

use crate::error::ApiError;
use crate::state::AppState;
use crate::validation;

const DEFAULT_LIST_LIMIT: usize = 50;
const MAX_LIST_LIMIT: usize = 200;

/// Browser and OS reported by the client.
#[derive(Debug, Deserialize, ToSchema)]
pub struct DeviceDto {
    #[schema(example = "Firefox")]
    pub browser: Option<String>,
    #[schema(example = "Linux")]
    pub os: Option<String>,
}

impl From<DeviceDto> for DeviceInfo {
    fn from(dto: DeviceDto) -> Self {
        Self {
            browser: dto.browser,
            os: dto.os,
        }
    }
}

/// Risk assessment computed by the caller.
#[derive(Debug, Deserialize, ToSchema)]
pub struct RiskDto {
    #[schema(example = 74)]
    #[serde(default)]
    pub score: u32,
    /// Reason tags such as `sim_swap`, `vpn`, `device_change`,
    /// `typing_anomaly`, `location_mismatch`
    #[serde(default)]
    pub reasons: Vec<String>,
}

impl From<RiskDto> for RiskReport {
    fn from(dto: RiskDto) -> Self {
        Self {
            score: dto.score,
            reasons: dto.reasons,
        }
    }
}

/// A login attempt to record and announce.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RecordAttemptRequest {
    #[schema(example = "user@example.com")]
    pub email: String,
    #[serde(default)]
    #[schema(example = "203.0.113.9")]
    pub ip: Option<String>,
    #[serde(default)]
    pub user_agent: Option<String>,
    #[serde(default)]
    pub fingerprint: Option<String>,
    #[serde(default)]
    pub device: Option<DeviceDto>,
    #[serde(default)]
    pub risk: Option<RiskDto>,
    #[serde(default)]
    #[schema(example = "Berlin, DE")]
    pub location: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordAttemptResponse {
    pub attempt_id: Uuid,
    pub status: AttemptStatus,
}

/// The account owner's answer, posted by the frontend.
#[derive(Debug, Deserialize, ToSchema)]
pub struct RespondRequest {
    pub token: String,
    /// `confirm` or `report`
    #[schema(example = "report")]
    pub decision: String,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct TokenQuery {
    /// Resolution token from the alert email
    pub token: String,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct ListAttemptsQuery {
    /// Restrict to one account's attempts
    pub email: Option<String>,
    /// Newest-first page size, capped at 200
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct ListAttemptsResponse {
    pub count: usize,
    pub attempts: Vec<LoginAttempt>,
}

/// Record a login attempt and email the account owner an alert.
#[utoipa::path(
    post,
    path = "/security/login-attempt",
    tag = "Security",
    request_body = RecordAttemptRequest,
    responses(
        (status = 201, description = "Attempt recorded and alert sent"),
        (status = 400, description = "Invalid email address"),
        (status = 500, description = "Alert delivery failed; the attempt stays recorded"),
    )
)]
pub async fn record_attempt(
    State(state): State<AppState>,
    Json(request): Json<RecordAttemptRequest>,
) -> Result<(StatusCode, Json<RecordAttemptResponse>), ApiError> {
    validation::validate_email(&request.email)?;
    let mailer = state
        .mailer
        .as_ref()
        .ok_or_else(|| ApiError::unconfigured("Email delivery is not configured"))?;

    let attempt = state.attempts.record(AttemptPayload {
        email: request.email,
        ip: request.ip,
        user_agent: request.user_agent,
        fingerprint: request.fingerprint,
        device: request.device.map(Into::into),
        risk: request.risk.map(Into::into),
        location: request.location,
    });

    // The record above stands whatever happens to the alert.
    let alert = compose_alert(&attempt, &state.public_base_url);
    if let Err(e) = mailer.send(&alert).await {
        tracing::error!(
            attempt_id = %attempt.id,
            error = %e,
            "Alert dispatch failed; attempt remains recorded"
        );
        return Err(e.into());
    }

    Ok((
        StatusCode::CREATED,
        Json(RecordAttemptResponse {
            attempt_id: attempt.id,
            status: attempt.status,
        }),
    ))
}

/// Confirm an attempt from the email link.
#[utoipa::path(
    get,
    path = "/security/login-attempt/confirm",
    tag = "Security",
    params(TokenQuery),
    responses(
        (status = 200, description = "Attempt confirmed"),
        (status = 404, description = "Unknown token"),
        (status = 409, description = "Already resolved"),
    )
)]
pub async fn confirm_attempt(
    State(state): State<AppState>,
    Query(query): Query<TokenQuery>,
) -> Result<Json<LoginAttempt>, ApiError> {
    resolve_attempt(&state, &query.token, ResolveDecision::Confirm)
}

/// Report an attempt from the email link.
#[utoipa::path(
    get,
    path = "/security/login-attempt/report",
    tag = "Security",
    params(TokenQuery),
    responses(
        (status = 200, description = "Attempt reported"),
        (status = 404, description = "Unknown token"),
        (status = 409, description = "Already resolved"),
    )
)]
pub async fn report_attempt(
    State(state): State<AppState>,
    Query(query): Query<TokenQuery>,
) -> Result<Json<LoginAttempt>, ApiError> {
    resolve_attempt(&state, &query.token, ResolveDecision::Report)
}

/// Resolve an attempt with an explicit decision payload.
#[utoipa::path(
    post,
    path = "/security/login-attempt/respond",
    tag = "Security",
    request_body = RespondRequest,
    responses(
        (status = 200, description = "Attempt resolved"),
        (status = 400, description = "Decision is neither 'confirm' nor 'report'"),
        (status = 404, description = "Unknown token"),
        (status = 409, description = "Already resolved"),
    )
)]
pub async fn respond_attempt(
    State(state): State<AppState>,
    Json(request): Json<RespondRequest>,
) -> Result<Json<LoginAttempt>, ApiError> {
    let decision = match request.decision.as_str() {
        "confirm" => ResolveDecision::Confirm,
        "report" => ResolveDecision::Report,
        other => {
            return Err(ApiError::bad_request(format!(
                "Decision must be 'confirm' or 'report', got '{other}'"
            )))
        }
    };

    resolve_attempt(&state, &request.token, decision)
}

/// Recent attempts, newest first.
#[utoipa::path(
    get,
    path = "/security/login-attempts",
    tag = "Security",
    params(ListAttemptsQuery),
    responses((status = 200, description = "Recent attempts, newest first"))
)]
pub async fn list_attempts(
    State(state): State<AppState>,
    Query(query): Query<ListAttemptsQuery>,
) -> Json<ListAttemptsResponse> {
    let limit = query
        .limit
        .unwrap_or(DEFAULT_LIST_LIMIT)
        .min(MAX_LIST_LIMIT);
    let attempts = state.attempts.recent(query.email.as_deref(), limit);

    Json(ListAttemptsResponse {
        count: attempts.len(),
        attempts,
    })
}

fn resolve_attempt(
    state: &AppState,
    token: &str,
    decision: ResolveDecision,
) -> Result<Json<LoginAttempt>, ApiError> {
    let attempt = state
        .attempts
        .resolve(token, decision)
        .map_err(|e| match e {
            ResolveError::InvalidToken => ApiError::not_found("Unknown or invalid resolution token"),
            ResolveError::AlreadyResolved => {
                ApiError::conflict("This login attempt was already resolved")
            }
        })?;

    Ok(Json(attempt))
}
