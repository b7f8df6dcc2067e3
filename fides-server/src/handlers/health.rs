//! Health and readiness endpoints.

use axum::extract::State;
use axum::Json;
use serde::Serialize;
use utoipa::ToSchema;

use crate::state::AppState;

/// Health check response
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// `healthy`, or `degraded` when email delivery is down and alerts
    /// cannot go out
    #[schema(example = "healthy")]
    pub status: &'static str,
    #[schema(example = "0.1.0")]
    pub version: &'static str,
    pub email_delivery: bool,
    pub sms_delivery: bool,
    pub typing_vendor: bool,
    /// Whether registered credentials survive a restart
    pub credentials_persistent: bool,
    pub service: &'static str,
}

/// Readiness check response
#[derive(Debug, Serialize, ToSchema)]
pub struct ReadyResponse {
    pub ready: bool,
}

/// Liveness and provider availability.
#[utoipa::path(
    get,
    path = "/health",
    tag = "Health",
    responses((status = 200, description = "Service health and provider availability", body = HealthResponse))
)]
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let email_delivery = state.mailer.is_some();
    let status = if email_delivery { "healthy" } else { "degraded" };

    Json(HealthResponse {
        status,
        version: env!("CARGO_PKG_VERSION"),
        email_delivery,
        sms_delivery: state.sms.is_some(),
        typing_vendor: state.typingdna.is_some(),
        credentials_persistent: state.credentials.is_persistent(),
        service: "fides-server",
    })
}

/// Readiness for traffic.
#[utoipa::path(
    get,
    path = "/ready",
    tag = "Health",
    responses((status = 200, description = "Service is ready to accept requests", body = ReadyResponse))
)]
pub async fn ready() -> Json<ReadyResponse> {
    Json(ReadyResponse { ready: true })
}
