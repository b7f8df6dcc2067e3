//! Route table and middleware stack.

use std::sync::Arc;
use std::time::Duration;

use axum::http::{HeaderValue, Method, StatusCode};
use axum::routing::{get, post};
use axum::Router;
use tower_governor::{governor::GovernorConfigBuilder, GovernorLayer};
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::config::Config;
use crate::handlers;
use crate::openapi::ApiDoc;
use crate::state::AppState;
use crate::webauthn;

/// Router with default configuration (used by tests).
pub fn create_router(state: AppState) -> Router {
    create_router_with_config(state, &Config::default())
}

/// Router with explicit configuration.
pub fn create_router_with_config(state: AppState, config: &Config) -> Router {
    let cors = match &config.allowed_origins {
        Some(origins) if !origins.is_empty() => {
            let parsed: Vec<HeaderValue> = origins
                .iter()
                .filter_map(|origin| origin.parse().ok())
                .collect();
            tracing::info!(origins = ?origins, "CORS restricted to configured origins");
            CorsLayer::new()
                .allow_origin(parsed)
                .allow_methods([Method::GET, Method::POST])
                .allow_headers(Any)
        }
        _ => {
            tracing::warn!("CORS: Allowing all origins (dev mode)");
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
        }
    };

    let router = Router::new()
        // OTP
        .route("/otp/send", post(handlers::send_email_otp))
        .route("/otp/verify", post(handlers::verify_email_otp))
        .route("/phone/send-otp", post(handlers::send_phone_otp))
        .route("/phone/verify-otp", post(handlers::verify_phone_otp))
        // WebAuthn ceremonies
        .route("/webauthn/register", post(webauthn::handlers::begin_registration))
        .route(
            "/webauthn/register/complete",
            post(webauthn::handlers::complete_registration),
        )
        .route(
            "/webauthn/authenticate",
            post(webauthn::handlers::begin_authentication),
        )
        .route(
            "/webauthn/authenticate/complete",
            post(webauthn::handlers::complete_authentication),
        )
        // Typing biometrics
        .route("/typingdna/verify", post(handlers::typing_verify))
        // Login attempts
        .route("/security/login-attempt", post(handlers::record_attempt))
        .route(
            "/security/login-attempt/confirm",
            get(handlers::confirm_attempt),
        )
        .route(
            "/security/login-attempt/report",
            get(handlers::report_attempt),
        )
        .route(
            "/security/login-attempt/respond",
            post(handlers::respond_attempt),
        )
        .route("/security/login-attempts", get(handlers::list_attempts))
        // Health
        .route("/health", get(handlers::health))
        .route("/ready", get(handlers::ready))
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(cors)
        .layer(RequestBodyLimitLayer::new(config.body_limit_mb * 1024 * 1024))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(config.request_timeout_secs),
        ))
        .with_state(state);

    if config.rate_limit_enabled {
        let governor_conf = GovernorConfigBuilder::default()
            .per_second(config.rate_limit_per_sec)
            .burst_size(config.rate_limit_burst)
            .finish()
            .expect("Failed to build rate limiter config");

        tracing::info!(
            per_second = config.rate_limit_per_sec,
            burst = config.rate_limit_burst,
            "Rate limiting enabled"
        );

        router
            .layer(GovernorLayer::new(Arc::new(governor_conf)))
            .layer(TraceLayer::new_for_http())
    } else {
        router.layer(TraceLayer::new_for_http())
    }
}
