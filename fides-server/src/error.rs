//! API error handling.
//!
//! Every handler returns [`ApiError`] on failure. Each variant maps to an
//! HTTP status and a stable machine-readable code; messages for server-side
//! failures are sanitized before they reach the client.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use fides_core::FidesError;
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Upstream failure: {0}")]
    Upstream(String),

    #[error("Not configured: {0}")]
    Unconfigured(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Core error: {0}")]
    Core(#[from] FidesError),
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }

    pub fn upstream(message: impl Into<String>) -> Self {
        Self::Upstream(message.into())
    }

    pub fn unconfigured(message: impl Into<String>) -> Self {
        Self::Unconfigured(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Upstream(_) | Self::Unconfigured(_) | Self::Internal(_) | Self::Core(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Stable error code for programmatic clients.
    fn error_code(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => "INVALID_INPUT",
            Self::Unauthorized(_) => "UNAUTHORIZED",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Conflict(_) => "CONFLICT",
            Self::Upstream(_) => "UPSTREAM_FAILURE",
            Self::Unconfigured(_) => "NOT_CONFIGURED",
            Self::Internal(_) => "INTERNAL_ERROR",
            Self::Core(e) => match e {
                FidesError::Delivery(_) => "DELIVERY_FAILED",
                FidesError::Unconfigured(_) => "NOT_CONFIGURED",
                FidesError::Vendor(_) | FidesError::VendorStatus { .. } => "VENDOR_ERROR",
                FidesError::Http(_) => "UPSTREAM_FAILURE",
            },
        }
    }

    /// What the client is allowed to see. Core failures carry relay
    /// addresses, vendor payloads and the like, so they get generic text.
    fn client_message(&self) -> String {
        match self {
            Self::Core(e) => match e {
                FidesError::Delivery(_) => "Failed to deliver message".to_string(),
                FidesError::Unconfigured(what) => format!("{what} is not configured"),
                FidesError::Vendor(_) | FidesError::VendorStatus { .. } => {
                    "Verification vendor error".to_string()
                }
                FidesError::Http(_) => "Upstream service error".to_string(),
            },
            _ => self.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.error_code();
        let message = self.client_message();

        match &self {
            Self::BadRequest(_) | Self::NotFound(_) | Self::Conflict(_) => {
                tracing::warn!(%status, code, error = %self, "Client error");
            }
            Self::Unauthorized(_) => {
                tracing::warn!(%status, code, error = %self, "Authentication refused");
            }
            Self::Upstream(_) | Self::Unconfigured(_) | Self::Internal(_) => {
                tracing::error!(%status, code, error = %self, "Server error");
            }
            Self::Core(_) => {
                tracing::error!(%status, code, error = %self, client_message = %message, "Core error");
            }
        }

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_follow_the_taxonomy() {
        assert_eq!(
            ApiError::bad_request("x").status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::unauthorized("x").status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(ApiError::not_found("x").status_code(), StatusCode::NOT_FOUND);
        assert_eq!(ApiError::conflict("x").status_code(), StatusCode::CONFLICT);
        assert_eq!(
            ApiError::upstream("x").status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ApiError::from(FidesError::Vendor("boom".into())).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn core_messages_are_sanitized() {
        let error = ApiError::from(FidesError::VendorStatus {
            status: 500,
            body: "stack trace with secrets".to_string(),
        });
        assert_eq!(error.client_message(), "Verification vendor error");
        assert_eq!(error.error_code(), "VENDOR_ERROR");
    }

    #[test]
    fn delivery_failures_have_their_own_code() {
        let error = ApiError::from(FidesError::Delivery("relay down".into()));
        assert_eq!(error.error_code(), "DELIVERY_FAILED");
        assert!(!error.client_message().contains("relay down"));
    }
}
