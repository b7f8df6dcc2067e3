//! # Fides Server
//!
//! REST API for multi-factor session trust: email and phone OTP, WebAuthn
//! passkey ceremonies, typing-biometric gating and login-attempt alerting,
//! built on the primitives in `fides-core`.

pub mod accounts;
pub mod config;
pub mod error;
pub mod handlers;
pub mod openapi;
pub mod routes;
pub mod state;
pub mod validation;
pub mod webauthn;

pub use config::Config;
pub use error::ApiError;
pub use routes::{create_router, create_router_with_config};
pub use state::AppState;
