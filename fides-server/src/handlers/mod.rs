//! HTTP request handlers.

pub mod health;
pub mod otp;
pub mod security;
pub mod typing;

pub use health::{health, ready};
pub use otp::{send_email_otp, send_phone_otp, verify_email_otp, verify_phone_otp};
pub use security::{
    confirm_attempt, list_attempts, record_attempt, report_attempt, respond_attempt,
};
pub use typing::typing_verify;
