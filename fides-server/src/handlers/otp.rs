//! One-time passcode endpoints for the email and phone channels.
//!
//! Send endpoints issue the code first and dispatch second: a delivery
//! failure returns an error but the issued code stays redeemable, so a
//! flaky relay never strands a code the user may still receive. Verify
//! endpoints answer a uniform 401 for wrong, expired and never-issued
//! codes alike.

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use fides_core::delivery::{otp_email, otp_sms_body};
use fides_core::otp::OtpChannel;

use crate::error::ApiError;
use crate::state::AppState;
use crate::validation;

/// Request to send an email OTP.
#[derive(Debug, Deserialize, ToSchema)]
pub struct SendOtpRequest {
    #[schema(example = "user@example.com")]
    pub email: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SendOtpResponse {
    pub success: bool,
}

/// Request to redeem an email OTP.
#[derive(Debug, Deserialize, ToSchema)]
pub struct VerifyOtpRequest {
    #[schema(example = "user@example.com")]
    pub email: String,
    #[schema(example = "123456")]
    pub otp: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct VerifyOtpResponse {
    pub valid: bool,
}

/// Request to send a phone OTP for the account behind `email`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct SendPhoneOtpRequest {
    #[schema(example = "user@example.com")]
    pub email: String,
    #[schema(example = "+14155550123")]
    pub phone: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct VerifyPhoneOtpResponse {
    pub valid: bool,
    /// The phone number now bound to the account
    pub phone: String,
}

/// Send a one-time code to the account's email address.
#[utoipa::path(
    post,
    path = "/otp/send",
    tag = "OTP",
    request_body = SendOtpRequest,
    responses(
        (status = 200, description = "Code issued and emailed", body = SendOtpResponse),
        (status = 400, description = "Invalid email address"),
        (status = 500, description = "Email delivery failed; the code remains redeemable"),
    )
)]
pub async fn send_email_otp(
    State(state): State<AppState>,
    Json(request): Json<SendOtpRequest>,
) -> Result<Json<SendOtpResponse>, ApiError> {
    validation::validate_email(&request.email)?;
    let mailer = state
        .mailer
        .as_ref()
        .ok_or_else(|| ApiError::unconfigured("Email delivery is not configured"))?;

    let contact = request.email.trim();
    let code = state.otp.issue(OtpChannel::Email, contact, contact);
    mailer.send(&otp_email(contact, &code)).await?;

    Ok(Json(SendOtpResponse { success: true }))
}

/// Redeem an emailed one-time code.
#[utoipa::path(
    post,
    path = "/otp/verify",
    tag = "OTP",
    request_body = VerifyOtpRequest,
    responses(
        (status = 200, description = "Code accepted", body = VerifyOtpResponse),
        (status = 401, description = "Wrong, expired or never-issued code"),
    )
)]
pub async fn verify_email_otp(
    State(state): State<AppState>,
    Json(request): Json<VerifyOtpRequest>,
) -> Result<Json<VerifyOtpResponse>, ApiError> {
    validation::validate_email(&request.email)?;

    match state
        .otp
        .verify(OtpChannel::Email, &request.email, request.otp.trim())
    {
        Some(_) => Ok(Json(VerifyOtpResponse { valid: true })),
        None => Err(ApiError::unauthorized("Invalid or expired code")),
    }
}

/// Send a one-time code by SMS to a phone number the account wants to prove.
#[utoipa::path(
    post,
    path = "/phone/send-otp",
    tag = "OTP",
    request_body = SendPhoneOtpRequest,
    responses(
        (status = 200, description = "Code issued and sent by SMS", body = SendOtpResponse),
        (status = 400, description = "Invalid email or phone number"),
        (status = 500, description = "SMS delivery failed; the code remains redeemable"),
    )
)]
pub async fn send_phone_otp(
    State(state): State<AppState>,
    Json(request): Json<SendPhoneOtpRequest>,
) -> Result<Json<SendOtpResponse>, ApiError> {
    validation::validate_email(&request.email)?;
    let phone = request.phone.trim();
    validation::validate_phone(phone)?;
    let sms = state
        .sms
        .as_ref()
        .ok_or_else(|| ApiError::unconfigured("SMS delivery is not configured"))?;

    // Keyed by the account email: redeeming later proves this phone belongs
    // to that account.
    let code = state.otp.issue(OtpChannel::Phone, &request.email, phone);
    sms.send(phone, &otp_sms_body(&code)).await?;

    Ok(Json(SendOtpResponse { success: true }))
}

/// Redeem a phone code and bind the proven number to the account.
#[utoipa::path(
    post,
    path = "/phone/verify-otp",
    tag = "OTP",
    request_body = VerifyOtpRequest,
    responses(
        (status = 200, description = "Code accepted; phone bound to the account", body = VerifyPhoneOtpResponse),
        (status = 401, description = "Wrong, expired or never-issued code"),
    )
)]
pub async fn verify_phone_otp(
    State(state): State<AppState>,
    Json(request): Json<VerifyOtpRequest>,
) -> Result<Json<VerifyPhoneOtpResponse>, ApiError> {
    validation::validate_email(&request.email)?;

    match state
        .otp
        .verify(OtpChannel::Phone, &request.email, request.otp.trim())
    {
        Some(issue) => {
            state.accounts.bind_phone(&request.email, &issue.contact);
            Ok(Json(VerifyPhoneOtpResponse {
                valid: true,
                phone: issue.contact,
            }))
        }
        None => Err(ApiError::unauthorized("Invalid or expired code")),
    }
}
