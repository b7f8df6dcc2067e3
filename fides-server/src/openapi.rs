//! OpenAPI documentation.

use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Fides - Session Trust API",
        version = "0.1.0",
        description = r#"
Multi-factor verification service for session trust decisions.

## Factors

- **Email and phone OTP**: six-digit single-use codes with a five-minute
  lifetime, delivered by SMTP or an SMS gateway
- **WebAuthn passkeys**: full attestation and assertion ceremonies with
  server-side challenge state and signature-counter enforcement
- **Typing biometrics**: TypingDNA-backed enrollment and verification with
  a locally owned accept threshold

## Login alerts

Notable sign-ins are recorded and announced to the account owner by email.
The alert carries single-use confirm/report links; the first response
decides the attempt.
"#,
        license(name = "MIT OR Apache-2.0"),
    ),
    servers(
        (url = "http://localhost:3000", description = "Local development")
    ),
    tags(
        (name = "OTP", description = "One-time passcodes over email and SMS"),
        (name = "WebAuthn", description = "Passkey registration and authentication"),
        (name = "Typing Biometrics", description = "Typing-pattern enrollment and verification"),
        (name = "Security", description = "Login-attempt recording and resolution"),
        (name = "Health", description = "Liveness and readiness"),
    ),
    paths(
        crate::handlers::otp::send_email_otp,
        crate::handlers::otp::verify_email_otp,
        crate::handlers::otp::send_phone_otp,
        crate::handlers::otp::verify_phone_otp,
        crate::webauthn::handlers::begin_registration,
        crate::webauthn::handlers::complete_registration,
        crate::webauthn::handlers::begin_authentication,
        crate::webauthn::handlers::complete_authentication,
        crate::handlers::typing::typing_verify,
        crate::handlers::security::record_attempt,
        crate::handlers::security::confirm_attempt,
        crate::handlers::security::report_attempt,
        crate::handlers::security::respond_attempt,
        crate::handlers::security::list_attempts,
        crate::handlers::health::health,
        crate::handlers::health::ready,
    ),
    components(schemas(
        crate::handlers::otp::SendOtpRequest,
        crate::handlers::otp::SendOtpResponse,
        crate::handlers::otp::VerifyOtpRequest,
        crate::handlers::otp::VerifyOtpResponse,
        crate::handlers::otp::SendPhoneOtpRequest,
        crate::handlers::otp::VerifyPhoneOtpResponse,
        crate::handlers::typing::TypingVerifyRequest,
        crate::handlers::typing::TypingVerifyResponse,
        crate::handlers::typing::TypingVerifyDetails,
        crate::handlers::security::RecordAttemptRequest,
        crate::handlers::security::DeviceDto,
        crate::handlers::security::RiskDto,
        crate::handlers::security::RespondRequest,
        crate::webauthn::BeginRegistrationRequest,
        crate::webauthn::BeginAuthenticationRequest,
        crate::webauthn::RegistrationCompleteResponse,
        crate::webauthn::AuthenticationCompleteResponse,
        crate::handlers::health::HealthResponse,
        crate::handlers::health::ReadyResponse,
    ))
)]
pub struct ApiDoc;
