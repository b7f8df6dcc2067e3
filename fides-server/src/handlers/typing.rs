//! Typing-biometric verification endpoint.

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use fides_core::normalize_identity;
use fides_core::typing::{self, GateDecision};

use crate::error::ApiError;
use crate::state::AppState;
use crate::validation;

/// A captured typing pattern for enrollment or verification.
#[derive(Debug, Deserialize, ToSchema)]
pub struct TypingVerifyRequest {
    #[serde(rename = "userId")]
    #[schema(example = "user@example.com")]
    pub user_id: String,
    /// Typing pattern emitted by the vendor's browser recorder
    pub tp: String,
    /// Recorder text id, when the client captured one
    #[serde(default, rename = "textid")]
    pub text_id: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TypingVerifyResponse {
    /// `enrolled` while patterns are still being collected, `verified` once
    /// the account has enough on file
    #[schema(example = "verified")]
    pub status: &'static str,
    pub details: TypingVerifyDetails,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(untagged)]
pub enum TypingVerifyDetails {
    Enrolled {
        /// Patterns on file after this enrollment
        count: u32,
        #[serde(skip_serializing_if = "Option::is_none")]
        message_code: Option<i64>,
    },
    Verified {
        /// The accept decision: 1 when the score clears the local threshold
        result: u8,
        score: u32,
        #[serde(skip_serializing_if = "Option::is_none")]
        net_score: Option<u32>,
        /// The vendor's own advisory verdict, surfaced for diagnostics
        vendor_result: i64,
    },
}

/// Enroll or verify a typing pattern, depending on how many the account
/// already has on file.
#[utoipa::path(
    post,
    path = "/typingdna/verify",
    tag = "Typing Biometrics",
    request_body = TypingVerifyRequest,
    responses(
        (status = 200, description = "Pattern enrolled or scored", body = TypingVerifyResponse),
        (status = 400, description = "Invalid user id or typing pattern"),
        (status = 500, description = "Vendor unreachable after retries"),
    )
)]
pub async fn typing_verify(
    State(state): State<AppState>,
    Json(request): Json<TypingVerifyRequest>,
) -> Result<Json<TypingVerifyResponse>, ApiError> {
    validation::validate_user_id(&request.user_id)?;
    validation::validate_typing_pattern(&request.tp)?;
    let vendor = state
        .typingdna
        .as_ref()
        .ok_or_else(|| ApiError::unconfigured("Typing-biometric verification is not configured"))?;
    let owner = normalize_identity(&request.user_id);

    let count = vendor.pattern_count(&owner).await?;

    match typing::route(count) {
        GateDecision::Enroll => {
            let outcome = vendor.save_pattern(&owner, &request.tp).await?;
            tracing::info!(owner = %owner, count = count + 1, "Typing pattern enrolled");
            Ok(Json(TypingVerifyResponse {
                status: "enrolled",
                details: TypingVerifyDetails::Enrolled {
                    count: count + 1,
                    message_code: outcome.message_code,
                },
            }))
        }
        GateDecision::Verify => {
            let verdict = vendor
                .verify_pattern(&owner, &request.tp, request.text_id.as_deref())
                .await?;
            let accepted = typing::accepts(verdict.score);
            tracing::info!(
                owner = %owner,
                score = verdict.score,
                vendor_result = verdict.result,
                accepted,
                "Typing pattern scored"
            );
            Ok(Json(TypingVerifyResponse {
                status: "verified",
                details: TypingVerifyDetails::Verified {
                    result: u8::from(accepted),
                    score: verdict.score,
                    net_score: verdict.net_score,
                    vendor_result: verdict.result,
                },
            }))
        }
    }
}
