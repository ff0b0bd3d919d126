//! Handlers for the signed-in member.

use axum::{
    Json,
    extract::{Extension, Multipart, State},
    http::StatusCode,
};
use referral_hub::{
    Amount, Principal, reports::UserDashboard, verification::PaymentProof,
    withdraw::WithdrawRequest,
};
use serde::Deserialize;

use super::{
    AppState,
    error::ApiError,
    extract::ApiJson,
    verification::{UploadForm, discard_upload},
};
use crate::metrics;

/// The member's dashboard: account, referrals, withdrawals and counts.
pub async fn me(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> Result<Json<UserDashboard>, ApiError> {
    Ok(Json(state.reports.user_dashboard(principal.id).await?))
}

/// Submit a new screenshot after a rejected proof.
///
/// # Errors
///
/// - `400 Bad Request`: Missing or invalid image
/// - `409 Conflict`: A proof is still pending, or the account is already verified
pub async fn resubmit_proof(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<PaymentProof>), ApiError> {
    let mut form = UploadForm::read(multipart).await?;
    state.verification.check_resubmission(principal.id).await?;
    let image_url = form.store_image(&state).await?;

    let proof = match state
        .verification
        .submit_additional_proof(principal.id, &image_url)
        .await
    {
        Ok(proof) => proof,
        Err(err) => {
            discard_upload(&state, &image_url).await;
            return Err(err.into());
        }
    };

    Ok((StatusCode::CREATED, Json(proof)))
}

#[derive(Debug, Deserialize)]
pub struct WithdrawPayload {
    pub method: String,
    /// Amount in minor units (cents)
    pub amount: Amount,
    pub account_info: String,
}

/// Request a payout from the earned balance.
///
/// The balance is checked but not debited; payouts are settled offline.
///
/// # Errors
///
/// - `400 Bad Request`: Unknown method, amount under the minimum or above the balance
pub async fn request_withdrawal(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    ApiJson(payload): ApiJson<WithdrawPayload>,
) -> Result<(StatusCode, Json<WithdrawRequest>), ApiError> {
    let request = state
        .withdrawals
        .request(
            principal.id,
            &payload.method,
            payload.amount,
            &payload.account_info,
        )
        .await?;
    metrics::withdrawal_requests_total(request.method.as_str());

    Ok((StatusCode::CREATED, Json(request)))
}
