//! Admin handlers: proof review, referral settlement and reporting.
//!
//! Every route here sits behind `auth_middleware` and `admin_middleware`; the
//! managers check the role again before mutating anything.

use axum::{
    Json,
    extract::{Extension, State},
};
use referral_hub::{
    Principal,
    referral::{Referral, ReferralId},
    reports::{AdminListing, AdminStats, ReferrerSummary, UserListing},
    verification::{PaymentProof, PaymentProofView, ProofId},
};
use serde::Deserialize;

use super::{
    AppState,
    error::ApiError,
    extract::{ApiJson, ApiPath},
};
use crate::{logging::log_admin_action, metrics};

#[derive(Debug, Deserialize)]
pub struct ApprovePaymentPayload {
    pub proof_id: ProofId,
    /// `approved` or `rejected`
    pub status: String,
    pub admin_note: Option<String>,
}

/// Approve or reject a pending payment proof.
///
/// Approval verifies the owner and credits the 50.00 reward in the same
/// transaction. A proof is resolved at most once.
///
/// # Errors
///
/// - `400 Bad Request`: Status is not `approved`/`rejected`, or the note is too long
/// - `404 Not Found`: Unknown proof
/// - `409 Conflict`: Proof was already resolved
pub async fn approve_payment(
    State(state): State<AppState>,
    Extension(admin): Extension<Principal>,
    ApiJson(payload): ApiJson<ApprovePaymentPayload>,
) -> Result<Json<PaymentProof>, ApiError> {
    let proof = state
        .verification
        .resolve_proof(
            &admin,
            payload.proof_id,
            &payload.status,
            payload.admin_note,
        )
        .await?;

    let outcome = proof.status.as_str();
    metrics::proof_resolutions_total(outcome);
    log_admin_action(admin.id, "resolve_payment_proof", proof.id, outcome);

    Ok(Json(proof))
}

/// Every payment proof with its owner and reviewer, newest first.
pub async fn payment_proofs(
    State(state): State<AppState>,
    Extension(admin): Extension<Principal>,
) -> Result<Json<Vec<PaymentProofView>>, ApiError> {
    Ok(Json(state.verification.list_proofs(&admin).await?))
}

/// Dashboard headline numbers; each figure falls back to zero on its own.
pub async fn stats(
    State(state): State<AppState>,
    Extension(admin): Extension<Principal>,
) -> Result<Json<AdminStats>, ApiError> {
    Ok(Json(state.reports.stats(&admin).await?))
}

pub async fn users(
    State(state): State<AppState>,
    Extension(admin): Extension<Principal>,
) -> Result<Json<Vec<UserListing>>, ApiError> {
    Ok(Json(state.reports.users(&admin).await?))
}

pub async fn admins(
    State(state): State<AppState>,
    Extension(admin): Extension<Principal>,
) -> Result<Json<Vec<AdminListing>>, ApiError> {
    Ok(Json(state.reports.admins(&admin).await?))
}

/// Per-referrer totals.
pub async fn referrals(
    State(state): State<AppState>,
    Extension(admin): Extension<Principal>,
) -> Result<Json<Vec<ReferrerSummary>>, ApiError> {
    Ok(Json(state.reports.referral_summaries(&admin).await?))
}

/// Settle a pending referral, crediting the referrer.
///
/// # Errors
///
/// - `404 Not Found`: Unknown referral
/// - `409 Conflict`: Referral was already completed
pub async fn complete_referral(
    State(state): State<AppState>,
    Extension(admin): Extension<Principal>,
    ApiPath(referral_id): ApiPath<ReferralId>,
) -> Result<Json<Referral>, ApiError> {
    let referral = state
        .referrals
        .complete_referral(&admin, referral_id)
        .await?;

    metrics::referral_completions_total();
    log_admin_action(admin.id, "complete_referral", referral.id, "completed");

    Ok(Json(referral))
}
