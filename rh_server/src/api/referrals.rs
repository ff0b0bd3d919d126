//! Public referral-code lookup, used by the signup page to show who invited
//! the visitor.

use axum::{
    Json,
    extract::State,
};
use serde::{Deserialize, Serialize};

use super::{AppState, error::ApiError, extract::ApiPath};

/// Public view of a referrer; no contact details
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferrerProfile {
    pub name: String,
    pub referral_code: String,
    pub is_verified: bool,
}

/// Look up the owner of a referral code, case-insensitively.
///
/// # Errors
///
/// - `404 Not Found`: No account carries this code
pub async fn lookup_code(
    State(state): State<AppState>,
    ApiPath(code): ApiPath<String>,
) -> Result<Json<ReferrerProfile>, ApiError> {
    let user = state
        .referrals
        .find_referrer(&code)
        .await?
        .ok_or_else(|| ApiError::not_found("Referral code not found"))?;

    Ok(Json(ReferrerProfile {
        name: user.name,
        referral_code: user.referral_code,
        is_verified: user.is_verified,
    }))
}
