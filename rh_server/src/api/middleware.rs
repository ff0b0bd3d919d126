//! Authentication middleware for protected endpoints.
//!
//! [`auth_middleware`] validates the bearer token and injects the caller's
//! [`Principal`] into request extensions. [`admin_middleware`] runs after it on
//! admin routes and rejects non-admin callers before any handler runs.
//!
//! # Extracting the caller
//!
//! ```rust,no_run
//! use axum::extract::Extension;
//! use referral_hub::Principal;
//!
//! async fn protected_handler(Extension(principal): Extension<Principal>) -> String {
//!     format!("Authenticated as user {}", principal.id)
//! }
//! # let _ = protected_handler;
//! ```

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use referral_hub::Principal;

use super::{AppState, error::ApiError};
use crate::logging::log_security_event;

/// Validate `Authorization: Bearer <token>` and inject the [`Principal`].
///
/// # Behavior
///
/// - **Success**: Token valid → injects `Principal` → calls next handler
/// - **Missing or malformed header**: `401 Unauthorized`
/// - **Invalid/expired token**: `401 Unauthorized`
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or_else(ApiError::unauthorized)?;

    match state.auth.verify_token(token) {
        Ok(principal) => {
            request.extensions_mut().insert(principal);
            Ok(next.run(request).await)
        }
        Err(err) => {
            log_security_event("invalid_token", None, &err.to_string());
            Err(err.into())
        }
    }
}

/// Reject callers without the admin role with `401 Unauthorized`.
///
/// Must be layered inside [`auth_middleware`].
pub async fn admin_middleware(request: Request, next: Next) -> Result<Response, ApiError> {
    let principal = request
        .extensions()
        .get::<Principal>()
        .ok_or_else(ApiError::unauthorized)?;

    if let Err(err) = principal.require_admin() {
        log_security_event(
            "admin_route_denied",
            Some(principal.id),
            "Non-admin caller reached an admin route",
        );
        return Err(err.into());
    }

    Ok(next.run(request).await)
}
