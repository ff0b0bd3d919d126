//! Authentication API handlers.
//!
//! # Examples
//!
//! Login:
//! ```bash
//! curl -X POST http://localhost:8080/api/v1/auth/login \
//!   -H "Content-Type: application/json" \
//!   -d '{"email": "admin@example.com", "password": "admin123"}'
//! ```

use axum::{Json, extract::State, http::StatusCode};
use referral_hub::auth::{AdminSignupRequest, LoginRequest, Session, UserSummary};

use super::{AppState, error::ApiError, extract::ApiJson};
use crate::{logging::log_security_event, metrics};

/// Login with email and password.
///
/// # Response
///
/// On success, returns `200 OK` with the session:
/// ```json
/// {
///   "token": "eyJhbGciOiJIUzI1NiIs...",
///   "expires_at": "2026-01-12T22:30:00Z",
///   "principal": {"id": 1, "email": "a@b.com", "role": "user", "referral_code": "USER..."}
/// }
/// ```
///
/// # Errors
///
/// - `401 Unauthorized`: Unknown email or wrong password
pub async fn login(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<LoginRequest>,
) -> Result<Json<Session>, ApiError> {
    match state.auth.login(payload).await {
        Ok(session) => {
            metrics::login_attempts_total(true);
            Ok(Json(session))
        }
        Err(err) => {
            metrics::login_attempts_total(false);
            log_security_event("failed_login", None, &err.to_string());
            Err(err.into())
        }
    }
}

/// Register an administrator account.
///
/// Only available when the server runs with `ALLOW_ADMIN_SIGNUP=true`.
///
/// # Errors
///
/// - `403 Forbidden`: Admin signup is disabled
/// - `400 Bad Request`: Short name or password, malformed email
/// - `409 Conflict`: Email already registered
pub async fn admin_signup(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<AdminSignupRequest>,
) -> Result<(StatusCode, Json<UserSummary>), ApiError> {
    if !state.allow_admin_signup {
        log_security_event(
            "admin_signup_disabled",
            None,
            "Admin signup attempted while disabled",
        );
        return Err(ApiError::forbidden("Admin signup is disabled"));
    }

    let admin = state.auth.register_admin(payload).await?;
    Ok((StatusCode::CREATED, Json(admin.summary())))
}
