//! HTTP API for the referral program.
//!
//! # Modules
//!
//! - [`auth`]: Login and administrator signup
//! - [`verification`]: Signup with payment proof and status polling
//! - [`referrals`]: Public referral-code lookup
//! - [`account`]: The signed-in member's dashboard, proofs and withdrawals
//! - [`admin`]: Proof review, referral settlement and reporting
//! - [`middleware`]: Bearer-token authentication and the admin gate
//!
//! # Endpoints Overview
//!
//! ```text
//! GET  /health                                - Storage health (public)
//! GET  /metrics                               - Prometheus exposition (when enabled)
//! POST /api/v1/auth/login                     - Login (public)
//! POST /api/v1/auth/admin-signup              - Register administrator (when enabled)
//! POST /api/v1/verification                   - Signup with screenshot (public, multipart)
//! GET  /api/v1/verification/status?user_id=   - Verification status (public)
//! GET  /api/v1/referrals/code/{code}          - Referrer lookup (public)
//! GET  /api/v1/me                             - Member dashboard (auth required)
//! POST /api/v1/me/proofs                      - Resubmit screenshot (auth required, multipart)
//! POST /api/v1/me/withdrawals                 - Request payout (auth required)
//! POST /api/v1/admin/approve-payment          - Approve or reject a proof (admin)
//! GET  /api/v1/admin/payment-proofs           - Review queue (admin)
//! GET  /api/v1/admin/stats                    - Dashboard numbers (admin)
//! GET  /api/v1/admin/users                    - Member listing (admin)
//! GET  /api/v1/admin/admins                   - Administrator listing (admin)
//! GET  /api/v1/admin/referrals                - Per-referrer totals (admin)
//! POST /api/v1/admin/referrals/{id}/complete  - Settle a referral (admin)
//! ```
//!
//! # CORS
//!
//! CORS is configured permissively for development. In production, configure
//! appropriate origins, methods, and headers.

pub mod account;
pub mod admin;
pub mod auth;
pub mod error;
pub mod extract;
pub mod middleware;
pub mod referrals;
pub mod request_id;
pub mod verification;

use axum::{
    Router,
    extract::{DefaultBodyLimit, State},
    http::{StatusCode, header},
    response::{IntoResponse, Json},
    routing::{get, post},
};
use metrics_exporter_prometheus::PrometheusHandle;
use referral_hub::{
    AuthManager, ImageStore, ReferralManager, ReportManager, Repositories, VerificationManager,
    WithdrawManager, storage::MAX_IMAGE_BYTES,
};
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use crate::config::SecurityConfig;

pub use error::{ApiError, ErrorResponse};

/// Upload routes accept the image plus the text fields around it
const MULTIPART_BODY_LIMIT: usize = MAX_IMAGE_BYTES + 1024 * 1024;

/// Application state shared across all HTTP handlers.
///
/// Cloned for each request; every manager sits behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub auth: Arc<AuthManager>,
    pub verification: Arc<VerificationManager>,
    pub referrals: Arc<ReferralManager>,
    pub withdrawals: Arc<WithdrawManager>,
    pub reports: Arc<ReportManager>,
    pub images: Arc<dyn ImageStore>,
    /// Whether `POST /auth/admin-signup` accepts registrations
    pub allow_admin_signup: bool,
    /// Render handle of the installed Prometheus recorder
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    /// Build every manager over one set of repositories
    pub fn new(
        repos: &Repositories,
        security: &SecurityConfig,
        images: Arc<dyn ImageStore>,
    ) -> Self {
        let auth = AuthManager::new(
            repos,
            security.password_pepper.clone(),
            security.jwt_secret.clone(),
        );
        let verification = VerificationManager::new(repos, auth.hasher().clone());

        Self {
            auth: Arc::new(auth),
            verification: Arc::new(verification),
            referrals: Arc::new(ReferralManager::new(repos)),
            withdrawals: Arc::new(WithdrawManager::new(repos)),
            reports: Arc::new(ReportManager::new(repos)),
            images,
            allow_admin_signup: false,
            metrics: None,
        }
    }

    pub fn with_admin_signup(mut self, allowed: bool) -> Self {
        self.allow_admin_signup = allowed;
        self
    }

    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }
}

/// Create the complete API router with all endpoints and middleware.
///
/// # Example
///
/// ```rust,no_run
/// # use rh_server::api::{create_router, AppState};
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// # let state: AppState = unimplemented!();
/// let app = create_router(state);
/// let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
/// axum::serve(listener, app).await?;
/// # Ok(())
/// # }
/// ```
pub fn create_router(state: AppState) -> Router {
    let v1_routes = create_v1_router(state.clone());

    let root_routes = Router::new()
        .route("/health", get(health_check))
        .route("/metrics", get(metrics_handler));

    Router::new()
        .merge(root_routes)
        .nest("/api/v1", v1_routes)
        .layer(axum::middleware::from_fn(request_id::request_id_middleware))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Create API v1 router with all versioned endpoints.
fn create_v1_router(state: AppState) -> Router<AppState> {
    // Public routes (no authentication middleware)
    let public_routes = Router::new()
        .route("/auth/login", post(auth::login))
        .route("/auth/admin-signup", post(auth::admin_signup))
        .route(
            "/verification",
            post(verification::submit).layer(DefaultBodyLimit::max(MULTIPART_BODY_LIMIT)),
        )
        .route("/verification/status", get(verification::status))
        .route("/referrals/code/{code}", get(referrals::lookup_code));

    // Member routes (require a valid session)
    let member_routes = Router::new()
        .route("/me", get(account::me))
        .route(
            "/me/proofs",
            post(account::resubmit_proof).layer(DefaultBodyLimit::max(MULTIPART_BODY_LIMIT)),
        )
        .route("/me/withdrawals", post(account::request_withdrawal))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::auth_middleware,
        ));

    // Admin routes (session plus admin role)
    let admin_routes = Router::new()
        .route("/admin/approve-payment", post(admin::approve_payment))
        .route("/admin/payment-proofs", get(admin::payment_proofs))
        .route("/admin/stats", get(admin::stats))
        .route("/admin/users", get(admin::users))
        .route("/admin/admins", get(admin::admins))
        .route("/admin/referrals", get(admin::referrals))
        .route(
            "/admin/referrals/{id}/complete",
            post(admin::complete_referral),
        )
        .layer(axum::middleware::from_fn(middleware::admin_middleware))
        .layer(axum::middleware::from_fn_with_state(
            state,
            middleware::auth_middleware,
        ));

    Router::new()
        .merge(public_routes)
        .merge(member_routes)
        .merge(admin_routes)
}

/// Health check endpoint for monitoring and load balancers.
///
/// Returns `200 OK` when storage answers, `503 Service Unavailable` otherwise.
///
/// ```bash
/// curl http://localhost:8080/health
/// # {"status":"healthy","database":true,"version":"0.1.0","timestamp":"2026-01-12T10:30:00Z"}
/// ```
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let db_healthy = state.reports.storage_healthy().await;

    let status_code = if db_healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let response = json!({
        "status": if db_healthy { "healthy" } else { "unhealthy" },
        "version": env!("CARGO_PKG_VERSION"),
        "database": db_healthy,
        "timestamp": chrono::Utc::now().to_rfc3339(),
    });

    (status_code, Json(response))
}

/// Prometheus scrape endpoint; 404 when metrics are disabled.
async fn metrics_handler(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let handle = state
        .metrics
        .as_ref()
        .ok_or_else(|| ApiError::not_found("Metrics are disabled"))?;

    Ok((
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        handle.render(),
    ))
}
