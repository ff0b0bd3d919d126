//! Integration tests for the HTTP API against an in-memory store.
//!
//! Exercises routing, authentication layers, status-code mapping and the
//! multipart signup flow end to end.

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use http_body_util::BodyExt;
use referral_hub::LocalImageStore;
use referral_hub::auth::AdminSignupRequest;
use referral_hub::db::{FaultPoint, MemoryStore, Repositories};
use rh_server::api::{AppState, create_router};
use rh_server::config::SecurityConfig;
use serde_json::{Value, json};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tower::ServiceExt; // For `oneshot` method

const BOUNDARY: &str = "rhtestboundary";
const PNG_BYTES: &[u8] = &[0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a, 0, 0, 0, 0];

struct TestServer {
    app: Router,
    state: AppState,
    store: MemoryStore,
    upload_dir: PathBuf,
}

fn create_test_server() -> TestServer {
    create_test_server_with(|state| state)
}

fn create_test_server_with(configure: impl FnOnce(AppState) -> AppState) -> TestServer {
    let store = MemoryStore::new();
    let repos = Repositories::from_store(store.clone());
    let security = SecurityConfig {
        jwt_secret: "test_secret_key_for_testing_only_0123456789".to_string(),
        password_pepper: "test_pepper_for_testing".to_string(),
    };
    let upload_dir = std::env::temp_dir().join(format!("rh-uploads-{}", uuid::Uuid::new_v4()));
    let images = Arc::new(LocalImageStore::new(upload_dir.clone(), "/uploads"));

    let state = configure(AppState::new(&repos, &security, images));
    let app = create_router(state.clone());

    TestServer {
        app,
        state,
        store,
        upload_dir,
    }
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let value = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, value)
}

fn get(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::empty()).unwrap()
}

fn post_json(uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

/// Build a multipart/form-data request with text fields and an optional image
fn post_multipart(
    uri: &str,
    token: Option<&str>,
    fields: &[(&str, &str)],
    image: Option<(&str, &[u8])>,
) -> Request<Body> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    if let Some((content_type, bytes)) = image {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"image\"; filename=\"proof\"\r\nContent-Type: {content_type}\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

    let mut builder = Request::builder().method("POST").uri(uri).header(
        header::CONTENT_TYPE,
        format!("multipart/form-data; boundary={BOUNDARY}"),
    );
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::from(body)).unwrap()
}

fn signup_fields<'a>(email: &'a str, referral_code: &'a str) -> Vec<(&'a str, &'a str)> {
    vec![
        ("name", "Abebe Kebede"),
        ("email", email),
        ("phone", "+251911234567"),
        ("telegram_username", "@abebe"),
        ("password", "member123"),
        ("referral_code", referral_code),
    ]
}

/// Number of files in the upload directory; zero when it was never created
fn uploaded_files(dir: &Path) -> usize {
    std::fs::read_dir(dir).map_or(0, |entries| entries.count())
}

async fn seed_admin(server: &TestServer) {
    server
        .state
        .auth
        .register_admin(AdminSignupRequest {
            name: "Api Admin".to_string(),
            email: "admin@example.com".to_string(),
            password: "admin123".to_string(),
        })
        .await
        .expect("Failed to seed admin");
}

async fn login(server: &TestServer, email: &str, password: &str) -> String {
    let (status, body) = send(
        &server.app,
        post_json(
            "/api/v1/auth/login",
            None,
            json!({"email": email, "password": password}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "login failed: {body}");
    body["token"].as_str().unwrap().to_string()
}

async fn signup(server: &TestServer, email: &str) -> (i64, i64) {
    let (status, body) = send(
        &server.app,
        post_multipart(
            "/api/v1/verification",
            None,
            &signup_fields(email, ""),
            Some(("image/png", PNG_BYTES)),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "signup failed: {body}");
    (
        body["user_id"].as_i64().unwrap(),
        body["proof_id"].as_i64().unwrap(),
    )
}

// ============================================================================
// Health and Metrics
// ============================================================================

#[tokio::test]
async fn test_health_check_tracks_storage() {
    let server = create_test_server();

    let (status, body) = send(&server.app, get("/health", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");

    server.store.set_unavailable(true);
    let (status, body) = send(&server.app, get("/health", None)).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["database"], false);
}

#[tokio::test]
async fn test_metrics_disabled_returns_not_found() {
    let server = create_test_server();

    let (status, _) = send(&server.app, get("/metrics", None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_request_id_is_echoed() {
    let server = create_test_server();
    let request = Request::builder()
        .uri("/health")
        .header("x-request-id", "trace-me-42")
        .body(Body::empty())
        .unwrap();

    let response = server.app.clone().oneshot(request).await.unwrap();
    assert_eq!(
        response.headers().get("x-request-id").unwrap(),
        "trace-me-42"
    );
}

// ============================================================================
// Authentication
// ============================================================================

#[tokio::test]
async fn test_login_rejects_bad_credentials() {
    let server = create_test_server();
    seed_admin(&server).await;

    let (status, body) = send(
        &server.app,
        post_json(
            "/api/v1/auth/login",
            None,
            json!({"email": "admin@example.com", "password": "wrong-password"}),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Invalid email or password");
}

#[tokio::test]
async fn test_admin_signup_respects_switch() {
    let payload = json!({"name": "New Admin", "email": "new@example.com", "password": "admin123"});

    let closed = create_test_server();
    let (status, _) = send(
        &closed.app,
        post_json("/api/v1/auth/admin-signup", None, payload.clone()),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let open = create_test_server_with(|state| state.with_admin_signup(true));
    let (status, body) = send(
        &open.app,
        post_json("/api/v1/auth/admin-signup", None, payload.clone()),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["email"], "new@example.com");

    let (status, _) = send(
        &open.app,
        post_json("/api/v1/auth/admin-signup", None, payload),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_protected_routes_require_token() {
    let server = create_test_server();

    let (status, _) = send(&server.app, get("/api/v1/me", None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = send(&server.app, get("/api/v1/admin/stats", Some("not-a-jwt"))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Authentication failed");
}

#[tokio::test]
async fn test_members_cannot_reach_admin_routes() {
    let server = create_test_server();
    let (user_id, proof_id) = signup(&server, "member@example.com").await;
    let token = login(&server, "member@example.com", "member123").await;

    let (status, body) = send(&server.app, get("/api/v1/admin/stats", Some(&token))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Admin access required");

    let (status, _) = send(
        &server.app,
        post_json(
            "/api/v1/admin/approve-payment",
            Some(&token),
            json!({"proof_id": proof_id, "status": "approved"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (_, body) = send(
        &server.app,
        get(
            &format!("/api/v1/verification/status?user_id={user_id}"),
            None,
        ),
    )
    .await;
    assert_eq!(body["is_verified"], false);
    assert_eq!(body["status"], "pending");
}

// ============================================================================
// Signup, Review and Rewards
// ============================================================================

#[tokio::test]
async fn test_signup_approval_and_dashboard() {
    let server = create_test_server();
    seed_admin(&server).await;
    let admin_token = login(&server, "admin@example.com", "admin123").await;

    let (user_id, proof_id) = signup(&server, "a@b.com").await;

    let (status, body) = send(
        &server.app,
        get(&format!("/api/v1/verification/status?user_id={user_id}"), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "pending");

    let (status, body) = send(
        &server.app,
        post_json(
            "/api/v1/admin/approve-payment",
            Some(&admin_token),
            json!({"proof_id": proof_id, "status": "approved"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "approved");

    let (status, body) = send(
        &server.app,
        post_json(
            "/api/v1/admin/approve-payment",
            Some(&admin_token),
            json!({"proof_id": proof_id, "status": "rejected", "admin_note": "again"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "Payment proof has already been approved");

    let member_token = login(&server, "a@b.com", "member123").await;
    let (status, body) = send(&server.app, get("/api/v1/me", Some(&member_token))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["is_verified"], true);
    assert_eq!(body["user"]["balance"], 5_000);
    assert_eq!(body["user"]["total_earnings"], 5_000);

    let (status, body) = send(
        &server.app,
        get("/api/v1/admin/payment-proofs", Some(&admin_token)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["user"]["email"], "a@b.com");
    assert_eq!(body[0]["admin"]["email"], "admin@example.com");
}

#[tokio::test]
async fn test_signup_validation_errors() {
    let server = create_test_server();

    let (status, body) = send(
        &server.app,
        post_multipart(
            "/api/v1/verification",
            None,
            &signup_fields("no-image@example.com", ""),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Payment screenshot is required");

    let (status, _) = send(
        &server.app,
        post_multipart(
            "/api/v1/verification",
            None,
            &signup_fields("gif@example.com", ""),
            Some(("image/gif", &b"GIF89a"[..])),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &server.app,
        post_multipart(
            "/api/v1/verification",
            None,
            &signup_fields("not-an-email", ""),
            Some(("image/png", PNG_BYTES)),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    signup(&server, "taken@example.com").await;
    let (status, body) = send(
        &server.app,
        post_multipart(
            "/api/v1/verification",
            None,
            &signup_fields("taken@example.com", ""),
            Some(("image/png", PNG_BYTES)),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "An account with this email already exists");
}

#[tokio::test]
async fn test_refused_signups_keep_no_uploads() {
    let server = create_test_server();

    for i in 0..3 {
        let email = format!("bad-email-{i}");
        let (status, _) = send(
            &server.app,
            post_multipart(
                "/api/v1/verification",
                None,
                &signup_fields(&email, ""),
                Some(("image/png", PNG_BYTES)),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
    assert_eq!(uploaded_files(&server.upload_dir), 0);

    signup(&server, "taken@example.com").await;
    assert_eq!(uploaded_files(&server.upload_dir), 1);
    let (status, _) = send(
        &server.app,
        post_multipart(
            "/api/v1/verification",
            None,
            &signup_fields("taken@example.com", ""),
            Some(("image/png", PNG_BYTES)),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(uploaded_files(&server.upload_dir), 1);

    // Storage fails after the image was written
    server.store.fail_at(FaultPoint::SignupProofInsert);
    let (status, _) = send(
        &server.app,
        post_multipart(
            "/api/v1/verification",
            None,
            &signup_fields("late-failure@example.com", ""),
            Some(("image/png", PNG_BYTES)),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(uploaded_files(&server.upload_dir), 1);
}

#[tokio::test]
async fn test_refused_resubmission_keeps_no_upload() {
    let server = create_test_server();
    signup(&server, "pending@example.com").await;
    let token = login(&server, "pending@example.com", "member123").await;

    let (status, _) = send(
        &server.app,
        post_multipart(
            "/api/v1/me/proofs",
            Some(&token),
            &[],
            Some(("image/png", PNG_BYTES)),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(uploaded_files(&server.upload_dir), 1);
}

#[tokio::test]
async fn test_malformed_requests_get_json_errors() {
    let server = create_test_server();
    seed_admin(&server).await;
    let admin_token = login(&server, "admin@example.com", "admin123").await;

    let request = Request::builder()
        .method("POST")
        .uri("/api/v1/auth/login")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{\"email\": "))
        .unwrap();
    let (status, body) = send(&server.app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    let (status, body) = send(
        &server.app,
        post_json(
            "/api/v1/admin/approve-payment",
            Some(&admin_token),
            json!({"status": "approved"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["error"].as_str().unwrap().contains("proof_id"));

    let request = Request::builder()
        .method("POST")
        .uri("/api/v1/auth/login")
        .body(Body::from("email=a@b.com"))
        .unwrap();
    let (status, body) = send(&server.app, request).await;
    assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
    assert!(body["error"].is_string());

    let (status, body) = send(
        &server.app,
        get("/api/v1/verification/status?user_id=abc", None),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    let request = Request::builder()
        .method("POST")
        .uri("/api/v1/admin/referrals/not-a-number/complete")
        .header(header::AUTHORIZATION, format!("Bearer {admin_token}"))
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&server.app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_referral_flow_over_http() {
    let server = create_test_server();
    seed_admin(&server).await;
    let admin_token = login(&server, "admin@example.com", "admin123").await;

    // Referrer joins and gets approved
    let (_, referrer_proof) = signup(&server, "referrer@example.com").await;
    send(
        &server.app,
        post_json(
            "/api/v1/admin/approve-payment",
            Some(&admin_token),
            json!({"proof_id": referrer_proof, "status": "approved"}),
        ),
    )
    .await;
    let referrer_token = login(&server, "referrer@example.com", "member123").await;
    let (_, dashboard) = send(&server.app, get("/api/v1/me", Some(&referrer_token))).await;
    let code = dashboard["user"]["referral_code"].as_str().unwrap().to_string();

    let (status, body) = send(
        &server.app,
        get(
            &format!("/api/v1/referrals/code/{}", code.to_lowercase()),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["referral_code"], code);
    assert!(body.get("email").is_none());

    let (status, _) = send(&server.app, get("/api/v1/referrals/code/NOSUCHCODE", None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // Invitee signs up with the code
    let (status, _) = send(
        &server.app,
        post_multipart(
            "/api/v1/verification",
            None,
            &signup_fields("invitee@example.com", &code),
            Some(("image/jpeg", &b"\xff\xd8\xff\xe0jpeg"[..])),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (_, dashboard) = send(&server.app, get("/api/v1/me", Some(&referrer_token))).await;
    assert_eq!(dashboard["pending_referrals"], 1);
    let referral_id = dashboard["referrals"][0]["id"].as_i64().unwrap();

    let complete_uri = format!("/api/v1/admin/referrals/{referral_id}/complete");
    let (status, body) = send(
        &server.app,
        post_json(&complete_uri, Some(&admin_token), json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "completed");

    let (status, _) = send(
        &server.app,
        post_json(&complete_uri, Some(&admin_token), json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, dashboard) = send(&server.app, get("/api/v1/me", Some(&referrer_token))).await;
    assert_eq!(dashboard["user"]["balance"], 10_000);
    assert_eq!(dashboard["successful_referrals"], 1);

    let (status, stats) = send(&server.app, get("/api/v1/admin/stats", Some(&admin_token))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["total_users"], 2);
    assert_eq!(stats["active_referrals"], 1);

    let (_, summaries) = send(
        &server.app,
        get("/api/v1/admin/referrals", Some(&admin_token)),
    )
    .await;
    let row = summaries
        .as_array()
        .unwrap()
        .iter()
        .find(|row| row["successful"] == 1)
        .unwrap();
    assert_eq!(row["earned"], 10_000);
}

#[tokio::test]
async fn test_withdrawal_checks_balance() {
    let server = create_test_server();
    seed_admin(&server).await;
    let admin_token = login(&server, "admin@example.com", "admin123").await;
    let (_, proof_id) = signup(&server, "saver@example.com").await;
    send(
        &server.app,
        post_json(
            "/api/v1/admin/approve-payment",
            Some(&admin_token),
            json!({"proof_id": proof_id, "status": "approved"}),
        ),
    )
    .await;
    let token = login(&server, "saver@example.com", "member123").await;

    let (status, _) = send(
        &server.app,
        post_json(
            "/api/v1/me/withdrawals",
            Some(&token),
            json!({"method": "telebirr", "amount": 6_000, "account_info": "0911234567"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(
        &server.app,
        post_json(
            "/api/v1/me/withdrawals",
            Some(&token),
            json!({"method": "telebirr", "amount": 2_000, "account_info": "0911234567"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["status"], "pending");

    let (_, dashboard) = send(&server.app, get("/api/v1/me", Some(&token))).await;
    assert_eq!(dashboard["user"]["balance"], 5_000);
    assert_eq!(dashboard["withdraw_requests"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_resubmission_after_rejection() {
    let server = create_test_server();
    seed_admin(&server).await;
    let admin_token = login(&server, "admin@example.com", "admin123").await;
    let (_, proof_id) = signup(&server, "retry@example.com").await;
    let token = login(&server, "retry@example.com", "member123").await;

    // Still pending
    let (status, _) = send(
        &server.app,
        post_multipart(
            "/api/v1/me/proofs",
            Some(&token),
            &[],
            Some(("image/png", PNG_BYTES)),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    send(
        &server.app,
        post_json(
            "/api/v1/admin/approve-payment",
            Some(&admin_token),
            json!({"proof_id": proof_id, "status": "rejected", "admin_note": "Blurry"}),
        ),
    )
    .await;

    let (status, body) = send(
        &server.app,
        post_multipart(
            "/api/v1/me/proofs",
            Some(&token),
            &[],
            Some(("image/webp", &b"RIFFxxxxWEBP"[..])),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["status"], "pending");
    assert!(body["image_url"].as_str().unwrap().starts_with("/uploads/"));
}

#[tokio::test]
async fn test_admin_listings_fall_back_during_outage() {
    let server = create_test_server();
    seed_admin(&server).await;
    let admin_token = login(&server, "admin@example.com", "admin123").await;
    server.store.set_unavailable(true);

    let (status, stats) = send(&server.app, get("/api/v1/admin/stats", Some(&admin_token))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        stats,
        json!({"total_users": 0, "active_referrals": 0, "total_payouts": 0, "recent_activities": []})
    );

    for uri in [
        "/api/v1/admin/users",
        "/api/v1/admin/admins",
        "/api/v1/admin/referrals",
        "/api/v1/admin/payment-proofs",
    ] {
        let (status, body) = send(&server.app, get(uri, Some(&admin_token))).await;
        assert_eq!(status, StatusCode::OK, "{uri}");
        assert_eq!(body, json!([]), "{uri}");
    }
}
