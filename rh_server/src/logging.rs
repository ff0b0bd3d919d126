//! Structured logging configuration.
//!
//! Installs the tracing subscriber and provides helpers for admin decisions
//! and security-relevant failures.

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize structured logging
///
/// Log levels come from `RUST_LOG`, defaulting to `info,sqlx=warn,hyper=warn`.
/// Records emitted through the `log` facade by `referral_hub` are bridged into
/// the same subscriber.
///
/// # Example
///
/// ```no_run
/// use rh_server::logging;
///
/// #[tokio::main]
/// async fn main() {
///     logging::init();
///     tracing::info!("Server starting");
/// }
/// ```
pub fn init() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn,hyper=warn"));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();

    tracing::info!("Structured logging initialized");
}

/// Log security event with structured data
///
/// # Example
///
/// ```
/// use rh_server::logging::log_security_event;
///
/// log_security_event("failed_login", None, "Invalid credentials for a@b.com");
/// ```
pub fn log_security_event(event_type: &str, user_id: Option<i64>, message: &str) {
    tracing::warn!(
        event_type = event_type,
        user_id = user_id,
        "SECURITY: {}",
        message
    );
}

/// Log an admin decision against a target record
///
/// `action` names the decision (`approve_payment`, `complete_referral`, ...)
/// and `outcome` what it resolved to.
pub fn log_admin_action(admin_id: i64, action: &str, target_id: i64, outcome: &str) {
    tracing::info!(
        admin_id = admin_id,
        action = action,
        target_id = target_id,
        outcome = outcome,
        "Admin action"
    );
}

/// Log API request/response
pub fn log_api_request(
    request_id: &str,
    method: &str,
    path: &str,
    status_code: u16,
    duration_ms: u64,
) {
    tracing::info!(
        request_id = request_id,
        http_method = method,
        http_path = path,
        http_status = status_code,
        duration_ms = duration_ms,
        "API request completed"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_security_event() {
        // Just ensure it doesn't panic
        log_security_event("test_event", Some(1), "Test message");
        log_security_event("invalid_token", None, "Bad signature");
    }

    #[test]
    fn test_log_admin_action() {
        log_admin_action(1, "approve_payment", 42, "approved");
    }

    #[test]
    fn test_log_api_request() {
        log_api_request("req-1", "GET", "/api/v1/me", 200, 45);
        log_api_request("req-2", "POST", "/api/v1/auth/login", 401, 120);
    }
}
