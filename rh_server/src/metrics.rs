//! Prometheus metrics for the referral server.
//!
//! Metrics are recorded through the `metrics` facade and rendered in
//! Prometheus text format by the `/metrics` route.
//!
//! # Metrics Categories
//!
//! - **HTTP Metrics**: Request counts and durations by route
//! - **Program Metrics**: Signups, proof resolutions, referral completions, withdrawals
//! - **Auth Metrics**: Login attempts
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use rh_server::metrics;
//!
//! let handle = metrics::init_metrics().unwrap();
//! metrics::http_requests_total("POST", "/api/v1/auth/login", 200);
//! println!("{}", handle.render());
//! ```

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// Install the Prometheus recorder as the global metrics recorder.
///
/// The returned handle renders the current exposition. A process can install
/// only one global recorder, so this is called once at startup.
///
/// # Returns
///
/// The render handle or an error message
pub fn init_metrics() -> Result<PrometheusHandle, String> {
    PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| format!("Failed to install Prometheus recorder: {}", e))
}

// ============================================================================
// HTTP Metrics
// ============================================================================

/// Record HTTP request.
///
/// Increments the total HTTP request counter with method, path, and status labels.
pub fn http_requests_total(method: &str, path: &str, status: u16) {
    metrics::counter!("http_requests_total",
        "method" => method.to_string(),
        "path" => path.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// Record HTTP request duration in milliseconds.
pub fn http_request_duration_ms(method: &str, path: &str, duration_ms: f64) {
    metrics::histogram!("http_request_duration_ms",
        "method" => method.to_string(),
        "path" => path.to_string()
    )
    .record(duration_ms);
}

// ============================================================================
// Program Metrics
// ============================================================================

/// Increment completed signups counter.
pub fn signups_total() {
    metrics::counter!("signups_total").increment(1);
}

/// Increment proof resolutions counter, labelled `approved` or `rejected`.
pub fn proof_resolutions_total(outcome: &str) {
    metrics::counter!("proof_resolutions_total",
        "outcome" => outcome.to_string()
    )
    .increment(1);
}

/// Increment settled referrals counter.
pub fn referral_completions_total() {
    metrics::counter!("referral_completions_total").increment(1);
}

/// Increment withdraw requests counter.
pub fn withdrawal_requests_total(method: &str) {
    metrics::counter!("withdrawal_requests_total",
        "method" => method.to_string()
    )
    .increment(1);
}

// ============================================================================
// Auth Metrics
// ============================================================================

/// Increment login attempts counter.
pub fn login_attempts_total(success: bool) {
    metrics::counter!("login_attempts_total",
        "success" => success.to_string()
    )
    .increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_without_recorder_is_noop() {
        http_requests_total("GET", "/health", 200);
        http_request_duration_ms("GET", "/health", 1.5);
        signups_total();
        proof_resolutions_total("approved");
        referral_completions_total();
        withdrawal_requests_total("telebirr");
        login_attempts_total(false);
    }
}
