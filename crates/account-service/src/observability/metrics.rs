//! Metrics definitions for the account service
//!
//! All metrics follow Prometheus naming conventions:
//! - `ac_` prefix for the access-control service
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! # Cardinality
//!
//! Labels are bounded to prevent cardinality explosion:
//! - `status`: 2 values (success, error)
//! - `role`: 5 values (the fixed role catalog)
//! - `operation`: bounded by code (register, sign_in, transfer_owner, ...)
//! - `error_category`: 4 values (authentication, authorization, validation, internal)

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::time::Duration;

/// Install the Prometheus recorder and return the handle served on `/metrics`.
///
/// Must be called before any metrics are recorded.
///
/// # Errors
///
/// Returns error if the recorder fails to install (e.g., already installed).
pub fn init_metrics_recorder() -> Result<PrometheusHandle, String> {
    PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Prefix("ac_http_request".to_string()),
            &[
                0.005, 0.010, 0.025, 0.050, 0.100, 0.150, 0.200, 0.300, 0.500, 1.000, 2.000,
            ],
        )
        .map_err(|e| format!("Failed to set HTTP request buckets: {e}"))?
        // bcrypt at cost 12 sits in the 100-400ms range
        .set_buckets_for_metric(
            Matcher::Full("ac_sign_in_duration_seconds".to_string()),
            &[0.050, 0.100, 0.200, 0.300, 0.400, 0.500, 0.750, 1.000, 2.000],
        )
        .map_err(|e| format!("Failed to set sign-in buckets: {e}"))?
        .set_buckets_for_metric(
            Matcher::Full("ac_bcrypt_duration_seconds".to_string()),
            &[0.010, 0.050, 0.100, 0.200, 0.300, 0.400, 0.500, 1.000],
        )
        .map_err(|e| format!("Failed to set bcrypt buckets: {e}"))?
        .install_recorder()
        .map_err(|e| format!("Failed to install Prometheus recorder: {e}"))
}

// ============================================================================
// Account Metrics
// ============================================================================

/// Record a registration attempt
///
/// Metric: `ac_registrations_total`
/// Labels: `role`, `status`
pub fn record_registration(role: &str, status: &str) {
    counter!("ac_registrations_total", "role" => role.to_string(), "status" => status.to_string())
        .increment(1);
}

/// Record sign-in duration and outcome
///
/// Metric: `ac_sign_in_duration_seconds`, `ac_sign_ins_total`
/// Labels: `status`
///
/// Failed sign-ins include the bcrypt verification against the dummy hash,
/// so both outcomes should show the same latency profile.
pub fn record_sign_in(status: &str, duration: Duration) {
    histogram!("ac_sign_in_duration_seconds", "status" => status.to_string())
        .record(duration.as_secs_f64());

    counter!("ac_sign_ins_total", "status" => status.to_string()).increment(1);
}

/// Record an owner transfer attempt
///
/// Metric: `ac_owner_transfers_total`
/// Labels: `status` (success, rejected, error, incomplete)
///
/// ALERT: any `incomplete` means the tenant has no Owner.
pub fn record_owner_transfer(status: &str) {
    counter!("ac_owner_transfers_total", "status" => status.to_string()).increment(1);
}

/// Record a profile or lifecycle operation
///
/// Metric: `ac_account_operations_total`
/// Labels: `operation` (update_profile, delete_account, sign_out), `status`
pub fn record_account_operation(operation: &str, status: &str) {
    counter!("ac_account_operations_total", "operation" => operation.to_string(), "status" => status.to_string())
        .increment(1);
}

/// Number of roles present in the registry after seeding
///
/// Metric: `ac_roles_seeded`
pub fn set_roles_seeded(count: usize) {
    gauge!("ac_roles_seeded").set(count as f64);
}

// ============================================================================
// Token Metrics
// ============================================================================

/// Record a token issuance
///
/// Metric: `ac_tokens_issued_total`
/// Labels: `status`
pub fn record_token_issuance(status: &str) {
    counter!("ac_tokens_issued_total", "status" => status.to_string()).increment(1);
}

/// Record bearer token validation result
///
/// Metric: `ac_token_validations_total`
/// Labels: `status`, `error_category`
pub fn record_token_validation(status: &str, error_category: Option<&str>) {
    let category = error_category.unwrap_or("none");
    counter!("ac_token_validations_total", "status" => status.to_string(), "error_category" => category.to_string())
        .increment(1);
}

// ============================================================================
// Crypto Metrics
// ============================================================================

/// Record bcrypt operation duration
///
/// Metric: `ac_bcrypt_duration_seconds`
/// Labels: `operation` (hash, verify)
pub fn record_bcrypt_duration(operation: &str, duration: Duration) {
    histogram!("ac_bcrypt_duration_seconds", "operation" => operation.to_string())
        .record(duration.as_secs_f64());
}

// ============================================================================
// Error Metrics
// ============================================================================

/// Record error by category
///
/// Metric: `ac_errors_total`
/// Labels: `operation`, `error_category`, `status_code`
pub fn record_error(operation: &str, error_category: &str, status_code: u16) {
    counter!("ac_errors_total",
        "operation" => operation.to_string(),
        "error_category" => error_category.to_string(),
        "status_code" => status_code.to_string()
    )
    .increment(1);
}

// ============================================================================
// HTTP Request Metrics
// ============================================================================

/// Record HTTP request completion
///
/// Metric: `ac_http_requests_total`, `ac_http_request_duration_seconds`
/// Labels: `method`, `path`, `status_code`
///
/// This captures ALL HTTP responses including framework-level errors like
/// 415 (wrong Content-Type), 400 (JSON parse errors) and 404.
pub fn record_http_request(method: &str, path: &str, status_code: u16, duration: Duration) {
    let normalized_path = normalize_path(path);

    histogram!("ac_http_request_duration_seconds",
        "method" => method.to_string(),
        "path" => normalized_path.clone(),
        "status_code" => status_code.to_string()
    )
    .record(duration.as_secs_f64());

    counter!("ac_http_requests_total",
        "method" => method.to_string(),
        "path" => normalized_path,
        "status_code" => status_code.to_string()
    )
    .increment(1);
}

const USERS_PREFIX: &str = "/api/v1/account/users/";

/// Normalize path to prevent label cardinality explosion
fn normalize_path(path: &str) -> String {
    match path {
        "/health"
        | "/ready"
        | "/metrics"
        | "/api/v1/account/signup/admin"
        | "/api/v1/account/signup/pilot"
        | "/api/v1/account/signin"
        | "/api/v1/account/signout"
        | "/api/v1/account/owner/transfer" => path.to_string(),
        _ => match path.strip_prefix(USERS_PREFIX) {
            Some(id) if is_uuid(id) => "/api/v1/account/users/{id}".to_string(),
            _ => "/other".to_string(),
        },
    }
}

/// Check if a string matches UUID format (8-4-4-4-12 hex digits with dashes)
fn is_uuid(s: &str) -> bool {
    if s.len() != 36 {
        return false;
    }

    s.bytes().enumerate().all(|(i, byte)| match i {
        8 | 13 | 18 | 23 => byte == b'-',
        _ => byte.is_ascii_hexdigit(),
    })
}
