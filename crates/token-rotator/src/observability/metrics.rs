//! Metrics definitions for the token rotator.
//!
//! All metrics follow Prometheus naming conventions:
//! - `rotator_` prefix
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! # Cardinality
//!
//! Labels are bounded:
//! - `status`: rotated, reinitialized, record_missing, or an error category
//! - `operation`: ping, ensure_schema, upsert, read
//! - `error_category`: bounded by `RotatorError::category`
//! - `endpoint`: /health, /status

use crate::errors::RotatorError;
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder};
use std::net::SocketAddr;
use std::time::Duration;

/// Install the Prometheus recorder with its own scrape listener.
///
/// Must run inside the tokio runtime. The listener is separate from the
/// health server, which only answers `/health` and `/status`.
///
/// # Errors
///
/// Returns error if the recorder is already installed or the listener
/// cannot be configured.
pub fn init_metrics_exporter(bind_address: SocketAddr) -> Result<(), String> {
    PrometheusBuilder::new()
        .with_http_listener(bind_address)
        .set_buckets_for_metric(
            Matcher::Prefix("rotator_storage".to_string()),
            &[0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.000, 2.500, 5.000, 10.000],
        )
        .map_err(|e| format!("Failed to set storage buckets: {e}"))?
        .set_buckets_for_metric(
            Matcher::Prefix("rotator_rotation".to_string()),
            &[0.010, 0.050, 0.100, 0.250, 0.500, 1.000, 2.500, 5.000, 10.000],
        )
        .map_err(|e| format!("Failed to set rotation buckets: {e}"))?
        .install()
        .map_err(|e| format!("Failed to install Prometheus exporter: {e}"))
}

fn outcome<T>(result: &Result<T, RotatorError>) -> (&'static str, &'static str) {
    match result {
        Ok(_) => ("success", "none"),
        Err(e) => ("error", e.category()),
    }
}

/// Record one storage operation.
///
/// Metric: `rotator_storage_operation_duration_seconds`, `rotator_storage_operations_total`
/// Labels: `operation`, `status`, `error_category`
pub fn record_storage_operation<T>(
    operation: &'static str,
    result: &Result<T, RotatorError>,
    duration: Duration,
) {
    let (status, category) = outcome(result);

    histogram!("rotator_storage_operation_duration_seconds", "operation" => operation)
        .record(duration.as_secs_f64());

    counter!(
        "rotator_storage_operations_total",
        "operation" => operation,
        "status" => status,
        "error_category" => category
    )
    .increment(1);
}

/// Record one rotation attempt.
///
/// Metric: `rotator_rotation_duration_seconds`, `rotator_rotations_total`
/// Labels: `status`
pub fn record_rotation(status: &'static str, duration: Duration) {
    histogram!("rotator_rotation_duration_seconds", "status" => status)
        .record(duration.as_secs_f64());
    counter!("rotator_rotations_total", "status" => status).increment(1);
}

/// Unix timestamp of the last successful rotation.
///
/// Metric: `rotator_last_rotation_timestamp`
pub fn set_last_rotation_timestamp(timestamp_secs: i64) {
    gauge!("rotator_last_rotation_timestamp").set(timestamp_secs as f64);
}

/// Record one startup connectivity attempt.
///
/// Metric: `rotator_startup_probe_attempts_total`
/// Labels: `status`
pub fn record_probe_attempt(success: bool) {
    let status = if success { "success" } else { "error" };
    counter!("rotator_startup_probe_attempts_total", "status" => status).increment(1);
}

/// Record one health endpoint response.
///
/// Metric: `rotator_health_requests_total`
/// Labels: `endpoint`, `status_code`
pub fn record_health_request(endpoint: &'static str, status_code: u16) {
    counter!(
        "rotator_health_requests_total",
        "endpoint" => endpoint,
        "status_code" => status_code.to_string()
    )
    .increment(1);
}
