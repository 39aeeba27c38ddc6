//! Metrics definitions for the workload console.
//!
//! All metrics follow Prometheus naming conventions:
//! - `console_` prefix
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! # Cardinality
//!
//! Labels are bounded:
//! - `command`: start, stop
//! - `outcome`: bounded by the outcome enums of each operation
//! - `workload`: the four catalog workloads plus `unknown`

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder};
use std::net::SocketAddr;
use std::time::Duration;

/// Install the Prometheus recorder and serve `/metrics` on `addr`.
///
/// Must be called from within a Tokio runtime, before any metric is recorded.
///
/// # Errors
///
/// Returns error if the recorder or the listener cannot be installed.
pub fn install_prometheus_exporter(addr: SocketAddr) -> Result<(), String> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        // Backend calls are short request/response round trips
        .set_buckets_for_metric(
            Matcher::Prefix("console_workload_command".to_string()),
            &[0.010, 0.050, 0.100, 0.250, 0.500, 1.000, 2.500, 5.000, 10.000],
        )
        .map_err(|e| format!("Failed to set command duration buckets: {e}"))?
        .install()
        .map_err(|e| format!("Failed to install Prometheus exporter: {e}"))
}

/// Record the outcome of a start/stop command.
///
/// Metric: `console_workload_commands_total`
/// Labels: `command`, `outcome`
pub fn record_workload_command(command: &str, outcome: &str) {
    counter!("console_workload_commands_total",
        "command" => command.to_string(),
        "outcome" => outcome.to_string()
    )
    .increment(1);
}

/// Record the latency of a start/stop request.
///
/// Metric: `console_workload_command_duration_seconds`
/// Labels: `command`
pub fn record_command_duration(command: &str, duration: Duration) {
    histogram!("console_workload_command_duration_seconds",
        "command" => command.to_string()
    )
    .record(duration.as_secs_f64());
}

/// Record a backend health check.
///
/// Metric: `console_health_checks_total`
/// Labels: `outcome` (available, unavailable)
pub fn record_health_check(outcome: &str) {
    counter!("console_health_checks_total", "outcome" => outcome.to_string()).increment(1);
}

/// Record a workload event received on the live subscription.
///
/// Metric: `console_sse_events_total`
/// Labels: `workload`
pub fn record_sse_event(workload: &str) {
    counter!("console_sse_events_total", "workload" => workload.to_string()).increment(1);
}

/// Record an SSE frame that could not be used.
///
/// Metric: `console_sse_errors_total`
/// Labels: `reason` (frame_too_large, invalid_event, stream_error)
pub fn record_sse_error(reason: &str) {
    counter!("console_sse_errors_total", "reason" => reason.to_string()).increment(1);
}
