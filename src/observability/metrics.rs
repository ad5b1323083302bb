//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gateway_sse_sessions_opened_total` (counter)
//! - `gateway_sse_sessions_closed_total` (counter)
//! - `gateway_sse_active_sessions` (gauge)
//! - `gateway_sse_messages_injected_total` (counter): by outcome
//! - `gateway_sse_heartbeats_total` (counter)
//! - `gateway_upstream_requests_total` (counter): by method, status
//! - `gateway_upstream_request_duration_seconds` (histogram)
//!
//! Recording is a no-op until [`init_metrics`] installs the exporter.

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter listening on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_session_opened() {
    ::metrics::counter!("gateway_sse_sessions_opened_total").increment(1);
    ::metrics::gauge!("gateway_sse_active_sessions").increment(1.0);
}

pub fn record_session_closed() {
    ::metrics::counter!("gateway_sse_sessions_closed_total").increment(1);
    ::metrics::gauge!("gateway_sse_active_sessions").decrement(1.0);
}

pub fn record_heartbeat() {
    ::metrics::counter!("gateway_sse_heartbeats_total").increment(1);
}

/// `outcome` is one of `delivered`, `unknown_session`, `invalid`.
pub fn record_injection(outcome: &'static str) {
    ::metrics::counter!("gateway_sse_messages_injected_total", "outcome" => outcome).increment(1);
}

/// Status `0` marks a transport failure (no response).
pub fn record_upstream(method: &str, status: u16, start: Instant) {
    ::metrics::counter!(
        "gateway_upstream_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    ::metrics::histogram!("gateway_upstream_request_duration_seconds")
        .record(start.elapsed().as_secs_f64());
}
