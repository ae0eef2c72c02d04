//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gateway_requests_total` (counter): requests by response status
//! - `gateway_backend_call_duration_seconds` (histogram): backend latency by outcome
//! - `gateway_active_connections` (gauge): open client connections
//!
//! Without an installed recorder every call here is a no-op.

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter with its scrape listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => {
            tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter")
        }
    }
}

/// Count one answered request.
pub fn record_request(status: u16) {
    metrics::counter!("gateway_requests_total", "status" => status.to_string()).increment(1);
}

/// Record how long a backend call took and how it ended.
pub fn record_backend_call(outcome: &'static str, start: Instant) {
    metrics::histogram!("gateway_backend_call_duration_seconds", "outcome" => outcome)
        .record(start.elapsed().as_secs_f64());
}

/// Track the open connection count.
pub fn set_active_connections(count: usize) {
    metrics::gauge!("gateway_active_connections").set(count as f64);
}
