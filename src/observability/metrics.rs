//! Metrics collection and exposition.
//!
//! # Metrics
//! - `lb_requests_total` (counter): dispatched requests by method, status, backend
//! - `lb_request_duration_seconds` (histogram): latency distribution
//! - `lb_no_backend_total` (counter): requests answered 503 for lack of a live backend
//! - `lb_backend_alive` (gauge): 1=alive, 0=dead, per backend
//!
//! Recording goes through the `metrics` facade, so it is a no-op until
//! [`init_metrics`] installs the Prometheus recorder.

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its HTTP listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

/// Record one dispatched request.
pub fn record_request(method: &str, status: u16, backend: &str, start: Instant) {
    let labels = [
        ("method", method.to_string()),
        ("status", status.to_string()),
        ("backend", backend.to_string()),
    ];
    counter!("lb_requests_total", &labels).increment(1);
    histogram!("lb_request_duration_seconds", &labels).record(start.elapsed().as_secs_f64());
}

pub fn record_no_backend() {
    counter!("lb_no_backend_total").increment(1);
}

/// Record the outcome of the latest probe for `backend`.
pub fn record_backend_health(backend: &str, alive: bool) {
    gauge!("lb_backend_alive", "backend" => backend.to_string()).set(if alive { 1.0 } else { 0.0 });
}
