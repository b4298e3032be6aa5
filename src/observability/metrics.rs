//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define request and migration metrics
//! - Expose Prometheus-compatible metrics endpoint
//!
//! # Metrics
//! - `http_requests_total` (counter): requests by method, status
//! - `http_request_duration_seconds` (histogram): latency distribution
//! - `migrations_applied_total` (counter)
//! - `migrations_undone_total` (counter)

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

use crate::migrations::Direction;

/// Install the Prometheus recorder and its scrape listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

/// Record one finished HTTP request.
pub fn record_request(method: &str, status: u16, start: Instant) {
    let status = status.to_string();
    metrics::counter!(
        "http_requests_total",
        "method" => method.to_string(),
        "status" => status.clone()
    )
    .increment(1);
    metrics::histogram!(
        "http_request_duration_seconds",
        "method" => method.to_string(),
        "status" => status
    )
    .record(start.elapsed().as_secs_f64());
}

/// Record units applied or undone by one migration run.
pub fn record_migrations(direction: Direction, count: usize) {
    if count == 0 {
        return;
    }
    let name = match direction {
        Direction::Apply => "migrations_applied_total",
        Direction::Undo => "migrations_undone_total",
    };
    metrics::counter!(name).increment(count as u64);
}
