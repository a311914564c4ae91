//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define proxy metrics (requests, latency, relayed bytes, pool usage)
//! - Expose Prometheus-compatible metrics endpoint
//!
//! # Metrics
//! - `proxy_requests_total` (counter): requests by outcome, status
//! - `proxy_request_duration_seconds` (histogram): pipeline latency by outcome
//! - `proxy_relayed_bytes_total` (counter): response bytes written to clients
//! - `proxy_pool_outstanding` (gauge): items checked out, by pool
//! - `proxy_pool_created_total` (counter): items built by pool factories
//!
//! # Design Decisions
//! - Low-overhead metric updates (atomic operations)
//! - Labels are bounded: outcome is an error kind, never a route key

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder and its scrape listener.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

/// Record one finished pipeline run.
pub fn record_request(outcome: &'static str, status: u16, start: Instant) {
    let elapsed = start.elapsed().as_secs_f64();
    counter!(
        "proxy_requests_total",
        "outcome" => outcome,
        "status" => status.to_string()
    )
    .increment(1);
    histogram!("proxy_request_duration_seconds", "outcome" => outcome).record(elapsed);
}

pub fn record_relayed_bytes(bytes: u64) {
    counter!("proxy_relayed_bytes_total").increment(bytes);
}

pub fn record_pool_created(pool: &'static str) {
    counter!("proxy_pool_created_total", "pool" => pool).increment(1);
}

pub fn record_pool_outstanding(pool: &'static str, outstanding: u64) {
    gauge!("proxy_pool_outstanding", "pool" => pool).set(outstanding as f64);
}
