//! Metrics collection and exposition.
//!
//! # Metrics
//! - `credchain_http_requests_total` (counter): requests by endpoint, status
//! - `credchain_transactions_total` (counter): submissions by outcome
//! - `credchain_confirmation_seconds` (histogram): submit-to-outcome latency
//! - `credchain_rpc_errors_total` (counter): failed RPC calls by operation
//! - `credchain_builder_scan_skipped_total` (counter): builders skipped by client scans

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Start the Prometheus scrape endpoint on `addr`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

pub fn record_request(endpoint: String, status: u16) {
    metrics::counter!(
        "credchain_http_requests_total",
        "endpoint" => endpoint,
        "status" => status.to_string()
    )
    .increment(1);
}

pub fn record_transaction(outcome: &'static str, started: Instant) {
    metrics::counter!("credchain_transactions_total", "outcome" => outcome).increment(1);
    metrics::histogram!("credchain_confirmation_seconds").record(started.elapsed().as_secs_f64());
}

pub fn record_rpc_error(op: &'static str) {
    metrics::counter!("credchain_rpc_errors_total", "op" => op).increment(1);
}

pub fn record_builders_skipped(count: usize) {
    metrics::counter!("credchain_builder_scan_skipped_total").increment(count as u64);
}
