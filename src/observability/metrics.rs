//! Metrics collection and exposition.
//!
//! # Metrics
//! - `minter_attempts_total` (counter): finished attempts by outcome
//! - `minter_step_duration_seconds` (histogram): on-chain step latency by phase
//! - `minter_http_requests_total` (counter): API requests by route, status
//! - `minter_http_request_duration_seconds` (histogram): API latency by route
//!
//! Recording is a no-op until `init_metrics` installs the exporter.

use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::time::Instant;

use crate::minting::MintPhase;

/// Install the Prometheus exporter, scraped at `http://<addr>/metrics`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

/// Count a finished attempt. `outcome` is `completed` or an error label.
pub fn record_attempt(outcome: &'static str) {
    ::metrics::counter!("minter_attempts_total", "outcome" => outcome).increment(1);
}

/// Record how long a pipeline step took.
pub fn record_step(phase: MintPhase, started: Instant) {
    ::metrics::histogram!("minter_step_duration_seconds", "phase" => phase.as_str())
        .record(started.elapsed().as_secs_f64());
}

/// Record a served API request.
pub fn record_request(route: &str, status: u16, started: Instant) {
    let route = route.to_string();
    ::metrics::counter!(
        "minter_http_requests_total",
        "route" => route.clone(),
        "status" => status.to_string()
    )
    .increment(1);
    ::metrics::histogram!("minter_http_request_duration_seconds", "route" => route)
        .record(started.elapsed().as_secs_f64());
}
