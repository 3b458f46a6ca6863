//! Metrics collection and exposition.
//!
//! # Metrics
//! - `router_attempts_total` (counter): attempts by path, outcome
//! - `router_attempt_duration_seconds` (histogram): attempt latency by path
//! - `router_path_usable` (gauge): 1=usable, 0=penalized
//! - `router_circuit_opened_total` (counter): circuit openings by path
//! - `router_probe_recoveries_total` (counter): penalties cleared by probes
//! - `relay_requests_total` (counter): relay server responses by status
//! - `relay_request_duration_seconds` (histogram): relay latency
//!
//! # Design Decisions
//! - Recording is a no-op until a recorder is installed
//! - Labels carry path names, never URLs

use std::net::SocketAddr;
use std::time::{Duration, Instant};

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its HTTP listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_attempt(path: &str, outcome: &'static str, elapsed: Duration) {
    counter!("router_attempts_total", "path" => path.to_string(), "outcome" => outcome)
        .increment(1);
    histogram!("router_attempt_duration_seconds", "path" => path.to_string())
        .record(elapsed.as_secs_f64());
}

pub fn record_path_usable(path: &str, usable: bool) {
    gauge!("router_path_usable", "path" => path.to_string()).set(if usable { 1.0 } else { 0.0 });
}

pub fn record_circuit_opened(path: &str) {
    counter!("router_circuit_opened_total", "path" => path.to_string()).increment(1);
}

pub fn record_probe_recovery(path: &str) {
    counter!("router_probe_recoveries_total", "path" => path.to_string()).increment(1);
}

pub fn record_relay_request(status: u16, start: Instant) {
    counter!("relay_requests_total", "status" => status.to_string()).increment(1);
    histogram!("relay_request_duration_seconds").record(start.elapsed().as_secs_f64());
}
