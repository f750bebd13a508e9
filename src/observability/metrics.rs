//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gateway_operations_total` (counter): mutations by kind and outcome
//! - `gateway_reads_total` (counter): listing reads by outcome
//! - `gateway_read_duration_seconds` (histogram): listing read latency
//! - `gateway_provider_health` (gauge): 1=reachable, 0=unreachable
//!
//! Recording is a no-op until a recorder is installed, so library users and
//! tests pay nothing.

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::time::Instant;

/// Install the Prometheus recorder and its scrape listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_operation(kind: &'static str, outcome: &'static str) {
    counter!("gateway_operations_total", "kind" => kind, "outcome" => outcome).increment(1);
}

pub fn record_read(outcome: &'static str, started: Instant) {
    counter!("gateway_reads_total", "outcome" => outcome).increment(1);
    histogram!("gateway_read_duration_seconds").record(started.elapsed().as_secs_f64());
}

pub fn record_provider_health(healthy: bool) {
    gauge!("gateway_provider_health").set(if healthy { 1.0 } else { 0.0 });
}
