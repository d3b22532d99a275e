//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gateway_decisions_total` (counter): terminal actions by zone, action
//! - `gateway_rate_limited_total` (counter): denials by limiter bucket
//! - `gateway_decision_duration_seconds` (histogram): pipeline latency

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Start the Prometheus scrape endpoint.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_decision(zone: &'static str, action: &'static str, start: Instant) {
    counter!("gateway_decisions_total", "zone" => zone, "action" => action).increment(1);
    histogram!("gateway_decision_duration_seconds").record(start.elapsed().as_secs_f64());
}

pub fn record_rate_limited(bucket: &str) {
    counter!("gateway_rate_limited_total", "bucket" => bucket.to_string()).increment(1);
}
