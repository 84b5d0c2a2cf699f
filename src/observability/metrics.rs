//! Metrics collection and exposition.
//!
//! # Metrics
//! - `replay_requests_total` (counter): replayed requests by response status
//! - `replay_round_trip_seconds` (histogram): send-to-receive latency
//! - `replay_synthetic_responses_total` (counter): 52x responses by code
//! - `replay_queue_depth` (gauge): pending requests in the replay queue
//! - `replay_active_workers` / `replay_idle_workers` (gauges): pool size
//! - `emitter_payloads_total` (counter): payloads read from sources

use std::net::SocketAddr;
use std::time::Duration;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Start the Prometheus scrape endpoint.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to start metrics endpoint"),
    }
}

/// Record one replayed request.
pub fn record_replay(status: Option<&[u8]>, round_trip: Duration) {
    let status = status
        .and_then(|s| std::str::from_utf8(s).ok())
        .unwrap_or("invalid")
        .to_string();

    metrics::counter!("replay_requests_total", "status" => status).increment(1);
    metrics::histogram!("replay_round_trip_seconds").record(round_trip.as_secs_f64());
}

/// Publish the replay queue depth.
pub fn record_queue_depth(depth: usize) {
    metrics::gauge!("replay_queue_depth").set(depth as f64);
}

/// Publish worker pool size.
pub fn record_pool(active: usize, idle: usize) {
    metrics::gauge!("replay_active_workers").set(active as f64);
    metrics::gauge!("replay_idle_workers").set(idle as f64);
}

/// Count a payload read by the emitter.
pub fn record_emitted() {
    metrics::counter!("emitter_payloads_total").increment(1);
}
