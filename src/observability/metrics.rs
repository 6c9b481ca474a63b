//! Metrics collection and exposition.
//!
//! # Metrics
//! - `config_reloads_total` (counter): reload attempts by domain and outcome
//! - `config_generation` (gauge): generation number of the published settings
//! - `cache_entries` (gauge): live entries in the memory cache
//!
//! # Design Decisions
//! - Recording is always on; without an installed recorder the macros are no-ops
//! - The Prometheus exporter is only installed when `[metrics] enabled = true`

use std::net::SocketAddr;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder with its own HTTP listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(
            address = %addr,
            error = %e,
            "Failed to install metrics exporter"
        ),
    }
}

pub fn record_reload(domain: &'static str, outcome: &'static str) {
    metrics::counter!("config_reloads_total", "domain" => domain, "outcome" => outcome)
        .increment(1);
}

pub fn record_generation(generation: u64) {
    metrics::gauge!("config_generation").set(generation as f64);
}

pub fn record_cache_size(entries: usize) {
    metrics::gauge!("cache_entries").set(entries as f64);
}
