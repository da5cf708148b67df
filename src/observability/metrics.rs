//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gate_admissions_total` (counter): decisions by operation, outcome
//! - `gate_rejections_total` (counter): rejections by reason
//! - `gate_events_total` (counter): emitted events by kind
//! - `gate_tracked_principals` (gauge): (asset, principal) records
//! - `gate_whitelist_members` (gauge): explicit whitelist size

use std::net::SocketAddr;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter listening on `addr`.
///
/// Must be called from within a tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_admission(operation: &'static str, outcome: &'static str) {
    ::metrics::counter!("gate_admissions_total", "operation" => operation, "outcome" => outcome).increment(1);
}

pub fn record_rejection(reason: &'static str) {
    ::metrics::counter!("gate_rejections_total", "reason" => reason).increment(1);
}

pub fn record_event(kind: &'static str) {
    ::metrics::counter!("gate_events_total", "kind" => kind).increment(1);
}

pub fn record_tracked_principals(count: usize) {
    ::metrics::gauge!("gate_tracked_principals").set(count as f64);
}

pub fn record_whitelist_size(count: usize) {
    ::metrics::gauge!("gate_whitelist_members").set(count as f64);
}
