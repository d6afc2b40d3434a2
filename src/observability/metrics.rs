//! Metrics collection and exposition.
//!
//! # Metrics
//! - `ext_proc_streams_active` (gauge): streams currently open
//! - `ext_proc_streams_total` (counter): finished streams by outcome
//! - `ext_proc_events_total` (counter): events received by phase
//! - `ext_proc_event_duration_seconds` (histogram): handling time by phase
//! - `ext_proc_classifications_total` (counter): classified bodies by size class
//! - `ext_proc_classification_failures_total` (counter)
//!
//! Without an installed recorder every call is a no-op.

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

use crate::classify::SizeClass;
use crate::ext_proc::event::Phase;

/// Install the Prometheus recorder with an HTTP scrape endpoint on `addr`.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn stream_opened() {
    gauge!("ext_proc_streams_active").increment(1.0);
}

pub fn stream_released() {
    gauge!("ext_proc_streams_active").decrement(1.0);
}

/// Record how a stream ended: "closed" or "failed".
pub fn record_stream_outcome(outcome: &'static str) {
    counter!("ext_proc_streams_total", "outcome" => outcome).increment(1);
}

pub fn record_event(phase: Phase, start: Instant) {
    counter!("ext_proc_events_total", "phase" => phase.as_str()).increment(1);
    histogram!("ext_proc_event_duration_seconds", "phase" => phase.as_str())
        .record(start.elapsed().as_secs_f64());
}

pub fn record_classification(size_class: SizeClass) {
    counter!("ext_proc_classifications_total", "size_class" => size_class.as_str()).increment(1);
}

pub fn record_classification_failure() {
    counter!("ext_proc_classification_failures_total").increment(1);
}
