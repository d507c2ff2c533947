//! Metrics collection and exposition.
//!
//! # Metrics
//! - `shutdown_signals_total` (counter): signals received by signal, action
//! - `shutdown_cleanup_total` (counter): finished cleanup tasks by task, outcome
//! - `shutdown_cleanup_duration_seconds` (histogram): per-task cleanup time
//! - `shutdown_forced_exits_total` (counter): deadline expirations
//! - `shutdown_duration_seconds` (histogram): cancellation to Drained
//!
//! Recording is a no-op until a recorder is installed.

use std::net::SocketAddr;
use std::time::Duration;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

use crate::lifecycle::Signal;

/// Install the Prometheus recorder and its scrape endpoint.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

pub fn record_signal(signal: Signal, action: &'static str) {
    counter!("shutdown_signals_total", "signal" => signal.to_string(), "action" => action)
        .increment(1);
}

pub fn record_cleanup(task: &str, outcome: &'static str, elapsed: Duration) {
    counter!("shutdown_cleanup_total", "task" => task.to_string(), "outcome" => outcome)
        .increment(1);
    histogram!("shutdown_cleanup_duration_seconds", "task" => task.to_string())
        .record(elapsed.as_secs_f64());
}

pub fn record_forced_exit() {
    counter!("shutdown_forced_exits_total").increment(1);
}

pub fn record_shutdown_duration(elapsed: Duration) {
    histogram!("shutdown_duration_seconds").record(elapsed.as_secs_f64());
}
