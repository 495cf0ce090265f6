//! Metrics collection and exposition.
//!
//! # Metrics
//! - `node_client_requests_total` (counter): node requests by operation, outcome
//! - `node_client_request_duration_seconds` (histogram): node request latency by operation
//! - `node_client_events_dispatched_total` (counter): listener deliveries by event
//! - `node_client_confirmation_wait_seconds` (histogram): deposit confirmation wait by chain, outcome

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};
use std::net::SocketAddr;
use std::time::Instant;

use crate::error::Operation;
use crate::events::EngineEventName;

/// Install the Prometheus recorder and serve `/metrics` on `addr`.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

pub fn record_request(operation: Operation, success: bool, started: Instant) {
    let outcome = outcome(success);
    ::metrics::counter!(
        "node_client_requests_total",
        "operation" => operation.as_str(),
        "outcome" => outcome
    )
    .increment(1);
    ::metrics::histogram!(
        "node_client_request_duration_seconds",
        "operation" => operation.as_str()
    )
    .record(started.elapsed().as_secs_f64());
}

pub fn record_dispatch(event: EngineEventName, delivered: usize) {
    ::metrics::counter!("node_client_events_dispatched_total", "event" => event.as_str())
        .increment(delivered as u64);
}

pub fn record_confirmation_wait(chain_id: u64, confirmed: bool, started: Instant) {
    ::metrics::histogram!(
        "node_client_confirmation_wait_seconds",
        "chain_id" => chain_id.to_string(),
        "outcome" => outcome(confirmed)
    )
    .record(started.elapsed().as_secs_f64());
}

fn outcome(success: bool) -> &'static str {
    if success {
        "success"
    } else {
        "failure"
    }
}
