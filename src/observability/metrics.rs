//! Metrics collection and exposition.
//!
//! # Metrics
//! - `ipp_connections_total` (counter): accepted connections
//! - `ipp_connections_active` (gauge): connections not yet closed
//! - `ipp_responses_total` (counter): status lines sent, by `status`
//! - `ipp_operations_total` (counter): IPP requests, by `operation`
//! - `ipp_dispatch_failures_total` (counter): contained failures, by `kind`
//! - `ipp_request_duration_seconds` (histogram): time from accept to close

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus exporter listening on `addr`.
///
/// Must be called from within the tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

pub fn connection_opened() {
    metrics::counter!("ipp_connections_total").increment(1);
    metrics::gauge!("ipp_connections_active").increment(1.0);
}

pub fn connection_closed() {
    metrics::gauge!("ipp_connections_active").decrement(1.0);
}

pub fn record_response(status: u16) {
    metrics::counter!("ipp_responses_total", "status" => status.to_string()).increment(1);
}

pub fn record_operation(operation: &'static str) {
    metrics::counter!("ipp_operations_total", "operation" => operation).increment(1);
}

pub fn record_failure(kind: &'static str) {
    metrics::counter!("ipp_dispatch_failures_total", "kind" => kind).increment(1);
}

pub fn record_duration(started: Instant) {
    metrics::histogram!("ipp_request_duration_seconds").record(started.elapsed().as_secs_f64());
}
