//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define server metrics (connections, requests, parse errors, responses)
//! - Expose Prometheus-compatible metrics endpoint
//!
//! # Metrics
//! - `http_connections_total` (counter): accepted connections
//! - `http_active_connections` (gauge): current connection count
//! - `http_requests_total` (counter): parsed requests by method
//! - `http_parse_errors_total` (counter): rejected requests by error kind
//! - `http_responses_total` (counter): responses by status code
//!
//! # Design Decisions
//! - Recording goes through the `metrics` facade, so it costs nothing without an exporter
//! - Labels are low-cardinality (method, kind, status)

use std::net::SocketAddr;

use metrics::{counter, gauge};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

use crate::http::error::ErrorKind;
use crate::http::request::Method;
use crate::http::response::StatusCode;

/// Install the Prometheus recorder and its scrape endpoint on `addr`.
///
/// Must run inside a tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

pub fn record_connection_opened() {
    counter!("http_connections_total").increment(1);
    gauge!("http_active_connections").increment(1.0);
}

pub fn record_connection_closed() {
    gauge!("http_active_connections").decrement(1.0);
}

pub fn record_request(method: Method) {
    counter!("http_requests_total", "method" => method.as_str()).increment(1);
}

pub fn record_parse_error(kind: ErrorKind) {
    counter!("http_parse_errors_total", "kind" => kind.as_str()).increment(1);
}

pub fn record_response(status: StatusCode) {
    counter!("http_responses_total", "status" => status.as_u16().to_string()).increment(1);
}
