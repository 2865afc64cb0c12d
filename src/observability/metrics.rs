//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define registry metrics (mock traffic, mutations, sessions)
//! - Expose Prometheus-compatible metrics endpoint
//!
//! # Metrics
//! - `mock_requests_total` (counter): mock requests by endpoint, method, status
//! - `mock_request_duration_seconds` (histogram): latency including delay
//! - `control_mutations_total` (counter): mutations by kind and result
//! - `control_sessions` (gauge): connected control sessions
//! - `control_slow_sessions_total` (counter): sessions dropped for a full queue
//! - `registry_endpoints` (gauge): configured endpoints
//!
//! # Design Decisions
//! - Recording is a no-op until a recorder is installed, so tests need no setup
//! - Labels stay low-cardinality: unknown paths are recorded as "unmatched"

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

pub const MOCK_REQUESTS_TOTAL: &str = "mock_requests_total";
pub const MOCK_REQUEST_DURATION_SECONDS: &str = "mock_request_duration_seconds";
pub const CONTROL_MUTATIONS_TOTAL: &str = "control_mutations_total";
pub const CONTROL_SESSIONS: &str = "control_sessions";
pub const CONTROL_SLOW_SESSIONS_TOTAL: &str = "control_slow_sessions_total";
pub const REGISTRY_ENDPOINTS: &str = "registry_endpoints";

/// Install the global recorder with a scrape listener on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

/// Record one mock request. `endpoint` is "unmatched" for misses.
pub fn record_mock_request(endpoint: &str, method: &str, status: u16, start: Instant) {
    let endpoint = endpoint.to_string();
    ::metrics::counter!(
        MOCK_REQUESTS_TOTAL,
        "endpoint" => endpoint.clone(),
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    ::metrics::histogram!(MOCK_REQUEST_DURATION_SECONDS, "endpoint" => endpoint)
        .record(start.elapsed().as_secs_f64());
}

/// Record a mutation attempt. `result` is "ok" or the error kind.
pub fn record_mutation(kind: &'static str, result: &'static str) {
    ::metrics::counter!(CONTROL_MUTATIONS_TOTAL, "kind" => kind, "result" => result).increment(1);
}

pub fn record_sessions(count: usize) {
    ::metrics::gauge!(CONTROL_SESSIONS).set(count as f64);
}

pub fn record_slow_session() {
    ::metrics::counter!(CONTROL_SLOW_SESSIONS_TOTAL).increment(1);
}

pub fn record_endpoints(count: usize) {
    ::metrics::gauge!(REGISTRY_ENDPOINTS).set(count as f64);
}
