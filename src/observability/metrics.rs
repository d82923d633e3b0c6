//! Metrics collection and exposition.
//!
//! # Metrics
//! - `function_invocations_total` (counter): requests by method, status.
//!   Non-standard methods are folded into `other` to keep label sets bounded
//! - `function_invocation_duration_seconds` (histogram): handler latency
//! - `function_accepting` (gauge): 1 while accepting new work, 0 otherwise
//!
//! # Design Decisions
//! - Recording goes through the `metrics` facade; without an installed
//!   recorder every call is a no-op
//! - Exporter installation failures are logged and otherwise ignored

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter with its own HTTP listener.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> bool {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => {
            tracing::info!(address = %addr, "Metrics exporter listening");
            true
        }
        Err(e) => {
            tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter");
            false
        }
    }
}

/// Record one completed invocation.
pub fn record_invocation(method: &str, status: u16, start: Instant) {
    metrics::counter!(
        "function_invocations_total",
        "method" => method_label(method),
        "status" => status.to_string()
    )
    .increment(1);
    metrics::histogram!("function_invocation_duration_seconds")
        .record(start.elapsed().as_secs_f64());
}

/// Label value for a request method.
fn method_label(method: &str) -> &'static str {
    match method {
        "GET" => "GET",
        "HEAD" => "HEAD",
        "POST" => "POST",
        "PUT" => "PUT",
        "DELETE" => "DELETE",
        "CONNECT" => "CONNECT",
        "OPTIONS" => "OPTIONS",
        "TRACE" => "TRACE",
        "PATCH" => "PATCH",
        _ => "other",
    }
}

/// Mirror the accepting flag.
pub fn record_accepting(accepting: bool) {
    metrics::gauge!("function_accepting").set(if accepting { 1.0 } else { 0.0 });
}
