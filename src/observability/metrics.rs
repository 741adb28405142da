//! Metrics collection and exposition.
//!
//! # Metrics
//! - `workhorse_requests_total` (counter): requests by method, status
//! - `workhorse_request_duration_seconds` (histogram): upstream latency
//! - `workhorse_error_pages_served_total` (counter): overrides by status
//! - `workhorse_git_spawn_total` (counter): Git launches by program, outcome
//!
//! # Design Decisions
//! - Exporter is opt-in; without it the macros record into a no-op recorder

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Start the Prometheus exporter on `addr`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

/// Record a forwarded request and its latency.
pub fn record_request(method: &str, status: u16, start: Instant) {
    counter!(
        "workhorse_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    histogram!("workhorse_request_duration_seconds").record(start.elapsed().as_secs_f64());
}

/// Record a static error page being served in place of a backend body.
pub fn record_error_page_served(status: u16) {
    counter!("workhorse_error_pages_served_total", "status" => status.to_string()).increment(1);
}

/// Record a Git subprocess launch attempt.
pub fn record_git_spawn(program: &str, ok: bool) {
    let outcome = if ok { "started" } else { "failed" };
    counter!(
        "workhorse_git_spawn_total",
        "program" => program.to_string(),
        "outcome" => outcome
    )
    .increment(1);
}
