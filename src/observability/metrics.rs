//! Prometheus metrics.
//!
//! # Exported Series
//! - `breaker_state{breaker}` gauge: 0 closed, 1 half-open, 2 open
//! - `health_checks_total{service, status}` counter
//! - `health_check_latency_ms{service}` histogram
//! - `recoveries_total{service, outcome}` counter
//!
//! Recording is a no-op until [`init_metrics`] installs the recorder,
//! so library users who never call it pay nothing.

use std::net::SocketAddr;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

use crate::probe::types::Status;
use crate::resilience::CircuitState;

/// Install the Prometheus recorder and its scrape endpoint.
pub fn init_metrics(addr: SocketAddr) -> Result<(), String> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| format!("failed to install prometheus exporter: {e}"))?;

    tracing::info!(%addr, "prometheus exporter listening");
    Ok(())
}

pub fn record_breaker_state(breaker: &str, state: CircuitState) {
    let value = match state {
        CircuitState::Closed => 0.0,
        CircuitState::HalfOpen => 1.0,
        CircuitState::Open => 2.0,
    };
    gauge!("breaker_state", "breaker" => breaker.to_string()).set(value);
}

pub fn record_probe(service: &str, status: Status, latency_ms: f64) {
    counter!(
        "health_checks_total",
        "service" => service.to_string(),
        "status" => status.to_string(),
    )
    .increment(1);
    histogram!("health_check_latency_ms", "service" => service.to_string()).record(latency_ms);
}

pub fn record_recovery(service: &str, recovered: bool) {
    let outcome = if recovered { "recovered" } else { "exhausted" };
    counter!(
        "recoveries_total",
        "service" => service.to_string(),
        "outcome" => outcome,
    )
    .increment(1);
}
