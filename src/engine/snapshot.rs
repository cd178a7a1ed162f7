//! Point-in-time system status export.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::probe::types::Status;
use crate::resilience::CircuitState;

/// One service's health, as exported.
#[derive(Debug, Clone, Serialize)]
pub struct ServiceSnapshot {
    pub status: Status,
    pub last_check: Option<DateTime<Utc>>,
    pub consecutive_failures: u32,
    /// Share of healthy results in the rolling window, 0 to 100.
    pub success_rate: f64,
    pub avg_latency_ms: f64,
}

/// One circuit breaker's state, as exported.
#[derive(Debug, Clone, Serialize)]
pub struct BreakerSnapshot {
    pub state: CircuitState,
    pub failure_count: u32,
    pub last_failure_time: Option<DateTime<Utc>>,
}

/// Full system status at one instant.
#[derive(Debug, Clone, Serialize)]
pub struct EngineSnapshot {
    pub overall_status: Status,
    pub timestamp: DateTime<Utc>,
    pub services: BTreeMap<String, ServiceSnapshot>,
    pub circuit_breakers: BTreeMap<String, BreakerSnapshot>,
    pub monitoring_active: bool,
}

impl EngineSnapshot {
    pub fn new(
        services: BTreeMap<String, ServiceSnapshot>,
        circuit_breakers: BTreeMap<String, BreakerSnapshot>,
        monitoring_active: bool,
    ) -> Self {
        let overall_status = services
            .values()
            .map(effective_status)
            .fold(Status::Healthy, Status::worst);
        Self {
            overall_status,
            timestamp: Utc::now(),
            services,
            circuit_breakers,
            monitoring_active,
        }
    }
}

/// Status used for worst-of aggregation. A service that was never
/// checked does not drag the system down; one whose check came back
/// Unknown is treated as Degraded.
fn effective_status(service: &ServiceSnapshot) -> Status {
    match (service.status, service.last_check) {
        (Status::Unknown, None) => Status::Healthy,
        (Status::Unknown, Some(_)) => Status::Degraded,
        (status, _) => status,
    }
}
