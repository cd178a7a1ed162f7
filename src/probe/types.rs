//! Probe result types shared across the engine.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Opaque registry key naming one external dependency.
///
/// Created at registration and immutable thereafter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ServiceIdentity(String);

impl ServiceIdentity {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ServiceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ServiceIdentity {
    fn from(name: &str) -> Self {
        Self(name.to_string())
    }
}

impl From<String> for ServiceIdentity {
    fn from(name: String) -> Self {
        Self(name)
    }
}

/// Classification of one health observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Healthy,
    Degraded,
    Unhealthy,
    /// No check has classified the service yet.
    Unknown,
}

impl Status {
    /// Rank for worst-of aggregation; higher is worse.
    pub fn severity_rank(&self) -> u8 {
        match self {
            Status::Healthy => 0,
            Status::Unknown => 1,
            Status::Degraded => 2,
            Status::Unhealthy => 3,
        }
    }

    /// Only Unhealthy counts toward consecutive failures.
    pub fn is_failure(&self) -> bool {
        matches!(self, Status::Unhealthy)
    }

    /// Returns the worse of two statuses.
    pub fn worst(self, other: Status) -> Status {
        if other.severity_rank() > self.severity_rank() {
            other
        } else {
            self
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Status::Healthy => "healthy",
            Status::Degraded => "degraded",
            Status::Unhealthy => "unhealthy",
            Status::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// Outcome of a single probe invocation. Immutable once recorded.
#[derive(Debug, Clone, Serialize)]
pub struct HealthCheckResult {
    pub service: ServiceIdentity,
    pub status: Status,
    pub latency_ms: f64,
    pub timestamp: DateTime<Utc>,
    pub details: BTreeMap<String, Value>,
    pub error: Option<String>,
}

impl HealthCheckResult {
    pub fn new(service: ServiceIdentity, status: Status) -> Self {
        Self {
            service,
            status,
            latency_ms: 0.0,
            timestamp: Utc::now(),
            details: BTreeMap::new(),
            error: None,
        }
    }

    /// Unhealthy result for a probe that raised an error.
    pub fn failure(service: ServiceIdentity, message: impl Into<String>) -> Self {
        let message = message.into();
        Self::new(service, Status::Unhealthy)
            .with_detail("code", "probe_error")
            .with_error(message)
    }

    /// Unhealthy result for a probe that exceeded its deadline.
    pub fn timeout(service: ServiceIdentity, timeout: Duration) -> Self {
        Self::new(service, Status::Unhealthy)
            .with_detail("code", "timeout")
            .with_error(format!("probe timed out after {timeout:?}"))
    }

    pub fn with_detail(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.details.insert(key.to_string(), value.into());
        self
    }

    pub fn with_error(mut self, message: impl Into<String>) -> Self {
        self.error = Some(message.into());
        self
    }
}

/// Errors a probe may raise. Coerced to Unhealthy results by the
/// engine; never re-raised to callers of `check_now`.
#[derive(Debug, Error)]
pub enum ProbeError {
    /// The probe hit its own internal deadline.
    #[error("probe timed out after {0:?}")]
    Timeout(Duration),

    /// Any other probe failure; the message is retained as detail.
    #[error("{0}")]
    Failed(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_ordering() {
        assert!(Status::Unhealthy.severity_rank() > Status::Degraded.severity_rank());
        assert!(Status::Degraded.severity_rank() > Status::Unknown.severity_rank());
        assert!(Status::Unknown.severity_rank() > Status::Healthy.severity_rank());
        assert_eq!(Status::Healthy.worst(Status::Unhealthy), Status::Unhealthy);
        assert_eq!(Status::Degraded.worst(Status::Healthy), Status::Degraded);
    }

    #[test]
    fn test_timeout_result_carries_detail_code() {
        let result =
            HealthCheckResult::timeout(ServiceIdentity::from("db"), Duration::from_secs(5));
        assert_eq!(result.status, Status::Unhealthy);
        assert_eq!(result.details.get("code"), Some(&Value::from("timeout")));
        assert!(result.error.as_deref().is_some_and(|e| e.contains("5s")));
    }

    #[test]
    fn test_status_serializes_lowercase() {
        let json = serde_json::to_string(&Status::Degraded).expect("serialize");
        assert_eq!(json, "\"degraded\"");
    }
}
