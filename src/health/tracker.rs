//! Rolling health state for a single service.
//!
//! # Responsibilities
//! - Keep a bounded window of recent check results
//! - Derive success rate and average latency from the window
//! - Count consecutive failures and decide when to escalate
//!
//! # Design Decisions
//! - Escalation is edge-triggered by default: one recovery per failure
//!   streak, re-armed only by a non-failing check. `retrigger_on_repeat`
//!   re-escalates on every failing check past the trip point instead.
//! - While a recovery is in flight no further escalation fires for the
//!   same service, whatever the mode.
//! - The tracker is synchronous; the engine serializes access to it.

use std::collections::VecDeque;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::json;

use crate::config::EscalationConfig;
use crate::probe::types::{HealthCheckResult, ServiceIdentity, Status};
use crate::sink::{Severity, Sink};

/// Window size for rolling statistics.
pub const HISTORY_CAPACITY: usize = 50;

/// Decision returned from recording a check result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Escalation {
    None,
    /// The failure streak crossed the trip point and no recovery is in
    /// flight; the caller must start one.
    StartRecovery,
}

/// Snapshot-friendly view of a service's current health.
#[derive(Debug, Clone)]
pub struct ServiceHealthRecord {
    pub identity: ServiceIdentity,
    pub current_status: Status,
    pub last_check_time: Option<DateTime<Utc>>,
    pub consecutive_failures: u32,
    /// Share of Healthy results in the window, 0 to 100.
    pub rolling_success_rate: f64,
    pub rolling_avg_latency: f64,
}

/// Tracks one service's health over time.
pub struct ServiceHealthTracker {
    record: ServiceHealthRecord,
    history: VecDeque<HealthCheckResult>,
    recovery_in_flight: bool,
    trip_count: u32,
    retrigger_on_repeat: bool,
    sink: Arc<dyn Sink>,
}

impl ServiceHealthTracker {
    pub fn new(
        identity: ServiceIdentity,
        escalation: &EscalationConfig,
        sink: Arc<dyn Sink>,
    ) -> Self {
        Self {
            record: ServiceHealthRecord {
                identity,
                current_status: Status::Unknown,
                last_check_time: None,
                consecutive_failures: 0,
                rolling_success_rate: 0.0,
                rolling_avg_latency: 0.0,
            },
            history: VecDeque::with_capacity(HISTORY_CAPACITY),
            recovery_in_flight: false,
            trip_count: escalation.trip_count,
            retrigger_on_repeat: escalation.retrigger_on_repeat,
            sink,
        }
    }

    /// Fold a check result into the rolling state and decide whether a
    /// recovery must start.
    pub fn record(&mut self, result: HealthCheckResult) -> Escalation {
        let previous = self.record.current_status;

        if self.history.len() == HISTORY_CAPACITY {
            self.history.pop_front();
        }
        self.history.push_back(result.clone());

        self.record.current_status = result.status;
        self.record.last_check_time = Some(result.timestamp);
        self.recompute_window_stats();

        if result.status.is_failure() {
            self.record.consecutive_failures = self.record.consecutive_failures.saturating_add(1);
        } else {
            self.record.consecutive_failures = 0;
        }

        if previous != result.status {
            self.on_status_change(previous, &result);
        }

        let tripped = self.record.consecutive_failures >= self.trip_count;
        let should_fire = tripped
            && !self.recovery_in_flight
            && (self.record.consecutive_failures == self.trip_count || self.retrigger_on_repeat);

        if should_fire {
            self.recovery_in_flight = true;
            self.sink.log(
                Severity::Warning,
                "failure streak tripped, starting recovery",
                json!({
                    "service": self.record.identity.to_string(),
                    "consecutive_failures": self.record.consecutive_failures,
                }),
            );
            Escalation::StartRecovery
        } else {
            Escalation::None
        }
    }

    /// Re-arm escalation once the recovery task for this service ends.
    pub fn recovery_finished(&mut self) {
        self.recovery_in_flight = false;
    }

    pub fn recovery_in_flight(&self) -> bool {
        self.recovery_in_flight
    }

    pub fn record_view(&self) -> ServiceHealthRecord {
        self.record.clone()
    }

    fn recompute_window_stats(&mut self) {
        let len = self.history.len();
        if len == 0 {
            self.record.rolling_success_rate = 0.0;
            self.record.rolling_avg_latency = 0.0;
            return;
        }

        let healthy = self
            .history
            .iter()
            .filter(|r| r.status == Status::Healthy)
            .count();
        let latency_sum: f64 = self.history.iter().map(|r| r.latency_ms).sum();

        self.record.rolling_success_rate = healthy as f64 / len as f64 * 100.0;
        self.record.rolling_avg_latency = latency_sum / len as f64;
    }

    fn on_status_change(&self, previous: Status, result: &HealthCheckResult) {
        let severity = match result.status {
            Status::Unhealthy => Severity::Error,
            Status::Degraded => Severity::Warning,
            _ => Severity::Info,
        };
        tracing::info!(
            service = %self.record.identity,
            from = %previous,
            to = %result.status,
            "service status changed"
        );
        self.sink.log(
            severity,
            "service status changed",
            json!({
                "service": self.record.identity.to_string(),
                "from": previous,
                "to": result.status,
                "error": result.error,
            }),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::TracingSink;

    fn tracker(trip_count: u32, retrigger: bool) -> ServiceHealthTracker {
        let escalation = EscalationConfig {
            trip_count,
            retrigger_on_repeat: retrigger,
        };
        ServiceHealthTracker::new("svc".into(), &escalation, Arc::new(TracingSink))
    }

    fn result(status: Status, latency_ms: f64) -> HealthCheckResult {
        let mut r = HealthCheckResult::new(ServiceIdentity::from("svc"), status);
        r.latency_ms = latency_ms;
        r
    }

    #[test]
    fn test_history_window_is_bounded() {
        let mut t = tracker(3, false);
        for i in 0..60 {
            let status = if i % 2 == 0 { Status::Healthy } else { Status::Degraded };
            t.record(result(status, 10.0));
        }
        assert_eq!(t.history.len(), HISTORY_CAPACITY);
        // 50-window over alternating results: exactly half Healthy.
        assert!((t.record_view().rolling_success_rate - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_stats_over_window() {
        let mut t = tracker(3, false);
        t.record(result(Status::Healthy, 10.0));
        t.record(result(Status::Healthy, 30.0));
        t.record(result(Status::Unhealthy, 50.0));

        let view = t.record_view();
        assert!((view.rolling_success_rate - 200.0 / 3.0).abs() < 0.001);
        assert!((view.rolling_avg_latency - 30.0).abs() < f64::EPSILON);
        assert_eq!(view.consecutive_failures, 1);
    }

    #[test]
    fn test_degraded_does_not_count_as_failure() {
        let mut t = tracker(2, false);
        assert_eq!(t.record(result(Status::Unhealthy, 5.0)), Escalation::None);
        assert_eq!(t.record(result(Status::Degraded, 5.0)), Escalation::None);
        assert_eq!(t.record_view().consecutive_failures, 0);
    }

    #[test]
    fn test_edge_triggered_escalation_fires_once() {
        let mut t = tracker(3, false);
        assert_eq!(t.record(result(Status::Unhealthy, 5.0)), Escalation::None);
        assert_eq!(t.record(result(Status::Unhealthy, 5.0)), Escalation::None);
        assert_eq!(
            t.record(result(Status::Unhealthy, 5.0)),
            Escalation::StartRecovery
        );

        // Streak continues but no new escalation, even after the
        // in-flight recovery finished.
        t.recovery_finished();
        assert_eq!(t.record(result(Status::Unhealthy, 5.0)), Escalation::None);

        // A healthy check re-arms the edge.
        t.record(result(Status::Healthy, 5.0));
        for _ in 0..2 {
            assert_eq!(t.record(result(Status::Unhealthy, 5.0)), Escalation::None);
        }
        assert_eq!(
            t.record(result(Status::Unhealthy, 5.0)),
            Escalation::StartRecovery
        );
    }

    #[test]
    fn test_retrigger_mode_fires_past_trip_point() {
        let mut t = tracker(2, true);
        t.record(result(Status::Unhealthy, 5.0));
        assert_eq!(
            t.record(result(Status::Unhealthy, 5.0)),
            Escalation::StartRecovery
        );

        t.recovery_finished();
        assert_eq!(
            t.record(result(Status::Unhealthy, 5.0)),
            Escalation::StartRecovery
        );
    }

    #[test]
    fn test_in_flight_recovery_suppresses_escalation() {
        let mut t = tracker(1, true);
        assert_eq!(
            t.record(result(Status::Unhealthy, 5.0)),
            Escalation::StartRecovery
        );
        assert!(t.recovery_in_flight());

        // Still failing, still in flight: suppressed.
        assert_eq!(t.record(result(Status::Unhealthy, 5.0)), Escalation::None);
    }
}
