//! Recovery execution.
//!
//! # Responsibilities
//! - Run a service's strategy attempt by attempt
//! - Verify recovery once per attempt, after every action ran
//! - On exhaustion, run the configured fallback strategy exactly once
//!
//! # Design Decisions
//! - The executor owns sequencing and reporting; the effects of each
//!   action live behind [`RecoveryContext`], implemented by the engine
//! - Every execution gets a correlation id so interleaved recoveries
//!   stay separable in the logs

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use uuid::Uuid;

use crate::observability::metrics;
use crate::probe::types::ServiceIdentity;
use crate::recovery::strategy::{RecoveryAction, RecoveryError, RecoveryStrategy, StrategyCatalog};
use crate::sink::{Severity, Sink};

/// Base and cap for the wait-and-retry backoff.
pub const WAIT_BASE: Duration = Duration::from_millis(500);
pub const WAIT_MAX: Duration = Duration::from_secs(30);

/// Engine-side effects of recovery actions, plus verification.
#[async_trait]
pub trait RecoveryContext: Send + Sync {
    /// Apply one action. `attempt` is 1-based, for backoff scaling.
    async fn run_action(
        &self,
        service: &ServiceIdentity,
        action: RecoveryAction,
        attempt: u32,
    ) -> Result<(), RecoveryError>;

    /// Whether the service is back. Called once per attempt.
    async fn verify_recovered(&self, service: &ServiceIdentity) -> bool;
}

/// Service-specific remediation effects, registered alongside a probe.
/// Defaults are no-ops so callers implement only what their service
/// supports.
#[async_trait]
pub trait RecoveryHooks: Send + Sync {
    async fn clear_cache(&self) -> Result<(), String> {
        Ok(())
    }

    async fn reconnect(&self) -> Result<(), String> {
        Ok(())
    }
}

/// Outcome of one recovery execution.
#[derive(Debug, Clone)]
pub struct RecoveryReport {
    pub service: ServiceIdentity,
    pub strategy: String,
    pub recovered: bool,
    pub attempts_used: u32,
    /// Report of the fallback strategy, if one ran.
    pub fallback: Option<Box<RecoveryReport>>,
}

/// Runs recovery strategies against a [`RecoveryContext`].
pub struct RecoveryExecutor {
    catalog: StrategyCatalog,
    sink: Arc<dyn Sink>,
}

impl RecoveryExecutor {
    pub fn new(catalog: StrategyCatalog, sink: Arc<dyn Sink>) -> Self {
        Self { catalog, sink }
    }

    /// Run the service's strategy; on exhaustion, run its fallback
    /// once. The fallback's own fallback is never followed.
    pub async fn run(&self, ctx: &dyn RecoveryContext, service: &ServiceIdentity) -> RecoveryReport {
        let execution_id = Uuid::new_v4();

        let Some(strategy) = self.catalog.for_service(service) else {
            tracing::error!(service = %service, "no recovery strategy available");
            return RecoveryReport {
                service: service.clone(),
                strategy: String::new(),
                recovered: false,
                attempts_used: 0,
                fallback: None,
            };
        };

        tracing::info!(
            service = %service,
            strategy = %strategy.name,
            execution_id = %execution_id,
            "recovery started"
        );

        let mut report = self.run_strategy(ctx, service, strategy, execution_id).await;

        if !report.recovered {
            if let Some(fallback) = strategy
                .fallback_strategy
                .as_deref()
                .and_then(|name| self.catalog.by_name(name))
            {
                tracing::warn!(
                    service = %service,
                    exhausted = %strategy.name,
                    fallback = %fallback.name,
                    execution_id = %execution_id,
                    "strategy exhausted, running fallback"
                );
                let fallback_report =
                    self.run_strategy(ctx, service, fallback, execution_id).await;
                report.recovered = fallback_report.recovered;
                report.fallback = Some(Box::new(fallback_report));
            }
        }

        metrics::record_recovery(service.as_str(), report.recovered);
        self.sink.log(
            if report.recovered { Severity::Info } else { Severity::Error },
            if report.recovered { "recovery succeeded" } else { "recovery failed" },
            json!({
                "service": service.to_string(),
                "strategy": report.strategy,
                "attempts_used": report.attempts_used,
                "fallback_ran": report.fallback.is_some(),
                "execution_id": execution_id.to_string(),
            }),
        );

        report
    }

    async fn run_strategy(
        &self,
        ctx: &dyn RecoveryContext,
        service: &ServiceIdentity,
        strategy: &RecoveryStrategy,
        execution_id: Uuid,
    ) -> RecoveryReport {
        for attempt in 1..=strategy.max_attempts {
            tracing::debug!(
                service = %service,
                strategy = %strategy.name,
                attempt,
                max_attempts = strategy.max_attempts,
                execution_id = %execution_id,
                "recovery attempt"
            );

            for &action in &strategy.actions {
                if let Err(e) = ctx.run_action(service, action, attempt).await {
                    // Absorbed: the rest of the attempt still runs.
                    self.sink.report_failure(
                        &e,
                        json!({
                            "service": service.to_string(),
                            "strategy": strategy.name,
                            "action": action.to_string(),
                            "attempt": attempt,
                            "execution_id": execution_id.to_string(),
                        }),
                    );
                }
                tokio::time::sleep(strategy.delay).await;
            }

            if ctx.verify_recovered(service).await {
                return RecoveryReport {
                    service: service.clone(),
                    strategy: strategy.name.clone(),
                    recovered: true,
                    attempts_used: attempt,
                    fallback: None,
                };
            }
        }

        let exhausted = RecoveryError::StrategyExhausted {
            service: service.clone(),
            strategy: strategy.name.clone(),
            attempts: strategy.max_attempts,
        };
        self.sink.report_failure(
            &exhausted,
            json!({
                "service": service.to_string(),
                "strategy": strategy.name,
                "execution_id": execution_id.to_string(),
            }),
        );

        RecoveryReport {
            service: service.clone(),
            strategy: strategy.name.clone(),
            recovered: false,
            attempts_used: strategy.max_attempts,
            fallback: None,
        }
    }
}
