//! Engine core and public facade.
//!
//! # Responsibilities
//! - Own the service registry: probe, tracker, breaker, hooks per service
//! - Route ad hoc checks and request-path calls through the breaker
//! - Turn tracker escalations into background recovery tasks
//! - Export point-in-time status snapshots
//!
//! # Data Flow
//! ```text
//! check_now / protect → circuit breaker → probe or wrapped call
//!     → tracker.record → Escalation::StartRecovery?
//!         → spawned recovery task (executor + RecoveryContext impl)
//!
//! monitor tick → run_probe for every registered service (breaker bypassed)
//!     → tracker.record → same escalation path
//! ```
//!
//! # Design Decisions
//! - Scheduled ticks never count toward the breaker; only calls a
//!   caller routed through it do
//! - One recovery task per service at a time, enforced by the tracker's
//!   in-flight flag and released by a drop guard
//! - Probe failures become Unhealthy results; `check_now` only errors
//!   for unknown services or an open breaker

pub mod registry;
pub mod snapshot;

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::json;
use thiserror::Error;
use tokio::task::JoinHandle;

use crate::config::EngineConfig;
use crate::engine::registry::{CheckFailed, ServiceEntry};
use crate::engine::snapshot::{BreakerSnapshot, EngineSnapshot, ServiceSnapshot};
use crate::health::{Escalation, ServiceHealthTracker};
use crate::lifecycle::Shutdown;
use crate::monitor::Monitor;
use crate::observability::metrics;
use crate::probe::types::{HealthCheckResult, ProbeError, ServiceIdentity, Status};
use crate::probe::HealthProbe;
use crate::recovery::executor::{WAIT_BASE, WAIT_MAX};
use crate::recovery::{
    RecoveryAction, RecoveryContext, RecoveryError, RecoveryExecutor, RecoveryHooks,
    StrategyCatalog,
};
use crate::resilience::backoff::backoff_delay;
use crate::resilience::{BreakerError, CircuitBreaker};
use crate::sink::{Severity, Sink, TracingSink};

/// Errors from ad hoc checks.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("unknown service '{0}'")]
    UnknownService(ServiceIdentity),

    #[error("circuit breaker '{name}' is open, retry in {retry_in:?}")]
    BreakerOpen { name: String, retry_in: Duration },
}

/// Errors from request-path calls wrapped by [`ResilienceEngine::protect`].
#[derive(Debug, Error)]
pub enum ProtectError<E> {
    #[error("unknown service '{0}'")]
    UnknownService(ServiceIdentity),

    /// Fast reject; the wrapped call was not invoked.
    #[error("circuit breaker '{name}' is open, retry in {retry_in:?}")]
    Open { name: String, retry_in: Duration },

    /// The wrapped call's own error, after breaker bookkeeping.
    #[error("{0}")]
    Inner(E),
}

/// Shared state behind the facade; recovery tasks and the monitor hold
/// their own `Arc` of it.
pub(crate) struct EngineCore {
    pub(crate) config: EngineConfig,
    pub(crate) services: DashMap<ServiceIdentity, Arc<ServiceEntry>>,
    executor: RecoveryExecutor,
    sink: Arc<dyn Sink>,
    pub(crate) monitoring_active: AtomicBool,
}

impl EngineCore {
    fn new(config: EngineConfig, sink: Arc<dyn Sink>) -> Self {
        let catalog = StrategyCatalog::from_config(&config.recovery);
        let executor = RecoveryExecutor::new(catalog, Arc::clone(&sink));
        Self {
            config,
            services: DashMap::new(),
            executor,
            sink,
            monitoring_active: AtomicBool::new(false),
        }
    }

    fn register(
        &self,
        identity: ServiceIdentity,
        probe: Arc<dyn HealthProbe>,
        hooks: Option<Arc<dyn RecoveryHooks>>,
    ) {
        let breaker_config = self
            .config
            .breakers
            .get(identity.as_str())
            .unwrap_or(&self.config.breaker);
        let breaker = CircuitBreaker::new(
            identity.as_str(),
            breaker_config.failure_threshold,
            Duration::from_secs(breaker_config.recovery_timeout_secs),
        );
        let tracker = ServiceHealthTracker::new(
            identity.clone(),
            &self.config.escalation,
            Arc::clone(&self.sink),
        );

        tracing::info!(
            service = %identity,
            failure_threshold = breaker_config.failure_threshold,
            recovery_timeout_secs = breaker_config.recovery_timeout_secs,
            hooks = hooks.is_some(),
            "service registered"
        );
        self.services.insert(
            identity.clone(),
            Arc::new(ServiceEntry {
                identity,
                probe,
                tracker: std::sync::Mutex::new(tracker),
                breaker: Arc::new(breaker),
                hooks,
                fallback_mode: AtomicBool::new(false),
            }),
        );
    }

    fn entry(&self, identity: &ServiceIdentity) -> Option<Arc<ServiceEntry>> {
        self.services.get(identity).map(|e| Arc::clone(e.value()))
    }

    /// Invoke the probe under the configured deadline, coercing every
    /// failure mode to an Unhealthy result with engine-measured
    /// latency. The probe runs on its own task, so a panicking probe
    /// becomes an Unhealthy result instead of unwinding into the
    /// monitor loop or a `check_now` caller.
    async fn run_probe(&self, entry: &ServiceEntry) -> HealthCheckResult {
        let deadline = Duration::from_secs(self.config.monitoring.probe_timeout_secs);
        let started = Instant::now();
        let probe = Arc::clone(&entry.probe);
        let mut task = tokio::spawn(async move { probe.check().await });
        let outcome = tokio::time::timeout(deadline, &mut task).await;
        let latency_ms = started.elapsed().as_secs_f64() * 1000.0;

        let mut result = match outcome {
            Ok(Ok(Ok(result))) => result,
            Ok(Ok(Err(ProbeError::Timeout(after)))) => {
                HealthCheckResult::timeout(entry.identity.clone(), after)
            }
            Ok(Ok(Err(ProbeError::Failed(message)))) => {
                HealthCheckResult::failure(entry.identity.clone(), message)
            }
            Ok(Err(join_error)) => {
                tracing::error!(
                    service = %entry.identity,
                    error = %join_error,
                    "probe task aborted"
                );
                HealthCheckResult::failure(
                    entry.identity.clone(),
                    format!("probe panicked: {join_error}"),
                )
            }
            Err(_) => {
                task.abort();
                HealthCheckResult::timeout(entry.identity.clone(), deadline)
            }
        };
        result.service = entry.identity.clone();
        result.latency_ms = latency_ms;
        result
    }

    /// Fold a result into the tracker. The caller dispatches recovery
    /// if escalation fires.
    fn apply_result(&self, entry: &ServiceEntry, result: HealthCheckResult) -> Escalation {
        metrics::record_probe(entry.identity.as_str(), result.status, result.latency_ms);
        entry.lock_tracker().record(result)
    }

    /// Probe once through the breaker. Unhealthy results count as
    /// breaker failures but still reach the caller as `Ok`.
    async fn guarded_check(
        core: &Arc<EngineCore>,
        entry: &Arc<ServiceEntry>,
    ) -> Result<HealthCheckResult, EngineError> {
        let outcome = entry
            .breaker
            .call(async {
                let result = core.run_probe(entry).await;
                if result.status.is_failure() {
                    Err(CheckFailed(result))
                } else {
                    Ok(result)
                }
            })
            .await;

        let result = match outcome {
            Ok(result) => result,
            Err(BreakerError::Inner(CheckFailed(result))) => result,
            Err(BreakerError::Open { name, retry_in }) => {
                return Err(EngineError::BreakerOpen { name, retry_in })
            }
        };

        if core.apply_result(entry, result.clone()) == Escalation::StartRecovery {
            EngineCore::dispatch_recovery(Arc::clone(core), Arc::clone(entry));
        }
        Ok(result)
    }

    /// One monitoring sweep: probe every registered service
    /// concurrently, then fold the joined results in. The breaker is
    /// not consulted; an open breaker guards callers, not observation,
    /// so the tracker and snapshot keep moving while it cools.
    pub(crate) async fn check_all(core: &Arc<EngineCore>) {
        let entries: Vec<Arc<ServiceEntry>> = core
            .services
            .iter()
            .map(|e| Arc::clone(e.value()))
            .collect();
        if entries.is_empty() {
            return;
        }

        let probes = entries.iter().map(|entry| core.run_probe(entry));
        let results = futures_util::future::join_all(probes).await;

        for (entry, result) in entries.iter().zip(results) {
            if core.apply_result(entry, result) == Escalation::StartRecovery {
                EngineCore::dispatch_recovery(Arc::clone(core), Arc::clone(entry));
            }
        }
    }

    /// Spawn the recovery task for a service whose tracker escalated.
    /// The in-flight flag was already set by the tracker; the guard
    /// clears it however the task ends.
    fn dispatch_recovery(core: Arc<EngineCore>, entry: Arc<ServiceEntry>) {
        tokio::spawn(async move {
            let _guard = InFlightGuard {
                entry: Arc::clone(&entry),
            };
            let report = core.executor.run(&core, &entry.identity).await;
            tracing::info!(
                service = %entry.identity,
                strategy = %report.strategy,
                recovered = report.recovered,
                attempts_used = report.attempts_used,
                "recovery task finished"
            );
        });
    }

    pub(crate) fn snapshot(&self) -> EngineSnapshot {
        let mut services = BTreeMap::new();
        let mut breakers = BTreeMap::new();

        for item in self.services.iter() {
            let entry = item.value();
            let view = entry.lock_tracker().record_view();
            services.insert(
                entry.identity.to_string(),
                ServiceSnapshot {
                    status: view.current_status,
                    last_check: view.last_check_time,
                    consecutive_failures: view.consecutive_failures,
                    success_rate: view.rolling_success_rate,
                    avg_latency_ms: view.rolling_avg_latency,
                },
            );
            breakers.insert(
                entry.identity.to_string(),
                BreakerSnapshot {
                    state: entry.breaker.current_state(),
                    failure_count: entry.breaker.failure_count(),
                    last_failure_time: entry.breaker.last_failure_time(),
                },
            );
        }

        EngineSnapshot::new(services, breakers, self.monitoring_active.load(Ordering::SeqCst))
    }
}

/// Clears the per-service in-flight flag when a recovery task ends,
/// panicking included.
struct InFlightGuard {
    entry: Arc<ServiceEntry>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.entry.lock_tracker().recovery_finished();
    }
}

#[async_trait]
impl RecoveryContext for Arc<EngineCore> {
    async fn run_action(
        &self,
        service: &ServiceIdentity,
        action: RecoveryAction,
        attempt: u32,
    ) -> Result<(), RecoveryError> {
        let Some(entry) = self.entry(service) else {
            return Err(RecoveryError::ActionFailed {
                service: service.clone(),
                action,
                reason: "service not registered".to_string(),
            });
        };

        match action {
            RecoveryAction::WaitAndRetry => {
                tokio::time::sleep(backoff_delay(attempt, WAIT_BASE, WAIT_MAX)).await;
                Ok(())
            }
            RecoveryAction::ClearCache => match &entry.hooks {
                Some(hooks) => hooks.clear_cache().await.map_err(|reason| {
                    RecoveryError::ActionFailed {
                        service: service.clone(),
                        action,
                        reason,
                    }
                }),
                None => {
                    self.sink.log(
                        Severity::Debug,
                        "no hooks registered, skipping clear_cache",
                        json!({ "service": service.to_string() }),
                    );
                    Ok(())
                }
            },
            RecoveryAction::Reconnect => match &entry.hooks {
                Some(hooks) => hooks.reconnect().await.map_err(|reason| {
                    RecoveryError::ActionFailed {
                        service: service.clone(),
                        action,
                        reason,
                    }
                }),
                None => {
                    self.sink.log(
                        Severity::Debug,
                        "no hooks registered, skipping reconnect",
                        json!({ "service": service.to_string() }),
                    );
                    Ok(())
                }
            },
            RecoveryAction::HalfOpenBreaker => {
                entry.breaker.force_half_open();
                Ok(())
            }
            RecoveryAction::FallbackMode => {
                entry.fallback_mode.store(true, Ordering::SeqCst);
                self.sink.log(
                    Severity::Warning,
                    "service switched to fallback mode",
                    json!({ "service": service.to_string() }),
                );
                Ok(())
            }
        }
    }

    async fn verify_recovered(&self, service: &ServiceIdentity) -> bool {
        let Some(entry) = self.entry(service) else {
            return false;
        };
        match EngineCore::guarded_check(self, &entry).await {
            Ok(result) if matches!(result.status, Status::Healthy | Status::Degraded) => {
                entry.fallback_mode.store(false, Ordering::SeqCst);
                true
            }
            _ => false,
        }
    }
}

/// Public facade: registration, checks, protected calls, lifecycle.
pub struct ResilienceEngine {
    core: Arc<EngineCore>,
    shutdown: Shutdown,
    monitor_task: tokio::sync::Mutex<Option<JoinHandle<()>>>,
}

impl ResilienceEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self::with_sink(config, Arc::new(TracingSink))
    }

    pub fn with_sink(config: EngineConfig, sink: Arc<dyn Sink>) -> Self {
        Self {
            core: Arc::new(EngineCore::new(config, sink)),
            shutdown: Shutdown::new(),
            monitor_task: tokio::sync::Mutex::new(None),
        }
    }

    /// Register a service with its probe. Re-registering a name
    /// replaces the previous entry, tracker state included.
    pub fn register(&self, service: impl Into<ServiceIdentity>, probe: Arc<dyn HealthProbe>) {
        self.core.register(service.into(), probe, None);
    }

    /// Register a service together with remediation hooks for the
    /// clear-cache and reconnect recovery actions.
    pub fn register_with_hooks(
        &self,
        service: impl Into<ServiceIdentity>,
        probe: Arc<dyn HealthProbe>,
        hooks: Arc<dyn RecoveryHooks>,
    ) {
        self.core.register(service.into(), probe, Some(hooks));
    }

    /// Probe a service immediately, through its circuit breaker.
    ///
    /// An Unhealthy observation is an `Ok` result (and a counted
    /// breaker failure); errors mean the check could not run at all.
    pub async fn check_now(
        &self,
        service: impl Into<ServiceIdentity>,
    ) -> Result<HealthCheckResult, EngineError> {
        let identity = service.into();
        let Some(entry) = self.core.entry(&identity) else {
            return Err(EngineError::UnknownService(identity));
        };
        EngineCore::guarded_check(&self.core, &entry).await
    }

    /// Run a request-path call through the service's circuit breaker.
    /// Every error of the wrapped call counts toward the breaker.
    pub async fn protect<T, E, Fut>(
        &self,
        service: impl Into<ServiceIdentity>,
        op: Fut,
    ) -> Result<T, ProtectError<E>>
    where
        Fut: Future<Output = Result<T, E>>,
    {
        let identity = service.into();
        let Some(entry) = self.core.entry(&identity) else {
            return Err(ProtectError::UnknownService(identity));
        };
        match entry.breaker.call(op).await {
            Ok(value) => Ok(value),
            Err(BreakerError::Open { name, retry_in }) => {
                Err(ProtectError::Open { name, retry_in })
            }
            Err(BreakerError::Inner(e)) => Err(ProtectError::Inner(e)),
        }
    }

    /// Whether the fallback-mode recovery action left the service in
    /// degraded fallback operation.
    pub fn fallback_active(&self, service: impl Into<ServiceIdentity>) -> bool {
        self.core
            .entry(&service.into())
            .map(|entry| entry.fallback_mode.load(Ordering::SeqCst))
            .unwrap_or(false)
    }

    pub fn snapshot(&self) -> EngineSnapshot {
        self.core.snapshot()
    }

    /// Start the background monitoring loop. No-op when already
    /// running or disabled by configuration.
    pub async fn start(&self) {
        if !self.core.config.monitoring.enabled {
            tracing::info!("background monitoring disabled by configuration");
            return;
        }
        let mut task = self.monitor_task.lock().await;
        if task.is_some() {
            return;
        }
        self.core.monitoring_active.store(true, Ordering::SeqCst);
        let monitor = Monitor::new(Arc::clone(&self.core));
        let receiver = self.shutdown.subscribe();
        *task = Some(tokio::spawn(monitor.run(receiver)));
    }

    /// Stop the background monitoring loop and wait for it to exit.
    /// No-op when not running.
    pub async fn stop(&self) {
        let handle = self.monitor_task.lock().await.take();
        if let Some(handle) = handle {
            self.core.monitoring_active.store(false, Ordering::SeqCst);
            self.shutdown.trigger();
            let _ = handle.await;
            tracing::info!("background monitoring stopped");
        }
    }
}

impl std::fmt::Debug for ResilienceEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResilienceEngine")
            .field("services", &self.core.services.len())
            .finish()
    }
}
