//! Shared test doubles and config builders.
#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use resilience_engine::config::{EngineConfig, RecoveryConfig, StrategyConfig};
use resilience_engine::recovery::RecoveryAction;
use resilience_engine::{
    HealthCheckResult, HealthProbe, ProbeError, RecoveryHooks, ServiceIdentity, Status,
};

/// Probe returning statuses off a script, then a fixed default.
pub struct ScriptedProbe {
    service: ServiceIdentity,
    script: Mutex<VecDeque<Status>>,
    default: Status,
    calls: AtomicU32,
}

impl ScriptedProbe {
    pub fn new(service: &str, script: Vec<Status>, default: Status) -> Self {
        Self {
            service: ServiceIdentity::from(service),
            script: Mutex::new(script.into()),
            default,
            calls: AtomicU32::new(0),
        }
    }

    /// Probe that always reports the same status.
    pub fn fixed(service: &str, status: Status) -> Self {
        Self::new(service, Vec::new(), status)
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl HealthProbe for ScriptedProbe {
    async fn check(&self) -> Result<HealthCheckResult, ProbeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let status = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(self.default);
        Ok(HealthCheckResult::new(self.service.clone(), status))
    }
}

/// Probe that panics on every invocation.
pub struct PanickingProbe;

#[async_trait]
impl HealthProbe for PanickingProbe {
    async fn check(&self) -> Result<HealthCheckResult, ProbeError> {
        panic!("probe blew up");
    }
}

/// Probe that sleeps far past any configured deadline.
pub struct HangingProbe {
    service: ServiceIdentity,
}

impl HangingProbe {
    pub fn new(service: &str) -> Self {
        Self {
            service: ServiceIdentity::from(service),
        }
    }
}

#[async_trait]
impl HealthProbe for HangingProbe {
    async fn check(&self) -> Result<HealthCheckResult, ProbeError> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok(HealthCheckResult::new(self.service.clone(), Status::Healthy))
    }
}

/// Probe that always raises the given failure.
pub struct FailingProbe {
    message: String,
}

impl FailingProbe {
    pub fn new(message: &str) -> Self {
        Self {
            message: message.to_string(),
        }
    }
}

#[async_trait]
impl HealthProbe for FailingProbe {
    async fn check(&self) -> Result<HealthCheckResult, ProbeError> {
        Err(ProbeError::Failed(self.message.clone()))
    }
}

/// Hooks counting their invocations, with an optional artificial delay
/// to keep a recovery observably in flight.
#[derive(Default)]
pub struct CountingHooks {
    pub reconnects: AtomicU32,
    pub cache_clears: AtomicU32,
    pub delay: Duration,
}

impl CountingHooks {
    pub fn slow(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::default()
        }
    }
}

#[async_trait]
impl RecoveryHooks for CountingHooks {
    async fn clear_cache(&self) -> Result<(), String> {
        self.cache_clears.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        Ok(())
    }

    async fn reconnect(&self) -> Result<(), String> {
        self.reconnects.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        Ok(())
    }
}

/// Config tuned for tests: fast single-action recovery, everything
/// else default.
pub fn test_config() -> EngineConfig {
    let mut config = EngineConfig::default();
    config.recovery = fast_recovery(vec![RecoveryAction::Reconnect], 1);
    config
}

/// Minimal catalog with one strategy covering every service.
pub fn fast_recovery(actions: Vec<RecoveryAction>, max_attempts: u32) -> RecoveryConfig {
    let mut strategies = HashMap::new();
    strategies.insert(
        "default".to_string(),
        StrategyConfig {
            actions,
            max_attempts,
            delay_secs: 0.01,
            fallback_strategy: None,
        },
    );
    RecoveryConfig {
        default_strategy: "default".to_string(),
        strategies,
    }
}
