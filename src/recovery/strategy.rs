//! Recovery strategies and the catalog that selects them.

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::{RecoveryConfig, StrategyConfig};
use crate::probe::types::ServiceIdentity;

/// One remediation step inside a strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecoveryAction {
    /// Back off and let the next verification re-probe.
    WaitAndRetry,
    /// Flush caches via the service's registered hooks.
    ClearCache,
    /// Rebuild connections via the service's registered hooks.
    Reconnect,
    /// Nudge the service's circuit breaker into Half-Open so the next
    /// call probes immediately.
    HalfOpenBreaker,
    /// Flip the service into degraded fallback mode.
    FallbackMode,
}

impl std::fmt::Display for RecoveryAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RecoveryAction::WaitAndRetry => "wait_and_retry",
            RecoveryAction::ClearCache => "clear_cache",
            RecoveryAction::Reconnect => "reconnect",
            RecoveryAction::HalfOpenBreaker => "half_open_breaker",
            RecoveryAction::FallbackMode => "fallback_mode",
        };
        f.write_str(s)
    }
}

/// Recovery failure.
#[derive(Debug, Clone, Error)]
pub enum RecoveryError {
    /// A single action failed. Absorbed by the executor; the attempt
    /// continues with the next action.
    #[error("recovery action {action} failed for '{service}': {reason}")]
    ActionFailed {
        service: ServiceIdentity,
        action: RecoveryAction,
        reason: String,
    },

    /// Every attempt of a strategy ran without the service recovering.
    #[error("strategy '{strategy}' exhausted after {attempts} attempts for '{service}'")]
    StrategyExhausted {
        service: ServiceIdentity,
        strategy: String,
        attempts: u32,
    },
}

/// An ordered remediation plan.
#[derive(Debug, Clone)]
pub struct RecoveryStrategy {
    pub name: String,
    pub actions: Vec<RecoveryAction>,
    pub max_attempts: u32,
    /// Pause after each action.
    pub delay: Duration,
    pub fallback_strategy: Option<String>,
}

impl RecoveryStrategy {
    fn from_config(name: &str, config: &StrategyConfig) -> Self {
        Self {
            name: name.to_string(),
            actions: config.actions.clone(),
            max_attempts: config.max_attempts,
            delay: Duration::from_secs_f64(config.delay_secs),
            fallback_strategy: config.fallback_strategy.clone(),
        }
    }
}

/// All configured strategies plus the default selection rule.
#[derive(Debug, Clone)]
pub struct StrategyCatalog {
    strategies: HashMap<String, RecoveryStrategy>,
    default: String,
}

impl StrategyCatalog {
    pub fn from_config(config: &RecoveryConfig) -> Self {
        let strategies = config
            .strategies
            .iter()
            .map(|(name, sc)| (name.clone(), RecoveryStrategy::from_config(name, sc)))
            .collect();
        Self {
            strategies,
            default: config.default_strategy.clone(),
        }
    }

    /// Strategy for a service: exact name match, else the default.
    pub fn for_service(&self, service: &ServiceIdentity) -> Option<&RecoveryStrategy> {
        self.strategies
            .get(service.as_str())
            .or_else(|| self.strategies.get(&self.default))
    }

    pub fn by_name(&self, name: &str) -> Option<&RecoveryStrategy> {
        self.strategies.get(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_match_beats_default() {
        let catalog = StrategyCatalog::from_config(&RecoveryConfig::default());
        let strategy = catalog
            .for_service(&ServiceIdentity::from("database"))
            .expect("strategy");
        assert_eq!(strategy.name, "database");
        assert_eq!(strategy.max_attempts, 5);
    }

    #[test]
    fn test_unknown_service_gets_default() {
        let catalog = StrategyCatalog::from_config(&RecoveryConfig::default());
        let strategy = catalog
            .for_service(&ServiceIdentity::from("payments"))
            .expect("strategy");
        assert_eq!(strategy.name, "api_service");
    }

    #[test]
    fn test_delay_is_fractional_seconds() {
        let catalog = StrategyCatalog::from_config(&RecoveryConfig::default());
        let strategy = catalog.by_name("cached_data").expect("strategy");
        assert_eq!(strategy.delay, Duration::from_millis(500));
    }
}
