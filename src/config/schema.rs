//! Configuration schema.
//!
//! Every section has serde defaults so a partial (or absent) file
//! yields a fully usable configuration. The built-in recovery catalog
//! mirrors the strategies operators reach for most: retry with
//! backoff, cache flush, reconnect, breaker nudge, fallback mode.

use std::collections::HashMap;

use serde::Deserialize;

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    pub monitoring: MonitoringConfig,
    pub escalation: EscalationConfig,
    pub breaker: BreakerConfig,
    /// Per-service breaker overrides, keyed by service name.
    pub breakers: HashMap<String, BreakerConfig>,
    pub recovery: RecoveryConfig,
    pub services: Vec<ServiceConfig>,
    pub observability: ObservabilityConfig,
    pub export: ExportConfig,
}

/// Background monitoring loop.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MonitoringConfig {
    /// Whether the background loop runs at all. `check_now` and
    /// `protect` work either way.
    pub enabled: bool,
    pub interval_secs: u64,
    /// Deadline for a single probe invocation.
    pub probe_timeout_secs: u64,
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: 30,
            probe_timeout_secs: 10,
        }
    }
}

/// When a failure streak turns into a recovery.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EscalationConfig {
    /// Consecutive unhealthy checks before recovery starts.
    pub trip_count: u32,
    /// Re-escalate on every failing check past the trip point instead
    /// of once per streak.
    pub retrigger_on_repeat: bool,
}

impl Default for EscalationConfig {
    fn default() -> Self {
        Self {
            trip_count: 3,
            retrigger_on_repeat: false,
        }
    }
}

/// Circuit breaker tuning.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BreakerConfig {
    pub failure_threshold: u32,
    pub recovery_timeout_secs: u64,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            recovery_timeout_secs: 60,
        }
    }
}

/// Recovery strategy catalog.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RecoveryConfig {
    /// Strategy used for services without an exact-name match.
    pub default_strategy: String,
    pub strategies: HashMap<String, StrategyConfig>,
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self {
            default_strategy: "api_service".to_string(),
            strategies: default_strategies(),
        }
    }
}

/// One named recovery strategy.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StrategyConfig {
    pub actions: Vec<crate::recovery::RecoveryAction>,
    pub max_attempts: u32,
    /// Pause after each action, in seconds (fractional allowed).
    pub delay_secs: f64,
    /// Strategy to run once if this one exhausts its attempts. One hop
    /// only; the fallback's own fallback is never followed.
    #[serde(default)]
    pub fallback_strategy: Option<String>,
}

fn default_strategies() -> HashMap<String, StrategyConfig> {
    use crate::recovery::RecoveryAction::*;

    let mut strategies = HashMap::new();
    strategies.insert(
        "api_service".to_string(),
        StrategyConfig {
            actions: vec![WaitAndRetry, ClearCache, Reconnect, FallbackMode],
            max_attempts: 3,
            delay_secs: 5.0,
            fallback_strategy: Some("fallback_api".to_string()),
        },
    );
    strategies.insert(
        "database".to_string(),
        StrategyConfig {
            actions: vec![WaitAndRetry, Reconnect, HalfOpenBreaker],
            max_attempts: 5,
            delay_secs: 10.0,
            fallback_strategy: Some("read_only_mode".to_string()),
        },
    );
    strategies.insert(
        "websocket".to_string(),
        StrategyConfig {
            actions: vec![Reconnect, WaitAndRetry],
            max_attempts: 3,
            delay_secs: 3.0,
            fallback_strategy: None,
        },
    );
    strategies.insert(
        "external_api".to_string(),
        StrategyConfig {
            actions: vec![WaitAndRetry, HalfOpenBreaker, FallbackMode],
            max_attempts: 3,
            delay_secs: 15.0,
            fallback_strategy: Some("cached_data".to_string()),
        },
    );
    for degraded in ["cached_data", "read_only_mode", "fallback_api"] {
        strategies.insert(
            degraded.to_string(),
            StrategyConfig {
                actions: vec![FallbackMode],
                max_attempts: 1,
                delay_secs: 0.5,
                fallback_strategy: None,
            },
        );
    }
    strategies
}

/// A service to monitor, with its probe.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceConfig {
    pub name: String,
    pub probe: ProbeConfig,
}

/// Probe wiring for a configured service.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ProbeConfig {
    /// GET a health URL; 2xx is healthy.
    Http { url: String },
    /// TCP connect liveness check.
    Tcp { addr: String },
}

/// Logging and metrics.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ObservabilityConfig {
    pub log_level: String,
    pub metrics_enabled: bool,
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9091".to_string(),
        }
    }
}

/// Read-only HTTP status endpoints.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExportConfig {
    pub enabled: bool,
    pub bind_address: String,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            bind_address: "127.0.0.1:8081".to_string(),
        }
    }
}
