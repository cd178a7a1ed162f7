//! Configuration validation.
//!
//! Collects every violation in one pass so operators fix the file
//! once instead of replaying load-fail-edit loops.

use std::collections::HashSet;

use crate::config::schema::{EngineConfig, ProbeConfig};

/// One configuration violation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    ZeroInterval,
    ZeroProbeTimeout,
    ZeroTripCount,
    ZeroFailureThreshold { breaker: String },
    EmptyActions { strategy: String },
    ZeroMaxAttempts { strategy: String },
    UnknownFallback { strategy: String, fallback: String },
    ChainedFallback { strategy: String, fallback: String },
    UnknownDefaultStrategy { name: String },
    InvalidProbeUrl { service: String, url: String },
    InvalidProbeAddr { service: String, addr: String },
    DuplicateService { name: String },
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::ZeroInterval => {
                write!(f, "monitoring.interval_secs must be greater than zero")
            }
            ValidationError::ZeroProbeTimeout => {
                write!(f, "monitoring.probe_timeout_secs must be greater than zero")
            }
            ValidationError::ZeroTripCount => {
                write!(f, "escalation.trip_count must be greater than zero")
            }
            ValidationError::ZeroFailureThreshold { breaker } => {
                write!(f, "breaker '{breaker}': failure_threshold must be greater than zero")
            }
            ValidationError::EmptyActions { strategy } => {
                write!(f, "strategy '{strategy}' has no actions")
            }
            ValidationError::ZeroMaxAttempts { strategy } => {
                write!(f, "strategy '{strategy}': max_attempts must be at least 1")
            }
            ValidationError::UnknownFallback { strategy, fallback } => {
                write!(f, "strategy '{strategy}' falls back to unknown strategy '{fallback}'")
            }
            ValidationError::ChainedFallback { strategy, fallback } => {
                write!(
                    f,
                    "strategy '{strategy}' falls back to '{fallback}', which has its own \
                     fallback; fallbacks must not chain"
                )
            }
            ValidationError::UnknownDefaultStrategy { name } => {
                write!(f, "recovery.default_strategy '{name}' is not defined")
            }
            ValidationError::InvalidProbeUrl { service, url } => {
                write!(f, "service '{service}': invalid probe url '{url}'")
            }
            ValidationError::InvalidProbeAddr { service, addr } => {
                write!(f, "service '{service}': invalid probe address '{addr}'")
            }
            ValidationError::DuplicateService { name } => {
                write!(f, "service '{name}' is configured more than once")
            }
        }
    }
}

/// Check the whole configuration, returning every violation found.
pub fn validate(config: &EngineConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if config.monitoring.interval_secs == 0 {
        errors.push(ValidationError::ZeroInterval);
    }
    if config.monitoring.probe_timeout_secs == 0 {
        errors.push(ValidationError::ZeroProbeTimeout);
    }
    if config.escalation.trip_count == 0 {
        errors.push(ValidationError::ZeroTripCount);
    }

    if config.breaker.failure_threshold == 0 {
        errors.push(ValidationError::ZeroFailureThreshold {
            breaker: "default".to_string(),
        });
    }
    for (name, breaker) in &config.breakers {
        if breaker.failure_threshold == 0 {
            errors.push(ValidationError::ZeroFailureThreshold {
                breaker: name.clone(),
            });
        }
    }

    for (name, strategy) in &config.recovery.strategies {
        if strategy.actions.is_empty() {
            errors.push(ValidationError::EmptyActions {
                strategy: name.clone(),
            });
        }
        if strategy.max_attempts == 0 {
            errors.push(ValidationError::ZeroMaxAttempts {
                strategy: name.clone(),
            });
        }
        if let Some(fallback) = &strategy.fallback_strategy {
            match config.recovery.strategies.get(fallback) {
                None => errors.push(ValidationError::UnknownFallback {
                    strategy: name.clone(),
                    fallback: fallback.clone(),
                }),
                Some(target) if target.fallback_strategy.is_some() => {
                    errors.push(ValidationError::ChainedFallback {
                        strategy: name.clone(),
                        fallback: fallback.clone(),
                    })
                }
                Some(_) => {}
            }
        }
    }

    if !config
        .recovery
        .strategies
        .contains_key(&config.recovery.default_strategy)
    {
        errors.push(ValidationError::UnknownDefaultStrategy {
            name: config.recovery.default_strategy.clone(),
        });
    }

    let mut seen = HashSet::new();
    for service in &config.services {
        if !seen.insert(service.name.as_str()) {
            errors.push(ValidationError::DuplicateService {
                name: service.name.clone(),
            });
        }
        match &service.probe {
            ProbeConfig::Http { url } => {
                if url::Url::parse(url).is_err() {
                    errors.push(ValidationError::InvalidProbeUrl {
                        service: service.name.clone(),
                        url: url.clone(),
                    });
                }
            }
            ProbeConfig::Tcp { addr } => {
                if addr.parse::<std::net::SocketAddr>().is_err() {
                    errors.push(ValidationError::InvalidProbeAddr {
                        service: service.name.clone(),
                        addr: addr.clone(),
                    });
                }
            }
        }
    }

    errors
}
