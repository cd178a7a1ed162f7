//! Self-healing resilience layer: health monitoring, circuit breaking
//! and automated recovery for external dependencies.
//!
//! # Architecture
//! ```text
//!                  ┌──────────────────┐
//!                  │ ResilienceEngine │  facade: register / check_now /
//!                  └────────┬─────────┘  protect / snapshot / start / stop
//!                           │
//!          ┌────────────────┼────────────────────┐
//!          ▼                ▼                    ▼
//!   ┌────────────┐   ┌─────────────┐      ┌────────────┐
//!   │  monitor   │   │ resilience  │      │   export   │
//!   │ (interval  │   │ (circuit    │      │ (HTTP read │
//!   │  sweeps)   │   │  breakers)  │      │  endpoints)│
//!   └─────┬──────┘   └──────┬──────┘      └────────────┘
//!         ▼                 ▼
//!   ┌────────────┐   ┌─────────────┐      ┌────────────┐
//!   │   probe    │──▶│   health    │─────▶│  recovery  │
//!   │ (HTTP/TCP/ │   │ (rolling    │ trip │ (strategy  │
//!   │  custom)   │   │  trackers)  │      │  executor) │
//!   └────────────┘   └─────────────┘      └────────────┘
//! ```
//!
//! Probes observe, trackers accumulate and escalate, the executor
//! remediates, breakers keep callers off dead dependencies while all
//! of that happens.

pub mod config;
pub mod engine;
pub mod export;
pub mod health;
pub mod lifecycle;
pub mod monitor;
pub mod observability;
pub mod probe;
pub mod recovery;
pub mod resilience;
pub mod sink;

pub use config::{ConfigError, EngineConfig};
pub use engine::snapshot::{BreakerSnapshot, EngineSnapshot, ServiceSnapshot};
pub use engine::{EngineError, ProtectError, ResilienceEngine};
pub use health::{ServiceHealthRecord, HISTORY_CAPACITY};
pub use probe::{HealthCheckResult, HealthProbe, ProbeError, ServiceIdentity, Status};
pub use recovery::{RecoveryAction, RecoveryHooks, RecoveryReport};
pub use resilience::{BreakerError, CircuitBreaker, CircuitState};
pub use sink::{Severity, Sink, TracingSink};
