//! Engine configuration.
//!
//! # Data Flow
//! ```text
//! engine.toml → loader.rs (read + parse)
//!     → validation.rs (collect every violation, not just the first)
//!     → schema.rs types, defaults filled in by serde
//! ```

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{
    BreakerConfig, EngineConfig, EscalationConfig, ExportConfig, MonitoringConfig,
    ObservabilityConfig, ProbeConfig, RecoveryConfig, ServiceConfig, StrategyConfig,
};
pub use validation::ValidationError;
