//! Automated recovery.
//!
//! # Data Flow
//! ```text
//! escalation from the health tracker
//!     → strategy.rs (pick the strategy for the service)
//!     → executor.rs (run actions, attempt by attempt)
//!         → RecoveryContext (engine-side action effects + verification)
//!         → one-hop fallback strategy on exhaustion
//! ```
//!
//! # Design Decisions
//! - Action failures are absorbed and reported, never fatal to the
//!   attempt; the remaining actions still run
//! - Recovery is verified once per attempt, after all actions
//! - Fallbacks never chain: the fallback's own fallback is ignored

pub mod executor;
pub mod strategy;

pub use executor::{RecoveryContext, RecoveryExecutor, RecoveryHooks, RecoveryReport};
pub use strategy::{RecoveryAction, RecoveryError, RecoveryStrategy, StrategyCatalog};
