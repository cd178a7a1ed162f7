//! Resilience primitives.
//!
//! # Data Flow
//! ```text
//! Request-path call / ad hoc check:
//!     → circuit_breaker.rs (admit, fast-reject, or half-open probe)
//!     → wrapped operation runs; outcome feeds the state machine
//!
//! Recovery executor:
//!     → backoff.rs (delay between wait-and-retry actions)
//!     → circuit_breaker.rs (force half-open as a remediation step)
//! ```
//!
//! # Design Decisions
//! - One breaker per dependency, never global
//! - Fail fast while Open; no caller ever waits on a doomed call
//! - Exactly one probe call admitted in Half-Open
//! - Breaker state mutation is mutex-guarded; no await while held

pub mod backoff;
pub mod circuit_breaker;

pub use circuit_breaker::{BreakerError, CircuitBreaker, CircuitState};
