//! Health probing subsystem.
//!
//! # Data Flow
//! ```text
//! Monitor tick / check_now:
//!     → HealthProbe::check() (caller-supplied, per dependency)
//!     → engine wraps with wall-clock latency + bounded timeout
//!     → HealthCheckResult (timeouts/errors coerced to Unhealthy)
//!     → health tracker
//! ```
//!
//! # Design Decisions
//! - Probes are idempotent and side-effect-free
//! - Probes never control their own latency accounting; the engine
//!   measures immediately before the call to immediately after return
//! - Probe failure is a value (Unhealthy result), not an error that
//!   crosses the engine boundary
//! - Default probes are illustrative; real dependency probes come
//!   from the owning application

pub mod http;
pub mod tcp;
pub mod types;

pub use types::{HealthCheckResult, ProbeError, ServiceIdentity, Status};

use async_trait::async_trait;

/// A named, idempotent health check for one external dependency.
///
/// Implementations report what they observed; classification into
/// rolling statistics and escalation happens in the health tracker.
#[async_trait]
pub trait HealthProbe: Send + Sync {
    /// Run one check. Errors and timeouts are coerced to Unhealthy
    /// results by the engine, never surfaced to request-path callers.
    async fn check(&self) -> Result<HealthCheckResult, ProbeError>;
}
