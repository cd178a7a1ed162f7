//! Registered service state.

use std::fmt;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::health::ServiceHealthTracker;
use crate::probe::types::{HealthCheckResult, ServiceIdentity};
use crate::probe::HealthProbe;
use crate::recovery::RecoveryHooks;
use crate::resilience::CircuitBreaker;

/// Everything the engine holds for one registered service.
pub(crate) struct ServiceEntry {
    pub identity: ServiceIdentity,
    pub probe: Arc<dyn HealthProbe>,
    pub tracker: Mutex<ServiceHealthTracker>,
    pub breaker: Arc<CircuitBreaker>,
    pub hooks: Option<Arc<dyn RecoveryHooks>>,
    /// Set by the fallback-mode recovery action, cleared when a later
    /// verification finds the service back.
    pub fallback_mode: AtomicBool,
}

impl ServiceEntry {
    pub fn lock_tracker(&self) -> MutexGuard<'_, ServiceHealthTracker> {
        match self.tracker.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl fmt::Debug for ServiceEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceEntry")
            .field("identity", &self.identity)
            .field("breaker", &self.breaker)
            .finish()
    }
}

/// Internal marker error carrying an unhealthy check result through
/// the circuit breaker, so a failed check counts as a breaker failure
/// while the result itself still reaches the caller.
#[derive(Debug)]
pub(crate) struct CheckFailed(pub HealthCheckResult);

impl fmt::Display for CheckFailed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0.error {
            Some(error) => write!(f, "check of '{}' failed: {error}", self.0.service),
            None => write!(f, "check of '{}' failed", self.0.service),
        }
    }
}

impl std::error::Error for CheckFailed {}
