//! Circuit breaker for dependency protection.
//!
//! # States
//! - Closed: normal operation, calls pass through
//! - Open: dependency assumed down, calls fail fast
//! - Half-Open: testing whether the dependency recovered
//!
//! # State Transitions
//! ```text
//! Closed → Open: failure_count >= failure_threshold
//! Open → Half-Open: recovery_timeout elapsed and a call is attempted
//! Half-Open → Closed: probe call succeeds (failure_count reset)
//! Half-Open → Open: probe call fails (last_failure_time reset)
//! ```
//!
//! # Design Decisions
//! - Only caller-designated ("counted") errors trip the breaker;
//!   everything else propagates without touching the failure count
//! - Single probe admitted in Half-Open, preventing a thundering herd
//!   against a recovering dependency
//! - Transitions emit a tracing event and a metrics gauge update; the
//!   breaker performs no I/O of its own

use std::future::Future;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::observability::metrics;

/// Circuit state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

impl std::fmt::Display for CircuitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            CircuitState::Closed => "closed",
            CircuitState::Open => "open",
            CircuitState::HalfOpen => "half-open",
        };
        f.write_str(s)
    }
}

/// Rejection or pass-through error from a guarded call.
#[derive(Debug, Error)]
pub enum BreakerError<E> {
    /// Fast reject: the circuit is open (or the single half-open slot
    /// is taken). The wrapped operation was not invoked.
    #[error("circuit breaker '{name}' is open, retry in {retry_in:?}")]
    Open { name: String, retry_in: Duration },

    /// The wrapped operation's own error, re-raised after counting.
    #[error("{0}")]
    Inner(E),
}

impl<E> BreakerError<E> {
    pub fn into_inner(self) -> Option<E> {
        match self {
            BreakerError::Inner(e) => Some(e),
            BreakerError::Open { .. } => None,
        }
    }
}

/// How a call was admitted; decides the bookkeeping on completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Admission {
    Closed,
    HalfOpenProbe,
}

#[derive(Debug)]
struct BreakerInner {
    state: CircuitState,
    failure_count: u32,
    /// Monotonic clock for the recovery window.
    last_failure_at: Option<Instant>,
    /// Wall-clock mirror for snapshot export.
    last_failure_time: Option<DateTime<Utc>>,
    /// Whether the single half-open probe slot is taken.
    half_open_probe: bool,
}

/// Per-dependency call-guarding state machine.
pub struct CircuitBreaker {
    name: String,
    failure_threshold: u32,
    recovery_timeout: Duration,
    inner: Mutex<BreakerInner>,
}

impl CircuitBreaker {
    pub fn new(name: impl Into<String>, failure_threshold: u32, recovery_timeout: Duration) -> Self {
        Self {
            name: name.into(),
            failure_threshold,
            recovery_timeout,
            inner: Mutex::new(BreakerInner {
                state: CircuitState::Closed,
                failure_count: 0,
                last_failure_at: None,
                last_failure_time: None,
                half_open_probe: false,
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Run `op` through the breaker, counting every error.
    pub async fn call<T, E, Fut>(&self, op: Fut) -> Result<T, BreakerError<E>>
    where
        Fut: Future<Output = Result<T, E>>,
    {
        self.call_if(op, |_| true).await
    }

    /// Run `op` through the breaker. `counted` names the error class
    /// that trips the breaker; other errors propagate with the failure
    /// count untouched.
    pub async fn call_if<T, E, Fut, P>(&self, op: Fut, counted: P) -> Result<T, BreakerError<E>>
    where
        Fut: Future<Output = Result<T, E>>,
        P: Fn(&E) -> bool,
    {
        let admission = match self.try_admit() {
            Ok(admission) => admission,
            Err(retry_in) => {
                return Err(BreakerError::Open {
                    name: self.name.clone(),
                    retry_in,
                })
            }
        };

        match op.await {
            Ok(value) => {
                self.on_success(admission);
                Ok(value)
            }
            Err(e) if counted(&e) => {
                self.on_counted_failure(admission);
                Err(BreakerError::Inner(e))
            }
            Err(e) => {
                self.on_uncounted_failure(admission);
                Err(BreakerError::Inner(e))
            }
        }
    }

    /// Force the breaker into Half-Open, used as a recovery action to
    /// let the next call probe the dependency immediately.
    pub fn force_half_open(&self) {
        let mut inner = self.lock();
        if inner.state == CircuitState::HalfOpen {
            return;
        }
        inner.state = CircuitState::HalfOpen;
        inner.half_open_probe = false;
        self.log_transition(&inner, "forced half-open");
    }

    pub fn current_state(&self) -> CircuitState {
        self.lock().state
    }

    pub fn failure_count(&self) -> u32 {
        self.lock().failure_count
    }

    pub fn last_failure_time(&self) -> Option<DateTime<Utc>> {
        self.lock().last_failure_time
    }

    fn try_admit(&self) -> Result<Admission, Duration> {
        let mut inner = self.lock();
        match inner.state {
            CircuitState::Closed => Ok(Admission::Closed),

            CircuitState::Open => {
                let elapsed = inner
                    .last_failure_at
                    .map(|at| at.elapsed())
                    .unwrap_or(Duration::ZERO);
                if elapsed >= self.recovery_timeout {
                    inner.state = CircuitState::HalfOpen;
                    inner.half_open_probe = true;
                    self.log_transition(&inner, "recovery window elapsed");
                    Ok(Admission::HalfOpenProbe)
                } else {
                    Err(self.recovery_timeout - elapsed)
                }
            }

            CircuitState::HalfOpen => {
                if inner.half_open_probe {
                    // Probe slot taken; reject like Open.
                    Err(Duration::ZERO)
                } else {
                    inner.half_open_probe = true;
                    Ok(Admission::HalfOpenProbe)
                }
            }
        }
    }

    fn on_success(&self, admission: Admission) {
        let mut inner = self.lock();
        match admission {
            Admission::Closed => {
                inner.failure_count = 0;
            }
            Admission::HalfOpenProbe => {
                inner.state = CircuitState::Closed;
                inner.failure_count = 0;
                inner.half_open_probe = false;
                self.log_transition(&inner, "half-open probe succeeded");
            }
        }
    }

    fn on_counted_failure(&self, admission: Admission) {
        let mut inner = self.lock();
        inner.last_failure_at = Some(Instant::now());
        inner.last_failure_time = Some(Utc::now());
        match admission {
            Admission::Closed => {
                inner.failure_count = inner.failure_count.saturating_add(1);
                if inner.failure_count >= self.failure_threshold
                    && inner.state == CircuitState::Closed
                {
                    inner.state = CircuitState::Open;
                    self.log_transition(&inner, "failure threshold reached");
                }
            }
            Admission::HalfOpenProbe => {
                inner.state = CircuitState::Open;
                inner.half_open_probe = false;
                self.log_transition(&inner, "half-open probe failed");
            }
        }
    }

    fn on_uncounted_failure(&self, admission: Admission) {
        // Not the counted error class: release the half-open slot but
        // leave state and failure count untouched.
        if admission == Admission::HalfOpenProbe {
            self.lock().half_open_probe = false;
        }
    }

    fn log_transition(&self, inner: &BreakerInner, cause: &str) {
        match inner.state {
            CircuitState::Open => {
                tracing::warn!(
                    breaker = %self.name,
                    failures = inner.failure_count,
                    cause,
                    "circuit breaker opened"
                );
            }
            state => {
                tracing::info!(
                    breaker = %self.name,
                    state = %state,
                    cause,
                    "circuit breaker transition"
                );
            }
        }
        metrics::record_breaker_state(&self.name, inner.state);
    }

    fn lock(&self) -> MutexGuard<'_, BreakerInner> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl std::fmt::Debug for CircuitBreaker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.lock();
        f.debug_struct("CircuitBreaker")
            .field("name", &self.name)
            .field("state", &inner.state)
            .field("failure_count", &inner.failure_count)
            .finish()
    }
}
