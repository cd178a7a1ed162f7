//! Background monitoring loop.
//!
//! # Responsibilities
//! - Sweep every registered service on a fixed interval
//! - Exit promptly on the shutdown broadcast
//!
//! # Design Decisions
//! - Sweeps bypass the circuit breakers: a scheduled observation is
//!   not a caller the breaker should count, and an open breaker must
//!   not blind the tracker to the service behind it
//! - Probe panics and errors become Unhealthy results; a misbehaving
//!   probe never takes the loop down
//! - A sweep that outlasts the interval delays the next tick instead
//!   of stacking sweeps

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;

use crate::engine::EngineCore;

/// Periodic health sweeper over the engine's service registry.
pub(crate) struct Monitor {
    core: Arc<EngineCore>,
    interval: Duration,
}

impl Monitor {
    pub(crate) fn new(core: Arc<EngineCore>) -> Self {
        let interval = Duration::from_secs(core.config.monitoring.interval_secs);
        Self { core, interval }
    }

    pub(crate) async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!(
            interval_secs = self.interval.as_secs(),
            services = self.core.services.len(),
            "background monitoring started"
        );

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // Consume the immediate first tick so the first sweep happens
        // one interval after start.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    EngineCore::check_all(&self.core).await;
                }
                _ = shutdown.recv() => {
                    tracing::info!("monitoring loop exiting");
                    break;
                }
            }
        }
    }
}
