//! Per-service health tracking.
//!
//! # Data Flow
//! ```text
//! probe result → tracker.rs
//!     → rolling history (bounded window)
//!     → derived stats (success rate, average latency)
//!     → consecutive-failure counter
//!     → escalation decision for the recovery executor
//! ```

pub mod tracker;

pub use tracker::{Escalation, ServiceHealthRecord, ServiceHealthTracker, HISTORY_CAPACITY};
