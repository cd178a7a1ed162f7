//! Logging and metrics wiring.

pub mod logging;
pub mod metrics;
