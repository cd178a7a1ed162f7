//! Event sink for health transitions, recovery outcomes and failures.
//!
//! # Responsibilities
//! - Give the engine one seam for emitting operational events
//! - Default implementation forwards to the tracing pipeline
//!
//! # Design Decisions
//! - Synchronous trait: emitting an event never awaits, so it can be
//!   called while holding a tracker lock
//! - Context travels as structured JSON, not preformatted strings

use serde::Serialize;
use serde_json::Value;

/// Severity attached to sink events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Debug,
    Info,
    Warning,
    Error,
    Critical,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Severity::Debug => "debug",
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
            Severity::Critical => "critical",
        };
        f.write_str(s)
    }
}

/// Receiver for engine events. Implementations must not block.
pub trait Sink: Send + Sync {
    /// A noteworthy event: status change, recovery start, recovery end.
    fn log(&self, severity: Severity, message: &str, context: Value);

    /// An error the engine absorbed and kept going past, such as a
    /// failed recovery action.
    fn report_failure(&self, error: &dyn std::error::Error, context: Value);
}

/// Default sink: forwards every event into the tracing pipeline.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl Sink for TracingSink {
    fn log(&self, severity: Severity, message: &str, context: Value) {
        match severity {
            Severity::Debug => tracing::debug!(%context, "{message}"),
            Severity::Info => tracing::info!(%context, "{message}"),
            Severity::Warning => tracing::warn!(%context, "{message}"),
            Severity::Error | Severity::Critical => {
                tracing::error!(%context, severity = %severity, "{message}")
            }
        }
    }

    fn report_failure(&self, error: &dyn std::error::Error, context: Value) {
        tracing::error!(%context, error = %error, "absorbed failure");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Test double capturing events for assertion.
    #[derive(Default)]
    pub struct MemorySink {
        pub events: Mutex<Vec<(Severity, String)>>,
    }

    impl Sink for MemorySink {
        fn log(&self, severity: Severity, message: &str, _context: Value) {
            self.events
                .lock()
                .unwrap()
                .push((severity, message.to_string()));
        }

        fn report_failure(&self, error: &dyn std::error::Error, _context: Value) {
            self.events
                .lock()
                .unwrap()
                .push((Severity::Error, error.to_string()));
        }
    }

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Debug < Severity::Info);
        assert!(Severity::Warning < Severity::Critical);
    }

    #[test]
    fn test_memory_sink_captures() {
        let sink = MemorySink::default();
        sink.log(Severity::Info, "hello", serde_json::json!({}));
        assert_eq!(sink.events.lock().unwrap().len(), 1);
    }
}
