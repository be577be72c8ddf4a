//! Injected logging capability.
//!
//! The engine narrates its lifecycle (loads, cache hits, unloads, match
//! diagnostics) through a [`LogSink`] with two channels. The default sink
//! routes into `tracing`, so without a subscriber installed the engine is
//! silent; tests inject a [`CaptureSink`] to assert on the exact lines.

use std::sync::{Arc, Mutex};

use tracing::{debug, error};

/// Two-channel diagnostic sink.
pub trait LogSink: Send + Sync {
    fn log(&self, message: &str);
    fn error(&self, message: &str);
}

/// Shared handle to a sink.
pub type Logger = Arc<dyn LogSink>;

/// Routes `log` to `tracing::debug!` and `error` to `tracing::error!`.
#[derive(Debug, Default)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn log(&self, message: &str) {
        debug!(target: "loadstone", "{message}");
    }

    fn error(&self, message: &str) {
        error!(target: "loadstone", "{message}");
    }
}

/// Discards everything.
#[derive(Debug, Default)]
pub struct NoopSink;

impl LogSink for NoopSink {
    fn log(&self, _message: &str) {}
    fn error(&self, _message: &str) {}
}

/// Buffers every line for later inspection. Intended for tests that assert
/// on the engine's diagnostic templates.
#[derive(Debug, Default)]
pub struct CaptureSink {
    lines: Mutex<Vec<(Channel, String)>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Log,
    Error,
}

impl CaptureSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// All captured lines, both channels, in order.
    pub fn lines(&self) -> Vec<String> {
        self.lines
            .lock()
            .unwrap()
            .iter()
            .map(|(_, m)| m.clone())
            .collect()
    }

    /// Only the error-channel lines, in order.
    pub fn errors(&self) -> Vec<String> {
        self.lines
            .lock()
            .unwrap()
            .iter()
            .filter(|(c, _)| *c == Channel::Error)
            .map(|(_, m)| m.clone())
            .collect()
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.lines().iter().any(|l| l == needle)
    }
}

impl LogSink for CaptureSink {
    fn log(&self, message: &str) {
        self.lines
            .lock()
            .unwrap()
            .push((Channel::Log, message.to_string()));
    }

    fn error(&self, message: &str) {
        self.lines
            .lock()
            .unwrap()
            .push((Channel::Error, message.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capture_sink_records_both_channels_in_order() {
        let sink = CaptureSink::new();
        sink.log("one");
        sink.error("two");
        sink.log("three");

        assert_eq!(sink.lines(), vec!["one", "two", "three"]);
        assert_eq!(sink.errors(), vec!["two"]);
        assert!(sink.contains("one"));
        assert!(!sink.contains("four"));
    }
}
