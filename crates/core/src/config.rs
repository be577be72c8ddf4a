//! Engine configuration.

use std::env;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::log::{Logger, TracingSink};

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_u64(key: &str, default: u64) -> u64 {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Knobs for one engine instance. Call-site and rule options layer on top
/// of these defaults; precedence is call-site > rule > engine.
#[derive(Clone)]
pub struct EngineConfig {
    /// Delay between background queue polls when the queue is empty.
    pub poll_interval: Duration,
    /// Default reload cap for jobs whose rule does not set one.
    pub default_reload_limit: u32,
    /// Diagnostic sink. Defaults to the `tracing`-backed sink.
    pub log: Logger,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(1000),
            default_reload_limit: 100,
            log: Arc::new(TracingSink),
        }
    }
}

impl EngineConfig {
    /// Build config from environment variables (call [`load_dotenv`] first):
    /// `LOADSTONE_POLL_INTERVAL_MS`, `LOADSTONE_RELOAD_LIMIT`.
    pub fn from_env() -> Self {
        Self {
            poll_interval: Duration::from_millis(env_u64("LOADSTONE_POLL_INTERVAL_MS", 1000)),
            default_reload_limit: env_u64("LOADSTONE_RELOAD_LIMIT", 100) as u32,
            ..Self::default()
        }
    }

    pub fn with_log(mut self, log: Logger) -> Self {
        self.log = log;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }
}

impl fmt::Debug for EngineConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineConfig")
            .field("poll_interval", &self.poll_interval)
            .field("default_reload_limit", &self.default_reload_limit)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.poll_interval, Duration::from_millis(1000));
        assert_eq!(config.default_reload_limit, 100);
    }

    #[test]
    fn builder_overrides() {
        let config = EngineConfig::default().with_poll_interval(Duration::from_millis(50));
        assert_eq!(config.poll_interval, Duration::from_millis(50));
    }
}
