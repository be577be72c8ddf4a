//! Layered load-option resolution.
//!
//! Options come from three layers with documented precedence:
//! call-site > rule > engine defaults. [`resolve_options`] collapses them
//! into one concrete struct before a job ever reads them.

use std::time::Duration;

use loadstone_core::config::EngineConfig;
use loadstone_rules::Rule;
use serde::Serialize;

/// Call-site overrides for one `load` invocation. Remembered by the job and
/// replayed on timer-driven reloads.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LoadOptions {
    pub reload_interval: Option<Duration>,
}

impl LoadOptions {
    pub fn reload_interval(interval: Duration) -> Self {
        Self {
            reload_interval: Some(interval),
        }
    }
}

/// The concrete options a job runs with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedOptions {
    /// Re-poll delay after a successful load; `None` disables polling.
    pub reload_interval: Option<Duration>,
    /// Total reload budget for the job's lifetime.
    pub reload_limit: u32,
}

/// Collapse the three option layers for one job.
pub fn resolve_options<T: Clone>(
    config: &EngineConfig,
    rule: &Rule<T>,
    call: Option<&LoadOptions>,
) -> ResolvedOptions {
    ResolvedOptions {
        reload_interval: call
            .and_then(|o| o.reload_interval)
            .or_else(|| rule.reload_interval()),
        reload_limit: rule.reload_limit().unwrap_or(config.default_reload_limit),
    }
}

#[cfg(test)]
mod tests {
    use loadstone_rules::RuleOptions;

    use super::*;

    fn rule(options: RuleOptions<u32>) -> Rule<u32> {
        Rule::new("r$x", options).unwrap()
    }

    #[test]
    fn engine_defaults_apply_when_nothing_is_set() {
        let config = EngineConfig::default();
        let resolved = resolve_options(&config, &rule(RuleOptions::new(|_| async { Ok(1) })), None);
        assert_eq!(resolved.reload_interval, None);
        assert_eq!(resolved.reload_limit, 100);
    }

    #[test]
    fn rule_options_override_engine_defaults() {
        let config = EngineConfig::default();
        let r = rule(
            RuleOptions::new(|_| async { Ok(1) })
                .reload_interval(Duration::from_secs(5))
                .reload_limit(3),
        );
        let resolved = resolve_options(&config, &r, None);
        assert_eq!(resolved.reload_interval, Some(Duration::from_secs(5)));
        assert_eq!(resolved.reload_limit, 3);
    }

    #[test]
    fn call_site_wins_over_rule() {
        let config = EngineConfig::default();
        let r = rule(RuleOptions::new(|_| async { Ok(1) }).reload_interval(Duration::from_secs(5)));
        let call = LoadOptions::reload_interval(Duration::from_secs(1));
        let resolved = resolve_options(&config, &r, Some(&call));
        assert_eq!(resolved.reload_interval, Some(Duration::from_secs(1)));
    }
}
