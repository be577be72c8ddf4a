//! Ordered rule collection.

use std::sync::Arc;

use loadstone_core::log::Logger;

use crate::rule::Rule;

/// Registration-ordered rules. Order only affects which of several
/// ambiguous matches wins; lookup diagnostics go through the sink rather
/// than failing the call.
pub struct RuleSet<T: Clone> {
    rules: Vec<Arc<Rule<T>>>,
    log: Logger,
}

impl<T: Clone> RuleSet<T> {
    pub fn new(log: Logger) -> Self {
        Self {
            rules: Vec::new(),
            log,
        }
    }

    pub fn push(&mut self, rule: Arc<Rule<T>>) {
        self.rules.push(rule);
    }

    /// Find the rule for a URI.
    ///
    /// Zero matches reports `Unable to match` and yields `None`; more than
    /// one reports `Ambiguous URI` but still yields the first match. Both
    /// conditions are reported, never thrown; the caller decides whether
    /// absence is fatal.
    pub fn find_matching_rule(&self, uri: &str) -> Option<Arc<Rule<T>>> {
        let mut matches = self.rules.iter().filter(|rule| rule.matches(uri));
        let first = matches.next();

        match first {
            None => self.log.error(&format!("Unable to match \"{uri}\".")),
            Some(_) if matches.next().is_some() => {
                self.log.error(&format!("Ambiguous URI \"{uri}\"."));
            }
            Some(_) => {}
        }

        first.map(Arc::clone)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
