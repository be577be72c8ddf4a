//! URI → Job cache with pattern-based bulk queries.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use loadstone_core::uri::{canonical_uri, UriSpec};
use regex::Regex;

use crate::job::Job;

/// How status/unload queries select jobs: exact URI, regex test, arbitrary
/// predicate, or a list of any of these (lists flatten).
#[derive(Clone)]
pub enum JobMatcher {
    Exact(String),
    Pattern(Regex),
    Predicate(Arc<dyn Fn(&str) -> bool + Send + Sync>),
    List(Vec<JobMatcher>),
}

impl JobMatcher {
    pub fn predicate(f: impl Fn(&str) -> bool + Send + Sync + 'static) -> Self {
        JobMatcher::Predicate(Arc::new(f))
    }

    /// Matches every URI. Used by `reset`.
    pub fn everything() -> Self {
        JobMatcher::predicate(|_| true)
    }

    pub fn hits(&self, uri: &str) -> bool {
        match self {
            JobMatcher::Exact(s) => s == uri,
            JobMatcher::Pattern(re) => re.is_match(uri),
            JobMatcher::Predicate(f) => f(uri),
            JobMatcher::List(list) => list.iter().any(|m| m.hits(uri)),
        }
    }

    /// Leaf matchers, with nested lists flattened out.
    pub fn leaves(&self) -> Vec<&JobMatcher> {
        match self {
            JobMatcher::List(list) => list.iter().flat_map(|m| m.leaves()).collect(),
            other => vec![other],
        }
    }
}

impl fmt::Debug for JobMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobMatcher::Exact(s) => write!(f, "Exact({s:?})"),
            JobMatcher::Pattern(re) => write!(f, "Pattern({re})"),
            JobMatcher::Predicate(_) => f.write_str("Predicate(..)"),
            JobMatcher::List(list) => f.debug_tuple("List").field(list).finish(),
        }
    }
}

impl From<&str> for JobMatcher {
    fn from(uri: &str) -> Self {
        JobMatcher::Exact(uri.to_string())
    }
}

impl From<String> for JobMatcher {
    fn from(uri: String) -> Self {
        JobMatcher::Exact(uri)
    }
}

impl From<Regex> for JobMatcher {
    fn from(re: Regex) -> Self {
        JobMatcher::Pattern(re)
    }
}

impl From<UriSpec> for JobMatcher {
    fn from(spec: UriSpec) -> Self {
        JobMatcher::Exact(canonical_uri(&spec))
    }
}

impl<M: Into<JobMatcher>> From<Vec<M>> for JobMatcher {
    fn from(list: Vec<M>) -> Self {
        JobMatcher::List(list.into_iter().map(Into::into).collect())
    }
}

/// Insertion-ordered job cache. Entries enter and leave only through
/// explicit set/remove; the engine is the sole mutator.
pub struct JobRegistry<T: Clone> {
    jobs: IndexMap<String, Job<T>>,
}

impl<T: Clone> JobRegistry<T> {
    pub fn new() -> Self {
        Self {
            jobs: IndexMap::new(),
        }
    }

    pub fn job(&self, uri: &str) -> Option<&Job<T>> {
        self.jobs.get(uri)
    }

    pub fn job_mut(&mut self, uri: &str) -> Option<&mut Job<T>> {
        self.jobs.get_mut(uri)
    }

    pub fn set(&mut self, uri: impl Into<String>, job: Job<T>) {
        self.jobs.insert(uri.into(), job);
    }

    pub fn remove(&mut self, uri: &str) -> Option<Job<T>> {
        self.jobs.shift_remove(uri)
    }

    /// URIs of entries the matcher selects, in registry order.
    pub fn match_jobs(&self, matcher: &JobMatcher) -> Vec<String> {
        self.jobs
            .keys()
            .filter(|uri| matcher.hits(uri))
            .cloned()
            .collect()
    }

    /// Is any selected job in a state satisfying `test`?
    pub fn any(&self, matcher: &JobMatcher, test: impl Fn(&Job<T>) -> bool) -> bool {
        self.jobs
            .iter()
            .any(|(uri, job)| matcher.hits(uri) && test(job))
    }

    pub fn values(&self) -> impl Iterator<Item = &Job<T>> {
        self.jobs.values()
    }

    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut Job<T>> {
        self.jobs.values_mut()
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }
}

impl<T: Clone> Default for JobRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use loadstone_rules::{Rule, RuleOptions};

    use crate::options::ResolvedOptions;

    use super::*;

    fn registry_with(uris: &[&str]) -> JobRegistry<u32> {
        let rule = Arc::new(
            Rule::new(Regex::new(".*").unwrap(), RuleOptions::new(|_| async { Ok(1) })).unwrap(),
        );
        let mut registry = JobRegistry::new();
        for uri in uris {
            registry.set(
                *uri,
                Job::new(
                    *uri,
                    Arc::clone(&rule),
                    ResolvedOptions {
                        reload_interval: None,
                        reload_limit: 100,
                    },
                ),
            );
        }
        registry
    }

    #[test]
    fn exact_match() {
        let registry = registry_with(&["dl:test-123/456"]);
        assert_eq!(
            registry.match_jobs(&"dl:test-123/456".into()),
            vec!["dl:test-123/456"]
        );
        assert!(registry.match_jobs(&"foo".into()).is_empty());
        // partial strings do not match
        assert!(registry.match_jobs(&"dl:test-123".into()).is_empty());
    }

    #[test]
    fn regex_match() {
        let registry = registry_with(&["dl:test-123/456", "other"]);
        let matcher = JobMatcher::from(Regex::new(r"test-(\d+)/(\d+)").unwrap());
        assert_eq!(registry.match_jobs(&matcher), vec!["dl:test-123/456"]);
        assert!(registry
            .match_jobs(&Regex::new("x93fk").unwrap().into())
            .is_empty());
    }

    #[test]
    fn predicate_match() {
        let registry = registry_with(&["a", "b"]);
        assert_eq!(registry.match_jobs(&JobMatcher::everything()), vec!["a", "b"]);
        assert!(registry
            .match_jobs(&JobMatcher::predicate(|_| false))
            .is_empty());
    }

    #[test]
    fn list_matcher_flattens_and_keeps_registry_order() {
        let registry = registry_with(&["a", "b", "c"]);
        let matcher = JobMatcher::from(vec![JobMatcher::from("c"), JobMatcher::from("a")]);
        // registry order, not matcher order
        assert_eq!(registry.match_jobs(&matcher), vec!["a", "c"]);
        assert_eq!(matcher.leaves().len(), 2);
    }

    #[test]
    fn remove_preserves_order_of_remaining_entries() {
        let mut registry = registry_with(&["a", "b", "c"]);
        registry.remove("b");
        assert_eq!(registry.match_jobs(&JobMatcher::everything()), vec!["a", "c"]);
    }
}
