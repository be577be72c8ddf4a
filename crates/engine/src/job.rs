//! Job: the stateful, cached unit of work for one concrete URI.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use loadstone_core::error::LoadError;
use loadstone_core::load::SharedLoad;
use loadstone_rules::Rule;
use serde::Serialize;
use tokio::task::AbortHandle;

use crate::options::{LoadOptions, ResolvedOptions};

/// Lifecycle state. `Reloading` is the "was loaded, loading again" phase:
/// it counts as loading, and the loaded flag is cleared the instant a
/// reload begins, set again on success.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    Idle,
    Loading,
    Loaded,
    Reloading,
    Failed,
}

impl JobState {
    pub fn is_loading(self) -> bool {
        matches!(self, JobState::Loading | JobState::Reloading)
    }

    pub fn is_reloading(self) -> bool {
        self == JobState::Reloading
    }

    pub fn is_loaded(self) -> bool {
        self == JobState::Loaded
    }

    pub fn is_failed(self) -> bool {
        self == JobState::Failed
    }

    pub fn label(self) -> &'static str {
        match self {
            JobState::Idle => "idle",
            JobState::Loading => "loading",
            JobState::Loaded => "loaded",
            JobState::Reloading => "reloading",
            JobState::Failed => "failed",
        }
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One cached resource. Created lazily by the engine on first load of its
/// URI, retained until explicitly unloaded.
pub struct Job<T: Clone> {
    uri: String,
    rule: Arc<Rule<T>>,
    state: JobState,
    options: ResolvedOptions,
    load_options: Option<LoadOptions>,
    reload_limit: u32,
    last_error: Option<LoadError>,
    promise: Option<SharedLoad<T>>,
    poll_handle: Option<AbortHandle>,
    last_loaded_at: Option<DateTime<Utc>>,
    last_failed_at: Option<DateTime<Utc>>,
}

impl<T: Clone> Job<T> {
    /// A fresh registry entry: `Idle` with no promise, the reserved-slot
    /// phase between registration and start that dependency cycles rely on.
    pub fn new(uri: impl Into<String>, rule: Arc<Rule<T>>, options: ResolvedOptions) -> Self {
        let reload_limit = options.reload_limit;
        Self {
            uri: uri.into(),
            rule,
            state: JobState::Idle,
            options,
            load_options: None,
            reload_limit,
            last_error: None,
            promise: None,
            poll_handle: None,
            last_loaded_at: None,
            last_failed_at: None,
        }
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn state(&self) -> JobState {
        self.state
    }

    pub fn rule(&self) -> Arc<Rule<T>> {
        Arc::clone(&self.rule)
    }

    pub fn options(&self) -> &ResolvedOptions {
        &self.options
    }

    pub fn load_options(&self) -> Option<&LoadOptions> {
        self.load_options.as_ref()
    }

    pub fn reload_limit(&self) -> u32 {
        self.reload_limit
    }

    pub fn last_error(&self) -> Option<&LoadError> {
        self.last_error.as_ref()
    }

    /// The in-flight or settled shared computation, if a load has started.
    pub fn promise(&self) -> Option<SharedLoad<T>> {
        self.promise.clone()
    }

    /// Install a freshly composed load. Keeps `Reloading` if a reload is in
    /// progress, otherwise transitions to `Loading`.
    pub fn begin_load(
        &mut self,
        promise: SharedLoad<T>,
        load_options: Option<LoadOptions>,
        options: ResolvedOptions,
    ) {
        self.promise = Some(promise);
        self.options = options;
        if load_options.is_some() {
            self.load_options = load_options;
        }
        if self.state != JobState::Reloading {
            self.state = JobState::Loading;
        }
    }

    /// Enter the reload phase: burn one unit of the reload budget and clear
    /// the loaded flag. Caller has already checked the guards.
    pub fn begin_reload(&mut self) {
        self.reload_limit -= 1;
        self.state = JobState::Reloading;
    }

    pub fn mark_loaded(&mut self) {
        self.state = JobState::Loaded;
        self.last_error = None;
        self.last_loaded_at = Some(Utc::now());
    }

    pub fn mark_failed(&mut self, error: LoadError) {
        self.state = JobState::Failed;
        self.last_error = Some(error);
        self.last_failed_at = Some(Utc::now());
    }

    /// Arm the reload timer. Idempotent: an armed job never arms a second
    /// timer.
    pub fn arm_poll(&mut self, handle: AbortHandle) {
        if self.poll_handle.is_none() {
            self.poll_handle = Some(handle);
        } else {
            handle.abort();
        }
    }

    pub fn poll_armed(&self) -> bool {
        self.poll_handle.is_some()
    }

    /// Forget the armed timer without aborting it (it fired).
    pub fn clear_poll(&mut self) {
        self.poll_handle = None;
    }

    /// Cancel any armed timer.
    pub fn abort_poll(&mut self) {
        if let Some(handle) = self.poll_handle.take() {
            handle.abort();
        }
    }

    /// Cancel the timer and run the rule's unload hook. Registry removal is
    /// the engine's responsibility.
    pub fn on_unload(&mut self) {
        self.abort_poll();
        if let Some(hook) = self.rule.unload_hook() {
            hook(&self.uri);
        }
    }

    pub fn snapshot(&self) -> JobSnapshot<T> {
        JobSnapshot {
            uri: self.uri.clone(),
            state: self.state,
            options: self.options.clone(),
            reload_limit: self.reload_limit,
            last_error: self.last_error.clone(),
            promise: self.promise.clone(),
            last_loaded_at: self.last_loaded_at,
            last_failed_at: self.last_failed_at,
        }
    }
}

/// Point-in-time view of a job, safe to hand outside the engine lock.
#[derive(Clone, Serialize)]
#[serde(bound = "")]
pub struct JobSnapshot<T: Clone> {
    pub uri: String,
    pub state: JobState,
    pub options: ResolvedOptions,
    pub reload_limit: u32,
    #[serde(serialize_with = "serialize_error")]
    pub last_error: Option<LoadError>,
    #[serde(skip)]
    pub promise: Option<SharedLoad<T>>,
    pub last_loaded_at: Option<DateTime<Utc>>,
    pub last_failed_at: Option<DateTime<Utc>>,
}

fn serialize_error<S: serde::Serializer>(
    error: &Option<LoadError>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match error {
        Some(e) => serializer.serialize_some(&e.to_string()),
        None => serializer.serialize_none(),
    }
}

impl<T: Clone> fmt::Debug for JobSnapshot<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobSnapshot")
            .field("uri", &self.uri)
            .field("state", &self.state.label())
            .field("reload_limit", &self.reload_limit)
            .field("last_error", &self.last_error)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use futures::FutureExt;
    use loadstone_rules::RuleOptions;

    use super::*;

    fn job() -> Job<u32> {
        let rule = Arc::new(Rule::new("uri$x", RuleOptions::new(|_| async { Ok(1) })).unwrap());
        Job::new(
            "uri1",
            rule,
            ResolvedOptions {
                reload_interval: None,
                reload_limit: 100,
            },
        )
    }

    fn ready_promise(value: u32) -> SharedLoad<u32> {
        let fut: loadstone_core::load::BoxLoad<u32> = async move { Ok(value) }.boxed();
        fut.shared()
    }

    #[test]
    fn starts_idle_with_no_promise() {
        let job = job();
        assert_eq!(job.state(), JobState::Idle);
        assert!(job.promise().is_none());
        assert!(!job.state().is_loading());
        assert!(!job.state().is_loaded());
        assert!(!job.state().is_failed());
    }

    #[test]
    fn begin_load_transitions_to_loading() {
        let mut job = job();
        job.begin_load(
            ready_promise(1),
            None,
            ResolvedOptions {
                reload_interval: None,
                reload_limit: 100,
            },
        );
        assert_eq!(job.state(), JobState::Loading);
        assert!(job.promise().is_some());
    }

    #[test]
    fn mark_loaded_and_failed() {
        let mut job = job();
        job.mark_loaded();
        assert!(job.state().is_loaded());
        assert!(job.last_loaded_at.is_some());

        job.mark_failed(LoadError::msg("boom"));
        assert!(job.state().is_failed());
        assert!(!job.state().is_loaded());
        assert_eq!(job.last_error().unwrap().to_string(), "boom");
    }

    #[test]
    fn reload_keeps_reloading_state_through_begin_load() {
        let mut job = job();
        job.mark_loaded();
        job.begin_reload();
        assert_eq!(job.reload_limit(), 99);
        assert_eq!(job.state(), JobState::Reloading);
        assert!(job.state().is_loading());
        assert!(!job.state().is_loaded());

        job.begin_load(
            ready_promise(2),
            None,
            ResolvedOptions {
                reload_interval: None,
                reload_limit: 100,
            },
        );
        assert_eq!(job.state(), JobState::Reloading);
    }

    #[test]
    fn state_labels() {
        assert_eq!(JobState::Idle.label(), "idle");
        assert_eq!(JobState::Reloading.label(), "reloading");
        assert_eq!(JobState::Failed.to_string(), "failed");
    }

    #[test]
    fn snapshot_serializes_without_promise() {
        let mut job = job();
        job.mark_failed(LoadError::msg("nope"));
        let json = serde_json::to_string(&job.snapshot()).unwrap();
        assert!(json.contains("\"state\":\"failed\""));
        assert!(json.contains("nope"));
        assert!(!json.contains("promise"));
    }
}
