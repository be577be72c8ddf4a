//! The orchestrator: public load/unload/status API, dependency resolution,
//! and the background FIFO queue with its self-rescheduling poll loop.
//!
//! One [`Engine`] instance owns the rule set, the job registry, and the
//! queue behind a single mutex. The lock is never held across an await;
//! user hooks are collected under the lock and fired after it is released.

mod load;
mod queue;
mod status;

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use loadstone_core::config::EngineConfig;
use loadstone_core::error::EngineError;
use loadstone_core::log::Logger;
use loadstone_rules::{JobStart, OnLoadFn, Rule, RuleOptions, RulePattern, RuleSet};
use tracing::debug;

use crate::job::JobSnapshot;
use crate::registry::{JobMatcher, JobRegistry};

/// Declarative, URI-keyed asynchronous resource loader.
///
/// Explicitly constructed and explicitly started: [`Engine::start`] arms
/// the background poll loop, [`Engine::dispose`] stops it. Cloning yields
/// another handle to the same engine.
pub struct Engine<T: Clone + Send + Sync + 'static> {
    pub(crate) inner: Arc<EngineInner<T>>,
}

impl<T: Clone + Send + Sync + 'static> Clone for Engine<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

pub(crate) struct EngineInner<T: Clone + Send + Sync + 'static> {
    pub(crate) state: Mutex<EngineState<T>>,
    pub(crate) log: Logger,
    pub(crate) config: EngineConfig,
    pub(crate) global_on_load: Mutex<Option<OnLoadFn<T>>>,
    pub(crate) poll_task: Mutex<Option<tokio::task::AbortHandle>>,
}

pub(crate) struct EngineState<T: Clone + Send + Sync + 'static> {
    pub(crate) rules: RuleSet<T>,
    pub(crate) jobs: JobRegistry<T>,
    pub(crate) queue: VecDeque<String>,
}

/// Hooks collected under the engine lock, fired once it is released.
pub(crate) type PendingHooks<T> = Vec<(OnLoadFn<T>, JobStart<T>)>;

pub(crate) fn fire_hooks<T: Clone>(hooks: PendingHooks<T>) {
    for (hook, start) in hooks {
        hook(&start);
    }
}

impl<T: Clone + Send + Sync + 'static> Engine<T> {
    pub fn new(config: EngineConfig) -> Self {
        let log = Arc::clone(&config.log);
        log.log(&format!(
            "loadstone {} starting up",
            env!("CARGO_PKG_VERSION")
        ));

        Self {
            inner: Arc::new(EngineInner {
                state: Mutex::new(EngineState {
                    rules: RuleSet::new(Arc::clone(&log)),
                    jobs: JobRegistry::new(),
                    queue: VecDeque::new(),
                }),
                log,
                config,
                global_on_load: Mutex::new(None),
                poll_task: Mutex::new(None),
            }),
        }
    }

    /// Register one rule.
    pub fn rule(
        &self,
        pattern: impl Into<RulePattern>,
        options: RuleOptions<T>,
    ) -> Result<(), EngineError> {
        let rule = Arc::new(Rule::new(pattern, options)?);
        self.inner.state.lock().unwrap().rules.push(rule);
        Ok(())
    }

    /// Register the same options against several patterns.
    pub fn rules(
        &self,
        patterns: impl IntoIterator<Item = impl Into<RulePattern>>,
        options: RuleOptions<T>,
    ) -> Result<(), EngineError> {
        for pattern in patterns {
            self.rule(pattern, options.clone())?;
        }
        Ok(())
    }

    /// Engine-wide load-start hook; a rule-level `on_load` takes precedence.
    pub fn set_global_on_load(&self, hook: impl Fn(&JobStart<T>) + Send + Sync + 'static) {
        *self.inner.global_on_load.lock().unwrap() = Some(Arc::new(hook));
    }

    /// Snapshot of one cached job, if any.
    pub fn job(&self, uri: &str) -> Option<JobSnapshot<T>> {
        self.inner
            .state
            .lock()
            .unwrap()
            .jobs
            .job(uri)
            .map(|job| job.snapshot())
    }

    /// Snapshots of every cached job, registry order.
    pub fn inspect(&self) -> Vec<JobSnapshot<T>> {
        self.inner
            .state
            .lock()
            .unwrap()
            .jobs
            .values()
            .map(|job| job.snapshot())
            .collect()
    }

    /// URIs of cached jobs the matcher selects, registry order.
    pub fn match_jobs(&self, matcher: impl Into<JobMatcher>) -> Vec<String> {
        self.inner
            .state
            .lock()
            .unwrap()
            .jobs
            .match_jobs(&matcher.into())
    }

    /// Stop the poll loop and cancel every armed reload timer. Cached jobs
    /// stay cached; in-flight loads are not aborted.
    pub fn dispose(&self) {
        debug!("engine dispose");
        if let Some(handle) = self.inner.poll_task.lock().unwrap().take() {
            handle.abort();
        }
        let mut state = self.inner.state.lock().unwrap();
        for job in state.jobs.values_mut() {
            job.abort_poll();
        }
    }
}

impl<T: Clone + Send + Sync + 'static> Drop for EngineInner<T> {
    fn drop(&mut self) {
        if let Ok(mut guard) = self.poll_task.lock() {
            if let Some(handle) = guard.take() {
                handle.abort();
            }
        }
    }
}
