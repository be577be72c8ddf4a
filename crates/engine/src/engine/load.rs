//! Load, dependency resolution, settle bookkeeping, and timed reloads.

use std::sync::Arc;

use futures::future::{self, try_join_all, BoxFuture};
use futures::FutureExt;
use loadstone_core::error::{EngineError, LoadError};
use loadstone_core::load::{BoxLoad, SharedLoad};
use loadstone_core::uri::{canonical_uri, sketchy_uri, UriSpec};
use loadstone_rules::{JobStart, Rule};

use crate::job::Job;
use crate::options::{resolve_options, LoadOptions, ResolvedOptions};

use super::{fire_hooks, Engine, EngineInner, EngineState, PendingHooks};

impl<T: Clone + Send + Sync + 'static> Engine<T> {
    /// Load a resource, returning the shared future every requester of this
    /// URI holds. A cache hit returns the existing future without touching
    /// the rules; a miss registers a new job and starts it.
    ///
    /// Must be called within a tokio runtime.
    pub fn load(&self, spec: impl Into<UriSpec>) -> Result<SharedLoad<T>, EngineError> {
        self.load_with(spec, None)
    }

    /// [`load`](Engine::load) with call-site options layered over the
    /// rule's defaults.
    pub fn load_with(
        &self,
        spec: impl Into<UriSpec>,
        options: Option<LoadOptions>,
    ) -> Result<SharedLoad<T>, EngineError> {
        let uri = canonical_uri(&spec.into());
        let mut hooks = Vec::new();
        let result = {
            let mut state = self.inner.state.lock().unwrap();
            self.inner.load_locked(&mut state, &uri, options, &mut hooks)
        };
        fire_hooks(hooks);
        result
    }

    /// Fan out over several specs and join the results.
    pub fn load_all(
        &self,
        specs: impl IntoIterator<Item = impl Into<UriSpec>>,
    ) -> Result<BoxLoad<Vec<T>>, EngineError> {
        let futures = specs
            .into_iter()
            .map(|spec| self.load(spec))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(try_join_all(futures).boxed())
    }
}

impl<T: Clone + Send + Sync + 'static> EngineInner<T> {
    pub(crate) fn load_locked(
        self: &Arc<Self>,
        state: &mut EngineState<T>,
        uri: &str,
        options: Option<LoadOptions>,
        hooks: &mut PendingHooks<T>,
    ) -> Result<SharedLoad<T>, EngineError> {
        if let Some(job) = state.jobs.job(uri) {
            self.log.log(&format!("  cache hit for {uri}"));
            if let Some(promise) = job.promise() {
                return Ok(promise);
            }
            // registered but never started; start it now
            let rule = job.rule();
            let resolved = job.options().clone();
            return self.start_load_locked(state, uri, rule, resolved, options, hooks);
        }

        let rule = state
            .rules
            .find_matching_rule(uri)
            .ok_or_else(|| EngineError::UnmatchedUri(uri.to_string()))?;

        // "undefined"/"null" in a URI usually means a param went missing
        let line = format!("load \"{uri}\"");
        if sketchy_uri(uri) {
            self.log.error(&line);
        } else {
            self.log.log(&line);
        }

        let resolved = resolve_options(&self.config, &rule, options.as_ref());

        // Register the job BEFORE starting its load. A dependency chain that
        // cycles back to this URI finds the reserved slot and is treated as
        // satisfied instead of recursing forever. Do not reorder.
        state
            .jobs
            .set(uri, Job::new(uri, Arc::clone(&rule), resolved.clone()));

        self.start_load_locked(state, uri, rule, resolved, options, hooks)
    }

    /// Compose and install one load attempt for a registered job.
    fn start_load_locked(
        self: &Arc<Self>,
        state: &mut EngineState<T>,
        uri: &str,
        rule: Arc<Rule<T>>,
        resolved: ResolvedOptions,
        load_options: Option<LoadOptions>,
        hooks: &mut PendingHooks<T>,
    ) -> Result<SharedLoad<T>, EngineError> {
        let composed = match self.compose_locked(state, uri, &rule, hooks) {
            Ok(fut) => fut,
            Err(error) => {
                // don't leave a promiseless zombie entry behind
                state.jobs.remove(uri);
                return Err(error);
            }
        };
        let shared = composed.shared();

        if let Some(job) = state.jobs.job_mut(uri) {
            job.begin_load(shared.clone(), load_options, resolved);

            let hook = rule
                .on_load_hook()
                .cloned()
                .or_else(|| self.global_on_load.lock().unwrap().clone());
            if let Some(hook) = hook {
                hooks.push((
                    hook,
                    JobStart {
                        uri: uri.to_string(),
                        future: shared.clone(),
                    },
                ));
            }
        }

        // drive to completion even if every caller drops its handle
        tokio::spawn(shared.clone().map(|_| ()));

        Ok(shared)
    }

    /// Build the composed future: resolve dependencies through the engine,
    /// then invoke the raw loader. With no dependencies the composition is
    /// just the raw loader plus settle bookkeeping.
    fn compose_locked(
        self: &Arc<Self>,
        state: &mut EngineState<T>,
        uri: &str,
        rule: &Arc<Rule<T>>,
        hooks: &mut PendingHooks<T>,
    ) -> Result<BoxLoad<T>, EngineError> {
        let params = rule.params(uri)?;
        let dep_uris: Vec<String> = rule
            .dependencies_as_uris(&params)
            .iter()
            .map(canonical_uri)
            .collect();

        let mut dep_futures = Vec::with_capacity(dep_uris.len());
        if !dep_uris.is_empty() {
            self.log
                .log(&format!("  checking dependencies ({})...", dep_uris.len()));
            for dep in &dep_uris {
                dep_futures.push(self.dep_promise_locked(state, dep, hooks)?);
            }
        }

        let weak = Arc::downgrade(self);
        let log = Arc::clone(&self.log);
        let rule = Arc::clone(rule);
        let uri = uri.to_string();
        let dep_count = dep_uris.len();

        Ok(async move {
            let result = async {
                if dep_count > 0 {
                    try_join_all(dep_futures).await?;
                    log.log(&format!("  {dep_count} dependencies loaded."));
                }
                rule.raw_loader_future(params).await
            }
            .await;

            // bookkeeping runs inside the shared future, so every waiter
            // resumes with the job state already updated
            if let Some(inner) = weak.upgrade() {
                inner.settle(&uri, &result);
            }
            result
        }
        .boxed())
    }

    /// A dependency's completion future. Goes through the full load path,
    /// unless the target is a reserved slot whose load has not started,
    /// which means the dependency graph cycled back onto a job currently
    /// being composed; that edge is treated as already satisfied.
    fn dep_promise_locked(
        self: &Arc<Self>,
        state: &mut EngineState<T>,
        uri: &str,
        hooks: &mut PendingHooks<T>,
    ) -> Result<BoxFuture<'static, Result<(), LoadError>>, EngineError> {
        if let Some(job) = state.jobs.job(uri) {
            if job.promise().is_none() {
                return Ok(future::ready(Ok(())).boxed());
            }
        }
        let shared = self.load_locked(state, uri, None, hooks)?;
        Ok(shared.map(|result| result.map(|_| ())).boxed())
    }

    /// Transition the job once its shared future settles.
    pub(crate) fn settle(self: &Arc<Self>, uri: &str, result: &Result<T, LoadError>) {
        let mut state = self.state.lock().unwrap();
        let Some(job) = state.jobs.job_mut(uri) else {
            return;
        };

        match result {
            Ok(_) => {
                let prefix = if job.state().is_reloading() { "re-" } else { "" };
                job.mark_loaded();
                self.log.log(&format!("{prefix}loaded {uri}"));
                if job.options().reload_interval.is_some() && !job.poll_armed() {
                    self.arm_poll(job, uri);
                }
            }
            Err(error) => {
                job.mark_failed(error.clone());
                self.log.error(&format!("failed {uri} Error={error}"));
            }
        }
    }

    /// Arm the reload timer for a freshly loaded job.
    fn arm_poll(self: &Arc<Self>, job: &mut Job<T>, uri: &str) {
        let Some(interval) = job.options().reload_interval else {
            return;
        };
        let weak = Arc::downgrade(self);
        let uri = uri.to_string();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(interval).await;
            if let Some(inner) = weak.upgrade() {
                inner.poll_fired(&uri);
            }
        });
        job.arm_poll(handle.abort_handle());
    }

    /// The reload timer fired: clear the spent handle, re-check the reload
    /// guards, and re-run the composed load with the previous options.
    pub(crate) fn poll_fired(self: &Arc<Self>, uri: &str) {
        let mut hooks = Vec::new();
        {
            let mut state = self.state.lock().unwrap();
            let Some(job) = state.jobs.job_mut(uri) else {
                return;
            };
            // the handle is spent; clear it so a later success can re-arm
            job.clear_poll();

            if !job.state().is_loaded() || job.reload_limit() == 0 {
                return;
            }
            job.begin_reload();

            let rule = job.rule();
            let resolved = job.options().clone();
            let load_options = job.load_options().cloned();
            if let Err(error) =
                self.start_load_locked(&mut state, uri, rule, resolved, load_options, &mut hooks)
            {
                self.log
                    .error(&format!("reload of {uri} failed to start: {error}"));
            }
        }
        fire_hooks(hooks);
    }
}
