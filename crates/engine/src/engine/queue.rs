//! Background FIFO work queue and the self-rescheduling poll loop.

use std::sync::{Arc, Weak};
use std::time::Duration;

use loadstone_core::error::EngineError;
use loadstone_core::load::SharedLoad;
use loadstone_core::uri::{canonical_uri, UriSpec};
use tracing::debug;

use super::{fire_hooks, Engine, EngineInner, EngineState, PendingHooks};

impl<T: Clone + Send + Sync + 'static> Engine<T> {
    /// Queue URIs for background loading. Work is consumed oldest-first by
    /// [`work_next_job`](Engine::work_next_job) and the poll loop.
    pub fn enqueue(&self, specs: impl IntoIterator<Item = impl Into<UriSpec>>) {
        let uris: Vec<String> = specs
            .into_iter()
            .map(|spec| canonical_uri(&spec.into()))
            .collect();

        let mut state = self.inner.state.lock().unwrap();
        self.inner
            .log
            .log(&format!("enqueue ({}) {uris:?}", state.queue.len()));
        for uri in uris {
            state.queue.push_front(uri);
        }
    }

    /// Pop the oldest queued URI and start loading it. `None` when the
    /// queue is empty.
    pub fn work_next_job(&self) -> Option<Result<SharedLoad<T>, EngineError>> {
        let mut hooks = Vec::new();
        let result = {
            let mut state = self.inner.state.lock().unwrap();
            self.inner.work_next_job_locked(&mut state, &mut hooks)
        };
        fire_hooks(hooks);
        result
    }

    /// How many URIs are waiting in the background queue.
    pub fn queue_depth(&self) -> usize {
        self.inner.state.lock().unwrap().queue.len()
    }

    /// Arm the background poll loop. Idempotent. The loop works the queue
    /// for the engine's lifetime or until [`dispose`](Engine::dispose).
    pub fn start(&self) {
        let mut guard = self.inner.poll_task.lock().unwrap();
        if guard.is_some() {
            return;
        }
        debug!("starting poll loop");
        let weak = Arc::downgrade(&self.inner);
        let interval = self.inner.config.poll_interval;
        let handle = tokio::spawn(poll_loop(weak, interval));
        *guard = Some(handle.abort_handle());
    }
}

impl<T: Clone + Send + Sync + 'static> EngineInner<T> {
    pub(crate) fn work_next_job_locked(
        self: &Arc<Self>,
        state: &mut EngineState<T>,
        hooks: &mut PendingHooks<T>,
    ) -> Option<Result<SharedLoad<T>, EngineError>> {
        let uri = state.queue.pop_back()?;
        self.log
            .log(&format!("workNextJob ({})", state.queue.len()));
        Some(self.load_locked(state, &uri, None, hooks))
    }
}

/// Work one queued job, then reschedule: immediately after its future
/// settles (success or failure), or after `interval` when the queue was
/// empty. A queued URI matching no rule is reported and skipped rather
/// than stalling the loop.
async fn poll_loop<T: Clone + Send + Sync + 'static>(
    weak: Weak<EngineInner<T>>,
    interval: Duration,
) {
    loop {
        let next = {
            let Some(inner) = weak.upgrade() else { return };
            let mut hooks = Vec::new();
            let result = {
                let mut state = inner.state.lock().unwrap();
                inner.work_next_job_locked(&mut state, &mut hooks)
            };
            fire_hooks(hooks);
            result
            // drop the Arc before awaiting so the loop never keeps a
            // disposed engine alive
        };

        match next {
            Some(Ok(shared)) => {
                let _ = shared.await;
            }
            Some(Err(error)) => {
                if let Some(inner) = weak.upgrade() {
                    inner.log.error(&error.to_string());
                }
            }
            None => tokio::time::sleep(interval).await,
        }
    }
}
