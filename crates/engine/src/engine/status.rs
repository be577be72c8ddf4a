//! Status queries and unload.

use crate::job::Job;
use crate::registry::JobMatcher;

use super::Engine;

impl<T: Clone + Send + Sync + 'static> Engine<T> {
    /// Is ANY matching job currently loading (first load or reload)?
    /// Unknown URIs are not loading.
    pub fn loading(&self, matcher: impl Into<JobMatcher>) -> bool {
        self.any_job(matcher.into(), |job| job.state().is_loading())
    }

    /// Is ANY matching job in its reload phase?
    pub fn reloading(&self, matcher: impl Into<JobMatcher>) -> bool {
        self.any_job(matcher.into(), |job| job.state().is_reloading())
    }

    /// Has ANY matching job failed?
    pub fn failed(&self, matcher: impl Into<JobMatcher>) -> bool {
        self.any_job(matcher.into(), |job| job.state().is_failed())
    }

    /// Is EVERY queried resource loaded? Each element of the query must
    /// select at least one cached job, and every selected job must be
    /// loaded; an unknown URI makes the whole query false.
    pub fn loaded(&self, matcher: impl Into<JobMatcher>) -> bool {
        let matcher = matcher.into();
        let state = self.inner.state.lock().unwrap();

        let leaves = matcher.leaves();
        if leaves.is_empty() {
            return false;
        }
        leaves.iter().all(|leaf| {
            let uris = state.jobs.match_jobs(leaf);
            !uris.is_empty()
                && uris.iter().all(|uri| {
                    state
                        .jobs
                        .job(uri)
                        .map(|job| job.state().is_loaded())
                        .unwrap_or(false)
                })
        })
    }

    /// Unload every matching job that is not currently loading: cancel its
    /// reload timer, run its rule's unload hook, drop it from the registry.
    /// An in-flight job is left alone (no mid-flight abort).
    ///
    /// Returns whether all matched jobs ended up absent; `false` when
    /// nothing matched.
    pub fn unload(&self, matcher: impl Into<JobMatcher>) -> bool {
        let matcher = matcher.into();
        let mut removed = Vec::new();

        let all_absent = {
            let mut state = self.inner.state.lock().unwrap();
            let uris = state.jobs.match_jobs(&matcher);
            if uris.is_empty() {
                return false;
            }

            let mut all_absent = true;
            for uri in uris {
                self.inner.log.log(&format!("unload: {uri}"));
                let loading = state
                    .jobs
                    .job(&uri)
                    .map(|job| job.state().is_loading())
                    .unwrap_or(false);
                if !loading {
                    if let Some(job) = state.jobs.remove(&uri) {
                        removed.push(job);
                    }
                }
                all_absent &= state.jobs.job(&uri).is_none();
            }
            all_absent
        };

        // unload hooks are user code; run them outside the engine lock
        for mut job in removed {
            job.on_unload();
        }
        all_absent
    }

    /// Unload every cached job.
    pub fn reset(&self) {
        self.unload(JobMatcher::everything());
    }

    fn any_job(&self, matcher: JobMatcher, test: impl Fn(&Job<T>) -> bool) -> bool {
        self.inner.state.lock().unwrap().jobs.any(&matcher, test)
    }
}
