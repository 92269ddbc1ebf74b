//! Dependency-aware job spawning over an external parallel executor.
//!
//! This module is the seam to the parallel task runtime. The bridge itself
//! never executes component-processing work; it only describes units of work
//! and the dependencies between them. [`JobRuntime`] turns that description
//! into submissions against an [`Executor`], the narrow trait an external
//! runtime implements (the default is Rayon's global pool).
//!
//! ## Dependency model
//!
//! [`JobRuntime::spawn`] takes a dependency [`JobHandle`] and a work closure
//! and returns a new handle for the work. The work runs only after every
//! dependency state has completed. Dependencies are tracked with a countdown
//! per spawned job: each incomplete dependency state registers a waiter that
//! decrements the countdown, and the job is submitted to the executor when
//! the countdown hits zero. No worker thread ever blocks on a dependency,
//! which rules out pool starvation no matter how deep a dependency chain is
//! scheduled.
//!
//! ## Batched submission
//!
//! Spawned jobs are *armed* but held until [`JobRuntime::flush`] is called:
//! every spawn carries one extra countdown slot released by the flush. This
//! lets one scheduling call describe work for all matched chunks before any
//! of it starts, and guarantees all jobs are known to the runtime before the
//! caller can wait on anything. A job spawned and never flushed never runs,
//! so every spawn must be paired with a flush (the scheduler flushes once
//! per call, at the end).

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::bridge::handle::{JobHandle, JobState};


/// Executes opaque units of work on a parallel runtime.
///
/// Implementations must not block inside `execute`; work is expected to be
/// queued and run on the runtime's own worker threads.
pub trait Executor: Send + Sync + 'static {
    /// Queues one unit of work for execution.
    fn execute(&self, work: Box<dyn FnOnce() + Send>);
}

/// Executor backed by Rayon's global thread pool.
#[derive(Clone, Copy, Debug, Default)]
pub struct RayonExecutor;

impl Executor for RayonExecutor {
    fn execute(&self, work: Box<dyn FnOnce() + Send>) {
        rayon::spawn(work);
    }
}

/// One spawned unit of work waiting on its dependency countdown.
///
/// ## Invariants
/// * `pending` starts at `1 (batch latch) + number of incomplete dependency
///   states`; the job submits exactly when it reaches zero.
/// * `work` is taken exactly once, by the submission path.
struct SpawnedJob {
    /// Remaining countdown before submission.
    pending: AtomicUsize,

    /// The work closure, taken on submission.
    work: Mutex<Option<Box<dyn FnOnce() + Send>>>,

    /// Completion state backing the handle returned from `spawn`.
    state: Arc<JobState>,

    /// Executor the job is submitted to.
    executor: Arc<dyn Executor>,
}

impl SpawnedJob {
    /// Releases one countdown slot, submitting the job on the last one.
    fn satisfy_one(self: &Arc<Self>) {
        if self.pending.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.submit();
        }
    }

    /// Hands the work to the executor, completing the state afterwards.
    fn submit(self: &Arc<Self>) {
        let work = {
            let mut slot = match self.work.lock() {
                Ok(slot) => slot,
                Err(poisoned) => poisoned.into_inner(),
            };
            slot.take()
        };
        let state = Arc::clone(&self.state);
        self.executor.execute(Box::new(move || {
            if let Some(work) = work {
                work();
            }
            state.complete();
        }));
    }
}

/// Spawns dependency-ordered jobs against an [`Executor`], with batched
/// submission.
///
/// The runtime is shared by reference across one or more scheduling calls;
/// it holds no per-call state beyond the current unflushed batch.
pub struct JobRuntime {
    /// Target executor for submitted jobs.
    executor: Arc<dyn Executor>,

    /// Jobs spawned since the last flush, each holding one latch slot.
    batch: Mutex<Vec<Arc<SpawnedJob>>>,
}

impl Default for JobRuntime {
    fn default() -> Self {
        Self::new()
    }
}

impl JobRuntime {
    /// Creates a runtime over Rayon's global pool.
    pub fn new() -> Self {
        Self::with_executor(Arc::new(RayonExecutor))
    }

    /// Creates a runtime over a caller-provided executor.
    pub fn with_executor(executor: Arc<dyn Executor>) -> Self {
        Self {
            executor,
            batch: Mutex::new(Vec::new()),
        }
    }

    /// Spawns `work` to run after `depends_on` completes.
    ///
    /// Returns a handle that completes when `work` has finished. The work
    /// cannot start before the next [`flush`](JobRuntime::flush), even if
    /// all dependencies are already complete.
    pub fn spawn(
        &self,
        depends_on: &JobHandle,
        work: impl FnOnce() + Send + 'static,
    ) -> JobHandle {
        let dependency_states = depends_on.states();

        // One slot per dependency state plus the batch latch slot.
        let job = Arc::new(SpawnedJob {
            pending: AtomicUsize::new(dependency_states.len() + 1),
            work: Mutex::new(Some(Box::new(work))),
            state: Arc::new(JobState::new()),
            executor: Arc::clone(&self.executor),
        });

        for dependency in dependency_states {
            let waiter_job = Arc::clone(&job);
            if dependency
                .add_waiter(Box::new(move || waiter_job.satisfy_one()))
                .is_err()
            {
                // Dependency completed before the waiter registered.
                job.satisfy_one();
            }
        }

        let handle = JobHandle::from_state(Arc::clone(&job.state));

        let mut batch = match self.batch.lock() {
            Ok(batch) => batch,
            Err(poisoned) => poisoned.into_inner(),
        };
        batch.push(job);

        handle
    }

    /// Releases every job spawned since the previous flush.
    ///
    /// Jobs whose dependencies are already satisfied are submitted to the
    /// executor immediately; the rest submit as their dependencies complete.
    pub fn flush(&self) {
        let jobs = {
            let mut batch = match self.batch.lock() {
                Ok(batch) => batch,
                Err(poisoned) => poisoned.into_inner(),
            };
            std::mem::take(&mut *batch)
        };
        for job in jobs {
            job.satisfy_one();
        }
    }
}

impl std::fmt::Debug for JobRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let queued = match self.batch.lock() {
            Ok(batch) => batch.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        };
        f.debug_struct("JobRuntime").field("queued", &queued).finish()
    }
}
