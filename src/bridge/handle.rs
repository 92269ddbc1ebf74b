//! Combinable, repeatably awaitable job completion tokens.
//!
//! This module implements [`JobHandle`], the completion token the rest of
//! the bridge composes. A handle represents "some set of scheduled work has
//! finished" and supports exactly the operations the scheduling algorithm
//! needs:
//!
//! - **Combine:** two handles merge into one that completes only when both
//!   inputs complete. Combination is associative and pure; it never consumes
//!   either input.
//! - **Wait:** blocking wait, safe to call any number of times from any
//!   number of threads. Waiting has no side effects beyond blocking, so a
//!   handle is never "used up".
//! - **Poll:** non-blocking completion check.
//!
//! ## Representation
//!
//! A handle is a small list of shared completion states, one per underlying
//! unit of work. Each state is a completion flag plus a condvar for blocking
//! waiters and a list of waiter callbacks for non-blocking chaining (used by
//! the runtime's dependency counting). Combining concatenates the lists,
//! pruning states that already completed and deduplicating shared states, so
//! long attach chains do not grow without bound.
//!
//! An **empty** list is the already-complete handle: [`JobHandle::ready`]
//! allocates nothing, completes immediately, and is the identity element of
//! [`JobHandle::combine`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};

use smallvec::SmallVec;


/// Callback invoked (exactly once) when a completion state completes.
pub(crate) type Waiter = Box<dyn FnOnce() + Send>;

/// Shared completion state for one unit of scheduled work.
///
/// ## Invariants
/// * `complete` transitions the state at most once; waiter callbacks run
///   exactly once, outside the internal lock.
/// * The atomic flag is set under the lock, so a waiter registered before
///   the transition is always invoked.
pub(crate) struct JobState {
    /// Fast-path completion flag for non-blocking polls.
    flag: AtomicBool,

    /// Slow-path state: completion bit plus registered waiters.
    inner: Mutex<StateInner>,

    /// Signalled once on completion.
    on_complete: Condvar,
}

struct StateInner {
    complete: bool,
    waiters: Vec<Waiter>,
}

impl JobState {
    pub(crate) fn new() -> Self {
        Self {
            flag: AtomicBool::new(false),
            inner: Mutex::new(StateInner {
                complete: false,
                waiters: Vec::new(),
            }),
            on_complete: Condvar::new(),
        }
    }

    /// Marks the state complete and runs all registered waiters.
    ///
    /// Safe to call more than once; only the first call transitions and the
    /// waiters run exactly once. Callbacks execute outside the lock.
    pub(crate) fn complete(&self) {
        let waiters = {
            let mut inner = match self.inner.lock() {
                Ok(inner) => inner,
                Err(poisoned) => poisoned.into_inner(),
            };
            if inner.complete {
                return;
            }
            inner.complete = true;
            self.flag.store(true, Ordering::Release);
            self.on_complete.notify_all();
            std::mem::take(&mut inner.waiters)
        };

        for waiter in waiters {
            waiter();
        }
    }

    /// Returns `true` if the state has completed.
    #[inline]
    pub(crate) fn is_complete(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }

    /// Blocks until the state completes.
    pub(crate) fn wait(&self) {
        if self.is_complete() {
            return;
        }
        let mut inner = match self.inner.lock() {
            Ok(inner) => inner,
            Err(poisoned) => poisoned.into_inner(),
        };
        while !inner.complete {
            inner = match self.on_complete.wait(inner) {
                Ok(inner) => inner,
                Err(poisoned) => poisoned.into_inner(),
            };
        }
    }

    /// Registers a waiter callback, or hands it back if already complete.
    ///
    /// On `Err` the state has already completed and the caller must invoke
    /// the returned callback itself.
    pub(crate) fn add_waiter(&self, waiter: Waiter) -> Result<(), Waiter> {
        let mut inner = match self.inner.lock() {
            Ok(inner) => inner,
            Err(poisoned) => poisoned.into_inner(),
        };
        if inner.complete {
            return Err(waiter);
        }
        inner.waiters.push(waiter);
        Ok(())
    }
}

/// Opaque, combinable, repeatably awaitable token for scheduled work.
///
/// Cloning a handle is cheap and shares the underlying completion states;
/// all clones observe the same completion. The default handle is
/// [`JobHandle::ready`].
///
/// ## Guarantees
/// * Waiting multiple times, from multiple callers, is safe and never
///   double-runs completion side effects.
/// * [`combine`](JobHandle::combine) is associative with `ready()` as
///   identity.
#[derive(Clone, Default)]
pub struct JobHandle {
    /// Completion states this handle waits on. Empty means already complete.
    states: SmallVec<[Arc<JobState>; 2]>,
}

impl JobHandle {
    /// Returns an already-complete handle. Allocates nothing.
    #[inline]
    pub fn ready() -> Self {
        Self::default()
    }

    /// Creates a handle completed externally through the paired signal.
    ///
    /// The handle completes when [`JobSignal::set`] is called. Useful for
    /// injecting controllable dependencies, e.g. gating scheduled work on an
    /// event the task runtime does not know about.
    pub fn deferred() -> (JobHandle, JobSignal) {
        let state = Arc::new(JobState::new());
        let handle = JobHandle::from_state(Arc::clone(&state));
        (handle, JobSignal { state })
    }

    pub(crate) fn from_state(state: Arc<JobState>) -> Self {
        let mut states = SmallVec::new();
        states.push(state);
        Self { states }
    }

    pub(crate) fn states(&self) -> &[Arc<JobState>] {
        &self.states
    }

    /// Returns `true` if all underlying work has completed.
    pub fn is_complete(&self) -> bool {
        self.states.iter().all(|state| state.is_complete())
    }

    /// Blocks until all underlying work has completed.
    ///
    /// Repeatable: returns immediately once complete, no matter how many
    /// callers have already waited.
    pub fn wait(&self) {
        for state in &self.states {
            state.wait();
        }
    }

    /// Combines two handles into one that completes when both complete.
    ///
    /// Neither input is consumed or invalidated. States that have already
    /// completed are pruned and states shared between the inputs are kept
    /// once, so repeated folding (the hazard registry's attach chain, the
    /// scheduler's aggregate) stays small.
    pub fn combine(&self, other: &JobHandle) -> JobHandle {
        let mut states: SmallVec<[Arc<JobState>; 2]> = SmallVec::new();
        for state in self.states.iter().chain(other.states.iter()) {
            if state.is_complete() {
                continue;
            }
            if states.iter().any(|kept| Arc::ptr_eq(kept, state)) {
                continue;
            }
            states.push(Arc::clone(state));
        }
        JobHandle { states }
    }
}

impl std::fmt::Debug for JobHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobHandle")
            .field("states", &self.states.len())
            .field("complete", &self.is_complete())
            .finish()
    }
}

/// Completes the paired deferred [`JobHandle`].
///
/// Setting the signal more than once is a no-op; dropping it without setting
/// completes the handle as well, so a deferred handle can never be waited on
/// forever by accident.
pub struct JobSignal {
    state: Arc<JobState>,
}

impl JobSignal {
    /// Completes the paired handle. Idempotent.
    pub fn set(&self) {
        self.state.complete();
    }
}

impl Drop for JobSignal {
    fn drop(&mut self) {
        self.state.complete();
    }
}
