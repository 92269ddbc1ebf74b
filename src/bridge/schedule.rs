//! The N-ary parallel query scheduler and its aggregate completion handle.
//!
//! This module is the bridge's entry point: [`schedule_query`] turns "a
//! query matched N chunks" into N independently schedulable units of work
//! with one awaitable, idempotently disposable [`QueryJobHandle`].
//!
//! ## Orchestration model
//!
//! The caller's thread runs the orchestration synchronously: it visits each
//! matched chunk, builds a [`JobChunkView`], invokes the user callback to
//! obtain a job handle for that chunk's work, chains pin release behind it,
//! and folds it into the running aggregate. The orchestration never blocks
//! and never waits on a handle; actual work runs on the external executor
//! behind the [`JobRuntime`]. The only blocking operations in the bridge
//! are [`QueryJobHandle::complete`] and
//! [`HazardRegistry::block`](crate::bridge::hazards::HazardRegistry::block),
//! both explicit and caller-invoked.
//!
//! ## Ordering guarantees
//!
//! Within one chunk: the user's work starts no earlier than both the
//! caller's incoming dependency and any previously attached hazard for the
//! chunk's archetype; pin release happens no earlier than that work's
//! completion. Across chunks: nothing — chunks may run fully concurrently.
//!
//! ## Cancellation
//!
//! Not supported. Once scheduled, work runs to completion, and the memory
//! pins can only be reclaimed by completing the aggregate handle, so the
//! handle must always eventually be completed. The `Drop` impl is a safety
//! net that completes (and logs) rather than leaking pinned memory, but
//! call sites should not rely on it.

use tracing::{trace, warn};

use crate::bridge::chunk::JobChunkView;
use crate::bridge::handle::JobHandle;
use crate::bridge::hazards::HazardRegistry;
use crate::bridge::pins::PinRegistry;
use crate::bridge::runtime::JobRuntime;
use crate::bridge::store::QueryChunks;
use crate::bridge::types::ColumnSet;


/// Schedules jobs for matched chunks.
///
/// One call per non-empty matched chunk. The implementation describes the
/// chunk's work to its task runtime, ordered after `depends_on`, and
/// returns the handle for that work. Different jobs may be scheduled for
/// different chunks.
pub trait ChunkJobScheduler {
    /// Schedules this chunk's work and returns its handle.
    ///
    /// `depends_on` combines the caller's incoming dependency with the
    /// hazard record for the chunk's archetype; the scheduled work must not
    /// start before it completes.
    fn schedule(&mut self, chunk: &mut JobChunkView<'_>, depends_on: JobHandle) -> JobHandle;
}

impl<F> ChunkJobScheduler for F
where
    F: FnMut(&mut JobChunkView<'_>, JobHandle) -> JobHandle,
{
    fn schedule(&mut self, chunk: &mut JobChunkView<'_>, depends_on: JobHandle) -> JobHandle {
        self(chunk, depends_on)
    }
}

/// Aggregate completion handle for one scheduling call.
///
/// Wraps the combined handle of every chunk job plus the call's pin
/// registry. **Must** be completed at least once for correctness; after
/// that, completing again is a safe no-op and the inner handle remains
/// independently waitable any number of times.
#[must_use = "the aggregate handle must eventually be completed to release pinned memory"]
pub struct QueryJobHandle {
    /// Combined handle over all chunk jobs and their pin releases.
    handle: JobHandle,

    /// Pins accumulated while preparing this call's work.
    pins: PinRegistry,

    /// Set once `complete` has run; later calls are no-ops.
    completed: bool,
}

impl QueryJobHandle {
    /// Returns a trivially complete handle with no pins.
    ///
    /// Used for queries matching zero chunks; waiting on it is a true
    /// no-op and no tracking state is allocated.
    pub fn ready() -> Self {
        Self {
            handle: JobHandle::ready(),
            pins: PinRegistry::new(),
            completed: true,
        }
    }

    pub(crate) fn new(handle: JobHandle, pins: PinRegistry) -> Self {
        Self {
            handle,
            pins,
            completed: false,
        }
    }

    /// Waits for all chunk jobs, then releases every pin exactly once.
    ///
    /// Idempotent: calling this again after it has run once returns
    /// immediately. Safe in any interleaving with direct waits on
    /// [`handle`](QueryJobHandle::handle).
    pub fn complete(&mut self) {
        if self.completed {
            return;
        }
        self.handle.wait();
        self.pins.release_all();
        self.completed = true;
    }

    /// Non-blocking poll of the inner combined handle.
    pub fn is_complete(&self) -> bool {
        self.handle.is_complete()
    }

    /// The inner combined handle.
    ///
    /// Waiting on it directly is safe, repeatable, and does not release
    /// pins; only [`complete`](QueryJobHandle::complete) does that.
    pub fn handle(&self) -> &JobHandle {
        &self.handle
    }
}

impl Drop for QueryJobHandle {
    fn drop(&mut self) {
        if self.completed {
            return;
        }
        let outstanding = self.pins.outstanding();
        if outstanding > 0 {
            warn!(
                outstanding,
                "query job handle dropped without complete(); completing in drop"
            );
        }
        self.complete();
    }
}

impl std::fmt::Debug for QueryJobHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryJobHandle")
            .field("complete", &self.is_complete())
            .field("pins", &self.pins)
            .finish()
    }
}

/// Schedules jobs over every chunk matched by `query`.
///
/// For each matched, non-empty chunk this: builds a [`JobChunkView`],
/// computes the chunk's effective dependency (incoming dependency combined
/// with the archetype's hazard record), invokes `scheduler` to obtain the
/// chunk's job handle, chains release of the chunk's pins behind that
/// handle, folds the result into the aggregate, and attaches it to the
/// archetype's hazard record. Submission is batched: no job starts before
/// every chunk has been visited and the runtime flushed.
///
/// ## Parameters
/// * `query` — the resolved query, supplied by the external store.
/// * `columns` — descriptors of the columns the jobs will touch; sizes the
///   pin registry and drives debug-mode presence assertions.
/// * `scheduler` — per-chunk scheduling callback.
/// * `hazards` — the per-archetype hazard registry for this store.
/// * `runtime` — dependency-aware spawner over the parallel executor.
/// * `depends_on` — incoming dependency; pass [`JobHandle::ready`] for
///   none.
///
/// ## Returns
/// The aggregate completion handle. It must eventually be completed; see
/// [`QueryJobHandle`].
pub fn schedule_query<Q, S>(
    query: &Q,
    columns: &ColumnSet,
    scheduler: &mut S,
    hazards: &mut HazardRegistry,
    runtime: &JobRuntime,
    depends_on: JobHandle,
) -> QueryJobHandle
where
    Q: QueryChunks + ?Sized,
    S: ChunkJobScheduler,
{
    let chunk_count = query.chunk_count();
    if chunk_count == 0 {
        return QueryJobHandle::ready();
    }

    trace!(chunks = chunk_count, columns = columns.len(), "scheduling query jobs");

    // Worst case one pin per requested column per chunk.
    let pins = PinRegistry::with_capacity(chunk_count * columns.len());
    let mut aggregate = JobHandle::ready();

    query.for_each_chunk(&mut |chunk| {
        // Matched but empty chunks schedule nothing.
        if chunk.entity_count() == 0 {
            return;
        }

        let mut view = JobChunkView::new(chunk, &pins);

        #[cfg(debug_assertions)]
        for request in columns.iter() {
            debug_assert!(
                chunk.has_column(request.element()),
                "query matched a chunk whose archetype lacks requested component `{}`",
                request.element_name()
            );
        }

        let effective = depends_on.combine(&hazards.get(chunk.archetype_id()));
        let job = scheduler.schedule(&mut view, effective);

        // Unpinning must happen strictly after the job stops reading the
        // memory, so it rides behind the job's handle.
        let slots = view.take_pin_slots();
        let chained = if slots.is_empty() {
            job
        } else {
            let registry = pins.clone();
            runtime.spawn(&job, move || registry.release_slots(&slots))
        };

        hazards.attach(chunk.archetype_id(), chained.clone());
        aggregate = aggregate.combine(&chained);
    });

    // Batched submission: every job is armed before the caller can wait.
    runtime.flush();

    QueryJobHandle::new(aggregate, pins)
}
