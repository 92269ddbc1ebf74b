//! # Chunk Jobs
//!
//! Parallel job scheduling bridge over the chunked, column-oriented storage
//! of an entity/component store.
//!
//! The bridge turns "a query matched N chunks" into N independently
//! schedulable units of parallel work with a single awaitable, idempotently
//! disposable completion handle, while preserving two invariants the store
//! cannot enforce on its own:
//!
//! - memory handed to a running job is **pinned**: it neither moves nor is
//!   freed until the job (and everything chained after it) finishes,
//! - jobs touching overlapping storage for the same archetype are
//!   **ordered** through per-archetype hazard records.
//!
//! ## Design Goals
//! - One generic scheduling path for any number of requested columns
//! - Non-blocking orchestration; blocking only at explicit completion points
//! - Safe, explicit resource lifetime management (pin, release exactly once)
//! - Narrow trait seams to the external store and task runtime

#![forbid(unsafe_op_in_unsafe_fn)]
#![warn(missing_docs)]

pub mod bridge;

// ─────────────────────────────────────────────────────────────────────────────
// Re-exports (Public API)
// ─────────────────────────────────────────────────────────────────────────────

// Handles and runtime

pub use bridge::handle::{
    JobHandle,
    JobSignal,
};

pub use bridge::runtime::{
    Executor,
    JobRuntime,
    RayonExecutor,
};

// Scheduling

pub use bridge::schedule::{
    schedule_query,
    ChunkJobScheduler,
    QueryJobHandle,
};

pub use bridge::chunk::{
    ColumnView,
    JobChunkView,
};

pub use bridge::gate::CompletionGate;

// Safety adapters

pub use bridge::hazards::HazardRegistry;
pub use bridge::pins::{PinGuard, PinRegistry};

// Store boundary

pub use bridge::store::{
    ChunkAccess,
    ColumnRef,
    QueryChunks,
};

pub use bridge::types::{
    ArchetypeID,
    ChunkID,
    ColumnRequest,
    ColumnSet,
    MAX_ARITY,
};

pub use bridge::error::{
    ArityError,
    ColumnTypeError,
    MissingComponentError,
    ViewError,
};

// ─────────────────────────────────────────────────────────────────────────────
// Prelude (Optional but recommended)
// ─────────────────────────────────────────────────────────────────────────────

/// Commonly used bridge types.
///
/// Import with:
/// ```rust
/// use chunk_jobs::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        schedule_query,
        ChunkJobScheduler,
        ColumnSet,
        CompletionGate,
        HazardRegistry,
        JobChunkView,
        JobHandle,
        JobRuntime,
        QueryJobHandle,
    };
}
