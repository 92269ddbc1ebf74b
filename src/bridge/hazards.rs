//! Per-archetype tracking of in-flight scheduled work.
//!
//! Scheduled jobs read (and write) column memory owned by archetypes that
//! the store may want to mutate structurally — move entities, resize
//! columns, destroy chunks. The store cannot see job handles on its own, so
//! the bridge keeps a **hazard record** per archetype: the combined handle
//! of the most recent work known to touch that archetype's storage.
//!
//! Two parties use the registry:
//!
//! - the scheduler reads a chunk's hazard before invoking the callback (new
//!   work starts no earlier than prior work on the same archetype) and
//!   attaches the chunk's final handle afterwards;
//! - the store calls [`HazardRegistry::block`] before a structural mutation,
//!   waiting out anything still in flight.
//!
//! Records persist across scheduling calls for the lifetime of their
//! archetype; attach only ever folds new handles in, and `block` is the one
//! operation that forgets a record (after waiting on it).
//!
//! ## Synchronization
//!
//! The registry does no internal locking. `attach` and `block` take
//! `&mut self`, so exclusive mutation is compiler-enforced; callers that
//! genuinely need multi-writer access wrap the registry in their own mutex.

use std::collections::HashMap;

use crate::bridge::handle::JobHandle;
use crate::bridge::types::ArchetypeID;


/// Per-archetype record of the latest outstanding job handles.
#[derive(Default)]
pub struct HazardRegistry {
    /// Most recent combined handle per archetype.
    records: HashMap<ArchetypeID, JobHandle>,
}

impl HazardRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds `handle` into the record for `id`.
    ///
    /// Monotonic: after `attach(id, h1)` and `attach(id, h2)`, the record
    /// depends on both `h1` and `h2`. Handles that have already completed
    /// fall out of the combination, so records do not grow without bound.
    pub fn attach(&mut self, id: ArchetypeID, handle: JobHandle) {
        let record = match self.records.remove(&id) {
            Some(existing) => existing.combine(&handle),
            None => handle,
        };
        self.records.insert(id, record);
    }

    /// Returns the current record for `id`, or a ready handle if none.
    ///
    /// Never errors, never blocks.
    pub fn get(&self, id: ArchetypeID) -> JobHandle {
        self.records
            .get(&id)
            .cloned()
            .unwrap_or_else(JobHandle::ready)
    }

    /// Waits on the record for `id` (if any) and forgets it.
    ///
    /// For the store to call before a structural mutation that would race
    /// with in-flight work. A subsequent [`get`](HazardRegistry::get)
    /// returns a ready handle.
    pub fn block(&mut self, id: ArchetypeID) {
        if let Some(record) = self.records.remove(&id) {
            record.wait();
        }
    }

    /// Number of archetypes with a record attached.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns `true` if no records are attached.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl std::fmt::Debug for HazardRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HazardRegistry")
            .field("records", &self.records.len())
            .finish()
    }
}
