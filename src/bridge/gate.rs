//! Deferred completion of accumulated query job handles.
//!
//! Hosts that schedule work across a frame usually do not want to complete
//! each [`QueryJobHandle`] at its call site; they gather handles as systems
//! run and settle all of them at a frame boundary. [`CompletionGate`] is
//! that collection point: handles go in during the frame, one
//! [`complete_all`](CompletionGate::complete_all) at the boundary waits
//! them out and releases their pins.
//!
//! Dropping a non-empty gate completes everything it still holds, so a
//! gate that goes out of scope early cannot leak pinned memory.

use crate::bridge::schedule::QueryJobHandle;


/// A collection of aggregate handles completed together.
#[derive(Default)]
pub struct CompletionGate {
    handles: Vec<QueryJobHandle>,
}

impl CompletionGate {
    /// Creates an empty gate.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a handle to be completed at the next `complete_all`.
    pub fn add(&mut self, handle: QueryJobHandle) {
        self.handles.push(handle);
    }

    /// Completes every held handle and empties the gate.
    ///
    /// Blocks until all held work has finished; every pin behind the held
    /// handles is released. Calling on an empty gate is a no-op.
    pub fn complete_all(&mut self) {
        for mut handle in self.handles.drain(..) {
            handle.complete();
        }
    }

    /// Number of handles currently held.
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    /// Returns `true` if the gate holds no handles.
    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }
}

impl Drop for CompletionGate {
    fn drop(&mut self) {
        self.complete_all();
    }
}

impl std::fmt::Debug for CompletionGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompletionGate")
            .field("held", &self.handles.len())
            .finish()
    }
}
