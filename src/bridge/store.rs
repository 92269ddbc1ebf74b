//! External-collaborator contracts for the column store and query engine.
//!
//! The bridge never owns entity storage. Queries are matched, chunks are
//! laid out, and columns are allocated by an external store; the bridge only
//! observes them for the duration of one scheduling call. This module
//! defines the narrow, object-safe traits that boundary is expressed
//! through, plus [`ColumnRef`], the type-erased column slice the store
//! hands across it.
//!
//! ## Contract summary
//!
//! - [`QueryChunks`]: a resolved query — how many chunks matched, iterate
//!   them. The bridge places no ordering requirement on iteration; whatever
//!   order the store produces is the order chunks are visited.
//! - [`ChunkAccess`]: one matched chunk — entity count, owning archetype,
//!   presence checks, and raw column access.
//! - [`ColumnRef`]: a raw column slice paired with a refcounted keep-alive
//!   for its backing buffer. The keep-alive is what the bridge pins.

use std::any::{Any, TypeId};
use std::sync::Arc;

use crate::bridge::types::{ArchetypeID, ChunkID};


/// Type-erased view of one component column of one chunk, handed out by the
/// external store.
///
/// Pairs a raw element pointer and length with a keep-alive handle to the
/// backing buffer. As long as any clone of `keep_alive` is held, the store
/// guarantees the pointed-to memory neither moves nor is freed; dropping the
/// last clone returns that guarantee to the store.
pub struct ColumnRef {
    /// First element of the chunk's slice of the column.
    ptr: *mut u8,

    /// Number of elements in the slice.
    len: usize,

    /// Element type stored in the column.
    element: TypeId,

    /// Human-readable element type name, for diagnostics.
    element_name: &'static str,

    /// Refcounted keep-alive for the backing buffer.
    keep_alive: Arc<dyn Any + Send + Sync>,
}

// The raw pointer is only dereferenced through typed views whose validity
// is guaranteed by the pin held for `keep_alive`.
unsafe impl Send for ColumnRef {}
unsafe impl Sync for ColumnRef {}

impl ColumnRef {
    /// Wraps a raw column slice produced by the store.
    ///
    /// ## Safety
    /// * `ptr` must be valid for reads and writes of `len` elements of `T`
    ///   for as long as any clone of `keep_alive` is held.
    /// * The address of `ptr` must not change while `keep_alive` is held.
    /// * No other live alias may be used to access the slice concurrently
    ///   with scheduled jobs, except as serialized by handle dependencies.
    pub unsafe fn from_raw_parts<T: 'static + Send + Sync>(
        ptr: *mut T,
        len: usize,
        keep_alive: Arc<dyn Any + Send + Sync>,
    ) -> Self {
        Self {
            ptr: ptr.cast(),
            len,
            element: TypeId::of::<T>(),
            element_name: std::any::type_name::<T>(),
            keep_alive,
        }
    }

    /// Returns the element type stored in the column.
    #[inline]
    pub fn element(&self) -> TypeId {
        self.element
    }

    /// Returns the element type name stored in the column.
    #[inline]
    pub fn element_name(&self) -> &'static str {
        self.element_name
    }

    /// Returns the number of elements in the slice.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if the slice is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Identity of the backing buffer, used to pin each buffer once.
    #[inline]
    pub(crate) fn backing_identity(&self) -> usize {
        Arc::as_ptr(&self.keep_alive) as *const u8 as usize
    }

    /// Returns the typed element pointer if `T` matches the stored type.
    #[inline]
    pub(crate) fn typed_ptr<T: 'static>(&self) -> Option<*mut T> {
        if self.element == TypeId::of::<T>() {
            Some(self.ptr.cast())
        } else {
            None
        }
    }

    /// Consumes the ref, returning the keep-alive to hold as a pin guard.
    pub(crate) fn into_keep_alive(self) -> Arc<dyn Any + Send + Sync> {
        self.keep_alive
    }
}

impl std::fmt::Debug for ColumnRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ColumnRef")
            .field("element", &self.element_name)
            .field("len", &self.len)
            .finish()
    }
}

/// One matched storage chunk, observed through the store.
///
/// Implemented by the external store; all methods are cheap queries with no
/// side effects.
pub trait ChunkAccess {
    /// Number of live entities in the chunk.
    fn entity_count(&self) -> usize;

    /// Identifier of the archetype that owns the chunk.
    fn archetype_id(&self) -> ArchetypeID;

    /// Index of the chunk within its archetype.
    fn chunk_id(&self) -> ChunkID;

    /// Returns `true` if the chunk's archetype contains a column with the
    /// given element type.
    fn has_column(&self, element: TypeId) -> bool;

    /// Returns the chunk's slice of the column with the given element type,
    /// or `None` if the archetype lacks it.
    fn column(&self, element: TypeId) -> Option<ColumnRef>;
}

/// A query already resolved to its matched chunks by the external store.
///
/// The bridge asks only two things of a resolved query: how many chunks
/// matched, and to visit each of them once.
pub trait QueryChunks {
    /// Number of matched chunks.
    fn chunk_count(&self) -> usize;

    /// Visits every matched chunk once, in store order.
    fn for_each_chunk(&self, visit: &mut dyn FnMut(&dyn ChunkAccess));
}
