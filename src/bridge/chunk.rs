//! Per-chunk façade handed to scheduling callbacks.
//!
//! [`JobChunkView`] wraps one matched chunk for the duration of one
//! scheduling callback. It exposes the chunk's entity count and, per
//! requested component, a [`ColumnView`] — a fixed-address typed view of
//! the chunk's slice of that component's column. Taking a view pins the
//! column's backing buffer as a side effect, so the memory cannot move or
//! be freed while the scheduled job reads it.
//!
//! ## Pinning
//!
//! Pins are created lazily, on first view of each backing buffer, and
//! recorded both in the call-wide [`PinRegistry`](crate::bridge::pins::PinRegistry)
//! and in the view's own slot list. The scheduler takes the slot list after
//! the callback returns and chains "release these slots" onto the chunk's
//! job handle. Two requested columns backed by the same buffer pin it once.
//!
//! ## Safety model
//!
//! A [`ColumnView`] is a raw pointer and a length; it is valid exactly as
//! long as its pin is held, and conflicting access between jobs must be
//! serialized through handle dependencies. As with the rest of the bridge,
//! safety is enforced by API discipline, not the borrow checker: the view is
//! only reachable inside a scheduling callback, the pin outlives the job by
//! construction, and the hazard registry orders overlapping work.

use std::any::TypeId;
use std::marker::PhantomData;

use smallvec::SmallVec;

use crate::bridge::error::{ColumnTypeError, MissingComponentError, ViewError};
use crate::bridge::pins::PinRegistry;
use crate::bridge::store::ChunkAccess;
use crate::bridge::types::{ArchetypeID, ChunkID};


/// Fixed-address typed view of one chunk's slice of one component column.
///
/// Sized to the chunk's entity count. The address is stable until the pin
/// registered when the view was taken is released, which the scheduler
/// guarantees happens no earlier than the completion of the job the view
/// was handed to.
pub struct ColumnView<T> {
    ptr: *mut T,
    len: usize,
    marker: PhantomData<*mut T>,
}

// Views are moved into scheduled jobs. The pin keeps the memory valid; the
// dependency chain serializes conflicting access.
unsafe impl<T: Send> Send for ColumnView<T> {}
unsafe impl<T: Sync> Sync for ColumnView<T> {}

impl<T> ColumnView<T> {
    /// Number of elements in the view (the chunk's entity count).
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if the view covers no entities.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns the view as a shared slice.
    #[inline]
    pub fn as_slice(&self) -> &[T] {
        // Valid while the pin taken with this view is held.
        unsafe { std::slice::from_raw_parts(self.ptr, self.len) }
    }

    /// Returns the view as a mutable slice.
    ///
    /// Callers must not hand mutable views of the same column to two jobs
    /// that can run concurrently; ordering overlapping work is what the
    /// hazard registry and dependency handles are for.
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        unsafe { std::slice::from_raw_parts_mut(self.ptr, self.len) }
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for ColumnView<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ColumnView").field("len", &self.len).finish()
    }
}

/// Façade over one matched chunk, alive for one scheduling callback.
///
/// Created by the scheduler per non-empty matched chunk. Component views
/// taken through it register pins in the scheduling call's registry; the
/// scheduler collects the registered slots afterwards to chain their
/// release behind the chunk's job.
pub struct JobChunkView<'a> {
    /// The matched chunk, observed through the store.
    chunk: &'a dyn ChunkAccess,

    /// Call-wide pin registry.
    pins: &'a PinRegistry,

    /// Backing buffers already pinned by this view (identity, slot).
    pinned: SmallVec<[(usize, usize); 4]>,
}

impl<'a> JobChunkView<'a> {
    pub(crate) fn new(chunk: &'a dyn ChunkAccess, pins: &'a PinRegistry) -> Self {
        Self {
            chunk,
            pins,
            pinned: SmallVec::new(),
        }
    }

    /// Number of live entities in the chunk.
    #[inline]
    pub fn entity_count(&self) -> usize {
        self.chunk.entity_count()
    }

    /// Identifier of the archetype that owns the chunk.
    #[inline]
    pub fn archetype_id(&self) -> ArchetypeID {
        self.chunk.archetype_id()
    }

    /// Index of the chunk within its archetype.
    #[inline]
    pub fn chunk_id(&self) -> ChunkID {
        self.chunk.chunk_id()
    }

    /// Returns `true` if the chunk's archetype contains component `T`.
    ///
    /// Pure query, no side effects.
    #[inline]
    pub fn has_component<T: 'static + Send + Sync>(&self) -> bool {
        self.chunk.has_column(TypeId::of::<T>())
    }

    /// Returns a fixed-address typed view of component `T`'s column,
    /// pinning the backing buffer on first access.
    ///
    /// ## Panics
    /// Panics if the chunk's archetype lacks component `T` or stores it
    /// with a different element type. Both are contract violations: the
    /// query is required to match only chunks carrying every requested
    /// component.
    pub fn component_view<T: 'static + Send + Sync>(&mut self) -> ColumnView<T> {
        match self.try_component_view::<T>() {
            Ok(view) => view,
            Err(error) => panic!("{error}"),
        }
    }

    /// Fallible form of [`component_view`](JobChunkView::component_view).
    pub fn try_component_view<T: 'static + Send + Sync>(
        &mut self,
    ) -> Result<ColumnView<T>, ViewError> {
        let column = self.chunk.column(TypeId::of::<T>()).ok_or(
            MissingComponentError {
                component: std::any::type_name::<T>(),
            },
        )?;

        let ptr = column.typed_ptr::<T>().ok_or(ColumnTypeError {
            expected: std::any::type_name::<T>(),
            actual: column.element_name(),
        })?;

        let entity_count = self.chunk.entity_count();
        debug_assert!(
            column.len() >= entity_count,
            "column slice shorter than chunk entity count ({} < {})",
            column.len(),
            entity_count
        );

        // Pin each backing buffer once per view.
        let identity = column.backing_identity();
        if !self.pinned.iter().any(|&(id, _)| id == identity) {
            let slot = self.pins.register(Box::new(column.into_keep_alive()));
            self.pinned.push((identity, slot));
        }

        Ok(ColumnView {
            ptr,
            len: entity_count,
            marker: PhantomData,
        })
    }

    /// Takes the pin slots registered through this view.
    ///
    /// The scheduler chains their release behind the chunk's job handle.
    pub(crate) fn take_pin_slots(&mut self) -> Vec<usize> {
        self.pinned.drain(..).map(|(_, slot)| slot).collect()
    }
}

impl std::fmt::Debug for JobChunkView<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobChunkView")
            .field("archetype", &self.archetype_id())
            .field("chunk", &self.chunk_id())
            .field("entities", &self.entity_count())
            .field("pinned", &self.pinned.len())
            .finish()
    }
}
