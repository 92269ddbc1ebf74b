//! Core identifiers and column descriptors for the job bridge.
//!
//! This module defines the **fundamental types** shared across the bridge:
//!
//! - Numeric identifiers for archetypes and chunks, matching the identifier
//!   scheme of the external column store,
//! - [`ColumnRequest`] and [`ColumnSet`], the bounded column-descriptor list
//!   that parameterizes a scheduling call over any number of simultaneously
//!   accessed component columns (up to [`MAX_ARITY`]).
//!
//! ## Column descriptors
//!
//! A scheduling call names the component columns its jobs will touch through
//! a [`ColumnSet`]. The set serves two purposes:
//!
//! - it sizes the pin registry up front (`chunks × columns` pins worst case),
//! - it drives debug-mode presence assertions against each matched chunk.
//!
//! The set is a single generic path: one descriptor per requested column,
//! however many columns a call needs, instead of one specialized code path
//! per column count.

use std::any::{type_name, TypeId};

use smallvec::SmallVec;

use crate::bridge::error::ArityError;


/// Unique identifier for an archetype, assigned by the external store.
pub type ArchetypeID = u16;

/// Chunk index within an archetype, assigned by the external store.
pub type ChunkID = u16;

/// Maximum number of component columns one scheduling call may request.
pub const MAX_ARITY: usize = 16;

/// Describes one component column requested by a scheduling call.
///
/// Carries the element [`TypeId`] for presence checks and the element type
/// name for diagnostics.
#[derive(Clone, Copy, Debug)]
pub struct ColumnRequest {
    /// Element type of the requested column.
    element: TypeId,

    /// Human-readable element type name.
    element_name: &'static str,
}

impl ColumnRequest {
    /// Creates a descriptor for component type `T`.
    #[inline]
    pub fn of<T: 'static + Send + Sync>() -> Self {
        Self {
            element: TypeId::of::<T>(),
            element_name: type_name::<T>(),
        }
    }

    /// Returns the element [`TypeId`] of the requested column.
    #[inline]
    pub fn element(&self) -> TypeId {
        self.element
    }

    /// Returns the element type name of the requested column.
    #[inline]
    pub fn element_name(&self) -> &'static str {
        self.element_name
    }
}

/// Bounded list of component columns requested by one scheduling call.
///
/// Built incrementally with [`ColumnSet::with`]:
///
/// ```ignore
/// let columns = ColumnSet::new()
///     .with::<Position>()
///     .with::<Velocity>();
/// ```
///
/// ## Invariants
/// * Holds at most [`MAX_ARITY`] descriptors; exceeding the cap is a
///   programming error and panics.
#[derive(Clone, Debug, Default)]
pub struct ColumnSet {
    /// Requested column descriptors, in declaration order.
    requests: SmallVec<[ColumnRequest; MAX_ARITY]>,
}

impl ColumnSet {
    /// Creates an empty column set.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a descriptor for component type `T`.
    ///
    /// ## Panics
    /// Panics if the set already holds [`MAX_ARITY`] descriptors.
    pub fn with<T: 'static + Send + Sync>(mut self) -> Self {
        if self.requests.len() >= MAX_ARITY {
            panic!(
                "{}",
                ArityError {
                    requested: self.requests.len() + 1,
                    capacity: MAX_ARITY,
                }
            );
        }
        self.requests.push(ColumnRequest::of::<T>());
        self
    }

    /// Returns the number of requested columns.
    #[inline]
    pub fn len(&self) -> usize {
        self.requests.len()
    }

    /// Returns `true` if no columns were requested.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    /// Iterates over the requested column descriptors.
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &ColumnRequest> {
        self.requests.iter()
    }
}
