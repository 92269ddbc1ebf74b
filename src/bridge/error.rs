//! Error types for column access and scheduling contract violations.
//!
//! This module declares focused error types used across the job bridge. Each
//! error models a single failure mode and carries enough context to make the
//! failure actionable (requested vs. actual types, offending counts).
//!
//! ## Propagation policy
//!
//! The bridge is a synchronous in-process adapter, not an I/O boundary, so
//! almost every failure here is a *contract violation* by the caller:
//! requesting a component absent from a matched chunk, viewing a column with
//! the wrong element type, or exceeding the column-count cap. Those are
//! surfaced two ways:
//!
//! - the `try_*` accessors return these types through `Result`,
//! - the panicking accessors format them into the panic message, so the
//!   fail-fast path and the fallible path report identically.
//!
//! Benign empty results (zero matched chunks, empty chunks) are never
//! errors; they are silent no-ops by design.

use std::fmt;


/// Returned when a scheduling call requests a component column that the
/// matched chunk's archetype does not contain.
///
/// The query builder of the external store is responsible for ensuring every
/// matched chunk carries every requested component; hitting this error means
/// the query and the column set disagree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MissingComponentError {
    /// Element type name of the absent component.
    pub component: &'static str,
}

impl fmt::Display for MissingComponentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "chunk archetype does not contain component `{}`",
            self.component
        )
    }
}

impl std::error::Error for MissingComponentError {}

/// Returned when a column exists but its element type does not match the
/// type requested by the view accessor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnTypeError {
    /// Element type name the caller requested.
    pub expected: &'static str,

    /// Element type name the column actually stores.
    pub actual: &'static str,
}

impl fmt::Display for ColumnTypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "column element type mismatch (requested `{}`, stored `{}`)",
            self.expected, self.actual
        )
    }
}

impl std::error::Error for ColumnTypeError {}

/// Returned when a scheduling call requests more simultaneous component
/// columns than the bridge supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArityError {
    /// Number of columns the call attempted to request.
    pub requested: usize,

    /// Maximum number of columns supported per call.
    pub capacity: usize,
}

impl fmt::Display for ArityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "too many requested columns ({} requested; cap {})",
            self.requested, self.capacity
        )
    }
}

impl std::error::Error for ArityError {}

/// Aggregate error for typed column view access.
///
/// Produced by the fallible `try_component_view` accessor; the panicking
/// accessor formats the same values into its panic message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewError {
    /// The chunk's archetype lacks the requested component.
    MissingComponent(MissingComponentError),

    /// The column stores a different element type.
    ColumnType(ColumnTypeError),
}

impl fmt::Display for ViewError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ViewError::MissingComponent(e) => e.fmt(f),
            ViewError::ColumnType(e) => e.fmt(f),
        }
    }
}

impl std::error::Error for ViewError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ViewError::MissingComponent(e) => Some(e),
            ViewError::ColumnType(e) => Some(e),
        }
    }
}

impl From<MissingComponentError> for ViewError {
    fn from(error: MissingComponentError) -> Self {
        ViewError::MissingComponent(error)
    }
}

impl From<ColumnTypeError> for ViewError {
    fn from(error: ColumnTypeError) -> Self {
        ViewError::ColumnType(error)
    }
}
