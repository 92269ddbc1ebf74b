//! Per-call registry of pinned column backing memory.
//!
//! While one scheduling call prepares work, every column handed to a job
//! must be **pinned**: its backing memory must not move or be freed until
//! the job (and anything chained after it) has finished. The column store
//! may reuse or reallocate backing buffers between calls, so pins are
//! accumulated per scheduling call and never cached globally.
//!
//! A pin is a type-erased keep-alive guard, in practice a refcounted clone
//! of the column's backing buffer. Holding the guard keeps the address
//! stable; dropping it is the release. Releasing early is a
//! use-after-free-class hazard, so release happens in exactly two places:
//!
//! - the per-chunk continuation the scheduler chains after a chunk's job,
//! - [`PinRegistry::release_all`] when the aggregate handle completes.
//!
//! Both paths release each pin at most once: pins live in take-once slots,
//! so the paths can overlap without double-release.

use std::any::Any;
use std::sync::{Arc, Mutex};


/// Type-erased keep-alive guard for one pinned backing buffer.
pub type PinGuard = Box<dyn Any + Send>;

/// Append-only collection of pins accumulated by one scheduling call.
///
/// Cloning the registry shares the underlying table; the scheduler keeps one
/// clone inside each per-chunk release continuation and hands the original
/// to the aggregate completion handle.
///
/// ## Invariants
/// * Slots are take-once: a pin is dropped by whichever release path
///   reaches it first, never both.
/// * `release_all` leaves the registry empty; a second call is a no-op.
#[derive(Clone)]
pub struct PinRegistry {
    inner: Arc<Mutex<Vec<Option<PinGuard>>>>,
}

impl PinRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Creates an empty registry sized for an expected number of pins.
    ///
    /// The hint is `matched chunks × requested columns`, the worst case for
    /// one scheduling call, to avoid reallocation while pinning.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Vec::with_capacity(capacity))),
        }
    }

    /// Registers a pin and returns its slot index.
    ///
    /// The guard is held until the slot is released.
    pub fn register(&self, guard: PinGuard) -> usize {
        let mut pins = self.lock();
        let slot = pins.len();
        pins.push(Some(guard));
        slot
    }

    /// Releases the pins in the given slots. Already-released slots are
    /// skipped.
    pub fn release_slots(&self, slots: &[usize]) {
        let released: Vec<PinGuard> = {
            let mut pins = self.lock();
            slots
                .iter()
                .filter_map(|&slot| pins.get_mut(slot).and_then(Option::take))
                .collect()
        };
        // Guards drop outside the lock.
        drop(released);
    }

    /// Releases every remaining pin and clears the registry.
    pub fn release_all(&self) {
        let released: Vec<Option<PinGuard>> = {
            let mut pins = self.lock();
            std::mem::take(&mut *pins)
        };
        drop(released);
    }

    /// Returns the number of pins not yet released.
    pub fn outstanding(&self) -> usize {
        self.lock().iter().filter(|slot| slot.is_some()).count()
    }

    /// Returns the total number of registered slots, released or not.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Returns `true` if no pins were ever registered.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Option<PinGuard>>> {
        match self.inner.lock() {
            Ok(pins) => pins,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl Default for PinRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for PinRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PinRegistry")
            .field("slots", &self.len())
            .field("outstanding", &self.outstanding())
            .finish()
    }
}
