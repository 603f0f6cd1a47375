//! Slab-backed storage issuing generational handles.
//!
//! Storage provides insert/remove/get operations where handles remain valid
//! until explicitly removed. Slot indices are recycled by the underlying
//! [`slab::Slab`], but every insert stamps a fresh generation, so a handle
//! that outlived its element is detected instead of aliasing the new
//! occupant of the slot.

use std::sync::atomic::{AtomicU64, Ordering};

use slab::Slab;

use crate::{Handle, HandleError};

/// Source of per-instance owner ids.
static NEXT_OWNER: AtomicU64 = AtomicU64::new(1);

#[inline]
fn next_owner() -> u64 {
    NEXT_OWNER.fetch_add(1, Ordering::Relaxed)
}

#[derive(Debug)]
struct Slot<T> {
    generation: u64,
    value: T,
}

/// Growable storage with stable, never-reissued handles.
///
/// # Requirements upheld
///
/// - **Stable handles**: a handle remains valid until its element is removed
/// - **O(1)** insert, remove, get
/// - **Slot reuse**: removed slots are reused, generations are not
///
/// # Example
///
/// ```
/// use nexus_sync::Arena;
///
/// let mut arena = Arena::new();
/// let a = arena.insert(42);
/// assert_eq!(arena.get(a), Some(&42));
///
/// assert_eq!(arena.remove(a), Ok(42));
/// let b = arena.insert(7);
/// assert!(arena.get(a).is_none()); // stale, even if b reused the slot
/// assert_eq!(arena.get(b), Some(&7));
/// ```
#[derive(Debug)]
pub struct Arena<T> {
    slots: Slab<Slot<T>>,
    owner: u64,
    next_generation: u64,
}

impl<T> Arena<T> {
    /// Creates empty storage.
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Creates empty storage with room for `capacity` elements before
    /// reallocating.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Slab::with_capacity(capacity),
            owner: next_owner(),
            next_generation: 0,
        }
    }

    /// Returns the id stamped into every handle this storage issues.
    #[inline]
    pub fn owner(&self) -> u64 {
        self.owner
    }

    /// Returns the number of occupied slots.
    #[inline]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Returns `true` if no slots are occupied.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Inserts a value, returning its handle.
    pub fn insert(&mut self, value: T) -> Handle {
        let generation = self.next_generation;
        self.next_generation += 1;
        let index = self.slots.insert(Slot { generation, value });
        Handle::new(self.owner, index, generation)
    }

    /// Validates `handle` against this storage and returns its slot index.
    ///
    /// # Errors
    ///
    /// - [`HandleError::Foreign`] if another instance issued the handle
    /// - [`HandleError::Stale`] if the element has been removed
    pub fn resolve(&self, handle: Handle) -> Result<usize, HandleError> {
        if handle.owner != self.owner {
            return Err(HandleError::Foreign {
                owner: handle.owner,
                expected: self.owner,
            });
        }
        match self.slots.get(handle.index) {
            Some(slot) if slot.generation == handle.generation => Ok(handle.index),
            _ => Err(HandleError::Stale {
                index: handle.index,
                generation: handle.generation,
            }),
        }
    }

    /// Returns `true` if `handle` refers to a live element of this storage.
    #[inline]
    pub fn contains(&self, handle: Handle) -> bool {
        self.resolve(handle).is_ok()
    }

    /// Returns a reference to the value for `handle`, if live.
    #[inline]
    pub fn get(&self, handle: Handle) -> Option<&T> {
        let index = self.resolve(handle).ok()?;
        Some(self.at(index))
    }

    /// Returns a mutable reference to the value for `handle`, if live.
    #[inline]
    pub fn get_mut(&mut self, handle: Handle) -> Option<&mut T> {
        let index = self.resolve(handle).ok()?;
        Some(self.at_mut(index))
    }

    /// Removes and returns the value for `handle`.
    ///
    /// # Errors
    ///
    /// Returns the same errors as [`resolve`](Self::resolve). Storage is
    /// unchanged on error.
    pub fn remove(&mut self, handle: Handle) -> Result<T, HandleError> {
        let index = self.resolve(handle)?;
        Ok(self.take(index))
    }

    /// Drops every value. Handles issued before the call stay invalid forever.
    pub fn clear(&mut self) {
        self.slots.clear();
    }

    // ========================================================================
    // Index-level access for node structures that already hold a validated
    // index. Panics on a vacant slot.
    // ========================================================================

    #[inline]
    pub(crate) fn at(&self, index: usize) -> &T {
        &self.slots[index].value
    }

    #[inline]
    pub(crate) fn at_mut(&mut self, index: usize) -> &mut T {
        &mut self.slots[index].value
    }

    #[inline]
    pub(crate) fn take(&mut self, index: usize) -> T {
        self.slots.remove(index).value
    }

    #[inline]
    pub(crate) fn handle_at(&self, index: usize) -> Handle {
        Handle::new(self.owner, index, self.slots[index].generation)
    }
}

impl<T> Default for Arena<T> {
    fn default() -> Self {
        Self::new()
    }
}
