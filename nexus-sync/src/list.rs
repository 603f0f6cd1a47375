//! Doubly-linked lists handing out stable handles.
//!
//! [`List`] is the unsynchronized core: nodes live in an [`Arena`], links are
//! slot indices, and every insert returns a [`Handle`] that allows O(1)
//! removal from anywhere. [`SyncedList`] wraps a `List` in a single
//! reader/writer lock.
//!
//! # Handle Discipline
//!
//! A handle is valid only on the instance that issued it and only until its
//! element is removed or the list is cleared. Positional operations
//! (`insert_before`, `insert_after`, `remove`) reject invalid handles with a
//! [`HandleError`] and leave the list untouched.
//!
//! # Example
//!
//! ```
//! use nexus_sync::List;
//!
//! let mut list = List::new();
//!
//! let a = list.push_back(1);
//! let b = list.push_back(2);
//! let c = list.push_back(3);
//!
//! assert_eq!(list.len(), 3);
//! assert_eq!(list.get(b), Some(&2));
//!
//! // Remove from middle - O(1)
//! assert_eq!(list.remove(b), Ok(2));
//! assert_eq!(list.len(), 2);
//!
//! // The handle is dead now
//! assert!(list.remove(b).is_err());
//!
//! assert_eq!(list.pop_front(), Some(1));
//! assert_eq!(list.front(), Some(c));
//! # let _ = a;
//! ```

use log::debug;
use parking_lot::RwLock;

use crate::{Arena, Handle, HandleError, Rejected, Snapshot};

/// Sentinel for an empty link.
const NONE: usize = usize::MAX;

#[derive(Debug)]
struct Node<T> {
    value: T,
    prev: usize,
    next: usize,
}

impl<T> Node<T> {
    #[inline]
    fn new(value: T) -> Self {
        Self {
            value,
            prev: NONE,
            next: NONE,
        }
    }
}

/// A doubly-linked list over slab storage.
///
/// The list tracks head and tail indices; the arena tracks length.
#[derive(Debug)]
pub struct List<T> {
    arena: Arena<Node<T>>,
    head: usize,
    tail: usize,
}

impl<T> Default for List<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> List<T> {
    /// Creates an empty list.
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Creates an empty list with room for `capacity` elements.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            arena: Arena::with_capacity(capacity),
            head: NONE,
            tail: NONE,
        }
    }

    /// Returns the number of elements in the list.
    #[inline]
    pub fn len(&self) -> usize {
        self.arena.len()
    }

    /// Returns `true` if the list is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }

    /// Returns the head element's handle, or `None` if empty.
    #[inline]
    pub fn front(&self) -> Option<Handle> {
        self.handle_at(self.head)
    }

    /// Returns the tail element's handle, or `None` if empty.
    #[inline]
    pub fn back(&self) -> Option<Handle> {
        self.handle_at(self.tail)
    }

    /// Returns a reference to the front element.
    #[inline]
    pub fn front_value(&self) -> Option<&T> {
        if self.head == NONE {
            None
        } else {
            Some(&self.arena.at(self.head).value)
        }
    }

    /// Returns a reference to the back element.
    #[inline]
    pub fn back_value(&self) -> Option<&T> {
        if self.tail == NONE {
            None
        } else {
            Some(&self.arena.at(self.tail).value)
        }
    }

    /// Returns `true` if `handle` refers to a live element of this list.
    #[inline]
    pub fn contains(&self, handle: Handle) -> bool {
        self.arena.contains(handle)
    }

    /// Validates `handle` against this list.
    ///
    /// # Errors
    ///
    /// [`HandleError::Foreign`] or [`HandleError::Stale`].
    #[inline]
    pub fn check(&self, handle: Handle) -> Result<(), HandleError> {
        self.resolve(handle).map(|_| ())
    }

    /// Returns a reference to the element for `handle`.
    #[inline]
    pub fn get(&self, handle: Handle) -> Option<&T> {
        self.arena.get(handle).map(|node| &node.value)
    }

    /// Returns a mutable reference to the element for `handle`.
    #[inline]
    pub fn get_mut(&mut self, handle: Handle) -> Option<&mut T> {
        self.arena.get_mut(handle).map(|node| &mut node.value)
    }

    // ========================================================================
    // Insert operations
    // ========================================================================

    /// Pushes a value to the back of the list.
    pub fn push_back(&mut self, value: T) -> Handle {
        let handle = self.arena.insert(Node::new(value));
        self.link_back(handle.index);
        handle
    }

    /// Pushes a value to the front of the list.
    pub fn push_front(&mut self, value: T) -> Handle {
        let handle = self.arena.insert(Node::new(value));
        self.link_front(handle.index);
        handle
    }

    /// Inserts a value immediately before `mark`.
    ///
    /// # Errors
    ///
    /// Returns [`Rejected`] carrying `value` back if `mark` is stale or
    /// foreign. The list is unchanged.
    pub fn insert_before(&mut self, value: T, mark: Handle) -> Result<Handle, Rejected<T>> {
        let before = match self.resolve(mark) {
            Ok(index) => index,
            Err(error) => return Err(Rejected { value, error }),
        };
        let handle = self.arena.insert(Node::new(value));
        self.link_before(before, handle.index);
        Ok(handle)
    }

    /// Inserts a value immediately after `mark`.
    ///
    /// # Errors
    ///
    /// Returns [`Rejected`] carrying `value` back if `mark` is stale or
    /// foreign. The list is unchanged.
    pub fn insert_after(&mut self, value: T, mark: Handle) -> Result<Handle, Rejected<T>> {
        let after = match self.resolve(mark) {
            Ok(index) => index,
            Err(error) => return Err(Rejected { value, error }),
        };
        let handle = self.arena.insert(Node::new(value));
        self.link_after(after, handle.index);
        Ok(handle)
    }

    // ========================================================================
    // Remove operations (unlink + deallocate)
    // ========================================================================

    /// Removes an element by handle.
    ///
    /// # Errors
    ///
    /// [`HandleError::Foreign`] or [`HandleError::Stale`]. An element is
    /// never removed twice.
    pub fn remove(&mut self, handle: Handle) -> Result<T, HandleError> {
        let index = self.resolve(handle)?;
        self.unlink(index);
        Ok(self.arena.take(index).value)
    }

    /// Removes and returns the front element.
    pub fn pop_front(&mut self) -> Option<T> {
        if self.head == NONE {
            return None;
        }
        let index = self.head;
        self.unlink(index);
        Some(self.arena.take(index).value)
    }

    /// Removes and returns the back element.
    pub fn pop_back(&mut self) -> Option<T> {
        if self.tail == NONE {
            return None;
        }
        let index = self.tail;
        self.unlink(index);
        Some(self.arena.take(index).value)
    }

    /// Removes all elements. Every handle issued so far becomes stale.
    pub fn clear(&mut self) {
        self.arena.clear();
        self.head = NONE;
        self.tail = NONE;
    }

    // ========================================================================
    // Iteration
    // ========================================================================

    /// Returns an iterator over `(handle, &value)`, front to back.
    #[inline]
    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            list: self,
            current: self.head,
            remaining: self.len(),
        }
    }

    /// Returns an iterator over handles, front to back.
    ///
    /// Collect the handles first if you plan to modify the list.
    #[inline]
    pub fn handles(&self) -> Handles<'_, T> {
        Handles { inner: self.iter() }
    }

    // ========================================================================
    // Internal links
    // ========================================================================

    fn resolve(&self, handle: Handle) -> Result<usize, HandleError> {
        self.arena.resolve(handle).inspect_err(|err| {
            debug!("list {}: rejected {handle:?}: {err}", self.arena.owner());
        })
    }

    #[inline]
    fn handle_at(&self, index: usize) -> Option<Handle> {
        if index == NONE {
            None
        } else {
            Some(self.arena.handle_at(index))
        }
    }

    fn link_back(&mut self, index: usize) {
        let tail = self.tail;
        let node = self.arena.at_mut(index);
        node.prev = tail;
        node.next = NONE;

        if tail != NONE {
            self.arena.at_mut(tail).next = index;
        } else {
            self.head = index;
        }
        self.tail = index;
    }

    fn link_front(&mut self, index: usize) {
        let head = self.head;
        let node = self.arena.at_mut(index);
        node.next = head;
        node.prev = NONE;

        if head != NONE {
            self.arena.at_mut(head).prev = index;
        } else {
            self.tail = index;
        }
        self.head = index;
    }

    fn link_after(&mut self, after: usize, index: usize) {
        let next = self.arena.at(after).next;
        let node = self.arena.at_mut(index);
        node.prev = after;
        node.next = next;

        self.arena.at_mut(after).next = index;
        if next != NONE {
            self.arena.at_mut(next).prev = index;
        } else {
            self.tail = index;
        }
    }

    fn link_before(&mut self, before: usize, index: usize) {
        let prev = self.arena.at(before).prev;
        let node = self.arena.at_mut(index);
        node.next = before;
        node.prev = prev;

        self.arena.at_mut(before).prev = index;
        if prev != NONE {
            self.arena.at_mut(prev).next = index;
        } else {
            self.head = index;
        }
    }

    fn unlink(&mut self, index: usize) {
        let node = self.arena.at(index);
        let prev = node.prev;
        let next = node.next;

        if prev != NONE {
            self.arena.at_mut(prev).next = next;
        } else {
            self.head = next;
        }

        if next != NONE {
            self.arena.at_mut(next).prev = prev;
        } else {
            self.tail = prev;
        }

        let node = self.arena.at_mut(index);
        node.prev = NONE;
        node.next = NONE;
    }
}

// =============================================================================
// Iterators
// =============================================================================

/// Iterator over `(handle, &value)` pairs of a [`List`].
pub struct Iter<'a, T> {
    list: &'a List<T>,
    current: usize,
    remaining: usize,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = (Handle, &'a T);

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        if self.current == NONE {
            return None;
        }
        let index = self.current;
        let node = self.list.arena.at(index);
        self.current = node.next;
        self.remaining -= 1;
        Some((self.list.arena.handle_at(index), &node.value))
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<T> ExactSizeIterator for Iter<'_, T> {}

/// Iterator over the handles of a [`List`].
pub struct Handles<'a, T> {
    inner: Iter<'a, T>,
}

impl<T> Iterator for Handles<'_, T> {
    type Item = Handle;

    #[inline]
    fn next(&mut self) -> Option<Handle> {
        self.inner.next().map(|(handle, _)| handle)
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<T> ExactSizeIterator for Handles<'_, T> {}

// =============================================================================
// SyncedList
// =============================================================================

/// A [`List`] guarded by a single reader/writer lock.
///
/// Reads (`front`, `back`, `len`, `get*`, `contains`) take the shared lock;
/// every mutation takes the exclusive lock. Each method is one critical
/// section.
///
/// Iteration copies under the shared lock and yields lock-free; see
/// [`Snapshot`].
///
/// # Example
///
/// ```
/// use nexus_sync::SyncedList;
///
/// let list = SyncedList::new();
/// let a = list.push_back("a");
/// let c = list.push_back("c");
/// list.insert_after("b", a).unwrap();
///
/// let values: Vec<_> = list.iter().map(|(_, v)| v).collect();
/// assert_eq!(values, vec!["a", "b", "c"]);
///
/// assert_eq!(list.remove(c), Ok("c"));
/// assert!(list.remove(c).is_err());
/// ```
#[derive(Debug)]
pub struct SyncedList<T> {
    inner: RwLock<List<T>>,
}

impl<T> Default for SyncedList<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> SyncedList<T> {
    /// Creates an empty list.
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Creates an empty list with room for `capacity` elements.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: RwLock::new(List::with_capacity(capacity)),
        }
    }

    /// Returns the number of elements.
    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    /// Returns `true` if the list is empty.
    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }

    /// Returns the head element's handle.
    pub fn front(&self) -> Option<Handle> {
        self.inner.read().front()
    }

    /// Returns the tail element's handle.
    pub fn back(&self) -> Option<Handle> {
        self.inner.read().back()
    }

    /// Returns `true` if `handle` is live in this list.
    pub fn contains(&self, handle: Handle) -> bool {
        self.inner.read().contains(handle)
    }

    /// Applies `f` to the element for `handle` under the shared lock.
    pub fn get_with<R>(&self, handle: Handle, f: impl FnOnce(&T) -> R) -> Option<R> {
        self.inner.read().get(handle).map(f)
    }

    /// Applies `f` to the element for `handle` under the exclusive lock.
    pub fn get_mut_with<R>(&self, handle: Handle, f: impl FnOnce(&mut T) -> R) -> Option<R> {
        self.inner.write().get_mut(handle).map(f)
    }

    /// Applies `f` to the front element under the shared lock.
    pub fn front_with<R>(&self, f: impl FnOnce(&T) -> R) -> Option<R> {
        self.inner.read().front_value().map(f)
    }

    /// Applies `f` to the back element under the shared lock.
    pub fn back_with<R>(&self, f: impl FnOnce(&T) -> R) -> Option<R> {
        self.inner.read().back_value().map(f)
    }

    /// Pushes a value to the front.
    pub fn push_front(&self, value: T) -> Handle {
        self.inner.write().push_front(value)
    }

    /// Pushes a value to the back.
    pub fn push_back(&self, value: T) -> Handle {
        self.inner.write().push_back(value)
    }

    /// Inserts a value immediately before `mark`.
    ///
    /// # Errors
    ///
    /// See [`List::insert_before`].
    pub fn insert_before(&self, value: T, mark: Handle) -> Result<Handle, Rejected<T>> {
        self.inner.write().insert_before(value, mark)
    }

    /// Inserts a value immediately after `mark`.
    ///
    /// # Errors
    ///
    /// See [`List::insert_after`].
    pub fn insert_after(&self, value: T, mark: Handle) -> Result<Handle, Rejected<T>> {
        self.inner.write().insert_after(value, mark)
    }

    /// Removes an element by handle.
    ///
    /// # Errors
    ///
    /// See [`List::remove`].
    pub fn remove(&self, handle: Handle) -> Result<T, HandleError> {
        self.inner.write().remove(handle)
    }

    /// Removes and returns the front element.
    pub fn pop_front(&self) -> Option<T> {
        self.inner.write().pop_front()
    }

    /// Removes and returns the back element.
    pub fn pop_back(&self) -> Option<T> {
        self.inner.write().pop_back()
    }

    /// Removes all elements. Every handle issued so far becomes stale.
    pub fn clear(&self) {
        let mut list = self.inner.write();
        let dropped = list.len();
        list.clear();
        debug!("synced list: cleared {dropped} elements");
    }

    /// Returns a snapshot of all handles, front to back.
    pub fn handles(&self) -> Snapshot<Handle> {
        let list = self.inner.read();
        Snapshot::new(list.handles().collect())
    }

    /// Consumes the lock, returning the inner list.
    pub fn into_inner(self) -> List<T> {
        self.inner.into_inner()
    }
}

impl<T: Clone> SyncedList<T> {
    /// Returns a clone of the element for `handle`.
    pub fn get(&self, handle: Handle) -> Option<T> {
        self.get_with(handle, T::clone)
    }

    /// Returns a snapshot of `(handle, value)` pairs, front to back.
    pub fn iter(&self) -> Snapshot<(Handle, T)> {
        let list = self.inner.read();
        Snapshot::new(
            list.iter()
                .map(|(handle, value)| (handle, value.clone()))
                .collect(),
        )
    }
}

impl<T> From<List<T>> for SyncedList<T> {
    fn from(list: List<T>) -> Self {
        Self {
            inner: RwLock::new(list),
        }
    }
}
