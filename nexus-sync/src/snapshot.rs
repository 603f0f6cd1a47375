//! Point-in-time iteration for the locked containers.
//!
//! Every `iter`/`handles` method on a synchronized container copies its
//! items while holding the shared lock, releases the lock, and returns a
//! [`Snapshot`] that yields the copies one at a time. Writers are never
//! blocked by an outstanding snapshot, and a snapshot never observes writes
//! made after it was taken.

use std::iter::FusedIterator;
use std::vec;

/// Single-pass iterator over items copied under a container's lock.
///
/// # Example
///
/// ```
/// use nexus_sync::SyncedList;
///
/// let list = SyncedList::new();
/// list.push_back(1);
/// list.push_back(2);
///
/// let snapshot = list.iter();
/// list.push_back(3); // not blocked, not visible below
///
/// let values: Vec<_> = snapshot.map(|(_, v)| v).collect();
/// assert_eq!(values, vec![1, 2]);
/// ```
#[derive(Debug)]
pub struct Snapshot<T> {
    items: vec::IntoIter<T>,
}

impl<T> Snapshot<T> {
    #[inline]
    pub(crate) fn new(items: Vec<T>) -> Self {
        Self {
            items: items.into_iter(),
        }
    }
}

impl<T> Iterator for Snapshot<T> {
    type Item = T;

    #[inline]
    fn next(&mut self) -> Option<T> {
        self.items.next()
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        self.items.size_hint()
    }
}

impl<T> ExactSizeIterator for Snapshot<T> {}

impl<T> FusedIterator for Snapshot<T> {}
