//! Stable element handles.
//!
//! A [`Handle`] names one element of one list instance. It stays valid until
//! that element is removed, and it is never reissued afterwards: the slot index
//! may be reused by a later insert, but the generation will differ.

use core::fmt;

/// Opaque reference to a list element.
///
/// Handles are cheap to copy and hash, so they can be stored in side tables
/// (the [`KeyedDeque`](crate::KeyedDeque) reverse index is one).
///
/// A handle carries three parts:
///
/// - `owner`: id of the list instance that issued it
/// - `index`: slot in that list's storage
/// - `generation`: per-instance insert counter at the time of issue
///
/// Two handles compare equal only if all three match, so a handle from a
/// different instance or from a removed element never aliases a live one.
///
/// # Example
///
/// ```
/// use nexus_sync::SyncedList;
///
/// let list = SyncedList::new();
/// let a = list.push_back("a");
/// let b = list.push_back("b");
/// assert_ne!(a, b);
///
/// assert_eq!(list.remove(a), Ok("a"));
/// let c = list.push_back("c"); // may reuse a's slot
/// assert_ne!(a, c);
/// assert!(!list.contains(a));
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Handle {
    pub(crate) owner: u64,
    pub(crate) index: usize,
    pub(crate) generation: u64,
}

impl Handle {
    #[inline]
    pub(crate) const fn new(owner: u64, index: usize, generation: u64) -> Self {
        Self {
            owner,
            index,
            generation,
        }
    }

    /// Returns the id of the instance that issued this handle.
    #[inline]
    pub const fn owner(&self) -> u64 {
        self.owner
    }

    /// Returns the generation stamp of this handle.
    ///
    /// Generations are strictly increasing per instance, so later pushes
    /// always carry a larger stamp than earlier ones.
    #[inline]
    pub const fn generation(&self) -> u64 {
        self.generation
    }
}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Handle({}:{}v{})", self.owner, self.index, self.generation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn equality_requires_all_parts() {
        let h = Handle::new(1, 4, 7);
        assert_eq!(h, Handle::new(1, 4, 7));
        assert_ne!(h, Handle::new(2, 4, 7));
        assert_ne!(h, Handle::new(1, 5, 7));
        assert_ne!(h, Handle::new(1, 4, 8));
    }

    #[test]
    fn hashes_as_distinct_keys() {
        let set: HashSet<Handle> = [
            Handle::new(1, 0, 0),
            Handle::new(1, 0, 1),
            Handle::new(2, 0, 0),
        ]
        .into_iter()
        .collect();
        assert_eq!(set.len(), 3);
    }

    #[test]
    fn debug_format() {
        assert_eq!(format!("{:?}", Handle::new(3, 9, 12)), "Handle(3:9v12)");
    }
}
