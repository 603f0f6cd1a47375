//! Hash map guarded by a single reader/writer lock.

use std::borrow::Borrow;
use std::collections::HashMap;
use std::hash::{BuildHasher, Hash};

use ahash::RandomState;
use log::debug;
use parking_lot::RwLock;

use crate::Snapshot;

/// A `HashMap` behind one reader/writer lock.
///
/// Lookups take the shared lock; `insert`, `remove`, `remove_batch` and
/// `clear` take the exclusive lock. Absence is never an error.
///
/// The hasher defaults to [`ahash::RandomState`].
///
/// # Example
///
/// ```
/// use nexus_sync::SyncedMap;
///
/// let map = SyncedMap::new();
/// map.insert("k", 1);
/// map.insert("k", 2);
/// assert_eq!(map.get("k"), Some(2));
///
/// map.insert("a", 10);
/// map.insert("b", 20);
/// assert_eq!(map.remove_batch(["a", "k", "missing"].iter()), 2);
/// assert_eq!(map.len(), 1);
/// assert!(map.contains_key("b"));
/// ```
#[derive(Debug)]
pub struct SyncedMap<K, V, S = RandomState> {
    inner: RwLock<HashMap<K, V, S>>,
}

impl<K, V> SyncedMap<K, V, RandomState> {
    /// Creates an empty map.
    pub fn new() -> Self {
        Self::with_hasher(RandomState::new())
    }

    /// Creates an empty map with room for `capacity` entries.
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_capacity_and_hasher(capacity, RandomState::new())
    }
}

impl<K, V, S> SyncedMap<K, V, S> {
    /// Creates an empty map using `hasher`.
    pub fn with_hasher(hasher: S) -> Self {
        Self {
            inner: RwLock::new(HashMap::with_hasher(hasher)),
        }
    }

    /// Creates an empty map with room for `capacity` entries using `hasher`.
    pub fn with_capacity_and_hasher(capacity: usize, hasher: S) -> Self {
        Self {
            inner: RwLock::new(HashMap::with_capacity_and_hasher(capacity, hasher)),
        }
    }

    /// Returns the number of entries.
    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    /// Returns `true` if the map has no entries.
    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }

    /// Drops every entry.
    pub fn clear(&self) {
        let mut map = self.inner.write();
        let dropped = map.len();
        map.clear();
        debug!("synced map: cleared {dropped} entries");
    }

    /// Consumes the lock, returning the inner map.
    pub fn into_inner(self) -> HashMap<K, V, S> {
        self.inner.into_inner()
    }
}

impl<K, V, S> SyncedMap<K, V, S>
where
    K: Hash + Eq,
    S: BuildHasher,
{
    /// Returns `true` if `key` is present.
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.inner.read().contains_key(key)
    }

    /// Applies `f` to the value for `key` under the shared lock.
    pub fn get_with<Q, R>(&self, key: &Q, f: impl FnOnce(&V) -> R) -> Option<R>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.inner.read().get(key).map(f)
    }

    /// Inserts or overwrites, returning the previous value.
    pub fn insert(&self, key: K, value: V) -> Option<V> {
        self.inner.write().insert(key, value)
    }

    /// Removes `key`, returning its value. No-op if absent.
    pub fn remove<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.inner.write().remove(key)
    }

    /// Removes every key in `keys` under one exclusive lock.
    ///
    /// Absent keys are skipped. Returns how many entries were removed.
    pub fn remove_batch<'q, Q, I>(&self, keys: I) -> usize
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized + 'q,
        I: IntoIterator<Item = &'q Q>,
    {
        let mut map = self.inner.write();
        keys.into_iter()
            .filter(|key| map.remove(*key).is_some())
            .count()
    }
}

impl<K, V, S> SyncedMap<K, V, S>
where
    K: Hash + Eq,
    V: Clone,
    S: BuildHasher,
{
    /// Returns a clone of the value for `key`.
    pub fn get<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.get_with(key, V::clone)
    }
}

impl<K: Clone, V: Clone, S> SyncedMap<K, V, S> {
    /// Returns a snapshot of all `(key, value)` pairs in unspecified order.
    pub fn iter(&self) -> Snapshot<(K, V)> {
        let map = self.inner.read();
        Snapshot::new(map.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
    }
}

impl<K, V, S: Default> Default for SyncedMap<K, V, S> {
    fn default() -> Self {
        Self::with_hasher(S::default())
    }
}

impl<K, V, S> FromIterator<(K, V)> for SyncedMap<K, V, S>
where
    K: Hash + Eq,
    S: BuildHasher + Default,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            inner: RwLock::new(iter.into_iter().collect()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_map_is_empty() {
        let map: SyncedMap<u32, u32> = SyncedMap::new();
        assert!(map.is_empty());
        assert_eq!(map.len(), 0);
        assert_eq!(map.get(&1), None);
        assert!(!map.contains_key(&1));
    }

    #[test]
    fn insert_overwrites() {
        let map = SyncedMap::new();
        assert_eq!(map.insert("k", 1), None);
        assert_eq!(map.insert("k", 2), Some(1));
        assert_eq!(map.get("k"), Some(2));
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn remove_absent_is_noop() {
        let map = SyncedMap::new();
        map.insert(1u32, "one");
        assert_eq!(map.remove(&2), None);
        assert_eq!(map.remove(&1), Some("one"));
        assert_eq!(map.remove(&1), None);
        assert!(map.is_empty());
    }

    #[test]
    fn remove_batch_removes_exactly_listed_keys() {
        let map: SyncedMap<u32, u32> = (0..10).map(|i| (i, i * 10)).collect();
        let removed = map.remove_batch(&[1, 3, 5, 42]);
        assert_eq!(removed, 3);
        assert_eq!(map.len(), 7);

        for k in [1, 3, 5] {
            assert!(!map.contains_key(&k));
        }
        for k in [0, 2, 4, 6, 7, 8, 9] {
            assert_eq!(map.get(&k), Some(k * 10));
        }
    }

    #[test]
    fn borrowed_lookups() {
        let map = SyncedMap::new();
        map.insert(String::from("alpha"), 1);
        assert!(map.contains_key("alpha"));
        assert_eq!(map.get_with("alpha", |v| v + 1), Some(2));
        assert_eq!(map.remove("alpha"), Some(1));
    }

    #[test]
    fn iter_snapshot() {
        let map = SyncedMap::new();
        map.insert(1u32, 'a');
        map.insert(2, 'b');

        let snapshot = map.iter();
        map.insert(3, 'c');
        map.remove(&1);

        let mut pairs: Vec<_> = snapshot.collect();
        pairs.sort_unstable();
        assert_eq!(pairs, vec![(1, 'a'), (2, 'b')]);
    }

    #[test]
    fn clear_drops_everything() {
        let map = SyncedMap::with_capacity(4);
        map.insert(1u32, 1u32);
        map.insert(2, 2);
        map.clear();
        assert!(map.is_empty());
        assert_eq!(map.get(&1), None);
        assert!(map.into_inner().is_empty());
    }

    #[test]
    fn custom_hasher() {
        let map: SyncedMap<u32, u32, std::collections::hash_map::RandomState> =
            SyncedMap::default();
        map.insert(7, 49);
        assert_eq!(map.get(&7), Some(49));
    }
}
