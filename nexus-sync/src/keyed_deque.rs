//! Ordered deque with O(1) keyed access and last-write-wins updates.
//!
//! A [`KeyedDeque`] is a [`List`] plus two side tables, all behind one
//! reader/writer lock:
//!
//! ```text
//! index:   key    -> handle   (key lookup / delete)
//! reverse: handle -> key      (remove by handle, pop)
//! list:    handle -> value    (ordering)
//! ```
//!
//! # Invariant
//!
//! After every operation, for every key `k` in `index`:
//!
//! - `reverse[index[k]] == k`
//! - the list element at `index[k]` is the value last pushed for `k`
//! - `index`, `reverse` and the list have the same length
//!
//! The three tables are only touched while the write lock is held, so no
//! reader observes a key that is missing from one table and present in
//! another.
//!
//! # Example
//!
//! ```
//! use nexus_sync::KeyedDeque;
//!
//! let deque = KeyedDeque::new();
//! deque.push("a", 1);
//! deque.push("b", 2);
//! deque.push("a", 3); // replaces "a" and moves it to the back
//!
//! let values: Vec<_> = deque.iter().map(|(_, v)| v).collect();
//! assert_eq!(values, vec![2, 3]);
//! assert_eq!(deque.get_value("a"), Some(3));
//!
//! assert_eq!(deque.pop_front(), Some(("b", 2)));
//! ```

use std::borrow::Borrow;
use std::collections::HashMap;
use std::hash::{BuildHasher, Hash};

use ahash::RandomState;
use log::{debug, trace};
use parking_lot::RwLock;

use crate::{Handle, List, Snapshot};

#[derive(Debug)]
struct Tables<K, V, S> {
    list: List<V>,
    index: HashMap<K, Handle, S>,
    reverse: HashMap<Handle, K, S>,
}

impl<K, V, S> Tables<K, V, S>
where
    K: Hash + Eq,
    S: BuildHasher,
{
    /// Removes the triple for `handle`. `None` if the handle is not tracked.
    fn detach(&mut self, handle: Handle) -> Option<(K, V)> {
        let key = self.reverse.remove(&handle)?;
        self.index.remove(&key);
        let value = self
            .list
            .remove(handle)
            .expect("reverse index references a dead list element");
        Some((key, value))
    }

    fn clear(&mut self) {
        self.list.clear();
        self.index.clear();
        self.reverse.clear();
    }
}

/// A FIFO/LIFO deque with O(1) lookup and removal by key or handle.
///
/// - [`push`](Self::push) appends to the back. Pushing an existing key
///   drops its old value and moves the key to the back.
/// - [`delete`](Self::delete) removes by key; [`remove`](Self::remove)
///   removes by handle. Both return `None` for unknown input.
/// - [`pop_front`](Self::pop_front) / [`pop_back`](Self::pop_back) consume
///   from either end.
///
/// Every method runs under one acquisition of the deque's own lock; the
/// embedded list is not separately locked.
#[derive(Debug)]
pub struct KeyedDeque<K, V, S = RandomState> {
    inner: RwLock<Tables<K, V, S>>,
}

impl<K, V> KeyedDeque<K, V, RandomState> {
    /// Creates an empty deque.
    pub fn new() -> Self {
        Self::with_hasher(RandomState::new())
    }

    /// Creates an empty deque with room for `capacity` entries.
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_capacity_and_hasher(capacity, RandomState::new())
    }
}

impl<K, V, S: Clone> KeyedDeque<K, V, S> {
    /// Creates an empty deque whose side tables use `hasher`.
    pub fn with_hasher(hasher: S) -> Self {
        Self::with_capacity_and_hasher(0, hasher)
    }

    /// Creates an empty deque with room for `capacity` entries using `hasher`.
    pub fn with_capacity_and_hasher(capacity: usize, hasher: S) -> Self {
        Self {
            inner: RwLock::new(Tables {
                list: List::with_capacity(capacity),
                index: HashMap::with_capacity_and_hasher(capacity, hasher.clone()),
                reverse: HashMap::with_capacity_and_hasher(capacity, hasher),
            }),
        }
    }
}

impl<K, V, S> KeyedDeque<K, V, S> {
    /// Returns the number of entries.
    pub fn len(&self) -> usize {
        self.inner.read().list.len()
    }

    /// Returns `true` if the deque has no entries.
    pub fn is_empty(&self) -> bool {
        self.inner.read().list.is_empty()
    }

    /// Returns the handle at the front (oldest push).
    pub fn front(&self) -> Option<Handle> {
        self.inner.read().list.front()
    }

    /// Returns the handle at the back (newest push).
    pub fn back(&self) -> Option<Handle> {
        self.inner.read().list.back()
    }

    /// Applies `f` to the value for `handle` under the shared lock.
    pub fn value_with<R>(&self, handle: Handle, f: impl FnOnce(&V) -> R) -> Option<R> {
        self.inner.read().list.get(handle).map(f)
    }
}

impl<K, V, S> KeyedDeque<K, V, S>
where
    K: Hash + Eq + Clone,
    S: BuildHasher,
{
    /// Pushes `value` to the back under `key`, returning its handle.
    ///
    /// If `key` is already present its old value is dropped and its old
    /// handle becomes stale before the new value is appended. The whole
    /// replacement is one critical section.
    pub fn push(&self, key: K, value: V) -> Handle {
        let mut guard = self.inner.write();
        let tables = &mut *guard;

        if let Some(&old) = tables.index.get(&key) {
            trace!("keyed deque: replacing {old:?}");
            tables.detach(old);
        }

        let handle = tables.list.push_back(value);
        tables.reverse.insert(handle, key.clone());
        tables.index.insert(key, handle);
        handle
    }

    /// Returns the live handle for `key`.
    pub fn get<Q>(&self, key: &Q) -> Option<Handle>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.inner.read().index.get(key).copied()
    }

    /// Applies `f` to the value for `key` under the shared lock.
    pub fn get_with<Q, R>(&self, key: &Q, f: impl FnOnce(&V) -> R) -> Option<R>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let tables = self.inner.read();
        let handle = *tables.index.get(key)?;
        tables.list.get(handle).map(f)
    }

    /// Returns `true` if `key` is present.
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.inner.read().index.contains_key(key)
    }

    /// Returns the key currently stored at `handle`.
    pub fn key_of(&self, handle: Handle) -> Option<K> {
        self.inner.read().reverse.get(&handle).cloned()
    }

    /// Removes the entry for `key`, returning its value.
    pub fn delete<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let mut tables = self.inner.write();
        let handle = *tables.index.get(key)?;
        tables.detach(handle).map(|(_, value)| value)
    }

    /// Removes the entry at `handle`, returning its value.
    ///
    /// A handle that is not tracked (already removed, replaced by a later
    /// push, or issued elsewhere) is a no-op returning `None`.
    pub fn remove(&self, handle: Handle) -> Option<V> {
        self.inner
            .write()
            .detach(handle)
            .map(|(_, value)| value)
    }

    /// Removes and returns the front entry.
    pub fn pop_front(&self) -> Option<(K, V)> {
        let mut tables = self.inner.write();
        let handle = tables.list.front()?;
        tables.detach(handle)
    }

    /// Removes and returns the back entry.
    pub fn pop_back(&self) -> Option<(K, V)> {
        let mut tables = self.inner.write();
        let handle = tables.list.back()?;
        tables.detach(handle)
    }

    /// Drops every entry and resets both side tables.
    pub fn clear(&self) {
        let mut tables = self.inner.write();
        let dropped = tables.list.len();
        tables.clear();
        debug!("keyed deque: cleared {dropped} entries");
    }
}

impl<K, V, S> KeyedDeque<K, V, S>
where
    K: Hash + Eq + Clone,
    V: Clone,
    S: BuildHasher,
{
    /// Returns a clone of the value for `key`.
    pub fn get_value<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.get_with(key, V::clone)
    }

    /// Returns a clone of the value at `handle`.
    ///
    /// `None` if the handle is stale or was issued by another instance.
    pub fn value(&self, handle: Handle) -> Option<V> {
        self.value_with(handle, V::clone)
    }

    /// Returns a snapshot of `(key, value)` pairs, front to back.
    pub fn iter(&self) -> Snapshot<(K, V)> {
        let tables = self.inner.read();
        Snapshot::new(
            tables
                .list
                .iter()
                .map(|(handle, value)| (tables.reverse[&handle].clone(), value.clone()))
                .collect(),
        )
    }
}

impl<K, V, S: Default + Clone> Default for KeyedDeque<K, V, S> {
    fn default() -> Self {
        Self::with_hasher(S::default())
    }
}

#[cfg(test)]
impl<K, V, S> KeyedDeque<K, V, S>
where
    K: Hash + Eq + Clone + std::fmt::Debug,
    S: BuildHasher,
{
    fn assert_invariants(&self) {
        let tables = self.inner.read();
        assert_eq!(tables.index.len(), tables.list.len());
        assert_eq!(tables.reverse.len(), tables.list.len());

        for (key, &handle) in &tables.index {
            assert_eq!(tables.reverse.get(&handle), Some(key));
            assert!(tables.list.contains(handle), "{key:?} -> dead {handle:?}");
        }
        for (handle, _) in tables.list.iter() {
            assert!(tables.reverse.contains_key(&handle));
        }
    }
}


#[cfg(test)]
mod prop_tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::HashMap as Model;

    #[derive(Debug, Clone)]
    enum Op {
        Push(u8, u32),
        Delete(u8),
        RemoveLatest(u8),
        RemoveStale,
        PopFront,
        PopBack,
        Clear,
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            6 => (0u8..16, any::<u32>()).prop_map(|(k, v)| Op::Push(k, v)),
            2 => (0u8..16).prop_map(Op::Delete),
            2 => (0u8..16).prop_map(Op::RemoveLatest),
            1 => Just(Op::RemoveStale),
            1 => Just(Op::PopFront),
            1 => Just(Op::PopBack),
            1 => Just(Op::Clear),
        ]
    }

    proptest! {
        #[test]
        fn matches_ordered_model(ops in prop::collection::vec(op(), 1..200)) {
            let deque: KeyedDeque<u8, u32> = KeyedDeque::new();
            // Model: keys in push order plus their latest value.
            let mut order: Vec<u8> = Vec::new();
            let mut latest: Model<u8, u32> = Model::new();
            let mut retired: Vec<Handle> = Vec::new();

            for op in ops {
                match op {
                    Op::Push(k, v) => {
                        if let Some(old) = deque.get(&k) {
                            retired.push(old);
                        }
                        deque.push(k, v);
                        order.retain(|&x| x != k);
                        order.push(k);
                        latest.insert(k, v);
                    }
                    Op::Delete(k) => {
                        let expected = latest.remove(&k);
                        order.retain(|&x| x != k);
                        if let Some(h) = deque.get(&k) {
                            retired.push(h);
                        }
                        prop_assert_eq!(deque.delete(&k), expected);
                    }
                    Op::RemoveLatest(k) => {
                        if let Some(h) = deque.get(&k) {
                            prop_assert_eq!(deque.remove(h), latest.remove(&k));
                            order.retain(|&x| x != k);
                            retired.push(h);
                        }
                    }
                    Op::RemoveStale => {
                        if let Some(&h) = retired.last() {
                            let before = deque.len();
                            prop_assert_eq!(deque.remove(h), None);
                            prop_assert_eq!(deque.len(), before);
                        }
                    }
                    Op::PopFront => {
                        let expected = if order.is_empty() {
                            None
                        } else {
                            let k = order.remove(0);
                            latest.remove(&k).map(|v| (k, v))
                        };
                        prop_assert_eq!(deque.pop_front(), expected);
                    }
                    Op::PopBack => {
                        let expected = order.pop().and_then(|k| latest.remove(&k).map(|v| (k, v)));
                        prop_assert_eq!(deque.pop_back(), expected);
                    }
                    Op::Clear => {
                        retired.extend(deque.iter().filter_map(|(k, _)| deque.get(&k)));
                        deque.clear();
                        order.clear();
                        latest.clear();
                    }
                }

                deque.assert_invariants();
                let actual: Vec<(u8, u32)> = deque.iter().collect();
                let expected: Vec<(u8, u32)> = order.iter().map(|k| (*k, latest[k])).collect();
                prop_assert_eq!(actual, expected);
            }
        }
    }
}

#[cfg(test)]
mod bench_keyed_deque {
    use super::*;
    use hdrhistogram::Histogram;
    use std::time::Instant;

    fn print_histogram(name: &str, hist: &Histogram<u64>) {
        println!(
            "{:24} p50: {:5} ns | p99: {:5} ns | p999: {:6} ns | min: {:5} | max: {:6}",
            name,
            hist.value_at_quantile(0.50),
            hist.value_at_quantile(0.99),
            hist.value_at_quantile(0.999),
            hist.min(),
            hist.max(),
        );
    }

    const WARMUP: usize = 10_000;
    const ITERATIONS: usize = 100_000;
    const KEYS: u64 = 1_024;

    #[test]
    #[ignore]
    fn bench_push_replace() {
        let deque: KeyedDeque<u64, u64> = KeyedDeque::with_capacity(KEYS as usize);
        let mut hist = Histogram::<u64>::new(3).unwrap();

        for i in 0..WARMUP as u64 {
            deque.push(i % KEYS, i);
        }

        for i in 0..ITERATIONS as u64 {
            let start = Instant::now();
            deque.push(i % KEYS, i);
            hist.record(start.elapsed().as_nanos() as u64).unwrap();
        }

        print_histogram("push (replace)", &hist);
    }

    #[test]
    #[ignore]
    fn bench_get_hit() {
        let deque: KeyedDeque<u64, u64> = KeyedDeque::with_capacity(KEYS as usize);
        let mut hist = Histogram::<u64>::new(3).unwrap();

        for i in 0..KEYS {
            deque.push(i, i);
        }
        for i in 0..WARMUP as u64 {
            std::hint::black_box(deque.get(&(i % KEYS)));
        }

        for i in 0..ITERATIONS as u64 {
            let start = Instant::now();
            std::hint::black_box(deque.get(&(i % KEYS)));
            hist.record(start.elapsed().as_nanos() as u64).unwrap();
        }

        print_histogram("get (hit)", &hist);
    }
}
