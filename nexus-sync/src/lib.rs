//! Lock-guarded collections with stable handles.
//!
//! This crate provides small building blocks for registries, task queues and
//! LRU-style structures shared between threads:
//!
//! | Type | Role | Key Operations |
//! |------|------|----------------|
//! | [`SyncedList`] | Doubly-linked list | O(1) push/insert/remove by [`Handle`] |
//! | [`SyncedMap`] | Hash map | get/insert/remove, batch remove |
//! | [`KeyedDeque`] | Ordered deque indexed by key | O(1) push/get/delete by key, remove by handle |
//!
//! The unsynchronized [`List`] and [`Arena`] they are built on are exported
//! for single-threaded use.
//!
//! # Design
//!
//! Storage is separated from structure, as in a slab-backed list:
//!
//! ```text
//! Arena (slab)  - owns values, issues generational handles
//! List          - links handles into an order
//! KeyedDeque    - List + key -> handle + handle -> key, one lock
//! ```
//!
//! Handles are never reissued: a removed element's slot can be reused, but
//! the new occupant carries a new generation. Handles also record which
//! instance issued them, so passing a handle to the wrong list is detected.
//!
//! # Quick Start
//!
//! ```
//! use nexus_sync::KeyedDeque;
//!
//! // Task queue keyed by task id
//! let queue = KeyedDeque::new();
//! queue.push(17u64, "compact");
//! let h = queue.push(42u64, "flush");
//! queue.push(17u64, "compact-again"); // last write wins, moves to back
//!
//! assert_eq!(queue.len(), 2);
//! assert_eq!(queue.remove(h), Some("flush"));
//! assert_eq!(queue.pop_front(), Some((17, "compact-again")));
//! ```
//!
//! # Locking
//!
//! Every instance owns exactly one [`parking_lot::RwLock`]. Reads share it,
//! writes exclude everything else on that instance, and no method takes
//! more than one lock. Operations on one instance are linearizable; there is
//! no ordering between instances.
//!
//! Iteration (`iter`, `handles`) copies under the shared lock and then yields
//! from the copy with the lock released. See [`Snapshot`].
//!
//! # Errors
//!
//! Absence is reported with `Option`. Misusing a handle on the base list
//! (stale or foreign) is reported with [`HandleError`], or [`Rejected`] for
//! inserts so the value is handed back.

#![warn(missing_docs)]

pub mod error;
pub mod handle;
pub mod keyed_deque;
pub mod list;
pub mod map;
pub mod snapshot;
pub mod storage;

pub use error::{HandleError, Rejected};
pub use handle::Handle;
pub use keyed_deque::KeyedDeque;
pub use list::{List, SyncedList};
pub use map::SyncedMap;
pub use snapshot::Snapshot;
pub use storage::Arena;
