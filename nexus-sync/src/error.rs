//! Error types for handle misuse.
//!
//! Absence (a missing key, an already-removed element in the keyed deque) is
//! reported through `Option`. The types here cover programmer errors on the
//! base list: passing a handle that is stale or that belongs to a different
//! instance.

use core::fmt;

use thiserror::Error;

/// A handle was rejected by a list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum HandleError {
    /// The element this handle referred to has been removed.
    #[error("stale handle: slot {index} generation {generation} is no longer live")]
    Stale {
        /// Slot index carried by the handle.
        index: usize,
        /// Generation carried by the handle.
        generation: u64,
    },

    /// The handle was issued by a different list instance.
    #[error("foreign handle: issued by list {owner}, used on list {expected}")]
    Foreign {
        /// Instance that issued the handle.
        owner: u64,
        /// Instance the handle was passed to.
        expected: u64,
    },
}

/// Error returned when an insert is rejected because its anchor handle is
/// invalid. Contains the value that could not be inserted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejected<T> {
    /// The value that was not inserted.
    pub value: T,
    /// Why the anchor handle was rejected.
    pub error: HandleError,
}

impl<T> Rejected<T> {
    /// Returns the value that could not be inserted.
    pub fn into_inner(self) -> T {
        self.value
    }
}

impl<T> fmt::Display for Rejected<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "insert rejected: {}", self.error)
    }
}

impl<T: fmt::Debug> std::error::Error for Rejected<T> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_messages() {
        let stale = HandleError::Stale {
            index: 3,
            generation: 9,
        };
        assert_eq!(
            stale.to_string(),
            "stale handle: slot 3 generation 9 is no longer live"
        );

        let foreign = HandleError::Foreign {
            owner: 1,
            expected: 2,
        };
        assert_eq!(
            foreign.to_string(),
            "foreign handle: issued by list 1, used on list 2"
        );
    }

    #[test]
    fn rejected_returns_value_and_source() {
        use std::error::Error;

        let err = Rejected {
            value: "payload",
            error: HandleError::Foreign {
                owner: 4,
                expected: 5,
            },
        };
        assert!(err.to_string().starts_with("insert rejected: foreign handle"));
        assert!(err.source().is_some());
        assert_eq!(err.into_inner(), "payload");
    }
}
