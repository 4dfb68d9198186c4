//! Domain identifiers (strongly-typed IDs).
//!
//! Task ids are plain integers on the wire (`Task queued with ID 101`), so the
//! newtype wraps a `u64` and displays as the bare number.

use std::fmt;

/// Identifier of a Task.
///
/// Issued by [`IdGenerator`](crate::ports::IdGenerator); never reused.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(u64);

impl TaskId {
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn get(self) -> u64 {
        self.0
    }

    /// Interpret a raw client-supplied integer as a task id.
    ///
    /// Negative values can never name a task, so they map to `None`.
    pub fn from_raw(raw: i64) -> Option<Self> {
        u64::try_from(raw).ok().map(Self)
    }
}

impl From<u64> for TaskId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn displays_as_bare_number() {
        assert_eq!(TaskId::new(101).to_string(), "101");
    }

    #[test]
    fn negative_raw_ids_do_not_map() {
        assert_eq!(TaskId::from_raw(-5), None);
        assert_eq!(TaskId::from_raw(999), Some(TaskId::new(999)));
    }

    #[test]
    fn ids_are_ordered_numerically() {
        assert!(TaskId::new(101) < TaskId::new(102));
        assert!(TaskId::new(99) < TaskId::new(100));
    }
}
