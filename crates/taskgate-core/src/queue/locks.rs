//! Per-resource mutual exclusion.

use std::collections::HashSet;
use std::sync::Mutex;

use crate::domain::ResourceKey;

/// Set of resource keys whose script is currently executing.
///
/// `try_acquire` is the enforcement point for "at most one executing task
/// per resource key". The std mutex is never held across an await.
#[derive(Debug, Default)]
pub struct ResourceLocks {
    held: Mutex<HashSet<ResourceKey>>,
}

impl ResourceLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire `key` if nobody holds it. Returns `false` if already held.
    pub fn try_acquire(&self, key: &ResourceKey) -> bool {
        self.held
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key.clone())
    }

    /// Release `key`. Returns `false` if it was not held.
    pub fn release(&self, key: &ResourceKey) -> bool {
        self.held
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(key)
    }

    pub fn is_locked(&self, key: &ResourceKey) -> bool {
        self.held
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains(key)
    }

    pub fn held_count(&self) -> usize {
        self.held.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}
