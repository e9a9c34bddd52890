//! Lock cache.
//!
//! Ordered list of resolved locks, each paired with its password sealed under
//! the session key. Every method takes the mutex for a single short critical
//! section; nothing slow ever runs while it is held.

use std::sync::{Mutex, PoisonError};

use crate::lock::Lock;

struct CacheEntry {
    lock: Lock,
    sealed_password: Vec<u8>,
}

#[derive(Default)]
pub(crate) struct LockCache {
    entries: Mutex<Vec<CacheEntry>>,
}

impl LockCache {
    fn with<T>(&self, f: impl FnOnce(&mut Vec<CacheEntry>) -> T) -> T {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut entries)
    }

    pub(crate) fn len(&self) -> usize {
        self.with(|entries| entries.len())
    }

    pub(crate) fn contains(&self, lock: &Lock) -> bool {
        self.with(|entries| entries.iter().any(|e| e.lock == *lock))
    }

    /// Sealed password that produced `lock`.
    pub(crate) fn sealed_password(&self, lock: &Lock) -> Option<Vec<u8>> {
        self.with(|entries| {
            entries
                .iter()
                .find(|e| e.lock == *lock)
                .map(|e| e.sealed_password.clone())
        })
    }

    /// Snapshot of every sealed password, oldest first.
    pub(crate) fn sealed_passwords(&self) -> Vec<Vec<u8>> {
        self.with(|entries| entries.iter().map(|e| e.sealed_password.clone()).collect())
    }

    /// Appends `lock` unless already present; returns whether it was added.
    pub(crate) fn insert(&self, lock: Lock, sealed_password: Vec<u8>) -> bool {
        self.with(|entries| {
            if entries.iter().any(|e| e.lock == lock) {
                return false;
            }
            entries.push(CacheEntry {
                lock,
                sealed_password,
            });
            true
        })
    }
}
