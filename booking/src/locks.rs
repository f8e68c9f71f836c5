//! Per-key async locks.
//!
//! Serializes work on one key (a professional's calendar) while letting
//! different keys proceed in parallel. Entries exist only while someone holds
//! or waits for them.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

type Slot = Arc<AsyncMutex<()>>;

/// One key's mutex and the number of callers holding or waiting on it
#[derive(Debug)]
struct Entry {
    slot: Slot,
    users: usize,
}

/// Table of async mutexes keyed by `K`
#[derive(Debug)]
pub struct KeyedLocks<K> {
    slots: Mutex<HashMap<K, Entry>>,
}

impl<K> Default for KeyedLocks<K> {
    fn default() -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
        }
    }
}

impl<K: Eq + Hash + Clone> KeyedLocks<K> {
    /// Creates an empty lock table
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `key`.
    ///
    /// Access lasts until the returned guard is dropped. Dropping the future
    /// before it resolves gives up the place in the queue.
    pub async fn lock(&self, key: K) -> KeyedGuard<'_, K> {
        let (slot, registration) = {
            let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
            let entry = slots.entry(key.clone()).or_insert_with(|| Entry {
                slot: Slot::default(),
                users: 0,
            });
            entry.users += 1;
            (Arc::clone(&entry.slot), Registration { locks: self, key })
        };

        let guard = slot.lock_owned().await;

        KeyedGuard {
            _guard: guard,
            _registration: registration,
        }
    }

    /// Keys currently held or waited on
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether no key is held or waited on
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn release(&self, key: &K) {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(entry) = slots.get_mut(key) {
            entry.users = entry.users.saturating_sub(1);
            if entry.users == 0 {
                slots.remove(key);
            }
        }
    }
}

/// Counts one caller against a key until dropped
struct Registration<'a, K: Eq + Hash + Clone> {
    locks: &'a KeyedLocks<K>,
    key: K,
}

impl<K: Eq + Hash + Clone> Drop for Registration<'_, K> {
    fn drop(&mut self) {
        self.locks.release(&self.key);
    }
}

/// Exclusive access to one key of a [`KeyedLocks`] table
#[must_use = "the lock is released as soon as the guard is dropped"]
pub struct KeyedGuard<'a, K: Eq + Hash + Clone> {
    // Unlock before deregistering.
    _guard: OwnedMutexGuard<()>,
    _registration: Registration<'a, K>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_entries_are_pruned_after_release() {
        let locks = KeyedLocks::new();
        {
            let _a = locks.lock("a").await;
            let _b = locks.lock("b").await;
            assert_eq!(locks.len(), 2);
        }
        assert!(locks.is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_same_key_is_serialized() {
        let locks = Arc::new(KeyedLocks::new());
        let inside = Arc::new(AtomicUsize::new(0));
        let max_inside = Arc::new(AtomicUsize::new(0));

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let locks = Arc::clone(&locks);
                let inside = Arc::clone(&inside);
                let max_inside = Arc::clone(&max_inside);
                tokio::spawn(async move {
                    let _guard = locks.lock(42_u32).await;
                    let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                    max_inside.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(5)).await;
                    inside.fetch_sub(1, Ordering::SeqCst);
                })
            })
            .collect();

        for result in futures::future::join_all(tasks).await {
            assert!(result.is_ok());
        }

        assert_eq!(max_inside.load(Ordering::SeqCst), 1);
        assert!(locks.is_empty());
    }

    #[tokio::test]
    async fn test_abandoned_waiter_does_not_leak_entry() {
        let locks = KeyedLocks::new();
        let held = locks.lock("calendar").await;

        let waited = tokio::time::timeout(Duration::from_millis(10), locks.lock("calendar")).await;
        assert!(waited.is_err());
        assert_eq!(locks.len(), 1);

        drop(held);
        assert!(locks.is_empty());

        let _again = locks.lock("calendar").await;
        assert_eq!(locks.len(), 1);
    }

    #[tokio::test]
    async fn test_different_keys_do_not_block_each_other() {
        let locks = KeyedLocks::new();
        let _held = locks.lock(1_u32).await;

        let other = tokio::time::timeout(Duration::from_millis(100), locks.lock(2_u32)).await;
        assert!(other.is_ok());
    }
}
