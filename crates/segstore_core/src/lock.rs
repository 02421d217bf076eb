//! Process-wide keyed locks for data set relocation.
//!
//! No two relocations of the same data set may ever overlap. Relocations
//! of different data sets proceed concurrently without a whole-store lock.
//! Guards release on drop, so a lock is released on every exit path.

use parking_lot::{ArcMutexGuard, Mutex, RawMutex};
use std::collections::HashMap;
use std::sync::Arc;

/// Manager of per-data-set exclusive locks.
///
/// One instance is shared by all control loops of a process.
#[derive(Debug, Default)]
pub struct LockManager {
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl LockManager {
    /// Creates an empty lock manager.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquires the exclusive lock for a data set code, blocking until it
    /// is available.
    pub fn lock(&self, code: &str) -> LockGuard<'_> {
        let entry = {
            let mut locks = self.locks.lock();
            locks
                .entry(code.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        let guard = entry.lock_arc();
        LockGuard {
            manager: self,
            code: code.to_string(),
            guard: Some(guard),
        }
    }

    /// Whether the lock for the given code is currently held.
    #[must_use]
    pub fn is_locked(&self, code: &str) -> bool {
        self.locks
            .lock()
            .get(code)
            .is_some_and(|entry| entry.is_locked())
    }
}

/// Guard holding the exclusive lock for one data set code.
#[must_use = "the lock is released as soon as the guard is dropped"]
pub struct LockGuard<'a> {
    manager: &'a LockManager,
    code: String,
    guard: Option<ArcMutexGuard<RawMutex, ()>>,
}

impl Drop for LockGuard<'_> {
    fn drop(&mut self) {
        drop(self.guard.take());
        let mut locks = self.manager.locks.lock();
        if let Some(entry) = locks.get(&self.code) {
            // Only the map itself holds the Arc: nobody else is holding
            // or waiting for this lock, so the entry can go.
            if Arc::strong_count(entry) == 1 {
                locks.remove(&self.code);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::thread;
    use std::time::Duration;

    #[test]
    fn lock_is_released_on_drop() {
        let manager = LockManager::new();
        {
            let _guard = manager.lock("ds-1");
            assert!(manager.is_locked("ds-1"));
        }
        assert!(!manager.is_locked("ds-1"));
    }

    #[test]
    fn different_codes_do_not_block_each_other() {
        let manager = LockManager::new();
        let _a = manager.lock("ds-1");
        let _b = manager.lock("ds-2");
        assert!(manager.is_locked("ds-1"));
        assert!(manager.is_locked("ds-2"));
    }

    #[test]
    fn entries_are_cleaned_up() {
        let manager = LockManager::new();
        drop(manager.lock("ds-1"));
        assert!(manager.locks.lock().is_empty());
    }

    #[test]
    fn same_code_is_exclusive_across_threads() {
        let manager = Arc::new(LockManager::new());
        let in_critical = Arc::new(AtomicBool::new(false));
        let overlaps = Arc::new(AtomicUsize::new(0));
        let entries = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let manager = Arc::clone(&manager);
            let in_critical = Arc::clone(&in_critical);
            let overlaps = Arc::clone(&overlaps);
            let entries = Arc::clone(&entries);
            handles.push(thread::spawn(move || {
                for _ in 0..50 {
                    let _guard = manager.lock("ds-1");
                    if in_critical.swap(true, Ordering::SeqCst) {
                        overlaps.fetch_add(1, Ordering::SeqCst);
                    }
                    entries.fetch_add(1, Ordering::SeqCst);
                    thread::sleep(Duration::from_micros(10));
                    in_critical.store(false, Ordering::SeqCst);
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(overlaps.load(Ordering::SeqCst), 0);
        assert_eq!(entries.load(Ordering::SeqCst), 8 * 50);
        assert!(!manager.is_locked("ds-1"));
    }
}
