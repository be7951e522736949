//! TTL cleanup background task
//!
//! `TtlCleaner` runs in a background thread and periodically calls
//! `MemoryStore::purge_expired`, which deletes expired keys through the
//! normal write path so watchers observe `Deleted` events.
//!
//! Reads already hide expired keys, so the cleaner only affects memory use
//! and event delivery, never visibility.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::info;

use crate::memory::MemoryStore;

/// Background TTL cleanup task
///
/// # Example
///
/// ```ignore
/// use std::sync::Arc;
/// use kindstore_storage::{MemoryStore, TtlCleaner};
///
/// let store = Arc::new(MemoryStore::new());
/// let cleaner = TtlCleaner::from_config(Arc::clone(&store));
/// let handle = cleaner.start();
///
/// // ... use the store ...
///
/// cleaner.shutdown();
/// handle.join().unwrap();
/// ```
pub struct TtlCleaner {
    store: Arc<MemoryStore>,
    check_interval: Duration,
    shutdown: Arc<AtomicBool>,
}

impl TtlCleaner {
    /// Create a cleaner that sweeps every `check_interval`
    pub fn new(store: Arc<MemoryStore>, check_interval: Duration) -> Self {
        Self {
            store,
            check_interval,
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Create a cleaner using the store's configured sweep interval
    pub fn from_config(store: Arc<MemoryStore>) -> Self {
        let interval = store.config().ttl_sweep_interval();
        Self::new(store, interval)
    }

    /// Start the background cleanup task
    ///
    /// The thread runs until `shutdown()` is called.
    pub fn start(&self) -> JoinHandle<()> {
        let store = Arc::clone(&self.store);
        let shutdown = Arc::clone(&self.shutdown);
        let check_interval = self.check_interval;

        thread::spawn(move || {
            info!(
                target: "kindstore::store",
                interval_ms = check_interval.as_millis() as u64,
                "TTL cleaner started"
            );
            while !shutdown.load(Ordering::Relaxed) {
                // Short sleeps so shutdown is noticed quickly
                let sleep_interval = Duration::from_millis(100).min(check_interval);
                let mut elapsed = Duration::ZERO;

                while elapsed < check_interval {
                    if shutdown.load(Ordering::Relaxed) {
                        info!(target: "kindstore::store", "TTL cleaner stopped");
                        return;
                    }
                    thread::sleep(sleep_interval);
                    elapsed += sleep_interval;
                }

                store.purge_expired();
            }
            info!(target: "kindstore::store", "TTL cleaner stopped");
        })
    }

    /// Signal shutdown; the thread exits on its next check
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::Relaxed);
    }

    /// Check if shutdown has been signaled
    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kindstore_core::VersionedStore;

    #[test]
    fn test_shutdown_flag() {
        let store = Arc::new(MemoryStore::new());
        let cleaner = TtlCleaner::new(store, Duration::from_secs(60));
        assert!(!cleaner.is_shutdown());
        cleaner.shutdown();
        assert!(cleaner.is_shutdown());
    }

    #[test]
    fn test_deletes_expired() {
        let store = Arc::new(MemoryStore::new());
        store
            .put("/tmp/a", b"data".to_vec(), Some(Duration::from_millis(50)))
            .unwrap();

        let cleaner = TtlCleaner::new(Arc::clone(&store), Duration::from_millis(20));
        let handle = cleaner.start();
        thread::sleep(Duration::from_millis(300));

        assert!(store.is_empty());

        cleaner.shutdown();
        handle.join().unwrap();
    }

    #[test]
    fn test_keeps_live_keys() {
        let store = Arc::new(MemoryStore::new());
        store
            .put("/tmp/a", b"data".to_vec(), Some(Duration::from_secs(60)))
            .unwrap();

        let cleaner = TtlCleaner::new(Arc::clone(&store), Duration::from_millis(20));
        let handle = cleaner.start();
        thread::sleep(Duration::from_millis(150));

        assert!(store.get("/tmp/a").is_ok());

        cleaner.shutdown();
        handle.join().unwrap();
    }

    #[test]
    fn test_graceful_shutdown() {
        let store = Arc::new(MemoryStore::new());
        let cleaner = TtlCleaner::new(store, Duration::from_secs(10));
        let handle = cleaner.start();

        cleaner.shutdown();
        let start = std::time::Instant::now();
        handle.join().unwrap();
        assert!(start.elapsed() < Duration::from_secs(1), "Should shutdown quickly");
    }
}
