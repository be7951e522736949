//! MemoryStore: in-memory `VersionedStore` with watch and TTL support
//!
//! - `BTreeMap<String, StoredValue>` for ordered keys, so prefix reads are a
//!   range scan
//! - `parking_lot::RwLock` for thread-safe access
//! - `AtomicU64` for the global version counter
//! - `TtlIndex` for O(expired) cleanup
//! - `WatchHub` for change fan-out and replay
//!
//! # Design Notes
//!
//! - **One global counter**: every mutation (including deletes and expiry
//!   purges) gets the next version, so versions are comparable across keys.
//! - **Version allocated under the write lock**: events are published in
//!   version order, which watch replay depends on.
//! - **Logical TTL expiration**: expired values are invisible to reads and
//!   treated as absent by writes. `purge_expired` removes them and emits
//!   `Deleted` events; a write landing on an unpurged expired value emits its
//!   `Deleted` first.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use kindstore_core::{
    is_under, EventKind, Listing, StoreError, StoreEvent, StoreResult, StoreWatch, Timestamp,
    Version, VersionedBytes, VersionedStore,
};
use parking_lot::RwLock;
use tracing::{info, trace};

use crate::config::StoreConfig;
use crate::hub::WatchHub;
use crate::stored_value::StoredValue;
use crate::ttl::TtlIndex;

#[derive(Debug, Default)]
struct Tables {
    data: BTreeMap<String, StoredValue>,
    ttl_index: TtlIndex,
}

impl Tables {
    /// Live entry at `key`, ignoring expired ones
    fn live(&self, key: &str) -> Option<&StoredValue> {
        self.data.get(key).filter(|sv| !sv.is_expired())
    }

    fn remove(&mut self, key: &str) -> Option<StoredValue> {
        let removed = self.data.remove(key)?;
        if let Some(expiry) = removed.expiry_timestamp() {
            self.ttl_index.remove(expiry, key);
        }
        Some(removed)
    }
}

/// In-memory versioned key-value store
#[derive(Debug)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
    version: AtomicU64,
    hub: Arc<WatchHub>,
    config: StoreConfig,
}

impl MemoryStore {
    /// Create an empty store with default configuration
    pub fn new() -> Self {
        Self::build(StoreConfig::default())
    }

    /// Create an empty store with `config`
    ///
    /// # Errors
    ///
    /// `InvalidConfig` if `config` fails validation.
    pub fn with_config(config: StoreConfig) -> StoreResult<Self> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: StoreConfig) -> Self {
        Self {
            tables: RwLock::new(Tables::default()),
            version: AtomicU64::new(0),
            hub: Arc::new(WatchHub::new(config.history_window, config.watch_buffer)),
            config,
        }
    }

    /// Configuration the store was built with
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Number of stored entries, expired-but-unpurged included
    pub fn len(&self) -> usize {
        self.tables.read().data.len()
    }

    /// True if nothing is stored
    pub fn is_empty(&self) -> bool {
        self.tables.read().data.is_empty()
    }

    /// Number of open watches
    pub fn watcher_count(&self) -> usize {
        self.hub.subscriber_count()
    }

    /// Remove every expired entry, emitting a `Deleted` event for each
    ///
    /// Returns the number of entries removed.
    pub fn purge_expired(&self) -> usize {
        let now = Timestamp::now();
        let mut tables = self.tables.write();
        let expired = tables.ttl_index.find_expired(now);

        let mut purged = 0;
        for key in expired {
            let is_expired = tables
                .data
                .get(&key)
                .map(|sv| sv.is_expired_at(now))
                .unwrap_or(false);
            if is_expired && self.expire_locked(&mut tables, &key) {
                purged += 1;
            }
        }
        if purged > 0 {
            info!(target: "kindstore::store", purged, "Purged expired keys");
        }
        purged
    }

    /// Remove the entry at `key` and publish its deletion at a new version;
    /// caller holds the write lock and has checked that it expired
    fn expire_locked(&self, tables: &mut Tables, key: &str) -> bool {
        let Some(old) = tables.remove(key) else {
            return false;
        };
        let version = self.next_version();
        trace!(target: "kindstore::store", key, version = %version, "Expired");
        self.hub.publish(StoreEvent {
            kind: EventKind::Deleted,
            key: key.to_string(),
            value: old.into_versioned().value,
            version,
        });
        true
    }

    /// Allocate the next version; callers hold the write lock
    fn next_version(&self) -> Version {
        Version::new(self.version.fetch_add(1, Ordering::SeqCst) + 1)
    }

    /// Write `value` at `key` and publish the change; caller holds the write lock
    fn write_locked(
        &self,
        tables: &mut Tables,
        key: &str,
        value: Vec<u8>,
        ttl: Option<Duration>,
        kind: EventKind,
    ) -> VersionedBytes {
        // An expired entry not yet purged still owes watchers its Deleted
        if tables.data.get(key).is_some_and(StoredValue::is_expired) {
            self.expire_locked(tables, key);
        }

        let version = self.next_version();
        let stored = StoredValue::new(value, version, ttl);

        tables.remove(key);
        if let Some(expiry) = stored.expiry_timestamp() {
            tables.ttl_index.insert(expiry, key.to_string());
        }
        let out = stored.versioned().clone();
        tables.data.insert(key.to_string(), stored);

        trace!(target: "kindstore::store", key, version = %version, ?kind, "Write");
        self.hub.publish(StoreEvent {
            kind,
            key: key.to_string(),
            value: out.value.clone(),
            version,
        });
        out
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl VersionedStore for MemoryStore {
    fn get(&self, key: &str) -> StoreResult<VersionedBytes> {
        let tables = self.tables.read();
        tables
            .live(key)
            .map(|sv| sv.versioned().clone())
            .ok_or_else(|| StoreError::NotFound {
                key: key.to_string(),
            })
    }

    fn create(
        &self,
        key: &str,
        value: Vec<u8>,
        ttl: Option<Duration>,
    ) -> StoreResult<VersionedBytes> {
        let mut tables = self.tables.write();
        if tables.live(key).is_some() {
            return Err(StoreError::AlreadyExists {
                key: key.to_string(),
            });
        }
        Ok(self.write_locked(&mut tables, key, value, ttl, EventKind::Added))
    }

    fn put(&self, key: &str, value: Vec<u8>, ttl: Option<Duration>) -> StoreResult<VersionedBytes> {
        let mut tables = self.tables.write();
        let kind = match tables.live(key) {
            Some(_) => EventKind::Modified,
            None => EventKind::Added,
        };
        Ok(self.write_locked(&mut tables, key, value, ttl, kind))
    }

    fn compare_and_swap(
        &self,
        key: &str,
        expected: Version,
        value: Vec<u8>,
        ttl: Option<Duration>,
    ) -> StoreResult<VersionedBytes> {
        let mut tables = self.tables.write();
        let actual = tables
            .live(key)
            .map(|sv| sv.version())
            .unwrap_or(Version::ZERO);
        if actual != expected {
            return Err(StoreError::VersionConflict {
                key: key.to_string(),
                expected,
                actual,
            });
        }
        let kind = if actual.is_zero() {
            EventKind::Added
        } else {
            EventKind::Modified
        };
        Ok(self.write_locked(&mut tables, key, value, ttl, kind))
    }

    fn delete(&self, key: &str) -> StoreResult<VersionedBytes> {
        let mut tables = self.tables.write();
        if tables.live(key).is_none() {
            return Err(StoreError::NotFound {
                key: key.to_string(),
            });
        }
        let removed = tables
            .remove(key)
            .map(StoredValue::into_versioned)
            .ok_or_else(|| StoreError::NotFound {
                key: key.to_string(),
            })?;

        let version = self.next_version();
        trace!(target: "kindstore::store", key, version = %version, "Delete");
        self.hub.publish(StoreEvent {
            kind: EventKind::Deleted,
            key: key.to_string(),
            value: removed.value.clone(),
            version,
        });
        Ok(removed)
    }

    fn list_prefix(&self, root: &str) -> StoreResult<Listing> {
        let tables = self.tables.read();
        let version = self.current_version();
        let now = Timestamp::now();

        let items = tables
            .data
            .range(root.to_string()..)
            .take_while(|(k, _)| k.starts_with(root))
            .filter(|(k, sv)| is_under(root, k) && !sv.is_expired_at(now))
            .map(|(k, sv)| (k.clone(), sv.versioned().clone()))
            .collect();

        Ok(Listing { items, version })
    }

    fn watch_from(&self, root: &str, after: Version) -> StoreResult<StoreWatch> {
        self.hub.subscribe(root, after)
    }

    fn current_version(&self) -> Version {
        Version::new(self.version.load(Ordering::SeqCst))
    }
}
