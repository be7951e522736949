//! The store collaborator contract
//!
//! `VersionedStore` is everything the registry requires of the underlying
//! key-value store. It is a trait so the in-memory reference store can be
//! swapped for a networked one (or a fault-injecting test double) without
//! touching upper layers.
//!
//! Thread safety: all methods must be safe to call concurrently from multiple
//! threads (requires Send + Sync).

use std::time::Duration;

use crate::contract::{Version, VersionedBytes};
use crate::error::StoreResult;
use crate::watch::StoreWatch;

/// Result of a bulk prefix read
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Listing {
    /// Every live key under the root, in key order
    pub items: Vec<(String, VersionedBytes)>,
    /// Store version at which the listing was taken
    pub version: Version,
}

/// Versioned hierarchical key-value store
///
/// Versions are assigned by the store. A value read with version `v` can be
/// replaced with `compare_and_swap(key, v, ..)` only if nobody else wrote the
/// key in between.
pub trait VersionedStore: Send + Sync {
    /// Read the current value of `key`
    ///
    /// # Errors
    ///
    /// `NotFound` if the key is absent or expired.
    fn get(&self, key: &str) -> StoreResult<VersionedBytes>;

    /// Write `value` only if `key` is absent
    ///
    /// # Errors
    ///
    /// `AlreadyExists` if the key holds a live value.
    fn create(&self, key: &str, value: Vec<u8>, ttl: Option<Duration>)
        -> StoreResult<VersionedBytes>;

    /// Write `value` unconditionally
    fn put(&self, key: &str, value: Vec<u8>, ttl: Option<Duration>) -> StoreResult<VersionedBytes>;

    /// Write `value` only if the key's current version is `expected`
    ///
    /// `expected == Version::ZERO` means "only if absent".
    ///
    /// # Errors
    ///
    /// `VersionConflict` if the current version differs.
    fn compare_and_swap(
        &self,
        key: &str,
        expected: Version,
        value: Vec<u8>,
        ttl: Option<Duration>,
    ) -> StoreResult<VersionedBytes>;

    /// Remove `key`, returning the value it held
    ///
    /// # Errors
    ///
    /// `NotFound` if the key is absent or expired.
    fn delete(&self, key: &str) -> StoreResult<VersionedBytes>;

    /// Read every live key strictly below `root`
    fn list_prefix(&self, root: &str) -> StoreResult<Listing>;

    /// Subscribe to changes strictly below `root` with version greater than `after`
    ///
    /// `after == Version::ZERO` streams only changes made after the call.
    ///
    /// # Errors
    ///
    /// `TooOldResourceVersion` if changes after `after` are no longer retained.
    fn watch_from(&self, root: &str, after: Version) -> StoreResult<StoreWatch>;

    /// Highest version allocated so far
    fn current_version(&self) -> Version;
}
