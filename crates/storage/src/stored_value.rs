//! Storage-layer value wrapper with TTL support
//!
//! `VersionedBytes` is what callers see. TTL is a storage concern, so it
//! lives here alongside the versioned payload and never crosses the
//! `VersionedStore` boundary.

use std::time::Duration;

use kindstore_core::{Timestamp, Version, VersionedBytes};

/// A stored value with optional TTL
#[derive(Debug, Clone, PartialEq)]
pub struct StoredValue {
    inner: VersionedBytes,
    ttl: Option<Duration>,
}

impl StoredValue {
    /// Stamp `value` with `version` at the current time
    pub fn new(value: Vec<u8>, version: Version, ttl: Option<Duration>) -> Self {
        StoredValue {
            inner: VersionedBytes::with_timestamp(value, version, Timestamp::now()),
            ttl,
        }
    }

    /// Create a stored value with explicit timestamp
    pub fn with_timestamp(
        value: Vec<u8>,
        version: Version,
        timestamp: Timestamp,
        ttl: Option<Duration>,
    ) -> Self {
        StoredValue {
            inner: VersionedBytes::with_timestamp(value, version, timestamp),
            ttl,
        }
    }

    /// The caller-visible part
    #[inline]
    pub fn versioned(&self) -> &VersionedBytes {
        &self.inner
    }

    /// Consume and return the caller-visible part
    #[inline]
    pub fn into_versioned(self) -> VersionedBytes {
        self.inner
    }

    /// Raw payload
    #[inline]
    pub fn value(&self) -> &[u8] {
        &self.inner.value
    }

    /// Version assigned by the write
    #[inline]
    pub fn version(&self) -> Version {
        self.inner.version
    }

    /// Time-to-live given at write time
    #[inline]
    pub fn ttl(&self) -> Option<Duration> {
        self.ttl
    }

    /// True once the TTL has elapsed since the write
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Timestamp::now())
    }

    /// True if the TTL has elapsed at `now`
    pub fn is_expired_at(&self, now: Timestamp) -> bool {
        match self.expiry_timestamp() {
            Some(expiry) => now >= expiry,
            None => false,
        }
    }

    /// When this value expires, or `None` without a TTL
    pub fn expiry_timestamp(&self) -> Option<Timestamp> {
        self.ttl.map(|ttl| self.inner.timestamp.saturating_add(ttl))
    }
}

impl From<StoredValue> for VersionedBytes {
    fn from(sv: StoredValue) -> Self {
        sv.inner
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_ttl_never_expires() {
        let sv = StoredValue::with_timestamp(b"x".to_vec(), Version::new(1), Timestamp::EPOCH, None);
        assert!(!sv.is_expired());
        assert!(sv.expiry_timestamp().is_none());
    }

    #[test]
    fn test_fresh_value_not_expired() {
        let sv = StoredValue::new(b"x".to_vec(), Version::new(1), Some(Duration::from_secs(60)));
        assert_eq!(sv.ttl(), Some(Duration::from_secs(60)));
        assert!(!sv.is_expired());
    }

    #[test]
    fn test_expired_at_boundary() {
        let sv = StoredValue::with_timestamp(
            Vec::new(),
            Version::new(3),
            Timestamp::from_secs(1),
            Some(Duration::from_secs(60)),
        );

        assert_eq!(sv.expiry_timestamp(), Some(Timestamp::from_secs(61)));
        assert!(!sv.is_expired_at(Timestamp::from_micros(60_999_999)));
        assert!(sv.is_expired_at(Timestamp::from_secs(61)));
    }

    #[test]
    fn test_into_versioned_keeps_payload() {
        let sv = StoredValue::new(b"payload".to_vec(), Version::new(5), Some(Duration::from_secs(10)));
        let vb: VersionedBytes = sv.into();
        assert_eq!(vb.value, b"payload".to_vec());
        assert_eq!(vb.version, Version::new(5));
    }
}
