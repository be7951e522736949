//! TTL index for expiration cleanup
//!
//! Maps expiry timestamp to the keys expiring then, so the cleaner touches
//! only expired entries instead of scanning every key.

use std::collections::{BTreeMap, HashSet};

use kindstore_core::Timestamp;

/// TTL index: expiry_timestamp → keys
#[derive(Debug, Default)]
pub struct TtlIndex {
    index: BTreeMap<Timestamp, HashSet<String>>,
}

impl TtlIndex {
    /// Create a new empty index
    pub fn new() -> Self {
        Self::default()
    }

    /// Track `key` as expiring at `expiry`
    pub fn insert(&mut self, expiry: Timestamp, key: String) {
        self.index.entry(expiry).or_default().insert(key);
    }

    /// Stop tracking `key` at `expiry`
    ///
    /// Used when a key is deleted or overwritten.
    pub fn remove(&mut self, expiry: Timestamp, key: &str) {
        if let Some(keys) = self.index.get_mut(&expiry) {
            keys.remove(key);
            if keys.is_empty() {
                self.index.remove(&expiry);
            }
        }
    }

    /// Every key whose expiry is at or before `now`, earliest first
    pub fn find_expired(&self, now: Timestamp) -> Vec<String> {
        self.index
            .range(..=now)
            .flat_map(|(_, keys)| keys.iter().cloned())
            .collect()
    }

    /// True if no key carries a TTL
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Total number of tracked keys
    pub fn len(&self) -> usize {
        self.index.values().map(|keys| keys.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_expired() {
        let mut index = TtlIndex::new();
        index.insert(Timestamp::from_micros(500), "/a".to_string());
        index.insert(Timestamp::from_micros(800), "/b".to_string());
        index.insert(Timestamp::from_micros(1200), "/c".to_string());
        index.insert(Timestamp::from_micros(500), "/d".to_string());

        let mut expired = index.find_expired(Timestamp::from_micros(1000));
        expired.sort();
        assert_eq!(expired, vec!["/a", "/b", "/d"]);
    }

    #[test]
    fn test_remove_cleans_empty_slots() {
        let mut index = TtlIndex::new();
        index.insert(Timestamp::from_micros(500), "/a".to_string());
        index.insert(Timestamp::from_micros(500), "/b".to_string());
        assert_eq!(index.len(), 2);

        index.remove(Timestamp::from_micros(500), "/a");
        assert_eq!(index.find_expired(Timestamp::from_micros(600)), vec!["/b"]);

        index.remove(Timestamp::from_micros(500), "/b");
        assert!(index.is_empty());
    }

    #[test]
    fn test_remove_unknown_is_noop() {
        let mut index = TtlIndex::new();
        index.insert(Timestamp::from_micros(500), "/a".to_string());
        index.remove(Timestamp::from_micros(400), "/a");
        index.remove(Timestamp::from_micros(500), "/zzz");
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn test_nothing_expired_yet() {
        let mut index = TtlIndex::new();
        index.insert(Timestamp::from_micros(2000), "/future".to_string());
        assert!(index.find_expired(Timestamp::from_micros(1000)).is_empty());
    }
}
