//! In-memory store tuning
//!
//! Every field has a default, so an empty `[store]` table (or none at all)
//! yields a working store.

use std::time::Duration;

use kindstore_core::{StoreError, StoreResult};
use serde::{Deserialize, Serialize};

fn default_history_window() -> usize {
    1000
}

fn default_watch_buffer() -> usize {
    256
}

fn default_ttl_sweep_interval_ms() -> u64 {
    1000
}

/// Configuration for [`MemoryStore`](crate::MemoryStore) and its TTL cleaner
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Number of recent change events kept for watch replay
    #[serde(default = "default_history_window")]
    pub history_window: usize,

    /// Per-subscriber channel capacity; a subscriber that falls this far
    /// behind is dropped
    #[serde(default = "default_watch_buffer")]
    pub watch_buffer: usize,

    /// How often the TTL cleaner purges expired keys
    #[serde(default = "default_ttl_sweep_interval_ms")]
    pub ttl_sweep_interval_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            history_window: default_history_window(),
            watch_buffer: default_watch_buffer(),
            ttl_sweep_interval_ms: default_ttl_sweep_interval_ms(),
        }
    }
}

impl StoreConfig {
    /// Set the replay history size
    pub fn with_history_window(mut self, events: usize) -> Self {
        self.history_window = events;
        self
    }

    /// Set the per-subscriber buffer
    pub fn with_watch_buffer(mut self, events: usize) -> Self {
        self.watch_buffer = events;
        self
    }

    /// Set the TTL sweep interval
    pub fn with_ttl_sweep_interval_ms(mut self, ms: u64) -> Self {
        self.ttl_sweep_interval_ms = ms;
        self
    }

    /// TTL sweep interval as a `Duration`
    pub fn ttl_sweep_interval(&self) -> Duration {
        Duration::from_millis(self.ttl_sweep_interval_ms)
    }

    /// Reject values the store cannot run with
    pub fn validate(&self) -> StoreResult<()> {
        if self.history_window == 0 {
            return Err(StoreError::InvalidConfig(
                "history_window must be at least 1".to_string(),
            ));
        }
        if self.watch_buffer == 0 {
            return Err(StoreError::InvalidConfig(
                "watch_buffer must be at least 1".to_string(),
            ));
        }
        if self.ttl_sweep_interval_ms == 0 {
            return Err(StoreError::InvalidConfig(
                "ttl_sweep_interval_ms must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
