//! Change fan-out for watches
//!
//! The hub keeps a bounded ring of recent events for replay and a set of
//! subscribers, each with a bounded channel and a root key.
//!
//! # Ordering
//!
//! `publish` and `subscribe` both run under the history lock. A subscriber
//! therefore sees the replayed events followed by every later event with no
//! gap and no duplicate. The store calls `publish` while still holding its
//! data write lock, so events leave in version order.
//!
//! # Slow subscribers
//!
//! Publishing never blocks. A subscriber whose channel is full is dropped;
//! its receiver then reports disconnect once drained.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use crossbeam_channel::{Sender, TrySendError};
use dashmap::DashMap;
use kindstore_core::{is_under, StoreError, StoreEvent, StoreResult, StoreWatch, Version};
use parking_lot::Mutex;
use tracing::{debug, warn};

#[derive(Debug)]
struct Subscriber {
    root: String,
    after: Version,
    tx: Sender<StoreEvent>,
}

#[derive(Debug, Default)]
struct History {
    events: VecDeque<StoreEvent>,
    /// Highest version that has been evicted from `events`
    evicted_through: Version,
}

/// Bounded replay history plus live subscribers
#[derive(Debug)]
pub struct WatchHub {
    history: Mutex<History>,
    subscribers: DashMap<u64, Subscriber>,
    next_id: AtomicU64,
    window: usize,
    buffer: usize,
}

impl WatchHub {
    /// Hub retaining `window` events and giving each subscriber `buffer` slots
    pub fn new(window: usize, buffer: usize) -> Self {
        Self {
            history: Mutex::new(History::default()),
            subscribers: DashMap::new(),
            next_id: AtomicU64::new(1),
            window,
            buffer,
        }
    }

    /// Record `event` and deliver it to every interested subscriber
    pub fn publish(&self, event: StoreEvent) {
        let mut history = self.history.lock();

        let mut dropped = Vec::new();
        for entry in self.subscribers.iter() {
            let sub = entry.value();
            if event.version <= sub.after || !is_under(&sub.root, &event.key) {
                continue;
            }
            match sub.tx.try_send(event.clone()) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => {
                    warn!(
                        target: "kindstore::store",
                        subscriber = *entry.key(),
                        root = %sub.root,
                        buffer = self.buffer,
                        "Subscriber fell behind, dropping"
                    );
                    dropped.push(*entry.key());
                }
                Err(TrySendError::Disconnected(_)) => dropped.push(*entry.key()),
            }
        }
        for id in dropped {
            self.subscribers.remove(&id);
        }

        if self.window == 0 {
            history.evicted_through = event.version;
            return;
        }
        history.events.push_back(event);
        while history.events.len() > self.window {
            if let Some(evicted) = history.events.pop_front() {
                history.evicted_through = evicted.version;
            }
        }
    }

    /// Subscribe to events under `root` with version greater than `after`
    ///
    /// Retained events newer than `after` are queued first. With
    /// `after == Version::ZERO` nothing is replayed.
    ///
    /// # Errors
    ///
    /// `TooOldResourceVersion` if events after `after` have been evicted.
    pub fn subscribe(self: &Arc<Self>, root: &str, after: Version) -> StoreResult<StoreWatch> {
        let history = self.history.lock();

        let replay: Vec<StoreEvent> = if after.is_zero() {
            Vec::new()
        } else {
            if after < history.evicted_through {
                let oldest = history
                    .events
                    .front()
                    .map(|e| e.version)
                    .unwrap_or_else(|| history.evicted_through.next());
                return Err(StoreError::TooOldResourceVersion {
                    requested: after,
                    oldest,
                });
            }
            history
                .events
                .iter()
                .filter(|e| e.version > after && is_under(root, &e.key))
                .cloned()
                .collect()
        };

        // Replay must fit without tripping the slow-subscriber check
        let (tx, rx) = crossbeam_channel::bounded(self.buffer + replay.len());
        for event in replay {
            // Capacity covers the replay, and rx is alive
            let _ = tx.try_send(event);
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.subscribers.insert(
            id,
            Subscriber {
                root: root.to_string(),
                after,
                tx,
            },
        );
        drop(history);

        debug!(target: "kindstore::store", subscriber = id, root, after = %after, "Subscribed");

        let hub: Weak<WatchHub> = Arc::downgrade(self);
        Ok(StoreWatch::new(rx, move || {
            if let Some(hub) = hub.upgrade() {
                hub.unsubscribe(id);
            }
        }))
    }

    fn unsubscribe(&self, id: u64) {
        if self.subscribers.remove(&id).is_some() {
            debug!(target: "kindstore::store", subscriber = id, "Unsubscribed");
        }
    }

    /// Number of live subscribers
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Oldest version still replayable, or `None` if nothing is retained
    pub fn oldest_retained(&self) -> Option<Version> {
        self.history.lock().events.front().map(|e| e.version)
    }
}
