//! Raw change notifications
//!
//! A `StoreWatch` is the store's side of a subscription: an ordered stream of
//! `StoreEvent`s for every key under some root. The registry wraps it with
//! decoding and filtering.
//!
//! Closing the watch (`stop()` or drop) runs the cancel hook supplied by the
//! store, which unregisters the subscriber so nothing keeps sending into a
//! dead channel.

use std::fmt;
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError};
use serde::{Deserialize, Serialize};

use crate::contract::Version;

/// What happened to a key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    /// Key was created
    Added,
    /// Key was overwritten
    Modified,
    /// Key was deleted or expired
    Deleted,
}

/// One change to one key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreEvent {
    /// Kind of change
    pub kind: EventKind,
    /// Full key
    pub key: String,
    /// New value; for `Deleted`, the last value before deletion
    pub value: Vec<u8>,
    /// Version allocated to this change
    pub version: Version,
}

/// Receiving end of a store subscription
pub struct StoreWatch {
    events: Receiver<StoreEvent>,
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl StoreWatch {
    /// Wrap a receiver with the hook that tears the subscription down
    pub fn new(events: Receiver<StoreEvent>, cancel: impl FnOnce() + Send + 'static) -> Self {
        Self {
            events,
            cancel: Some(Box::new(cancel)),
        }
    }

    /// Block until the next event
    ///
    /// Returns `None` once the watch is stopped or the store dropped the
    /// subscriber.
    pub fn recv(&self) -> Option<StoreEvent> {
        if self.is_stopped() {
            return None;
        }
        self.events.recv().ok()
    }

    /// Wait up to `timeout` for the next event
    ///
    /// Returns `None` on timeout, after `stop()`, or after disconnect.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<StoreEvent> {
        if self.is_stopped() {
            return None;
        }
        match self.events.recv_timeout(timeout) {
            Ok(event) => Some(event),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        }
    }

    /// Stop the subscription; idempotent
    pub fn stop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }

    /// True once `stop()` has run
    pub fn is_stopped(&self) -> bool {
        self.cancel.is_none()
    }
}

impl Iterator for StoreWatch {
    type Item = StoreEvent;

    fn next(&mut self) -> Option<Self::Item> {
        self.recv()
    }
}

impl Drop for StoreWatch {
    fn drop(&mut self) {
        self.stop();
    }
}

impl fmt::Debug for StoreWatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreWatch")
            .field("pending", &self.events.len())
            .field("stopped", &self.is_stopped())
            .finish()
    }
}
