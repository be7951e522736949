//! Typed watch streams
//!
//! A `Watcher` wraps the store's raw `StoreWatch` for one resource kind:
//!
//! 1. Events at or before the start version are dropped.
//! 2. The value is decoded and stamped with the event's version. A value that
//!    fails to decode surfaces as a `WatchEvent::Error`.
//! 3. The matcher decides whether the object belongs to the stream. A
//!    matcher error is logged and counts as a non-match.
//! 4. Matches are decorated. A decorator error is logged and counts as a
//!    non-match.
//!
//! The stream is infinite until stopped or dropped; neither can be undone.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use kindstore_core::{EventKind, StoreEvent, StoreWatch, Version};
use serde::de::DeserializeOwned;
use tracing::warn;

use crate::codec;
use crate::config::{ObjectFn, ResourceVersioner};
use crate::error::{FieldError, RegistryError, RegistryResult};
use crate::matcher::Matcher;

/// Parse a watch start token
///
/// `""` and `"0"` both mean "changes from now on".
///
/// # Errors
///
/// `ValidationFailed` on field `resourceVersion` if the token is not a
/// non-negative integer.
pub fn parse_watch_version(token: &str, kind: &str) -> RegistryResult<Version> {
    Version::parse_token(token).map_err(|_| {
        RegistryError::invalid(
            kind,
            "",
            vec![FieldError::invalid(
                "resourceVersion",
                token,
                "must be a non-negative integer",
            )],
        )
    })
}

/// Kind of a [`WatchEvent`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WatchEventKind {
    /// Object was created
    Added,
    /// Object was replaced
    Modified,
    /// Object was deleted or expired
    Deleted,
    /// A change could not be turned into an object
    Error,
}

/// One change seen by a [`Watcher`]
#[derive(Debug, Clone, PartialEq)]
pub enum WatchEvent<T> {
    /// Object was created
    Added(T),
    /// Object was replaced
    Modified(T),
    /// Object was deleted or expired; carries its last state
    Deleted(T),
    /// A stored value failed to decode
    Error(RegistryError),
}

impl<T> WatchEvent<T> {
    /// Kind of this event
    pub fn kind(&self) -> WatchEventKind {
        match self {
            WatchEvent::Added(_) => WatchEventKind::Added,
            WatchEvent::Modified(_) => WatchEventKind::Modified,
            WatchEvent::Deleted(_) => WatchEventKind::Deleted,
            WatchEvent::Error(_) => WatchEventKind::Error,
        }
    }

    /// The object, unless this is an error event
    pub fn object(&self) -> Option<&T> {
        match self {
            WatchEvent::Added(obj) | WatchEvent::Modified(obj) | WatchEvent::Deleted(obj) => {
                Some(obj)
            }
            WatchEvent::Error(_) => None,
        }
    }

    /// Consume the event, returning the object unless this is an error event
    pub fn into_object(self) -> Option<T> {
        match self {
            WatchEvent::Added(obj) | WatchEvent::Modified(obj) | WatchEvent::Deleted(obj) => {
                Some(obj)
            }
            WatchEvent::Error(_) => None,
        }
    }
}

/// Filtered, decoded change stream for one resource kind
pub struct Watcher<T> {
    inner: StoreWatch,
    start: Version,
    kind: String,
    matcher: Box<dyn Matcher<T>>,
    decorator: Option<ObjectFn<T>>,
    versioner: Arc<dyn ResourceVersioner<T>>,
}

impl<T: DeserializeOwned> Watcher<T> {
    pub(crate) fn new(
        inner: StoreWatch,
        start: Version,
        kind: String,
        matcher: Box<dyn Matcher<T>>,
        decorator: Option<ObjectFn<T>>,
        versioner: Arc<dyn ResourceVersioner<T>>,
    ) -> Self {
        Self {
            inner,
            start,
            kind,
            matcher,
            decorator,
            versioner,
        }
    }

    /// Wait up to `timeout` for the next event that passes the filter
    ///
    /// Returns `None` on timeout, after `stop()`, or once the store ends the
    /// subscription.
    pub fn next_timeout(&mut self, timeout: Duration) -> Option<WatchEvent<T>> {
        let deadline = Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            let raw = self.inner.recv_timeout(remaining)?;
            if let Some(event) = self.process(raw) {
                return Some(event);
            }
            if remaining.is_zero() {
                return None;
            }
        }
    }

    /// Stop the stream and release the store subscription; idempotent
    pub fn stop(&mut self) {
        self.inner.stop();
    }

    /// True once `stop()` has run
    pub fn is_stopped(&self) -> bool {
        self.inner.is_stopped()
    }

    /// Version the stream started after
    pub fn start_version(&self) -> Version {
        self.start
    }

    fn process(&self, raw: StoreEvent) -> Option<WatchEvent<T>> {
        if raw.version <= self.start {
            return None;
        }

        let bytes = kindstore_core::VersionedBytes::with_timestamp(raw.value, raw.version, kindstore_core::Timestamp::now());
        let mut obj: T = match codec::decode(&self.kind, &raw.key, &bytes, &*self.versioner) {
            Ok(obj) => obj,
            Err(err) => {
                warn!(
                    target: "kindstore::watch",
                    kind = %self.kind,
                    key = %raw.key,
                    version = %raw.version,
                    error = %err,
                    "Unable to decode watch event"
                );
                return Some(WatchEvent::Error(err));
            }
        };

        match self.matcher.matches(&obj) {
            Ok(true) => {}
            Ok(false) => return None,
            Err(err) => {
                warn!(
                    target: "kindstore::watch",
                    kind = %self.kind,
                    key = %raw.key,
                    error = %err,
                    "Unable to match watch"
                );
                return None;
            }
        }

        if let Some(decorate) = &self.decorator {
            if let Err(err) = decorate(&mut obj) {
                warn!(
                    target: "kindstore::watch",
                    kind = %self.kind,
                    key = %raw.key,
                    error = %err,
                    "Unable to decorate watch"
                );
                return None;
            }
        }

        Some(match raw.kind {
            EventKind::Added => WatchEvent::Added(obj),
            EventKind::Modified => WatchEvent::Modified(obj),
            EventKind::Deleted => WatchEvent::Deleted(obj),
        })
    }
}

impl<T: DeserializeOwned> Iterator for Watcher<T> {
    type Item = WatchEvent<T>;

    /// Block until the next event that passes the filter
    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let raw = self.inner.recv()?;
            if let Some(event) = self.process(raw) {
                return Some(event);
            }
        }
    }
}

impl<T> fmt::Debug for Watcher<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Watcher")
            .field("kind", &self.kind)
            .field("start", &self.start)
            .field("inner", &self.inner)
            .finish_non_exhaustive()
    }
}
