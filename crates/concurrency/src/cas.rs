//! Optimistic read-modify-write against a `VersionedStore`
//!
//! `guaranteed_update` is the single place where version races are handled:
//!
//! 1. Read the current value and its version (absent = `Version::ZERO`).
//! 2. Hand it to the caller's transform, which proposes a replacement.
//! 3. `compare_and_swap` against the version read in step 1.
//! 4. On `VersionConflict`, back off and start over from step 1 with a fresh
//!    read. Any other failure ends the loop.
//!
//! ## Transform contract
//!
//! The transform MAY BE CALLED MULTIPLE TIMES. It must derive its proposal
//! from its argument and its own captured inputs only. It may mutate private
//! copies but must not leave side effects behind that assume the attempt will
//! commit.
//!
//! ## Outcome
//!
//! Each proposal carries an `outcome` chosen by the transform (the registry
//! uses it to record whether the attempt created or updated). Only the
//! outcome of the attempt that actually committed is returned. On failure the
//! outcome of the last attempt whose transform ran is returned, so callers can
//! pick the right error translation.

use std::thread;
use std::time::Duration;

use kindstore_core::{StoreError, Version, VersionedBytes, VersionedStore};
use thiserror::Error;
use tracing::{debug, warn};

use crate::retry::RetryConfig;

/// A replacement value proposed by a transform
#[derive(Debug, Clone, PartialEq)]
pub struct Proposal<O> {
    /// Encoded value to write
    pub value: Vec<u8>,
    /// TTL for the written value
    pub ttl: Option<Duration>,
    /// Caller-defined tag describing this attempt
    pub outcome: O,
}

impl<O> Proposal<O> {
    /// Propose `value` with no TTL
    pub fn new(value: Vec<u8>, outcome: O) -> Self {
        Self {
            value,
            ttl: None,
            outcome,
        }
    }

    /// Set the TTL for the written value
    pub fn with_ttl(mut self, ttl: Option<Duration>) -> Self {
        self.ttl = ttl;
        self
    }
}

/// A proposal that committed
#[derive(Debug, Clone, PartialEq)]
pub struct Committed<O> {
    /// The value as stored, with its new version
    pub stored: VersionedBytes,
    /// Outcome of the committing attempt
    pub outcome: O,
    /// Number of attempts, including the committing one
    pub attempts: usize,
}

/// Why a guaranteed update gave up
#[derive(Debug, Error)]
pub enum CasError<E, O> {
    /// The transform refused; never retried
    #[error("update rejected: {0}")]
    Rejected(E),

    /// The store failed, or the retry budget ran out on conflicts
    #[error("store failure: {source}")]
    Store {
        /// Underlying store error
        source: StoreError,
        /// Outcome of the last attempt whose transform ran, if any
        last: Option<O>,
    },
}

/// Apply `transform` to the value at `key` until the write commits
///
/// # Errors
///
/// - `CasError::Rejected` with the transform's own error, untouched
/// - `CasError::Store` with the store error; a `VersionConflict` here means
///   the retry budget in `retry` was exhausted
pub fn guaranteed_update<S, F, O, E>(
    store: &S,
    key: &str,
    retry: &RetryConfig,
    mut transform: F,
) -> Result<Committed<O>, CasError<E, O>>
where
    S: VersionedStore + ?Sized,
    F: FnMut(Option<&VersionedBytes>) -> Result<Proposal<O>, E>,
{
    let mut attempt = 0usize;
    loop {
        let current = match store.get(key) {
            Ok(current) => Some(current),
            Err(StoreError::NotFound { .. }) => None,
            Err(source) => return Err(CasError::Store { source, last: None }),
        };
        let expected = current
            .as_ref()
            .map(|c| c.version)
            .unwrap_or(Version::ZERO);

        let Proposal {
            value,
            ttl,
            outcome,
        } = transform(current.as_ref()).map_err(CasError::Rejected)?;

        match store.compare_and_swap(key, expected, value, ttl) {
            Ok(stored) => {
                return Ok(Committed {
                    stored,
                    outcome,
                    attempts: attempt + 1,
                })
            }
            Err(source @ StoreError::VersionConflict { .. }) => {
                if !retry.allows_retry(attempt) {
                    warn!(
                        target: "kindstore::cas",
                        key,
                        attempts = attempt + 1,
                        error = %source,
                        "Retry budget exhausted"
                    );
                    return Err(CasError::Store {
                        source,
                        last: Some(outcome),
                    });
                }
                if let StoreError::VersionConflict {
                    expected, actual, ..
                } = &source
                {
                    debug!(
                        target: "kindstore::cas",
                        key,
                        attempt,
                        expected = %expected,
                        actual = %actual,
                        "Version conflict, retrying"
                    );
                }
                let delay = retry.calculate_delay(attempt);
                if !delay.is_zero() {
                    thread::sleep(delay);
                }
                attempt += 1;
            }
            Err(source) => {
                return Err(CasError::Store {
                    source,
                    last: Some(outcome),
                })
            }
        }
    }
}
