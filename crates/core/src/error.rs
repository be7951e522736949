//! Store-level error types
//!
//! These are the failures a `VersionedStore` reports. They are deliberately
//! low-level: they name keys, not resource kinds. The registry translates them
//! into its own taxonomy per operation.
//!
//! We use `thiserror` for automatic `Display` and `Error` trait implementations.

use crate::contract::Version;
use thiserror::Error;

/// Result type alias for store operations
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Error types reported by the store collaborator
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    /// Key not found (or expired)
    #[error("Key not found: {key}")]
    NotFound {
        /// The missing key
        key: String,
    },

    /// Create-only write against a key that already holds a value
    #[error("Key already exists: {key}")]
    AlreadyExists {
        /// The occupied key
        key: String,
    },

    /// Compare-and-swap lost the race
    #[error("Version mismatch on {key}: expected {expected}, got {actual}")]
    VersionConflict {
        /// The contested key
        key: String,
        /// Version the writer read
        expected: Version,
        /// Version found at write time (zero if the key is now absent)
        actual: Version,
    },

    /// Watch start version has been evicted from the retained history
    #[error("Resource version {requested} is too old (oldest retained: {oldest})")]
    TooOldResourceVersion {
        /// Version the watcher asked to start after
        requested: Version,
        /// Oldest version still replayable
        oldest: Version,
    },

    /// Store configuration rejected
    #[error("Invalid store configuration: {0}")]
    InvalidConfig(String),

    /// Unclassified storage failure
    #[error("Storage error: {0}")]
    Internal(String),
}

impl StoreError {
    /// True for `NotFound`
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }

    /// True for `AlreadyExists`
    pub fn is_already_exists(&self) -> bool {
        matches!(self, StoreError::AlreadyExists { .. })
    }

    /// True for `VersionConflict`; the only condition worth retrying
    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::VersionConflict { .. })
    }
}
