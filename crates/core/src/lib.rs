//! Core types and traits for kindstore
//!
//! This crate defines the foundational types used throughout the system:
//! - Context: request-scoped metadata (namespace)
//! - Key builder: root and item key construction with namespace rules
//! - Version / Versioned<T> / Timestamp: the versioning contract
//! - StoreError: failures reported by the store collaborator
//! - VersionedStore: the store collaborator contract
//! - StoreWatch / StoreEvent: raw change notifications

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod context;
pub mod contract;
pub mod error;
pub mod key;
pub mod traits;
pub mod watch;

pub use context::{Context, NAMESPACE_DEFAULT};
pub use contract::{Timestamp, Version, Versioned, VersionedBytes};
pub use error::{StoreError, StoreResult};
pub use key::{
    is_under, namespace_key, namespace_key_root, no_namespace_key, no_namespace_key_root,
    validate_segment, KeyError,
};
pub use traits::{Listing, VersionedStore};
pub use watch::{EventKind, StoreEvent, StoreWatch};
