//! Generic resource registry for kindstore
//!
//! A [`Registry`] serves List, Create, Update, Get, Delete and Watch for one
//! resource kind over any [`VersionedStore`](kindstore_core::VersionedStore).
//! All kind-specific behavior is injected through a [`RegistryConfig`]:
//! - key construction (namespaced or cluster-scoped)
//! - name extraction and resource versioning
//! - create and update strategies
//! - optional TTL, decorator and after-operation hooks
//!
//! Store failures surface as a [`RegistryError`] whose variant depends on
//! the operation that hit them; see [`translate`].

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod codec;
pub mod config;
pub mod error;
pub mod matcher;
pub mod registry;
pub mod strategy;
pub mod translate;
pub mod watch;

pub use config::{BuildError, FnVersioner, RegistryConfig, RegistryConfigBuilder, ResourceVersioner};
pub use error::{ErrorKind, FieldError, RegistryError, RegistryResult};
pub use matcher::{match_fn, Everything, MatchFn, Matcher};
pub use registry::{DeleteOutcome, ObjectList, Registry, Status, StatusOutcome};
pub use strategy::{generate_name, CreateStrategy, UpdateStrategy};
pub use translate::Operation;
pub use watch::{WatchEvent, WatchEventKind, Watcher};
