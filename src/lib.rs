//! kindstore - generic resource registry over a versioned key-value store
//!
//! kindstore serves List, Create, Update, Get, Delete and Watch for any
//! resource kind whose objects serialize with serde. Each kind is described
//! once by a [`RegistryConfig`] and served by a [`Registry`] on top of a
//! [`VersionedStore`].
//!
//! # Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use kindstore::{Context, FnVersioner, MemoryStore, Registry, RegistryConfig};
//!
//! let config = RegistryConfig::builder("widgets")
//!     .new_fn(Widget::default)
//!     .namespaced("/registry/widgets")
//!     .name_fn(|w: &Widget| Ok(w.name.clone()))
//!     .versioner(FnVersioner::new(|w: &Widget| w.version, |w: &mut Widget, v| w.version = v))
//!     .strategy(Arc::new(WidgetStrategy))
//!     .build()?;
//!
//! let widgets = Registry::new(config, Arc::new(MemoryStore::new()));
//! let ctx = Context::with_namespace("ns1");
//! let created = widgets.create(&ctx, Widget::named("a"))?;
//! ```
//!
//! # Architecture
//!
//! - `kindstore-core`: context, key builder, versions, store contract
//! - `kindstore-storage`: in-memory reference store with TTL and watch
//! - `kindstore-concurrency`: CAS retry loop
//! - `kindstore-registry`: the per-kind registry

#![warn(missing_docs)]

pub mod config;

pub use config::{Config, ConfigError, CONFIG_FILE_NAME};

pub use kindstore_concurrency::{guaranteed_update, CasError, Committed, Proposal, RetryConfig};
pub use kindstore_core::{
    Context, EventKind, KeyError, Listing, StoreError, StoreEvent, StoreResult, StoreWatch,
    Timestamp, Version, Versioned, VersionedBytes, VersionedStore, NAMESPACE_DEFAULT,
};
pub use kindstore_registry::{
    generate_name, match_fn, BuildError, CreateStrategy, DeleteOutcome, ErrorKind, Everything,
    FieldError, FnVersioner, MatchFn, Matcher, ObjectList, Operation, Registry, RegistryConfig,
    RegistryConfigBuilder, RegistryError, RegistryResult, ResourceVersioner, Status,
    StatusOutcome, UpdateStrategy, WatchEvent, WatchEventKind, Watcher,
};
pub use kindstore_storage::{MemoryStore, StoreConfig, TtlCleaner};

impl Config {
    /// Store built from the `[store]` section
    pub fn open_store(&self) -> Result<MemoryStore, ConfigError> {
        MemoryStore::with_config(self.store.clone()).map_err(|e| ConfigError::Invalid(e.to_string()))
    }
}
