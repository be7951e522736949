//! Per-kind registry configuration
//!
//! Everything that makes a registry specific to one resource kind is
//! injected here: how to build keys, how to name and version objects, the
//! strategies, and the optional hooks. A `RegistryConfig` is assembled once
//! through [`RegistryConfigBuilder`], validated at `build()`, and immutable
//! afterwards.
//!
//! # Example
//!
//! ```ignore
//! let config = RegistryConfig::<Widget>::builder("widgets")
//!     .new_fn(Widget::default)
//!     .namespaced("/registry/widgets")
//!     .name_fn(|w: &Widget| Ok(w.name.clone()))
//!     .versioner(FnVersioner::new(|w: &Widget| w.version, |w: &mut Widget, v| w.version = v))
//!     .strategy(Arc::new(WidgetStrategy))
//!     .build()?;
//! ```

use std::fmt;
use std::sync::Arc;

use kindstore_core::{
    namespace_key, namespace_key_root, no_namespace_key, no_namespace_key_root, Context,
    KeyError, Version,
};
use thiserror::Error;

use crate::error::RegistryResult;
use crate::strategy::{CreateStrategy, UpdateStrategy};

/// Constructs an empty object
pub type NewFn<T> = Arc<dyn Fn() -> T + Send + Sync>;

/// Extracts an object's name
pub type NameFn<T> = Arc<dyn Fn(&T) -> RegistryResult<String> + Send + Sync>;

/// TTL in seconds for an object; `0` means no expiry. The flag is true on update.
pub type TtlFn<T> = Arc<dyn Fn(&T, bool) -> RegistryResult<u64> + Send + Sync>;

/// Hook applied to an object (decorator, after-create, after-update, after-delete)
pub type ObjectFn<T> = Arc<dyn Fn(&mut T) -> RegistryResult<()> + Send + Sync>;

/// Builds the root key for a context
pub type KeyRootFn = Arc<dyn Fn(&Context) -> Result<String, KeyError> + Send + Sync>;

/// Builds the item key for a context and name
pub type KeyFn = Arc<dyn Fn(&Context, &str) -> Result<String, KeyError> + Send + Sync>;

/// Reads and stamps the resource version carried inside an object
pub trait ResourceVersioner<T>: Send + Sync {
    /// Version recorded in `obj`; zero for an object never stored
    fn resource_version(&self, obj: &T) -> Version;

    /// Record `version` in `obj`
    fn set_resource_version(&self, obj: &mut T, version: Version);
}

/// `ResourceVersioner` from a getter and a setter
pub struct FnVersioner<G, S> {
    get: G,
    set: S,
}

impl<G, S> FnVersioner<G, S> {
    /// Wrap `get` and `set`
    pub fn new(get: G, set: S) -> Self {
        Self { get, set }
    }
}

impl<T, G, S> ResourceVersioner<T> for FnVersioner<G, S>
where
    G: Fn(&T) -> Version + Send + Sync,
    S: Fn(&mut T, Version) + Send + Sync,
{
    fn resource_version(&self, obj: &T) -> Version {
        (self.get)(obj)
    }

    fn set_resource_version(&self, obj: &mut T, version: Version) {
        (self.set)(obj, version)
    }
}

/// Errors detected while building a `RegistryConfig`
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BuildError {
    /// A mandatory item was never supplied
    #[error("registry config is missing {0}")]
    Missing(&'static str),

    /// The key prefix cannot produce well-formed keys
    #[error("invalid key prefix {prefix:?}: {reason}")]
    InvalidPrefix {
        /// The rejected prefix
        prefix: String,
        /// Why it was rejected
        reason: &'static str,
    },
}

/// Immutable per-kind configuration
pub struct RegistryConfig<T> {
    pub(crate) new_fn: NewFn<T>,
    pub(crate) endpoint_name: String,
    pub(crate) key_root_fn: KeyRootFn,
    pub(crate) key_fn: KeyFn,
    pub(crate) name_fn: NameFn<T>,
    pub(crate) versioner: Arc<dyn ResourceVersioner<T>>,
    pub(crate) ttl_fn: Option<TtlFn<T>>,
    pub(crate) decorator: Option<ObjectFn<T>>,
    pub(crate) create_strategy: Arc<dyn CreateStrategy<T>>,
    pub(crate) after_create: Option<ObjectFn<T>>,
    pub(crate) update_strategy: Arc<dyn UpdateStrategy<T>>,
    pub(crate) after_update: Option<ObjectFn<T>>,
    pub(crate) return_deleted_object: bool,
    pub(crate) after_delete: Option<ObjectFn<T>>,
}

impl<T: 'static> RegistryConfig<T> {
    /// Start building a config for the kind shown as `endpoint_name`
    pub fn builder(endpoint_name: impl Into<String>) -> RegistryConfigBuilder<T> {
        RegistryConfigBuilder::new(endpoint_name)
    }
}

impl<T> RegistryConfig<T> {
    /// Display name used in errors and logs
    pub fn endpoint_name(&self) -> &str {
        &self.endpoint_name
    }

    /// True if Delete returns the deleted object instead of a status
    pub fn return_deleted_object(&self) -> bool {
        self.return_deleted_object
    }
}

impl<T> fmt::Debug for RegistryConfig<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistryConfig")
            .field("endpoint_name", &self.endpoint_name)
            .field("ttl_fn", &self.ttl_fn.is_some())
            .field("decorator", &self.decorator.is_some())
            .field("after_create", &self.after_create.is_some())
            .field("after_update", &self.after_update.is_some())
            .field("return_deleted_object", &self.return_deleted_object)
            .field("after_delete", &self.after_delete.is_some())
            .finish_non_exhaustive()
    }
}

/// Builder for [`RegistryConfig`]
pub struct RegistryConfigBuilder<T> {
    endpoint_name: String,
    prefix: Option<String>,
    new_fn: Option<NewFn<T>>,
    key_root_fn: Option<KeyRootFn>,
    key_fn: Option<KeyFn>,
    name_fn: Option<NameFn<T>>,
    versioner: Option<Arc<dyn ResourceVersioner<T>>>,
    ttl_fn: Option<TtlFn<T>>,
    decorator: Option<ObjectFn<T>>,
    create_strategy: Option<Arc<dyn CreateStrategy<T>>>,
    after_create: Option<ObjectFn<T>>,
    update_strategy: Option<Arc<dyn UpdateStrategy<T>>>,
    after_update: Option<ObjectFn<T>>,
    return_deleted_object: bool,
    after_delete: Option<ObjectFn<T>>,
}

impl<T: 'static> RegistryConfigBuilder<T> {
    /// Empty builder for the kind shown as `endpoint_name`
    pub fn new(endpoint_name: impl Into<String>) -> Self {
        Self {
            endpoint_name: endpoint_name.into(),
            prefix: None,
            new_fn: None,
            key_root_fn: None,
            key_fn: None,
            name_fn: None,
            versioner: None,
            ttl_fn: None,
            decorator: None,
            create_strategy: None,
            after_create: None,
            update_strategy: None,
            after_update: None,
            return_deleted_object: false,
            after_delete: None,
        }
    }

    /// Object constructor
    pub fn new_fn(mut self, f: impl Fn() -> T + Send + Sync + 'static) -> Self {
        self.new_fn = Some(Arc::new(f));
        self
    }

    /// Namespaced keys under `prefix`: `<prefix>/<namespace>/<name>`
    pub fn namespaced(mut self, prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        let root = prefix.clone();
        let item = prefix.clone();
        self.key_root_fn = Some(Arc::new(move |ctx: &Context| namespace_key_root(ctx, &root)));
        self.key_fn = Some(Arc::new(move |ctx: &Context, name: &str| {
            namespace_key(ctx, &item, name)
        }));
        self.prefix = Some(prefix);
        self
    }

    /// Cluster-scoped keys under `prefix`: `<prefix>/<name>`
    pub fn cluster_scoped(mut self, prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        let root = prefix.clone();
        let item = prefix.clone();
        self.key_root_fn = Some(Arc::new(move |ctx: &Context| {
            Ok(no_namespace_key_root(ctx, &root))
        }));
        self.key_fn = Some(Arc::new(move |ctx: &Context, name: &str| {
            no_namespace_key(ctx, &item, name)
        }));
        self.prefix = Some(prefix);
        self
    }

    /// Custom root-key function
    pub fn key_root_fn(
        mut self,
        f: impl Fn(&Context) -> Result<String, KeyError> + Send + Sync + 'static,
    ) -> Self {
        self.key_root_fn = Some(Arc::new(f));
        self
    }

    /// Custom item-key function
    pub fn key_fn(
        mut self,
        f: impl Fn(&Context, &str) -> Result<String, KeyError> + Send + Sync + 'static,
    ) -> Self {
        self.key_fn = Some(Arc::new(f));
        self
    }

    /// Name-extraction function
    pub fn name_fn(
        mut self,
        f: impl Fn(&T) -> RegistryResult<String> + Send + Sync + 'static,
    ) -> Self {
        self.name_fn = Some(Arc::new(f));
        self
    }

    /// Resource versioner
    pub fn versioner(mut self, v: impl ResourceVersioner<T> + 'static) -> Self {
        self.versioner = Some(Arc::new(v));
        self
    }

    /// TTL function
    pub fn ttl_fn(
        mut self,
        f: impl Fn(&T, bool) -> RegistryResult<u64> + Send + Sync + 'static,
    ) -> Self {
        self.ttl_fn = Some(Arc::new(f));
        self
    }

    /// Decorator applied to every returned object
    pub fn decorator(
        mut self,
        f: impl Fn(&mut T) -> RegistryResult<()> + Send + Sync + 'static,
    ) -> Self {
        self.decorator = Some(Arc::new(f));
        self
    }

    /// Create strategy
    pub fn create_strategy(mut self, s: Arc<dyn CreateStrategy<T>>) -> Self {
        self.create_strategy = Some(s);
        self
    }

    /// Update strategy
    pub fn update_strategy(mut self, s: Arc<dyn UpdateStrategy<T>>) -> Self {
        self.update_strategy = Some(s);
        self
    }

    /// One object serving as both create and update strategy
    pub fn strategy<S>(self, s: Arc<S>) -> Self
    where
        S: CreateStrategy<T> + UpdateStrategy<T> + 'static,
    {
        let create: Arc<dyn CreateStrategy<T>> = s.clone();
        let update: Arc<dyn UpdateStrategy<T>> = s;
        self.create_strategy(create).update_strategy(update)
    }

    /// Hook run after a successful create
    pub fn after_create(
        mut self,
        f: impl Fn(&mut T) -> RegistryResult<()> + Send + Sync + 'static,
    ) -> Self {
        self.after_create = Some(Arc::new(f));
        self
    }

    /// Hook run after a successful update
    pub fn after_update(
        mut self,
        f: impl Fn(&mut T) -> RegistryResult<()> + Send + Sync + 'static,
    ) -> Self {
        self.after_update = Some(Arc::new(f));
        self
    }

    /// Hook run after a successful delete
    pub fn after_delete(
        mut self,
        f: impl Fn(&mut T) -> RegistryResult<()> + Send + Sync + 'static,
    ) -> Self {
        self.after_delete = Some(Arc::new(f));
        self
    }

    /// Return the deleted object from Delete instead of a status
    pub fn return_deleted_object(mut self, yes: bool) -> Self {
        self.return_deleted_object = yes;
        self
    }

    /// Validate and freeze the configuration
    ///
    /// # Errors
    ///
    /// - `BuildError::Missing` if a mandatory item was not supplied
    /// - `BuildError::InvalidPrefix` if the key prefix is empty or ends in `/`
    pub fn build(self) -> Result<RegistryConfig<T>, BuildError> {
        if self.endpoint_name.is_empty() {
            return Err(BuildError::Missing("endpoint name"));
        }
        if let Some(prefix) = &self.prefix {
            if prefix.is_empty() {
                return Err(BuildError::InvalidPrefix {
                    prefix: prefix.clone(),
                    reason: "may not be empty",
                });
            }
            if prefix.ends_with('/') {
                return Err(BuildError::InvalidPrefix {
                    prefix: prefix.clone(),
                    reason: "may not end in '/'",
                });
            }
        }

        Ok(RegistryConfig {
            new_fn: self.new_fn.ok_or(BuildError::Missing("object constructor"))?,
            endpoint_name: self.endpoint_name,
            key_root_fn: self.key_root_fn.ok_or(BuildError::Missing("root key function"))?,
            key_fn: self.key_fn.ok_or(BuildError::Missing("key function"))?,
            name_fn: self.name_fn.ok_or(BuildError::Missing("name function"))?,
            versioner: self.versioner.ok_or(BuildError::Missing("resource versioner"))?,
            ttl_fn: self.ttl_fn,
            decorator: self.decorator,
            create_strategy: self
                .create_strategy
                .ok_or(BuildError::Missing("create strategy"))?,
            after_create: self.after_create,
            update_strategy: self
                .update_strategy
                .ok_or(BuildError::Missing("update strategy"))?,
            after_update: self.after_update,
            return_deleted_object: self.return_deleted_object,
            after_delete: self.after_delete,
        })
    }
}
