//! Generic resource registry
//!
//! `Registry<T>` implements List, Create, Update, Get, Delete and Watch for
//! one resource kind on top of any `VersionedStore`. Everything kind-specific
//! comes from the `RegistryConfig<T>`; the registry itself holds no state
//! beyond that and a handle to the store, so clones are cheap and calls are
//! independent.
//!
//! ## Update protocol
//!
//! Update runs inside `guaranteed_update`. Each attempt decodes the current
//! object (or builds an empty one through the object constructor when the
//! key is absent) and branches on its resource version:
//!
//! - version zero: create-on-update. Rejected with `AlreadyExists` unless the
//!   update strategy allows it; otherwise the create strategy runs on a copy
//!   of the proposed object.
//! - otherwise: the update strategy runs with `(proposed, existing)`.
//!
//! The attempt's branch travels out of the loop as the CAS outcome, so the
//! `created` flag and the error translation both follow the attempt that
//! actually ran last.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use kindstore_concurrency::{guaranteed_update, CasError, Proposal, RetryConfig};
use kindstore_core::{Context, Version, VersionedBytes, VersionedStore};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::codec;
use crate::config::{ObjectFn, RegistryConfig};
use crate::error::{RegistryError, RegistryResult};
use crate::matcher::Matcher;
use crate::strategy::{before_create, before_update, check_generated_name_error};
use crate::translate::{key_error, translate, Operation};
use crate::watch::{parse_watch_version, Watcher};

/// Result of List
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectList<T> {
    /// Matched, decorated items in key order
    pub items: Vec<T>,
    /// Store version the listing was taken at; watch from here to see every
    /// later change
    pub resource_version: Version,
}

impl<T> ObjectList<T> {
    /// Number of items
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// True if nothing matched
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Outcome reported in a [`Status`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatusOutcome {
    /// The operation completed
    Success,
}

/// Acknowledgement returned by Delete when the deleted object is not wanted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Status {
    /// Always `Success` for a returned status
    pub status: StatusOutcome,
    /// Resource kind
    pub kind: String,
    /// Item name
    pub name: String,
}

/// Result of Delete
#[derive(Debug, Clone, PartialEq)]
pub enum DeleteOutcome<T> {
    /// The object as it was just before deletion
    Object(T),
    /// Plain acknowledgement
    Status(Status),
}

impl<T> DeleteOutcome<T> {
    /// The deleted object, if the kind returns it
    pub fn into_object(self) -> Option<T> {
        match self {
            DeleteOutcome::Object(obj) => Some(obj),
            DeleteOutcome::Status(_) => None,
        }
    }
}

/// Which branch an update attempt took
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Attempt {
    Create,
    Update,
}

/// Registry for one resource kind
pub struct Registry<T> {
    config: Arc<RegistryConfig<T>>,
    store: Arc<dyn VersionedStore>,
    retry: RetryConfig,
}

impl<T> Clone for Registry<T> {
    fn clone(&self) -> Self {
        Self {
            config: Arc::clone(&self.config),
            store: Arc::clone(&self.store),
            retry: self.retry,
        }
    }
}

impl<T> fmt::Debug for Registry<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("config", &self.config)
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

impl<T> Registry<T>
where
    T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
{
    /// Registry for the kind described by `config`, backed by `store`
    pub fn new(config: RegistryConfig<T>, store: Arc<dyn VersionedStore>) -> Self {
        Self {
            config: Arc::new(config),
            store,
            retry: RetryConfig::default(),
        }
    }

    /// Replace the update retry policy
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// The kind's configuration
    pub fn config(&self) -> &RegistryConfig<T> {
        &self.config
    }

    fn kind(&self) -> &str {
        &self.config.endpoint_name
    }

    fn item_key(&self, ctx: &Context, name: &str) -> RegistryResult<String> {
        (self.config.key_fn)(ctx, name).map_err(|e| key_error(e, self.kind(), name))
    }

    fn root_key(&self, ctx: &Context) -> RegistryResult<String> {
        (self.config.key_root_fn)(ctx).map_err(|e| key_error(e, self.kind(), ""))
    }

    fn ttl(&self, obj: &T, update: bool) -> RegistryResult<Option<Duration>> {
        match &self.config.ttl_fn {
            None => Ok(None),
            Some(ttl_fn) => {
                let secs = ttl_fn(obj, update)?;
                Ok((secs > 0).then(|| Duration::from_secs(secs)))
            }
        }
    }

    fn decode(&self, key: &str, raw: &VersionedBytes) -> RegistryResult<T> {
        codec::decode(self.kind(), key, raw, &*self.config.versioner).map_err(|err| {
            warn!(
                target: "kindstore::registry",
                kind = %self.kind(),
                key,
                version = %raw.version,
                error = %err,
                "Stored object could not be decoded"
            );
            err
        })
    }

    fn decorate(&self, obj: &mut T) -> RegistryResult<()> {
        run_hook(&self.config.decorator, obj)
    }

    /// Run a hook on an object that is already persisted
    fn after_persist(
        &self,
        hook: &Option<ObjectFn<T>>,
        op: Operation,
        name: &str,
        obj: &mut T,
    ) -> RegistryResult<()> {
        run_hook(hook, obj).map_err(|err| {
            warn!(
                target: "kindstore::registry",
                kind = %self.kind(),
                name,
                operation = %op,
                error = %err,
                "Hook failed after the change was persisted"
            );
            err
        })
    }

    /// Every object under the context's root key that `matcher` accepts
    ///
    /// Matcher and decorator failures on individual objects are logged and
    /// the object is left out. A failed bulk read or an undecodable value
    /// fails the whole call.
    pub fn list<M>(&self, ctx: &Context, matcher: &M) -> RegistryResult<ObjectList<T>>
    where
        M: Matcher<T> + ?Sized,
    {
        let root = self.root_key(ctx)?;
        let listing = self
            .store
            .list_prefix(&root)
            .map_err(|e| translate(Operation::List, e, self.kind(), ""))?;

        let mut items = Vec::with_capacity(listing.items.len());
        for (key, raw) in &listing.items {
            let mut obj = self.decode(key, raw)?;
            match matcher.matches(&obj) {
                Ok(true) => {}
                Ok(false) => continue,
                Err(err) => {
                    warn!(
                        target: "kindstore::registry",
                        kind = %self.kind(),
                        key = %key,
                        error = %err,
                        "Unable to match object, skipping"
                    );
                    continue;
                }
            }
            if let Err(err) = self.decorate(&mut obj) {
                warn!(
                    target: "kindstore::registry",
                    kind = %self.kind(),
                    key = %key,
                    error = %err,
                    "Unable to decorate object, skipping"
                );
                continue;
            }
            items.push(obj);
        }

        Ok(ObjectList {
            items,
            resource_version: listing.version,
        })
    }

    /// Persist a new object
    ///
    /// The create strategy runs first and may rename the object. Returns the
    /// stored object, stamped with its version and decorated.
    ///
    /// If the after-create hook fails, the error is returned although the
    /// object has been persisted.
    pub fn create(&self, ctx: &Context, mut obj: T) -> RegistryResult<T> {
        let cfg = &*self.config;
        before_create(&*cfg.create_strategy, self.kind(), &cfg.name_fn, ctx, &mut obj)?;
        let name = (cfg.name_fn)(&obj)?;
        let key = self.item_key(ctx, &name)?;
        let ttl = self.ttl(&obj, false)?;
        let bytes = codec::encode(self.kind(), &name, &obj)?;

        let stored = self.store.create(&key, bytes, ttl).map_err(|e| {
            let err = translate(Operation::Create, e, self.kind(), &name);
            check_generated_name_error(&*cfg.create_strategy, err, &obj)
        })?;

        let mut out = self.decode(&key, &stored)?;
        self.after_persist(&cfg.after_create, Operation::Create, &name, &mut out)?;
        self.decorate(&mut out)?;

        debug!(
            target: "kindstore::registry",
            kind = %self.kind(),
            name = %name,
            version = %stored.version,
            "Created"
        );
        Ok(out)
    }

    /// Replace an object with optimistic concurrency
    ///
    /// Returns the stored object and `true` if the call created it. See the
    /// module docs for the create-on-update rules.
    ///
    /// If the after-create or after-update hook fails, the error is returned
    /// although the change has been persisted.
    pub fn update(&self, ctx: &Context, obj: T) -> RegistryResult<(T, bool)> {
        let cfg = &*self.config;
        let kind = self.kind();
        let name = (cfg.name_fn)(&obj)?;
        let key = self.item_key(ctx, &name)?;

        let result = guaranteed_update(
            &*self.store,
            &key,
            &self.retry,
            |current| -> RegistryResult<Proposal<Attempt>> {
                let existing = match current {
                    Some(raw) => self.decode(&key, raw)?,
                    None => (cfg.new_fn)(),
                };

                if cfg.versioner.resource_version(&existing).is_zero() {
                    if !cfg.update_strategy.allow_create_on_update() {
                        return Err(RegistryError::already_exists(kind, &name));
                    }
                    let mut fresh = obj.clone();
                    before_create(&*cfg.create_strategy, kind, &cfg.name_fn, ctx, &mut fresh)?;
                    let ttl = self.ttl(&fresh, false)?;
                    let value = codec::encode(kind, &name, &fresh)?;
                    return Ok(Proposal::new(value, Attempt::Create).with_ttl(ttl));
                }

                let mut proposed = obj.clone();
                before_update(
                    &*cfg.update_strategy,
                    kind,
                    &cfg.name_fn,
                    ctx,
                    &mut proposed,
                    &existing,
                )?;
                let ttl = self.ttl(&proposed, true)?;
                let value = codec::encode(kind, &name, &proposed)?;
                Ok(Proposal::new(value, Attempt::Update).with_ttl(ttl))
            },
        );

        let committed = match result {
            Ok(committed) => committed,
            Err(CasError::Rejected(err)) => return Err(err),
            Err(CasError::Store { source, last }) => {
                return Err(match last {
                    Some(Attempt::Create) => check_generated_name_error(
                        &*cfg.create_strategy,
                        translate(Operation::Create, source, kind, &name),
                        &obj,
                    ),
                    Some(Attempt::Update) | None => {
                        translate(Operation::Update, source, kind, &name)
                    }
                });
            }
        };

        let creating = committed.outcome == Attempt::Create;
        let mut out = self.decode(&key, &committed.stored)?;
        if creating {
            self.after_persist(&cfg.after_create, Operation::Create, &name, &mut out)?;
        } else {
            self.after_persist(&cfg.after_update, Operation::Update, &name, &mut out)?;
        }
        self.decorate(&mut out)?;

        debug!(
            target: "kindstore::registry",
            kind = %kind,
            name = %name,
            version = %committed.stored.version,
            created = creating,
            attempts = committed.attempts,
            "Updated"
        );
        Ok((out, creating))
    }

    /// Read one object by name
    pub fn get(&self, ctx: &Context, name: &str) -> RegistryResult<T> {
        let key = self.item_key(ctx, name)?;
        let raw = self
            .store
            .get(&key)
            .map_err(|e| translate(Operation::Get, e, self.kind(), name))?;
        let mut obj = self.decode(&key, &raw)?;
        self.decorate(&mut obj)?;
        Ok(obj)
    }

    /// Remove one object by name
    ///
    /// Returns the object as it was before deletion if the kind is configured
    /// with `return_deleted_object`, otherwise a success status. If the
    /// after-delete hook fails, the error is returned although the object is
    /// gone.
    pub fn delete(&self, ctx: &Context, name: &str) -> RegistryResult<DeleteOutcome<T>> {
        let cfg = &*self.config;
        let key = self.item_key(ctx, name)?;
        let raw = self
            .store
            .delete(&key)
            .map_err(|e| translate(Operation::Delete, e, self.kind(), name))?;

        let mut obj = self.decode(&key, &raw)?;
        self.after_persist(&cfg.after_delete, Operation::Delete, name, &mut obj)?;
        self.decorate(&mut obj)?;

        debug!(target: "kindstore::registry", kind = %self.kind(), name, "Deleted");
        if cfg.return_deleted_object {
            Ok(DeleteOutcome::Object(obj))
        } else {
            Ok(DeleteOutcome::Status(Status {
                status: StatusOutcome::Success,
                kind: self.kind().to_string(),
                name: name.to_string(),
            }))
        }
    }

    /// Stream changes under the context's root key after `resource_version`
    ///
    /// `""` and `"0"` watch from now on. A malformed token is rejected before
    /// any subscription is opened; a token older than the store's retained
    /// history fails with `Gone`.
    pub fn watch<M>(
        &self,
        ctx: &Context,
        matcher: M,
        resource_version: &str,
    ) -> RegistryResult<Watcher<T>>
    where
        M: Matcher<T> + 'static,
    {
        let start = parse_watch_version(resource_version, self.kind())?;
        let root = self.root_key(ctx)?;
        let inner = self
            .store
            .watch_from(&root, start)
            .map_err(|e| translate(Operation::Watch, e, self.kind(), ""))?;

        Ok(Watcher::new(
            inner,
            start,
            self.kind().to_string(),
            Box::new(matcher),
            self.config.decorator.clone(),
            Arc::clone(&self.config.versioner),
        ))
    }

    /// Create `obj` under an explicit name
    ///
    /// Skips name extraction and the create strategy. The object is decorated
    /// in place on success.
    #[deprecated(note = "use `create` instead")]
    pub fn create_with_name(&self, ctx: &Context, name: &str, obj: &mut T) -> RegistryResult<()> {
        let key = self.item_key(ctx, name)?;
        let ttl = self.ttl(obj, false)?;
        let bytes = codec::encode(self.kind(), name, obj)?;
        self.store
            .create(&key, bytes, ttl)
            .map_err(|e| translate(Operation::Create, e, self.kind(), name))?;
        self.decorate(obj)
    }

    /// Unconditionally overwrite the object stored under `name`
    ///
    /// Skips the update strategy and version checks. The object is decorated
    /// in place on success.
    #[deprecated(note = "use `update` instead")]
    pub fn update_with_name(&self, ctx: &Context, name: &str, obj: &mut T) -> RegistryResult<()> {
        let key = self.item_key(ctx, name)?;
        let ttl = self.ttl(obj, false)?;
        let bytes = codec::encode(self.kind(), name, obj)?;
        self.store
            .put(&key, bytes, ttl)
            .map_err(|e| translate(Operation::Update, e, self.kind(), name))?;
        self.decorate(obj)
    }
}

fn run_hook<T>(hook: &Option<ObjectFn<T>>, obj: &mut T) -> RegistryResult<()> {
    match hook {
        Some(f) => f(obj),
        None => Ok(()),
    }
}
