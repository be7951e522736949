//! Shared test utilities for the root integration suites.
//!
//! Defines a `Widget` resource kind with a namespaced key layout and a
//! strategy that defaults, validates and generates names.
//! Import via `mod common;`.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::{Arc, Once};

use kindstore::{
    generate_name, Context, CreateStrategy, FieldError, FnVersioner, MemoryStore, Registry,
    RegistryConfig, RegistryConfigBuilder, StoreConfig, UpdateStrategy, Version, VersionedStore,
};
use serde::{Deserialize, Serialize};

// ============================================================================
// Initialization
// ============================================================================

static INIT_TRACING: Once = Once::new();

/// Route `tracing` output through the test harness (shown for failing tests)
pub fn init_tracing() {
    INIT_TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_test_writer()
            .try_init();
    });
}

// ============================================================================
// Widget kind
// ============================================================================

pub const WIDGET_PREFIX: &str = "/registry/widgets";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Widget {
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub generate_name: String,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    pub size: i64,
    #[serde(default)]
    pub ttl_seconds: u64,
    #[serde(default)]
    pub resource_version: Version,
    #[serde(default)]
    pub phase: String,
    /// Set by the decorator; never stored
    #[serde(default, skip_serializing)]
    pub decorated: bool,
}

impl Widget {
    pub fn named(name: &str) -> Self {
        Widget {
            name: name.to_string(),
            ..Default::default()
        }
    }

    pub fn generated(base: &str) -> Self {
        Widget {
            generate_name: base.to_string(),
            ..Default::default()
        }
    }

    pub fn size(mut self, size: i64) -> Self {
        self.size = size;
        self
    }

    pub fn label(mut self, key: &str, value: &str) -> Self {
        self.labels.insert(key.to_string(), value.to_string());
        self
    }

    pub fn ttl(mut self, seconds: u64) -> Self {
        self.ttl_seconds = seconds;
        self
    }

    pub fn at(mut self, version: Version) -> Self {
        self.resource_version = version;
        self
    }
}

/// Defaults `phase`, generates names, rejects negative sizes on create and
/// shrinking on update.
pub struct WidgetStrategy {
    pub create_on_update: bool,
}

impl CreateStrategy<Widget> for WidgetStrategy {
    fn prepare_for_create(&self, obj: &mut Widget) {
        if obj.name.is_empty() && !obj.generate_name.is_empty() {
            obj.name = generate_name(&obj.generate_name);
        }
        if obj.phase.is_empty() {
            obj.phase = "Pending".to_string();
        }
    }

    fn validate(&self, _ctx: &Context, obj: &Widget) -> Vec<FieldError> {
        let mut errors = Vec::new();
        if obj.name.is_empty() {
            errors.push(FieldError::required("name"));
        }
        if obj.size < 0 {
            errors.push(FieldError::invalid("size", obj.size, "must be non-negative"));
        }
        errors
    }

    fn uses_generated_name(&self, obj: &Widget) -> bool {
        !obj.generate_name.is_empty()
    }
}

impl UpdateStrategy<Widget> for WidgetStrategy {
    fn allow_create_on_update(&self) -> bool {
        self.create_on_update
    }

    fn prepare_for_update(&self, obj: &mut Widget, old: &Widget) {
        obj.phase = old.phase.clone();
    }

    fn validate_update(&self, _ctx: &Context, obj: &Widget, old: &Widget) -> Vec<FieldError> {
        if obj.size < old.size {
            vec![FieldError::invalid("size", obj.size, "may not shrink")]
        } else {
            Vec::new()
        }
    }
}

/// Config builder for widgets with everything but hooks set
pub fn widget_config(create_on_update: bool) -> RegistryConfigBuilder<Widget> {
    RegistryConfig::builder("widgets")
        .new_fn(Widget::default)
        .namespaced(WIDGET_PREFIX)
        .name_fn(|w: &Widget| Ok(w.name.clone()))
        .versioner(FnVersioner::new(
            |w: &Widget| w.resource_version,
            |w: &mut Widget, v| w.resource_version = v,
        ))
        .ttl_fn(|w: &Widget, _update| Ok(w.ttl_seconds))
        .decorator(|w: &mut Widget| {
            w.decorated = true;
            Ok(())
        })
        .strategy(Arc::new(WidgetStrategy { create_on_update }))
}

/// Widget registry over `store`
pub fn widgets_on(store: Arc<dyn VersionedStore>, create_on_update: bool) -> Registry<Widget> {
    let config = widget_config(create_on_update)
        .build()
        .expect("widget config is complete");
    Registry::new(config, store)
}

/// Widget registry over a fresh memory store, returning both
pub fn widgets() -> (Registry<Widget>, Arc<MemoryStore>) {
    widgets_with(StoreConfig::default(), false)
}

pub fn widgets_with(config: StoreConfig, create_on_update: bool) -> (Registry<Widget>, Arc<MemoryStore>) {
    init_tracing();
    let store = Arc::new(MemoryStore::with_config(config).expect("valid store config"));
    let registry = widgets_on(store.clone(), create_on_update);
    (registry, store)
}

pub fn ns(name: &str) -> Context {
    Context::with_namespace(name)
}
