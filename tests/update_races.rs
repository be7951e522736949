//! Update Race Tests
//!
//! Pins which branch Update reports when the key changes between the read
//! and the compare-and-swap of an attempt, and checks that concurrent
//! updates through the registry never lose a write.

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

use common::*;
use kindstore::{
    Context, CreateStrategy, ErrorKind, FieldError, FnVersioner, Listing, MemoryStore, Registry,
    RegistryConfig, RetryConfig, StoreResult, StoreWatch, UpdateStrategy, Version,
    VersionedBytes, VersionedStore,
};
use serde::{Deserialize, Serialize};

// ============================================================================
// Interfering store
// ============================================================================

type Interference = Box<dyn Fn(&MemoryStore, usize) + Send + Sync>;

/// Memory store that lets a test mutate the key just before each CAS
///
/// The interference closure gets the zero-based CAS call number.
struct RacingStore {
    inner: MemoryStore,
    cas_calls: AtomicUsize,
    interfere: Interference,
}

impl RacingStore {
    fn new(inner: MemoryStore, interfere: impl Fn(&MemoryStore, usize) + Send + Sync + 'static) -> Self {
        Self {
            inner,
            cas_calls: AtomicUsize::new(0),
            interfere: Box::new(interfere),
        }
    }

    fn cas_calls(&self) -> usize {
        self.cas_calls.load(Ordering::SeqCst)
    }
}

impl VersionedStore for RacingStore {
    fn get(&self, key: &str) -> StoreResult<VersionedBytes> {
        self.inner.get(key)
    }

    fn create(&self, key: &str, value: Vec<u8>, ttl: Option<Duration>) -> StoreResult<VersionedBytes> {
        self.inner.create(key, value, ttl)
    }

    fn put(&self, key: &str, value: Vec<u8>, ttl: Option<Duration>) -> StoreResult<VersionedBytes> {
        self.inner.put(key, value, ttl)
    }

    fn compare_and_swap(
        &self,
        key: &str,
        expected: Version,
        value: Vec<u8>,
        ttl: Option<Duration>,
    ) -> StoreResult<VersionedBytes> {
        let call = self.cas_calls.fetch_add(1, Ordering::SeqCst);
        (self.interfere)(&self.inner, call);
        self.inner.compare_and_swap(key, expected, value, ttl)
    }

    fn delete(&self, key: &str) -> StoreResult<VersionedBytes> {
        self.inner.delete(key)
    }

    fn list_prefix(&self, root: &str) -> StoreResult<Listing> {
        self.inner.list_prefix(root)
    }

    fn watch_from(&self, root: &str, after: Version) -> StoreResult<StoreWatch> {
        self.inner.watch_from(root, after)
    }

    fn current_version(&self) -> Version {
        self.inner.current_version()
    }
}

const KEY_A: &str = "/registry/widgets/ns1/a";

fn stored_widget(w: &Widget) -> Vec<u8> {
    serde_json::to_vec(w).unwrap()
}

fn racing_widgets(
    seed: &MemoryStore,
    create_on_update: bool,
    retry: RetryConfig,
    interfere: impl Fn(&MemoryStore, usize) + Send + Sync + 'static,
) -> (Registry<Widget>, Arc<RacingStore>) {
    init_tracing();
    let inner = MemoryStore::new();
    for (key, raw) in seed.list_prefix("/registry").unwrap().items {
        inner.put(&key, raw.value, None).unwrap();
    }
    let store = Arc::new(RacingStore::new(inner, interfere));
    let registry = widgets_on(store.clone(), create_on_update).with_retry(retry);
    (registry, store)
}

fn fast_retry() -> RetryConfig {
    RetryConfig::new().with_base_delay_ms(0).with_max_delay_ms(0)
}

// ============================================================================
// Branch flips between attempts
// ============================================================================

#[test]
fn delete_raced_with_update_reports_create() {
    let seed = MemoryStore::new();
    seed.put(KEY_A, stored_widget(&Widget::named("a").size(1)), None)
        .unwrap();

    // Attempt 1 reads "a" and takes the update branch; the key is deleted
    // before its CAS, so attempt 2 sees it absent and creates
    let (widgets, store) = racing_widgets(&seed, true, fast_retry(), |inner, call| {
        if call == 0 {
            inner.delete(KEY_A).unwrap();
        }
    });

    let (obj, created) = widgets.update(&ns("ns1"), Widget::named("a").size(2)).unwrap();
    assert!(created, "flag follows the committing attempt");
    assert_eq!(obj.phase, "Pending", "create strategy ran on attempt 2");
    assert_eq!(store.cas_calls(), 2);
}

#[test]
fn delete_raced_with_update_without_create_on_update() {
    let seed = MemoryStore::new();
    seed.put(KEY_A, stored_widget(&Widget::named("a").size(1)), None)
        .unwrap();

    let (widgets, store) = racing_widgets(&seed, false, fast_retry(), |inner, call| {
        if call == 0 {
            inner.delete(KEY_A).unwrap();
        }
    });

    let err = widgets.update(&ns("ns1"), Widget::named("a").size(2)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AlreadyExists);
    assert_eq!(store.cas_calls(), 1, "attempt 2 rejected before writing");
}

#[test]
fn create_raced_with_update_reports_update() {
    // Attempt 1 sees no key and takes the create branch; another writer
    // creates it first, so attempt 2 runs the update strategy against it
    let mut racer = Widget::named("a").size(1);
    racer.phase = "Racing".to_string();
    let racer_bytes = stored_widget(&racer);

    let (widgets, store) = racing_widgets(&MemoryStore::new(), true, fast_retry(), move |inner, call| {
        if call == 0 {
            inner.create(KEY_A, racer_bytes.clone(), None).unwrap();
        }
    });

    let (obj, created) = widgets.update(&ns("ns1"), Widget::named("a").size(5)).unwrap();
    assert!(!created);
    assert_eq!(obj.phase, "Racing", "update strategy kept the racer's phase");
    assert_eq!(obj.size, 5);
    assert_eq!(store.cas_calls(), 2);
}

#[test]
fn create_raced_with_update_fails_validation_on_attempt_2() {
    let racer_bytes = stored_widget(&Widget::named("a").size(10));

    let (widgets, _store) = racing_widgets(&MemoryStore::new(), true, fast_retry(), move |inner, call| {
        if call == 0 {
            inner.create(KEY_A, racer_bytes.clone(), None).unwrap();
        }
    });

    // Valid as a create, a shrink as an update
    let err = widgets.update(&ns("ns1"), Widget::named("a").size(5)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ValidationFailed);
}

// ============================================================================
// Exhausted budgets
// ============================================================================

#[test]
fn exhausted_update_budget_is_conflict() {
    let seed = MemoryStore::new();
    seed.put(KEY_A, stored_widget(&Widget::named("a").size(1)), None)
        .unwrap();

    let (widgets, store) = racing_widgets(
        &seed,
        false,
        fast_retry().with_max_retries(2),
        |inner, _call| {
            let bump = serde_json::to_vec(&Widget::named("a").size(1)).unwrap();
            inner.put(KEY_A, bump, None).unwrap();
        },
    );

    let err = widgets.update(&ns("ns1"), Widget::named("a").size(2)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);
    assert_eq!(err.status_code(), 409);
    assert_eq!(store.cas_calls(), 3);
}

#[test]
fn exhausted_create_branch_uses_create_translation() {
    let racer_bytes = stored_widget(&Widget::named("a"));
    let (widgets, _store) = racing_widgets(
        &MemoryStore::new(),
        true,
        RetryConfig::no_retry(),
        move |inner, _call| {
            inner.create(KEY_A, racer_bytes.clone(), None).unwrap();
        },
    );

    let err = widgets.update(&ns("ns1"), Widget::named("a")).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AlreadyExists);
}

#[test]
fn exhausted_create_branch_with_generated_name_asks_for_retry() {
    let racer_bytes = stored_widget(&Widget::named("g-abcde"));
    let (widgets, _store) = racing_widgets(
        &MemoryStore::new(),
        true,
        RetryConfig::no_retry(),
        move |inner, _call| {
            inner
                .create("/registry/widgets/ns1/g-abcde", racer_bytes.clone(), None)
                .unwrap();
        },
    );

    let mut proposed = Widget::generated("g-");
    proposed.name = "g-abcde".to_string();
    let err = widgets.update(&ns("ns1"), proposed).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ServerTimeout);
}

// ============================================================================
// Concurrent counter through the registry
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct Counter {
    name: String,
    count: u64,
    #[serde(default)]
    resource_version: Version,
}

/// Every accepted update increments the stored count by one
struct CounterStrategy;

impl CreateStrategy<Counter> for CounterStrategy {
    fn namespace_scoped(&self) -> bool {
        false
    }

    fn validate(&self, _ctx: &Context, _obj: &Counter) -> Vec<FieldError> {
        Vec::new()
    }
}

impl UpdateStrategy<Counter> for CounterStrategy {
    fn namespace_scoped(&self) -> bool {
        false
    }

    fn prepare_for_update(&self, obj: &mut Counter, old: &Counter) {
        obj.count = old.count + 1;
    }

    fn validate_update(&self, _ctx: &Context, _obj: &Counter, _old: &Counter) -> Vec<FieldError> {
        Vec::new()
    }
}

fn counters() -> Registry<Counter> {
    init_tracing();
    let config = RegistryConfig::builder("counters")
        .new_fn(Counter::default)
        .cluster_scoped("/registry/counters")
        .name_fn(|c: &Counter| Ok(c.name.clone()))
        .versioner(FnVersioner::new(
            |c: &Counter| c.resource_version,
            |c: &mut Counter, v| c.resource_version = v,
        ))
        .strategy(Arc::new(CounterStrategy))
        .build()
        .unwrap();
    Registry::new(config, Arc::new(MemoryStore::new())).with_retry(fast_retry())
}

#[test]
fn concurrent_increments_lose_nothing() {
    const THREADS: usize = 8;
    const PER_THREAD: usize = 50;

    let registry = counters();
    let ctx = Context::new();
    registry
        .create(
            &ctx,
            Counter {
                name: "hits".into(),
                ..Default::default()
            },
        )
        .unwrap();

    let barrier = Arc::new(Barrier::new(THREADS));
    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let registry = registry.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let ctx = Context::new();
                barrier.wait();
                for _ in 0..PER_THREAD {
                    let (_, created) = registry
                        .update(
                            &ctx,
                            Counter {
                                name: "hits".into(),
                                ..Default::default()
                            },
                        )
                        .unwrap();
                    assert!(!created);
                }
            })
        })
        .collect();

    for h in handles {
        h.join().unwrap();
    }

    let counter = registry.get(&ctx, "hits").unwrap();
    assert_eq!(counter.count, (THREADS * PER_THREAD) as u64);
}

#[test]
fn concurrent_create_on_update_has_one_creator() {
    const THREADS: usize = 8;

    let (widgets, _store) = widgets_with(Default::default(), true);
    let barrier = Arc::new(Barrier::new(THREADS));
    let handles: Vec<_> = (0..THREADS)
        .map(|i| {
            let widgets = widgets.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                match widgets.update(&ns("ns1"), Widget::named("shared").size(i as i64)) {
                    Ok((_, created)) => created,
                    Err(e) => {
                        // Shrinking below an earlier writer's size
                        assert_eq!(e.kind(), ErrorKind::ValidationFailed);
                        false
                    }
                }
            })
        })
        .collect();

    let creators = handles
        .into_iter()
        .map(|h| h.join().unwrap())
        .filter(|created| *created)
        .count();
    assert_eq!(creators, 1);
}
