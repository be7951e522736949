//! Storage layer for kindstore
//!
//! This crate implements the in-memory reference store:
//! - MemoryStore: BTreeMap-based `VersionedStore` with RwLock
//! - Global version management with AtomicU64
//! - WatchHub: bounded replay history and per-subscriber channels
//! - TTL index and background TTL cleaner
//! - StoreConfig: history window, watch buffer, sweep interval

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cleaner;
pub mod config;
pub mod hub;
pub mod memory;
pub mod stored_value;
pub mod ttl;

pub use cleaner::TtlCleaner;
pub use config::StoreConfig;
pub use hub::WatchHub;
pub use memory::MemoryStore;
pub use stored_value::StoredValue;
pub use ttl::TtlIndex;
