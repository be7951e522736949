//! Generic versioned wrapper type
//!
//! Every store read returns data wrapped in `Versioned<T>`:
//!
//! ```text
//! fn get(&self, key) -> StoreResult<Versioned<Vec<u8>>>
//! ```
//!
//! The version is the one the store assigned to the mutation that produced
//! the value. The registry stamps it onto decoded objects.

use super::{Timestamp, Version};
use serde::{Deserialize, Serialize};

/// A value with its version information
///
/// ## Invariants
///
/// - `version` always matches the mutation that created this data
/// - `timestamp` is always the creation time of this version
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Versioned<T> {
    /// The actual value
    pub value: T,

    /// Version identifier
    pub version: Version,

    /// Creation timestamp (microseconds since epoch)
    pub timestamp: Timestamp,
}

impl<T> Versioned<T> {
    /// Create a versioned value with explicit timestamp
    pub fn with_timestamp(value: T, version: Version, timestamp: Timestamp) -> Self {
        Versioned {
            value,
            version,
            timestamp,
        }
    }
}

/// Raw bytes as stored, with their version
pub type VersionedBytes = Versioned<Vec<u8>>;
