//! Contract types shared by the store and the registry
//!
//! - `version`: the resource version token
//! - `versioned`: generic versioned wrapper returned by every read
//! - `timestamp`: microsecond timestamps (write time, TTL expiry)

pub mod timestamp;
pub mod version;
pub mod versioned;

pub use timestamp::Timestamp;
pub use version::Version;
pub use versioned::{Versioned, VersionedBytes};
