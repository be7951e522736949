//! Resource version type
//!
//! Every mutation in the store produces a version. Every read returns version
//! information alongside the value.
//!
//! ## Semantics
//!
//! - Versions are allocated from a single store-wide counter, so they are
//!   totally ordered across keys (the order in which mutations committed).
//! - Within one key, versions are strictly increasing.
//! - `Version::ZERO` never labels stored data. It means "nothing is stored at
//!   this key" and is the create-on-update signal used by the registry.
//!
//! ## Wire form
//!
//! Callers see versions as opaque decimal tokens. `""` and `"0"` both parse
//! to `Version::ZERO`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;

/// Version identifier for a stored value
///
/// ## Invariants
///
/// - Stored values always carry a non-zero version
/// - A later commit always has a greater version than an earlier one
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Version(u64);

impl Version {
    /// The zero version: "no object at this key"
    pub const ZERO: Version = Version(0);

    /// Create a version from its raw counter value
    #[inline]
    pub const fn new(v: u64) -> Self {
        Version(v)
    }

    /// Get the numeric value
    #[inline]
    pub const fn as_u64(&self) -> u64 {
        self.0
    }

    /// Check if this version is zero
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// The version immediately after this one
    ///
    /// Saturates at `u64::MAX`.
    pub const fn next(&self) -> Self {
        Version(self.0.saturating_add(1))
    }

    /// Parse an opaque resource-version token
    ///
    /// The empty string is accepted and means `Version::ZERO`.
    pub fn parse_token(token: &str) -> Result<Self, ParseIntError> {
        if token.is_empty() {
            return Ok(Version::ZERO);
        }
        token.parse::<u64>().map(Version)
    }

    /// Render as an opaque token
    pub fn to_token(&self) -> String {
        self.0.to_string()
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Version {
    type Err = ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Version::parse_token(s)
    }
}

impl From<u64> for Version {
    fn from(v: u64) -> Self {
        Version(v)
    }
}

impl From<Version> for u64 {
    fn from(v: Version) -> Self {
        v.0
    }
}
