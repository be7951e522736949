//! Store error translation
//!
//! The same store failure means different things depending on the operation
//! that hit it. A missing key is the caller's problem on Get but a store
//! inconsistency on Create, where the key was just written. Translation is
//! therefore a table indexed by operation:
//!
//! | Store error | Create | Update | Get | Delete | List/Watch |
//! |---|---|---|---|---|---|
//! | NotFound | Internal | NotFound | NotFound | NotFound | Internal |
//! | AlreadyExists | AlreadyExists | Conflict | Internal | Internal | Internal |
//! | VersionConflict | AlreadyExists | Conflict | Internal | Conflict | Internal |
//! | TooOldResourceVersion | Internal | Internal | Internal | Internal | Gone |
//! | other | Internal | Internal | Internal | Internal | Internal |

use std::fmt;

use kindstore_core::{KeyError, StoreError};

use crate::error::RegistryError;

const CONFLICT_MESSAGE: &str =
    "the object has been modified; please apply your changes to the latest version and try again";

/// Registry operation a store error came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// Create-only write
    Create,
    /// Read-modify-write
    Update,
    /// Single read
    Get,
    /// Removal
    Delete,
    /// Bulk read
    List,
    /// Subscription
    Watch,
}

impl Operation {
    /// Lowercase verb, as used in log fields and timeout messages
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Create => "create",
            Operation::Update => "update",
            Operation::Get => "get",
            Operation::Delete => "delete",
            Operation::List => "list",
            Operation::Watch => "watch",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Map a store error to the registry taxonomy for `op`
pub fn translate(op: Operation, err: StoreError, kind: &str, name: &str) -> RegistryError {
    use Operation::*;

    match (op, &err) {
        (Update | Get | Delete, StoreError::NotFound { .. }) => RegistryError::not_found(kind, name),

        (Create, StoreError::AlreadyExists { .. } | StoreError::VersionConflict { .. }) => {
            RegistryError::already_exists(kind, name)
        }

        (Update, StoreError::AlreadyExists { .. } | StoreError::VersionConflict { .. })
        | (Delete, StoreError::VersionConflict { .. }) => {
            RegistryError::conflict(kind, name, CONFLICT_MESSAGE)
        }

        (List | Watch, StoreError::TooOldResourceVersion { .. }) => {
            RegistryError::gone(kind, err.to_string())
        }

        _ => RegistryError::internal(kind, name, err.to_string()),
    }
}

/// Annotate a key-builder failure with the kind and item name
pub fn key_error(err: KeyError, kind: &str, name: &str) -> RegistryError {
    RegistryError::bad_request(kind, name, err.to_string())
}
