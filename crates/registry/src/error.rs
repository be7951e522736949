//! Registry error taxonomy
//!
//! `RegistryError` is what every registry operation returns. It is a closed
//! set: each variant names the resource kind (the endpoint display name) and,
//! where one exists, the item name. Store failures reach this type only
//! through the per-operation translation in [`crate::translate`].
//!
//! ## Error Categories
//!
//! | Variant | Status | Meaning |
//! |---|---|---|
//! | `BadRequest` | 400 | a key component is missing or malformed |
//! | `NotFound` | 404 | no object under the key |
//! | `AlreadyExists` | 409 | create against an occupied key |
//! | `Conflict` | 409 | version race outlived the retry budget |
//! | `ValidationFailed` | 422 | strategy rejection or bad watch token |
//! | `Internal` | 500 | anything unclassified |
//! | `Gone` | 410 | watch start version no longer retained |
//! | `ServerTimeout` | 504 | generated name collided; retry the create |

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for registry operations
pub type RegistryResult<T> = std::result::Result<T, RegistryError>;

/// One invalid field in a rejected object
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    /// Dotted path to the field
    pub field: String,
    /// What is wrong with it
    pub message: String,
}

impl FieldError {
    /// Field error with a free-form message
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }

    /// The field must be set
    pub fn required(field: impl Into<String>) -> Self {
        Self::new(field, "Required value")
    }

    /// The field holds an unacceptable value
    pub fn invalid(field: impl Into<String>, value: impl fmt::Display, reason: &str) -> Self {
        Self::new(field, format!("Invalid value: \"{}\": {}", value, reason))
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

fn join_fields(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Discriminant of [`RegistryError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Malformed request
    BadRequest,
    /// Absent object
    NotFound,
    /// Occupied key
    AlreadyExists,
    /// Lost version race
    Conflict,
    /// Rejected by validation
    ValidationFailed,
    /// Unclassified failure
    Internal,
    /// Expired watch start
    Gone,
    /// Retryable create failure
    ServerTimeout,
}

impl ErrorKind {
    /// HTTP-style status code conventionally paired with this kind
    pub fn status_code(self) -> u16 {
        match self {
            ErrorKind::BadRequest => 400,
            ErrorKind::NotFound => 404,
            ErrorKind::AlreadyExists | ErrorKind::Conflict => 409,
            ErrorKind::ValidationFailed => 422,
            ErrorKind::Internal => 500,
            ErrorKind::Gone => 410,
            ErrorKind::ServerTimeout => 504,
        }
    }
}

/// Errors returned by registry operations
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RegistryError {
    /// A required key component is missing or invalid
    #[error("bad request for {kind} \"{name}\": {message}")]
    BadRequest {
        /// Resource kind
        kind: String,
        /// Item name, empty if unknown
        name: String,
        /// What was wrong
        message: String,
    },

    /// No object under the key
    #[error("{kind} \"{name}\" not found")]
    NotFound {
        /// Resource kind
        kind: String,
        /// Item name
        name: String,
    },

    /// An object already occupies the key
    #[error("{kind} \"{name}\" already exists")]
    AlreadyExists {
        /// Resource kind
        kind: String,
        /// Item name
        name: String,
    },

    /// Version race that survived the retry budget
    #[error("Operation cannot be fulfilled on {kind} \"{name}\": {message}")]
    Conflict {
        /// Resource kind
        kind: String,
        /// Item name
        name: String,
        /// Details
        message: String,
    },

    /// The object or request failed validation
    #[error("{kind} \"{name}\" is invalid: {}", join_fields(.errors))]
    ValidationFailed {
        /// Resource kind
        kind: String,
        /// Item name, empty if unknown
        name: String,
        /// Every offending field
        errors: Vec<FieldError>,
    },

    /// Unclassified failure
    #[error("Internal error occurred on {kind} \"{name}\": {message}")]
    Internal {
        /// Resource kind
        kind: String,
        /// Item name, empty if not item-scoped
        name: String,
        /// Details
        message: String,
    },

    /// Watch start version is older than the retained history
    #[error("{kind}: {message}")]
    Gone {
        /// Resource kind
        kind: String,
        /// Details
        message: String,
    },

    /// Create on a generated name collided; the client should retry
    #[error("The {operation} operation against {kind} could not be completed at this time, please try again.")]
    ServerTimeout {
        /// Resource kind
        kind: String,
        /// Generated item name that collided
        name: String,
        /// Operation that timed out
        operation: String,
    },
}

impl RegistryError {
    /// Create a BadRequest error
    pub fn bad_request(kind: &str, name: &str, message: impl Into<String>) -> Self {
        RegistryError::BadRequest {
            kind: kind.to_string(),
            name: name.to_string(),
            message: message.into(),
        }
    }

    /// Create a NotFound error
    pub fn not_found(kind: &str, name: &str) -> Self {
        RegistryError::NotFound {
            kind: kind.to_string(),
            name: name.to_string(),
        }
    }

    /// Create an AlreadyExists error
    pub fn already_exists(kind: &str, name: &str) -> Self {
        RegistryError::AlreadyExists {
            kind: kind.to_string(),
            name: name.to_string(),
        }
    }

    /// Create a Conflict error
    pub fn conflict(kind: &str, name: &str, message: impl Into<String>) -> Self {
        RegistryError::Conflict {
            kind: kind.to_string(),
            name: name.to_string(),
            message: message.into(),
        }
    }

    /// Create a ValidationFailed error
    pub fn invalid(kind: &str, name: &str, errors: Vec<FieldError>) -> Self {
        RegistryError::ValidationFailed {
            kind: kind.to_string(),
            name: name.to_string(),
            errors,
        }
    }

    /// Create an Internal error
    pub fn internal(kind: &str, name: &str, message: impl Into<String>) -> Self {
        RegistryError::Internal {
            kind: kind.to_string(),
            name: name.to_string(),
            message: message.into(),
        }
    }

    /// Create a Gone error
    pub fn gone(kind: &str, message: impl Into<String>) -> Self {
        RegistryError::Gone {
            kind: kind.to_string(),
            message: message.into(),
        }
    }

    /// Create a ServerTimeout error
    pub fn server_timeout(kind: &str, name: &str, operation: &str) -> Self {
        RegistryError::ServerTimeout {
            kind: kind.to_string(),
            name: name.to_string(),
            operation: operation.to_string(),
        }
    }

    /// Discriminant of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            RegistryError::BadRequest { .. } => ErrorKind::BadRequest,
            RegistryError::NotFound { .. } => ErrorKind::NotFound,
            RegistryError::AlreadyExists { .. } => ErrorKind::AlreadyExists,
            RegistryError::Conflict { .. } => ErrorKind::Conflict,
            RegistryError::ValidationFailed { .. } => ErrorKind::ValidationFailed,
            RegistryError::Internal { .. } => ErrorKind::Internal,
            RegistryError::Gone { .. } => ErrorKind::Gone,
            RegistryError::ServerTimeout { .. } => ErrorKind::ServerTimeout,
        }
    }

    /// HTTP-style status code for this error
    pub fn status_code(&self) -> u16 {
        self.kind().status_code()
    }

    /// Resource kind this error is about
    pub fn resource(&self) -> &str {
        match self {
            RegistryError::BadRequest { kind, .. }
            | RegistryError::NotFound { kind, .. }
            | RegistryError::AlreadyExists { kind, .. }
            | RegistryError::Conflict { kind, .. }
            | RegistryError::ValidationFailed { kind, .. }
            | RegistryError::Internal { kind, .. }
            | RegistryError::Gone { kind, .. }
            | RegistryError::ServerTimeout { kind, .. } => kind,
        }
    }

    /// Item name, if the error is item-scoped
    pub fn name(&self) -> Option<&str> {
        match self {
            RegistryError::BadRequest { name, .. }
            | RegistryError::NotFound { name, .. }
            | RegistryError::AlreadyExists { name, .. }
            | RegistryError::Conflict { name, .. }
            | RegistryError::ValidationFailed { name, .. }
            | RegistryError::Internal { name, .. }
            | RegistryError::ServerTimeout { name, .. } => Some(name.as_str()),
            RegistryError::Gone { .. } => None,
        }
    }

    /// Field errors carried by `ValidationFailed`; empty otherwise
    pub fn field_errors(&self) -> &[FieldError] {
        match self {
            RegistryError::ValidationFailed { errors, .. } => errors,
            _ => &[],
        }
    }

    /// Check if this is a NotFound error
    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }

    /// Check if this is an AlreadyExists error
    pub fn is_already_exists(&self) -> bool {
        self.kind() == ErrorKind::AlreadyExists
    }

    /// Check if this is a Conflict error
    pub fn is_conflict(&self) -> bool {
        self.kind() == ErrorKind::Conflict
    }
}
