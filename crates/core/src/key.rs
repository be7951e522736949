//! Hierarchical key construction
//!
//! Keys are `/`-separated paths:
//!
//! ```text
//! <prefix>[/<namespace>]          root key (list, watch)
//! <prefix>[/<namespace>]/<name>   item key (create, update, get, delete)
//! ```
//!
//! ## Contract
//!
//! - The namespace segment is present only when the context carries a
//!   non-empty namespace.
//! - Namespace-enforcing item keys fail without a namespace, and every item
//!   key fails without a name.
//! - Segments must not be `.` or `..` and must not contain `/` or `%`. This
//!   keeps `(namespace, name) -> key` injective.
//!
//! All functions here are pure.

use crate::context::Context;
use thiserror::Error;

/// Path separator between key segments
pub const SEPARATOR: char = '/';

/// Root key for a resource kind, namespaced when the context has a namespace
///
/// A context without a namespace yields `prefix`, so list and watch span
/// every namespace. A namespace that is not a valid segment fails with
/// [`KeyError::InvalidSegment`] instead of naming a root no item key can
/// live under.
pub fn namespace_key_root(ctx: &Context, prefix: &str) -> Result<String, KeyError> {
    match ctx.namespace() {
        Some(ns) => {
            validate_segment(ns)?;
            Ok(format!("{}{}{}", prefix, SEPARATOR, ns))
        }
        None => Ok(prefix.to_string()),
    }
}

/// Item key for a namespaced resource kind
///
/// Fails with [`KeyError::NamespaceRequired`] if the context has no namespace
/// and with [`KeyError::NameRequired`] if `name` is empty.
pub fn namespace_key(ctx: &Context, prefix: &str, name: &str) -> Result<String, KeyError> {
    let ns = ctx.namespace().ok_or(KeyError::NamespaceRequired)?;
    if name.is_empty() {
        return Err(KeyError::NameRequired);
    }
    let root = namespace_key_root(ctx, prefix)?;
    validate_segment(name)?;
    Ok(format!("{}{}{}", root, SEPARATOR, name))
}

/// Root key for a cluster-scoped resource kind; ignores the namespace
pub fn no_namespace_key_root(_ctx: &Context, prefix: &str) -> String {
    prefix.to_string()
}

/// Item key for a cluster-scoped resource kind; ignores the namespace
pub fn no_namespace_key(_ctx: &Context, prefix: &str, name: &str) -> Result<String, KeyError> {
    if name.is_empty() {
        return Err(KeyError::NameRequired);
    }
    validate_segment(name)?;
    Ok(format!("{}{}{}", prefix, SEPARATOR, name))
}

/// Check that a name or namespace can be used as a single key segment
pub fn validate_segment(segment: &str) -> Result<(), KeyError> {
    let reason = if segment == "." || segment == ".." {
        Some("may not be '.' or '..'")
    } else if segment.contains(SEPARATOR) {
        Some("may not contain '/'")
    } else if segment.contains('%') {
        Some("may not contain '%'")
    } else {
        None
    };
    match reason {
        Some(reason) => Err(KeyError::InvalidSegment {
            segment: segment.to_string(),
            reason,
        }),
        None => Ok(()),
    }
}

/// True if `key` lies strictly below `root`
///
/// `prefix/ns1` does not contain `prefix/ns10/a`.
pub fn is_under(root: &str, key: &str) -> bool {
    key.len() > root.len() + 1
        && key.starts_with(root)
        && key[root.len()..].starts_with(SEPARATOR)
}

/// Key construction errors
///
/// The registry reports these as `BadRequest`.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum KeyError {
    /// Namespace-enforcing key built from a context without a namespace
    #[error("Namespace parameter required.")]
    NamespaceRequired,

    /// Item key built with an empty name
    #[error("Name parameter required.")]
    NameRequired,

    /// Segment cannot be embedded in a key path
    #[error("{segment:?} {reason}")]
    InvalidSegment {
        /// The rejected name or namespace
        segment: String,
        /// Why it was rejected
        reason: &'static str,
    },
}

impl KeyError {
    /// Short machine-readable reason
    pub fn reason_code(&self) -> &'static str {
        match self {
            KeyError::NamespaceRequired => "namespace_required",
            KeyError::NameRequired => "name_required",
            KeyError::InvalidSegment { .. } => "invalid_segment",
        }
    }
}
