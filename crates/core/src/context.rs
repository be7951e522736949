//! Request context
//!
//! A `Context` is built once per request by the calling layer and handed to
//! every registry operation. It is immutable: there are no setters, only
//! constructors.

/// Namespace used by callers that do not pick one explicitly
pub const NAMESPACE_DEFAULT: &str = "default";

/// Request-scoped metadata
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Context {
    namespace: Option<String>,
}

impl Context {
    /// Context without a namespace (cluster-scoped requests)
    pub fn new() -> Self {
        Self::default()
    }

    /// Context scoped to `namespace`
    pub fn with_namespace(namespace: impl Into<String>) -> Self {
        Self {
            namespace: Some(namespace.into()),
        }
    }

    /// Context scoped to [`NAMESPACE_DEFAULT`]
    pub fn default_namespace() -> Self {
        Self::with_namespace(NAMESPACE_DEFAULT)
    }

    /// The namespace, if one was supplied and it is non-empty
    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref().filter(|ns| !ns.is_empty())
    }

    /// True if the context carries a non-empty namespace
    pub fn has_namespace(&self) -> bool {
        self.namespace().is_some()
    }
}
