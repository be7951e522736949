//! Item predicates for List and Watch
//!
//! Selector parsing lives outside the registry; this is only the contract a
//! selector has to satisfy. A matcher may fail on a particular object (for
//! example, a field selector naming a field the object lacks). The registry
//! logs such failures and treats the object as a non-match.

use crate::error::RegistryResult;

/// Decides whether an object belongs in a List or Watch result
pub trait Matcher<T>: Send + Sync {
    /// True if `obj` should be included
    fn matches(&self, obj: &T) -> RegistryResult<bool>;
}

/// Matches every object
#[derive(Debug, Clone, Copy, Default)]
pub struct Everything;

impl<T> Matcher<T> for Everything {
    fn matches(&self, _obj: &T) -> RegistryResult<bool> {
        Ok(true)
    }
}

/// Matcher backed by a closure
#[derive(Debug, Clone, Copy)]
pub struct MatchFn<F>(pub F);

impl<T, F> Matcher<T> for MatchFn<F>
where
    F: Fn(&T) -> RegistryResult<bool> + Send + Sync,
{
    fn matches(&self, obj: &T) -> RegistryResult<bool> {
        (self.0)(obj)
    }
}

/// Wrap a closure as a matcher
pub fn match_fn<T, F>(f: F) -> MatchFn<F>
where
    F: Fn(&T) -> RegistryResult<bool> + Send + Sync,
{
    MatchFn(f)
}
