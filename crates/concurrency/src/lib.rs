//! Concurrency layer for kindstore
//!
//! This crate implements optimistic concurrency control on top of a
//! `VersionedStore`:
//! - RetryConfig: conflict retry policy with exponential backoff
//! - guaranteed_update: the read-transform-compare-and-swap loop
//!
//! Only version conflicts are retried. Every other failure, including a
//! rejection from the transform, ends the loop.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cas;
pub mod retry;

pub use cas::{guaranteed_update, CasError, Committed, Proposal};
pub use retry::RetryConfig;
