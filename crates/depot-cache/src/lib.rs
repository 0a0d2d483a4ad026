//! Shared cache for Depot entities.
//!
//! A single [`RepositoryCache`] is built from a cache spec string and shared
//! by every entity under a storage manager. The eviction policy is driven
//! entirely by the [`CacheSpec`]; callers only see lookups, a [`CacheStats`]
//! snapshot, and `clear()`.
//!
//! # Spec format
//!
//! Comma-separated `key=value` pairs:
//!
//! - `maximumSize=<entries>`
//! - `maximumWeight=<bytes>`
//! - `expireAfterAccess=<duration>`
//! - `expireAfterWrite=<duration>`
//!
//! Durations take a unit suffix: `ms`, `s`, `m`, `h`, or `d`. `maximumSize`
//! and `maximumWeight` are mutually exclusive.

pub mod cache;
pub mod error;
pub mod spec;
pub mod stats;

pub use cache::RepositoryCache;
pub use error::{CacheSpecError, CacheSpecResult};
pub use spec::{CacheSpec, DEFAULT_CACHE_SPEC};
pub use stats::CacheStats;
