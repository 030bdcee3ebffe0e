//! Brezza cache subsystem.
//!
//! Provides the generic capacity-bounded LRU store that the routing and
//! asset layers build on:
//!
//! - **[`BoundedCache`]**: weighted LRU map with an eviction hook.
//!
//! The cache owns entry lifecycle only. Resources behind entries (files on
//! disk, for the asset layer) are disposed of by the owning component through
//! the eviction hook, keeping the data structure resource-agnostic.

mod bounded;
mod lock;

pub use bounded::BoundedCache;
