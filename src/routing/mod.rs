//! Brezza routing subsystem.
//!
//! An ordered route registry with eager pattern compilation, and a cached
//! wrapper that amortizes per-request matching behind a path-keyed bounded
//! cache. Verb dispatch and middleware execution live with the consuming
//! dispatcher, not here.

mod cached;
mod pattern;
mod router;

pub use cached::{CachedRouter, SharedMatches};
pub use pattern::{Params, RoutePattern};
pub use router::{Fallback, RouteMatch, Router};
