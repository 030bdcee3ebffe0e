//! Brezza — bounded-memory caching core for a small HTTP server.
//!
//! Three amortization layers around expensive per-request work:
//!
//! - **`cache`**: a generic weighted LRU map with an eviction hook.
//! - **`routing`**: an ordered route matcher and its path-keyed cached wrapper.
//! - **`assets`**: gzip compression of static file bodies, either recomputed
//!   per request or kept as disk-backed artifacts behind a bounded index.
//!
//! ## Configuration
//!
//! Runtime behavior is controlled via `brezza.toml`:
//!
//! ```toml
//! [routing]
//! cache_capacity = 1024
//!
//! [assets]
//! directory = "cache/assets"
//! budget_bytes = 67108864
//! ```

pub mod assets;
pub mod cache;
pub mod config;
pub mod infra;
pub mod routing;
pub mod util;
