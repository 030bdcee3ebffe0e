//! Brezza compressed-artifact subsystem.
//!
//! Builds gzip-encoded responses for static file bodies. Two interchangeable
//! policies share one `fetch` contract: recompute on every request, or keep
//! compressed copies on disk behind a bounded in-memory index whose
//! evictions delete the backing file.

mod cache;
mod file;
mod gzip;

use thiserror::Error;

pub use cache::{ArtifactRecord, DiskBackedCache, GzipAssetCache};
pub use file::{AssetSource, DiskAsset};

/// Errors surfaced to the caller of `fetch`. Disposal failures during
/// eviction are logged and never reach the request path.
#[derive(Debug, Error)]
pub enum AssetError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("compression task failed: {0}")]
    Compress(String),
}
