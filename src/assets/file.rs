//! File-source boundary for the compressed-artifact cache.

use std::io;
use std::path::PathBuf;
use std::time::SystemTime;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::fs;

/// A static file as the artifact cache sees it: a logical name, a
/// modification timestamp that doubles as the staleness marker, a media
/// type, and a way to read the full contents.
#[async_trait]
pub trait AssetSource: Send + Sync {
    /// Logical name, usually a path. Must be distinct per source: it feeds
    /// the cache identity, and two sources sharing a name would share cached
    /// artifacts. Sanitized before it reaches disk.
    fn name(&self) -> &str;

    /// Modification time of the contents. A change here produces a new
    /// identity key; contents are never hashed.
    fn last_modified(&self) -> SystemTime;

    /// Media type for the `Content-Type` header.
    fn content_type(&self) -> &str;

    /// Read the full contents into memory.
    async fn read_all(&self) -> io::Result<Bytes>;
}

/// An [`AssetSource`] backed by a file on the local filesystem.
#[derive(Debug, Clone)]
pub struct DiskAsset {
    path: PathBuf,
    name: String,
    content_type: String,
    last_modified: SystemTime,
}

impl DiskAsset {
    /// Stat the file and capture its identity. The modification time is
    /// frozen at open time; reopen to observe a newer version.
    pub async fn open(path: impl Into<PathBuf>) -> io::Result<Self> {
        let path = path.into();
        let metadata = fs::metadata(&path).await?;
        let last_modified = metadata.modified()?;

        // The full path is the logical name; a bare basename would collide
        // across directories.
        let name = path.to_string_lossy().into_owned();
        let content_type = mime_guess::from_path(&path)
            .first_or_octet_stream()
            .to_string();

        Ok(Self {
            path,
            name,
            content_type,
            last_modified,
        })
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }
}

#[async_trait]
impl AssetSource for DiskAsset {
    fn name(&self) -> &str {
        &self.name
    }

    fn last_modified(&self) -> SystemTime {
        self.last_modified
    }

    fn content_type(&self) -> &str {
        &self.content_type
    }

    async fn read_all(&self) -> io::Result<Bytes> {
        fs::read(&self.path).await.map(Bytes::from)
    }
}
