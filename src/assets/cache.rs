//! Compressed-artifact cache policies.
//!
//! One contract, `fetch(source) -> Response`, over a closed set of policies
//! selected at construction:
//!
//! - [`GzipAssetCache::AlwaysRecompute`] compresses on every call.
//! - [`GzipAssetCache::DiskBacked`] keeps compressed copies in a cache
//!   directory behind a bounded in-memory index; evicting an index entry
//!   deletes the backing file.
//!
//! The cache directory is exclusively owned by [`DiskBackedCache`]; the
//! eviction hook is the single authorized deletion path, so the index and
//! the directory stay consistent with each other.

use std::fmt::Write as FmtWrite;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use std::time::{Instant, UNIX_EPOCH};

use axum::{
    body::Body,
    http::{HeaderValue, StatusCode, header},
    response::Response,
};
use bytes::Bytes;
use metrics::{counter, histogram};
use sha2::{Digest, Sha256};
use slug::slugify;
use tokio::{fs, io::AsyncReadExt};
use tracing::{debug, warn};

use crate::cache::BoundedCache;
use crate::util::bytes::format_bytes;

use super::{AssetError, AssetSource, gzip};

const SOURCE: &str = "assets::cache";

const METRIC_ASSET_CACHE_HIT: &str = "brezza_asset_cache_hit_total";
const METRIC_ASSET_CACHE_MISS: &str = "brezza_asset_cache_miss_total";
const METRIC_ASSET_CACHE_EVICT: &str = "brezza_asset_cache_evict_total";
const METRIC_ASSET_GZIP_MS: &str = "brezza_asset_gzip_ms";

// Approximate index bookkeeping cost charged per record on top of the
// compressed byte length.
const RECORD_OVERHEAD: usize = 64;

const STREAM_CHUNK_BYTES: usize = 64 * 1024;

/// One indexed compressed artifact. While the record is indexed, the file at
/// `cache_path` holds exactly the gzip of the source as of the identity
/// key's modification time.
#[derive(Debug, Clone)]
pub struct ArtifactRecord {
    pub cache_path: PathBuf,
    pub byte_len: usize,
}

/// Compression policy selected at construction.
pub enum GzipAssetCache {
    /// No caching: compress the full contents on every request.
    AlwaysRecompute,
    /// Disk-backed artifacts behind a bounded index.
    DiskBacked(DiskBackedCache),
}

impl GzipAssetCache {
    pub fn always_recompute() -> Self {
        Self::AlwaysRecompute
    }

    /// Disk-backed policy writing into `directory`, bounded by
    /// `budget_bytes` of index weight. The directory is created if missing.
    pub fn disk_backed(
        directory: impl Into<PathBuf>,
        budget_bytes: usize,
    ) -> Result<Self, AssetError> {
        Ok(Self::DiskBacked(DiskBackedCache::new(
            directory,
            budget_bytes,
        )?))
    }

    /// Build a gzip response for the source under the selected policy.
    pub async fn fetch(&self, source: &dyn AssetSource) -> Result<Response, AssetError> {
        match self {
            Self::AlwaysRecompute => {
                let compressed = read_and_compress(source).await?;
                let length = compressed.len();
                Ok(build_response(source, Body::from(compressed), length))
            }
            Self::DiskBacked(cache) => cache.fetch(source).await,
        }
    }
}

/// Bounded index over compressed files in an exclusively-owned directory.
pub struct DiskBackedCache {
    directory: PathBuf,
    index: BoundedCache<ArtifactRecord>,
}

impl DiskBackedCache {
    /// Initialise the cache rooted at `directory`, creating it if necessary.
    pub fn new(directory: impl Into<PathBuf>, budget_bytes: usize) -> Result<Self, AssetError> {
        let directory = directory.into();
        std::fs::create_dir_all(&directory)?;

        let index = BoundedCache::with_weigher(budget_bytes, |key: &str, record: &ArtifactRecord| {
            key.len()
                + record.cache_path.as_os_str().len()
                + record.byte_len
                + RECORD_OVERHEAD
        })
        .with_eviction_hook(|key, record: &ArtifactRecord| {
            counter!(METRIC_ASSET_CACHE_EVICT).increment(1);
            debug!(
                target_module = SOURCE,
                key,
                size = %format_bytes(record.byte_len as u64),
                "evicting compressed artifact"
            );
            // Deletion is fire-and-forget off the insertion path. A failure
            // leaks the file; the logical cache has already moved on.
            let path = record.cache_path.clone();
            tokio::spawn(async move {
                if let Err(error) = fs::remove_file(&path).await
                    && error.kind() != ErrorKind::NotFound
                {
                    warn!(
                        target_module = SOURCE,
                        path = %path.display(),
                        %error,
                        "failed to delete evicted artifact"
                    );
                }
            });
        });

        Ok(Self { directory, index })
    }

    /// Serve the compressed body for the source: from disk when the identity
    /// key is indexed, otherwise read-compress-write and index the result.
    ///
    /// Two concurrent cold misses for the same identity both do the full
    /// work; the later `set` wins the index slot and both responses are
    /// valid. This duplicate work is accepted rather than guarded.
    pub async fn fetch(&self, source: &dyn AssetSource) -> Result<Response, AssetError> {
        let key = identity_key(source);

        if let Some(record) = self.index.get(&key) {
            match fs::File::open(&record.cache_path).await {
                Ok(file) => {
                    counter!(METRIC_ASSET_CACHE_HIT).increment(1);
                    debug!(target_module = SOURCE, key = %key, outcome = "hit", "streaming cached artifact");
                    return Ok(build_response(source, stream_body(file), record.byte_len));
                }
                Err(error) => {
                    // Someone deleted the file out from under the index.
                    // Drop the record through the normal disposal path and
                    // fall through to a recompute.
                    warn!(
                        target_module = SOURCE,
                        key = %key,
                        %error,
                        "indexed artifact unreadable, recompressing"
                    );
                    self.index.remove(&key);
                }
            }
        }

        counter!(METRIC_ASSET_CACHE_MISS).increment(1);
        debug!(target_module = SOURCE, key = %key, outcome = "miss", "compressing artifact");

        let compressed = read_and_compress(source).await?;
        let length = compressed.len();

        let cache_path = self.artifact_path(&key);
        fs::write(&cache_path, &compressed).await?;

        // Indexed only after the write fully completed; a partial write is
        // never reachable through the index.
        self.index.set(
            key,
            ArtifactRecord {
                cache_path,
                byte_len: length,
            },
        );

        Ok(build_response(source, Body::from(compressed), length))
    }

    /// Whether the source's current identity is indexed. Non-touching peek.
    pub fn contains(&self, source: &dyn AssetSource) -> bool {
        self.index.has(&identity_key(source))
    }

    /// Deterministic on-disk path for the source's current identity. The
    /// layout is implementation-owned, re-derivable after a restart, and not
    /// a public format.
    pub fn artifact_path_for(&self, source: &dyn AssetSource) -> PathBuf {
        self.artifact_path(&identity_key(source))
    }

    /// Sum of index weights currently retained.
    pub fn indexed_weight(&self) -> usize {
        self.index.total_weight()
    }

    fn artifact_path(&self, key: &str) -> PathBuf {
        self.directory.join(format!("{key}.gz"))
    }
}

async fn read_and_compress(source: &dyn AssetSource) -> Result<Bytes, AssetError> {
    let raw = source.read_all().await?;
    let started = Instant::now();
    let compressed = gzip::compress(raw).await?;
    histogram!(METRIC_ASSET_GZIP_MS).record(started.elapsed().as_secs_f64() * 1000.0);
    Ok(compressed)
}

/// Identity key: sanitized source name, a digest of the raw name, and the
/// modification time in seconds. A changed file shows up as a new key; the
/// old record ages out by LRU. The digest keeps sources distinct even when
/// sanitization flattens their names to the same slug (`admin/site.css` and
/// `public/site.css` share a basename but never a key).
fn identity_key(source: &dyn AssetSource) -> String {
    let seconds = source
        .last_modified()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or(0);
    format!(
        "{}-{}@{seconds}",
        sanitize_name(source.name()),
        name_digest(source.name())
    )
}

/// Slug of every path component of the logical name, joined with `-`, with
/// the final extension lowercased and kept. Purely for on-disk readability;
/// uniqueness comes from [`name_digest`].
fn sanitize_name(original: &str) -> String {
    let path = Path::new(original);

    let mut directories: Vec<String> = Vec::new();
    if let Some(parent) = path.parent() {
        for component in parent.components() {
            if let Component::Normal(piece) = component
                && let Some(text) = piece.to_str()
            {
                let slug = slugify(text);
                if !slug.is_empty() {
                    directories.push(slug);
                }
            }
        }
    }

    let stem = path
        .file_stem()
        .and_then(|value| value.to_str())
        .unwrap_or("asset");
    let mut base = slugify(stem);
    if base.is_empty() {
        base = "asset".to_string();
    }
    if !directories.is_empty() {
        base = format!("{}-{base}", directories.join("-"));
    }

    let extension = path
        .extension()
        .and_then(|value| value.to_str())
        .map(|value| value.trim_matches('.').to_ascii_lowercase())
        .filter(|value| !value.is_empty());

    match extension {
        Some(ext) => format!("{base}.{ext}"),
        None => base,
    }
}

fn name_digest(name: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(name.as_bytes());
    let digest = hasher.finalize();
    hex_from_bytes(&digest[..4])
}

fn hex_from_bytes(bytes: &[u8]) -> String {
    let mut output = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        let _ = FmtWrite::write_fmt(&mut output, format_args!("{byte:02x}"));
    }
    output
}

fn stream_body(file: fs::File) -> Body {
    let stream = async_stream::stream! {
        let mut file = file;
        let mut buffer = vec![0u8; STREAM_CHUNK_BYTES];
        loop {
            match file.read(&mut buffer).await {
                Ok(0) => break,
                Ok(read) => yield Ok::<_, std::io::Error>(Bytes::copy_from_slice(&buffer[..read])),
                Err(error) => {
                    yield Err(error);
                    break;
                }
            }
        }
    };
    Body::from_stream(stream)
}

fn build_response(source: &dyn AssetSource, body: Body, compressed_len: usize) -> Response {
    let mut response = Response::new(body);
    *response.status_mut() = StatusCode::OK;

    let headers = response.headers_mut();
    headers.insert(header::CONTENT_ENCODING, HeaderValue::from_static("gzip"));
    if let Ok(value) = HeaderValue::from_str(source.content_type()) {
        headers.insert(header::CONTENT_TYPE, value);
    }
    if let Ok(value) = HeaderValue::from_str(&compressed_len.to_string()) {
        headers.insert(header::CONTENT_LENGTH, value);
    }
    if let Some(formatted) = gzip::imf_fixdate(source.last_modified())
        && let Ok(value) = HeaderValue::from_str(&formatted)
    {
        headers.insert(header::LAST_MODIFIED, value);
    }

    response
}
