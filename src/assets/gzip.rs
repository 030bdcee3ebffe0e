//! Gzip helpers for the artifact cache.

use std::io::Write;
use std::time::SystemTime;

use bytes::Bytes;
use flate2::{Compression, write::GzEncoder};
use time::{OffsetDateTime, format_description::BorrowedFormatItem, macros::format_description};
use tokio::task;

use super::AssetError;

// IMF-fixdate, the required format for Last-Modified.
const IMF_FIXDATE: &[BorrowedFormatItem<'static>] = format_description!(
    "[weekday repr:short], [day] [month repr:short] [year] [hour]:[minute]:[second] GMT"
);

/// Gzip a full body on the blocking pool; compression never runs on the
/// async executor or under a cache lock.
pub(super) async fn compress(raw: Bytes) -> Result<Bytes, AssetError> {
    task::spawn_blocking(move || {
        let mut encoder = GzEncoder::new(
            Vec::with_capacity(raw.len() / 2 + 16),
            Compression::default(),
        );
        encoder.write_all(&raw)?;
        encoder.finish().map(Bytes::from)
    })
    .await
    .map_err(|join_error| AssetError::Compress(join_error.to_string()))?
    .map_err(AssetError::Io)
}

/// Render a timestamp as an IMF-fixdate header value. Timestamps that fall
/// outside the formattable range yield `None` and the header is skipped.
pub(super) fn imf_fixdate(timestamp: SystemTime) -> Option<String> {
    OffsetDateTime::from(timestamp).format(&IMF_FIXDATE).ok()
}
