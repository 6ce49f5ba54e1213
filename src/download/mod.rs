//! HTTP downloader: fetch a URL into a writer.
//!
//! The downloader probes the origin for byte-range support and picks one of
//! two strategies:
//! - **sequential** - a plain GET streamed straight to the writer; used when
//!   the probe fails, ranges are unsupported, the size is unknown, or the
//!   file is below the parallel threshold
//! - **parallel** - fixed-size ranged chunks fetched by a worker pool and
//!   reassembled into strict offset order before reaching the writer
//!
//! Either way the file is never buffered whole; the parallel path holds at
//! most the in-flight chunks plus the out-of-order window.

use crate::error::Result;
use crate::types::Metadata;
use async_trait::async_trait;
use tokio::io::AsyncWrite;
use tokio_util::sync::CancellationToken;

mod http;
mod probe;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;

pub use http::HttpDownloader;
pub use probe::{detect_range_and_size, RangeSupport};

/// Metadata key: origin-reported content type (sequential path)
pub const METADATA_KEY_CONTENT_TYPE: &str = "content-type";
/// Metadata key: wall-clock duration of the sequential download
pub const METADATA_KEY_DURATION_MS: &str = "download-duration-ms";
/// Metadata key: bytes written by the sequential download
pub const METADATA_KEY_SIZE_BYTES: &str = "download-size-bytes";

/// Fetches a source into a writer, reporting diagnostic metadata
#[async_trait]
pub trait Downloader: Send + Sync {
    /// Stream the source into `writer`
    ///
    /// Bytes reach the writer in strict offset order. Cancelling the token
    /// aborts outstanding requests promptly; the writer may have received a
    /// partial prefix by then.
    async fn download(
        &self,
        cancel: &CancellationToken,
        writer: &mut (dyn AsyncWrite + Send + Unpin),
    ) -> Result<Metadata>;
}
