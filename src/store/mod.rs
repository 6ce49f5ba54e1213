//! Pluggable blob storage for downloaded files.
//!
//! A [`FileStore`] writes and reads blobs by logical path (e.g.
//! `download_file_42`). Writers are streaming sinks: closing finalizes the
//! object, closing after an error may leave a partial object behind.

use crate::config::{DownloadConfig, StoreMode};
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};

mod local;
mod s3;

pub use local::LocalStore;
pub use s3::S3Store;

/// Streaming sink returned by [`FileStore::write`]
pub type BlobWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// Streaming source returned by [`FileStore::read`]
pub type BlobReader = Box<dyn AsyncRead + Send + Unpin>;

/// Blob sink/source keyed by logical path
#[async_trait]
pub trait FileStore: Send + Sync {
    /// Open a streaming sink for the given path, creating or truncating the
    /// object. Shutting the sink down finalizes the object.
    async fn write(&self, path: &str) -> Result<BlobWriter>;

    /// Open a stream over the object at the given path
    async fn read(&self, path: &str) -> Result<BlobReader>;
}

/// Construct the store selected by the configuration
pub async fn from_config(config: &DownloadConfig) -> Result<Arc<dyn FileStore>> {
    match config.mode {
        StoreMode::Local => Ok(Arc::new(LocalStore::new(&config.directory).await?)),
        StoreMode::S3 => Ok(Arc::new(S3Store::new(config))),
    }
}
