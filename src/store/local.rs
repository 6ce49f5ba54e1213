//! Local filesystem blob store.

use crate::error::{Result, StorageError};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs::File;
use tokio::io::BufReader;

use super::{BlobReader, BlobWriter, FileStore};

/// Stores blobs as plain files under a root directory
pub struct LocalStore {
    root: PathBuf,
}

impl LocalStore {
    /// Create the store, creating the root directory if missing
    pub async fn new(root: &Path) -> Result<Self> {
        tokio::fs::create_dir_all(root)
            .await
            .map_err(|e| StorageError::Open {
                path: root.display().to_string(),
                message: format!("failed to create download directory: {}", e),
            })?;

        Ok(Self {
            root: root.to_path_buf(),
        })
    }
}

#[async_trait]
impl FileStore for LocalStore {
    async fn write(&self, path: &str) -> Result<BlobWriter> {
        let absolute = self.root.join(path);
        let file = File::create(&absolute).await.map_err(|e| StorageError::Open {
            path: path.to_string(),
            message: e.to_string(),
        })?;

        Ok(Box::new(file))
    }

    async fn read(&self, path: &str) -> Result<BlobReader> {
        let absolute = self.root.join(path);
        let file = File::open(&absolute).await.map_err(|e| StorageError::Open {
            path: path.to_string(),
            message: e.to_string(),
        })?;

        Ok(Box::new(BufReader::new(file)))
    }
}
