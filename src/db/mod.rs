//! Database layer for fetchd
//!
//! Handles SQLite persistence for accounts, account passwords, and download
//! tasks.
//!
//! ## Submodules
//!
//! Methods on [`Database`] are organized by domain:
//! - [`migrations`] - Database lifecycle, schema migrations
//! - [`accounts`] - Account and password rows
//! - [`tasks`] - Download task repository, including the transaction-bound
//!   lock-for-update read used by the claim protocol
//!
//! ## Transactions
//!
//! Repository methods take any [`sqlx::Executor`], so callers pass the
//! pool for standalone statements or `&mut *tx` to compose several calls into
//! one transaction. [`Database::begin`] starts a transaction on the pool.

use crate::error::{DatabaseError, Error, Result};
use crate::types::{AccountId, DownloadStatus, DownloadType, Metadata, TaskId, TaskInfo};
use sqlx::sqlite::SqlitePool;
use sqlx::{FromRow, Sqlite, Transaction};

mod accounts;
mod migrations;
mod tasks;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;

pub use accounts::{Account, AccountPassword};
pub use tasks::NewTask;

/// Handle to the SQLite database
#[derive(Clone)]
pub struct Database {
    pub(crate) pool: SqlitePool,
}

impl Database {
    /// Begin a transaction on the underlying pool
    pub async fn begin(&self) -> Result<Transaction<'static, Sqlite>> {
        self.pool.begin().await.map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to begin transaction: {}",
                e
            )))
        })
    }

    /// Access the underlying connection pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

/// Download task row as stored
///
/// `download_type` and `download_status` are kept as raw integers so rows
/// written by newer builds still load; decode them with
/// [`TaskRecord::download_type`] and [`TaskRecord::download_status`].
#[derive(Debug, Clone, FromRow)]
pub struct TaskRecord {
    /// Unique task ID
    pub id: TaskId,
    /// Owning account
    pub of_account_id: AccountId,
    /// Raw download type column
    #[sqlx(rename = "download_type")]
    pub download_type_raw: i32,
    /// Source URL
    pub url: String,
    /// Raw download status column
    #[sqlx(rename = "download_status")]
    pub download_status_raw: i32,
    /// Metadata column, JSON-encoded object
    #[sqlx(rename = "metadata")]
    pub metadata_raw: String,
}

impl TaskRecord {
    /// Decode the stored download type
    pub fn download_type(&self) -> Option<DownloadType> {
        DownloadType::from_i32(self.download_type_raw)
    }

    /// Decode the stored download status
    pub fn download_status(&self) -> Option<DownloadStatus> {
        DownloadStatus::from_i32(self.download_status_raw)
    }

    /// Set the download status
    pub fn set_download_status(&mut self, status: DownloadStatus) {
        self.download_status_raw = status.as_i32();
    }

    /// Decode the metadata JSON object
    pub fn metadata(&self) -> Result<Metadata> {
        serde_json::from_str(&self.metadata_raw).map_err(|e| {
            Error::Database(DatabaseError::CorruptRow(format!(
                "task {} metadata is not a JSON object: {}",
                self.id, e
            )))
        })
    }

    /// Replace the metadata JSON object
    pub fn set_metadata(&mut self, metadata: &Metadata) -> Result<()> {
        self.metadata_raw = serde_json::to_string(metadata)?;
        Ok(())
    }

    /// Convert to the API-facing view
    pub fn to_info(&self) -> Result<TaskInfo> {
        Ok(TaskInfo {
            id: self.id,
            of_account_id: self.of_account_id,
            download_type: self.download_type(),
            url: self.url.clone(),
            download_status: self.download_status(),
            metadata: self.metadata()?,
        })
    }
}
