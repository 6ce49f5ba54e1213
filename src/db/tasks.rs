//! Download task repository.
//!
//! The claim protocol relies on [`Database::get_task_for_update`]: it must be
//! called inside a transaction, acquires the database write lock before
//! reading (a blocking wait, bounded by the pool's busy timeout), and thereby
//! guarantees that between the read and the transaction's commit no other
//! claimant can observe the same Pending row.

use crate::error::{DatabaseError, Error, Result};
use crate::types::{AccountId, DownloadStatus, DownloadType, TaskId};
use sqlx::{Sqlite, Transaction};

use super::{Database, TaskRecord};

/// New download task to be inserted into the database
#[derive(Debug, Clone)]
pub struct NewTask {
    /// Owning account
    pub of_account_id: AccountId,
    /// Protocol used to fetch the URL
    pub download_type: DownloadType,
    /// Source URL
    pub url: String,
}

const TASK_COLUMNS: &str = "id, of_account_id, download_type, url, download_status, metadata";

impl Database {
    /// Insert a new download task with status Pending and empty metadata
    pub async fn create_task<'e, E>(&self, executor: E, task: &NewTask) -> Result<TaskId>
    where
        E: sqlx::Executor<'e, Database = sqlx::Sqlite>,
    {
        let result = sqlx::query(
            r#"
            INSERT INTO download_tasks (of_account_id, download_type, url, download_status, metadata)
            VALUES (?, ?, ?, ?, '{}')
            "#,
        )
        .bind(task.of_account_id)
        .bind(task.download_type.as_i32())
        .bind(&task.url)
        .bind(DownloadStatus::Pending.as_i32())
        .execute(executor)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to insert download task: {}",
                e
            )))
        })?;

        Ok(TaskId(result.last_insert_rowid()))
    }

    /// Get a download task by ID
    pub async fn get_task<'e, E>(&self, executor: E, id: TaskId) -> Result<Option<TaskRecord>>
    where
        E: sqlx::Executor<'e, Database = sqlx::Sqlite>,
    {
        let row = sqlx::query_as::<_, TaskRecord>(&format!(
            "SELECT {TASK_COLUMNS} FROM download_tasks WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(executor)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to get download task: {}",
                e
            )))
        })?;

        Ok(row)
    }

    /// Get a download task by ID while holding its write lock
    ///
    /// Must be called as the transaction's first statement. The
    /// self-assignment UPDATE forces the transaction to take the write lock
    /// up front, so concurrent claimants queue here (blocking, bounded by the
    /// connection busy timeout) instead of racing the later status check.
    pub async fn get_task_for_update(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        id: TaskId,
    ) -> Result<Option<TaskRecord>> {
        sqlx::query("UPDATE download_tasks SET id = id WHERE id = ?")
            .bind(id)
            .execute(&mut **tx)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::QueryFailed(format!(
                    "Failed to lock download task: {}",
                    e
                )))
            })?;

        let row = sqlx::query_as::<_, TaskRecord>(&format!(
            "SELECT {TASK_COLUMNS} FROM download_tasks WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&mut **tx)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to get download task: {}",
                e
            )))
        })?;

        Ok(row)
    }

    /// Overwrite the mutable columns of a download task
    pub async fn update_task<'e, E>(&self, executor: E, task: &TaskRecord) -> Result<()>
    where
        E: sqlx::Executor<'e, Database = sqlx::Sqlite>,
    {
        sqlx::query(
            r#"
            UPDATE download_tasks
            SET download_type = ?, url = ?, download_status = ?, metadata = ?
            WHERE id = ?
            "#,
        )
        .bind(task.download_type_raw)
        .bind(&task.url)
        .bind(task.download_status_raw)
        .bind(&task.metadata_raw)
        .bind(task.id)
        .execute(executor)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to update download task: {}",
                e
            )))
        })?;

        Ok(())
    }

    /// Delete a download task row
    ///
    /// The stored blob, if any, is not removed.
    pub async fn delete_task<'e, E>(&self, executor: E, id: TaskId) -> Result<()>
    where
        E: sqlx::Executor<'e, Database = sqlx::Sqlite>,
    {
        sqlx::query("DELETE FROM download_tasks WHERE id = ?")
            .bind(id)
            .execute(executor)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::QueryFailed(format!(
                    "Failed to delete download task: {}",
                    e
                )))
            })?;

        Ok(())
    }

    /// List an account's download tasks, oldest first
    pub async fn list_tasks_of_account<'e, E>(
        &self,
        executor: E,
        account_id: AccountId,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<TaskRecord>>
    where
        E: sqlx::Executor<'e, Database = sqlx::Sqlite>,
    {
        let rows = sqlx::query_as::<_, TaskRecord>(&format!(
            r#"
            SELECT {TASK_COLUMNS} FROM download_tasks
            WHERE of_account_id = ?
            ORDER BY id ASC
            LIMIT ? OFFSET ?
            "#
        ))
        .bind(account_id)
        .bind(limit as i64)
        .bind(offset as i64)
        .fetch_all(executor)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to list download tasks: {}",
                e
            )))
        })?;

        Ok(rows)
    }

    /// Count an account's download tasks
    pub async fn count_tasks_of_account<'e, E>(
        &self,
        executor: E,
        account_id: AccountId,
    ) -> Result<u64>
    where
        E: sqlx::Executor<'e, Database = sqlx::Sqlite>,
    {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM download_tasks WHERE of_account_id = ?")
                .bind(account_id)
                .fetch_one(executor)
                .await
                .map_err(|e| {
                    Error::Database(DatabaseError::QueryFailed(format!(
                        "Failed to count download tasks: {}",
                        e
                    )))
                })?;

        Ok(count as u64)
    }
}
