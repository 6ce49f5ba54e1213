//! Download task orchestration: create-and-publish, claim, execute, and
//! owner-scoped CRUD/streaming.

use crate::auth::TokenAuth;
use crate::bus::{EventBus, TaskCreatedEvent, TOPIC_DOWNLOAD_TASK_CREATED};
use crate::config::DownloaderConfig;
use crate::db::{Database, NewTask, TaskRecord};
use crate::download::{Downloader, HttpDownloader};
use crate::error::{Error, Result};
use crate::store::{BlobReader, FileStore};
use crate::types::{AccountId, DownloadStatus, DownloadType, TaskId, TaskInfo};
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;

/// Metadata field naming the stored blob; present iff the task succeeded
const METADATA_FIELD_FILE_NAME: &str = "file-name";

/// The download task state machine
pub struct TaskService {
    db: Database,
    token_auth: TokenAuth,
    bus: Arc<dyn EventBus>,
    store: Arc<dyn FileStore>,
    http_client: reqwest::Client,
    downloader_settings: DownloaderConfig,
}

impl TaskService {
    /// Wire up the service
    pub fn new(
        db: Database,
        token_auth: TokenAuth,
        bus: Arc<dyn EventBus>,
        store: Arc<dyn FileStore>,
        http_client: reqwest::Client,
        downloader_settings: DownloaderConfig,
    ) -> Self {
        Self {
            db,
            token_auth,
            bus,
            store,
            http_client,
            downloader_settings,
        }
    }

    /// Resolve the caller's token and confirm the account still exists.
    async fn resolve_account(&self, token: &str) -> Result<AccountId> {
        let (account_id, _expires_at) = self.token_auth.resolve(token)?;
        self.db
            .get_account_by_id(self.db.pool(), account_id)
            .await?
            .ok_or_else(|| {
                Error::Unauthenticated("token subject no longer exists".to_string())
            })?;
        Ok(account_id)
    }

    /// Create a task and publish its created-event in one transaction.
    ///
    /// The publish happens before commit on purpose: if the broker is down
    /// the insert rolls back, so a task row existing implies its event was
    /// sent, never the reverse.
    pub async fn create_task(
        &self,
        token: &str,
        download_type: DownloadType,
        url: String,
    ) -> Result<TaskInfo> {
        let account_id = self.resolve_account(token).await?;

        let new_task = NewTask {
            of_account_id: account_id,
            download_type,
            url,
        };

        let mut tx = self.db.begin().await?;
        let task_id = self.db.create_task(&mut *tx, &new_task).await?;

        let payload = serde_json::to_vec(&TaskCreatedEvent { id: task_id })?;
        self.bus
            .publish(TOPIC_DOWNLOAD_TASK_CREATED, payload)
            .await?;

        tx.commit().await?;

        tracing::info!(task_id = %task_id, account_id = %account_id, "download task created");

        let task = self
            .db
            .get_task(self.db.pool(), task_id)
            .await?
            .ok_or_else(|| Error::Internal("freshly created task not found".to_string()))?;
        task.to_info()
    }

    /// List the caller's tasks with the total count.
    pub async fn list_tasks(
        &self,
        token: &str,
        offset: u64,
        limit: u64,
    ) -> Result<(Vec<TaskInfo>, u64)> {
        let account_id = self.resolve_account(token).await?;

        let total = self
            .db
            .count_tasks_of_account(self.db.pool(), account_id)
            .await?;
        let records = self
            .db
            .list_tasks_of_account(self.db.pool(), account_id, offset, limit)
            .await?;

        let tasks = records
            .iter()
            .map(TaskRecord::to_info)
            .collect::<Result<Vec<_>>>()?;
        Ok((tasks, total))
    }

    /// Change a task's URL.
    ///
    /// Accepted at any status; an edit has no effect on a download already
    /// in flight.
    pub async fn update_task(&self, token: &str, id: TaskId, url: String) -> Result<TaskInfo> {
        let account_id = self.resolve_account(token).await?;

        let mut tx = self.db.begin().await?;
        let mut task = self
            .db
            .get_task_for_update(&mut tx, id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("download task {}", id)))?;

        if task.of_account_id != account_id {
            return Err(Error::PermissionDenied(
                "trying to update a download task the account does not own".to_string(),
            ));
        }

        task.url = url;
        self.db.update_task(&mut *tx, &task).await?;
        tx.commit().await?;

        task.to_info()
    }

    /// Delete a task row. The stored blob, if any, stays behind.
    pub async fn delete_task(&self, token: &str, id: TaskId) -> Result<()> {
        let account_id = self.resolve_account(token).await?;

        let mut tx = self.db.begin().await?;
        let task = self
            .db
            .get_task_for_update(&mut tx, id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("download task {}", id)))?;

        if task.of_account_id != account_id {
            return Err(Error::PermissionDenied(
                "trying to delete a download task the account does not own".to_string(),
            ));
        }

        self.db.delete_task(&mut *tx, id).await?;
        tx.commit().await?;

        tracing::info!(task_id = %id, "download task deleted");
        Ok(())
    }

    /// Stream a succeeded task's stored blob back to its owner.
    pub async fn get_file(&self, token: &str, id: TaskId) -> Result<BlobReader> {
        let account_id = self.resolve_account(token).await?;

        let task = self
            .db
            .get_task(self.db.pool(), id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("download task {}", id)))?;

        if task.of_account_id != account_id {
            return Err(Error::PermissionDenied(
                "trying to get the file of a download task the account does not own".to_string(),
            ));
        }

        if task.download_status() != Some(DownloadStatus::Succeeded) {
            return Err(Error::InvalidArgument(
                "download task does not have succeeded status".to_string(),
            ));
        }

        let metadata = task.metadata()?;
        let file_name = metadata
            .get(METADATA_FIELD_FILE_NAME)
            .and_then(|v| v.as_str())
            .ok_or_else(|| {
                Error::Internal("download task metadata does not contain a file name".to_string())
            })?;

        self.store.read(file_name).await
    }

    /// Consumer callback: claim the task and run its download to completion.
    ///
    /// Safe under duplicate delivery: a missing task or a non-Pending status
    /// is a logged no-op. Any failure after the claim commits is returned to
    /// the consumer and leaves the task in Downloading; there is no reaper
    /// and no Failed transition here.
    pub async fn execute(&self, cancel: &CancellationToken, id: TaskId) -> Result<()> {
        let Some(mut task) = self.claim_pending(id).await? else {
            return Ok(());
        };

        let downloader = match task.download_type() {
            Some(DownloadType::Http) => HttpDownloader::new(
                self.http_client.clone(),
                task.url.clone(),
                self.downloader_settings.clone(),
            ),
            None => {
                tracing::warn!(
                    task_id = %id,
                    download_type = task.download_type_raw,
                    "unsupported download type, skipping execution"
                );
                return Ok(());
            }
        };

        let file_name = format!("download_file_{}", id);
        let mut writer = self.store.write(&file_name).await?;

        let mut metadata = match downloader.download(cancel, &mut *writer).await {
            Ok(metadata) => metadata,
            Err(e) => {
                tracing::error!(task_id = %id, error = %e, "failed to download");
                let _ = writer.shutdown().await;
                return Err(e);
            }
        };
        // Finalize the blob before the row claims success
        writer.shutdown().await?;

        metadata.insert(METADATA_FIELD_FILE_NAME.to_string(), file_name.into());
        task.set_download_status(DownloadStatus::Succeeded);
        task.set_metadata(&metadata)?;
        self.db.update_task(self.db.pool(), &task).await?;

        tracing::info!(task_id = %id, "download task executed successfully");
        Ok(())
    }

    /// Transition Pending→Downloading under the row lock.
    ///
    /// Returns the claimed record, or `None` when the task is missing or was
    /// already claimed by another consumer.
    async fn claim_pending(&self, id: TaskId) -> Result<Option<TaskRecord>> {
        let mut tx = self.db.begin().await?;

        let Some(mut task) = self.db.get_task_for_update(&mut tx, id).await? else {
            tracing::warn!(task_id = %id, "download task not found, skipping");
            return Ok(None);
        };

        if task.download_status() != Some(DownloadStatus::Pending) {
            tracing::warn!(
                task_id = %id,
                status = task.download_status_raw,
                "download task is not pending, skipping"
            );
            return Ok(None);
        }

        task.set_download_status(DownloadStatus::Downloading);
        self.db.update_task(&mut *tx, &task).await?;
        tx.commit().await?;

        Ok(Some(task))
    }
}
