//! Core types for fetchd

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Opaque key→value metadata attached to a download task.
///
/// Serialized as a JSON object in storage. After a successful download it
/// contains at least the stored file name plus diagnostic fields emitted by
/// the downloader (content type, size, duration).
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// Unique identifier for a download task
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    ToSchema,
    sqlx::Type,
)]
#[serde(transparent)]
#[sqlx(transparent)]
pub struct TaskId(pub i64);

impl TaskId {
    /// Get the inner i64 value
    pub fn get(&self) -> i64 {
        self.0
    }
}

impl From<i64> for TaskId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for TaskId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}

/// Unique identifier for an account
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    ToSchema,
    sqlx::Type,
)]
#[serde(transparent)]
#[sqlx(transparent)]
pub struct AccountId(pub i64);

impl AccountId {
    /// Get the inner i64 value
    pub fn get(&self) -> i64 {
        self.0
    }
}

impl From<i64> for AccountId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for AccountId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle status of a download task
///
/// Transitions are strictly `Pending → Downloading → (Succeeded | Failed)`.
/// The `Failed` terminal state exists in the schema but the executor leaves
/// tasks in `Downloading` on post-claim failure; see `service::task`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum DownloadStatus {
    /// Created, waiting for an executor to claim it
    Pending,
    /// Claimed by an executor; the fetch is (or was) in flight
    Downloading,
    /// Terminal failure
    Failed,
    /// Download completed and the blob is stored
    Succeeded,
}

impl DownloadStatus {
    /// Integer representation used in the database
    pub fn as_i32(self) -> i32 {
        match self {
            DownloadStatus::Pending => 1,
            DownloadStatus::Downloading => 2,
            DownloadStatus::Failed => 3,
            DownloadStatus::Succeeded => 4,
        }
    }

    /// Decode the database integer representation
    pub fn from_i32(value: i32) -> Option<Self> {
        match value {
            1 => Some(DownloadStatus::Pending),
            2 => Some(DownloadStatus::Downloading),
            3 => Some(DownloadStatus::Failed),
            4 => Some(DownloadStatus::Succeeded),
            _ => None,
        }
    }
}

impl std::fmt::Display for DownloadStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            DownloadStatus::Pending => "pending",
            DownloadStatus::Downloading => "downloading",
            DownloadStatus::Failed => "failed",
            DownloadStatus::Succeeded => "succeeded",
        };
        write!(f, "{}", s)
    }
}

/// Protocol used to fetch a task's URL
///
/// The type is frozen at create time. Rows may carry integers this build does
/// not recognize (written by a newer build); execution treats those as
/// unsupported and no-ops with a warning.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum DownloadType {
    /// Plain HTTP(S) fetch
    Http,
}

impl DownloadType {
    /// Integer representation used in the database
    pub fn as_i32(self) -> i32 {
        match self {
            DownloadType::Http => 1,
        }
    }

    /// Decode the database integer representation
    pub fn from_i32(value: i32) -> Option<Self> {
        match value {
            1 => Some(DownloadType::Http),
            _ => None,
        }
    }
}

/// API-facing view of a download task
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct TaskInfo {
    /// Task ID
    pub id: TaskId,
    /// Owning account
    pub of_account_id: AccountId,
    /// Protocol used to fetch the URL, as stored
    pub download_type: Option<DownloadType>,
    /// Source URL
    pub url: String,
    /// Current lifecycle status, as stored
    pub download_status: Option<DownloadStatus>,
    /// Task metadata (file name and downloader diagnostics once succeeded)
    #[schema(value_type = Object)]
    pub metadata: Metadata,
}
