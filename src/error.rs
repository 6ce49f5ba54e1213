//! Error types for fetchd
//!
//! This module provides error handling for the crate, including:
//! - Domain-specific error types (Database, Download, Storage)
//! - Request-level categories mirroring canonical RPC codes
//!   (unauthenticated, permission denied, not found, already exists,
//!   invalid argument)
//! - HTTP status code mapping for API integration
//! - Structured error responses with machine-readable error codes

use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

/// Result type alias for fetchd operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for fetchd
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "download.bucket")
        key: Option<String>,
    },

    /// Caller presented a missing, malformed, or expired token
    #[error("unauthenticated: {0}")]
    Unauthenticated(String),

    /// Caller is authenticated but does not own the target resource
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// Requested entity does not exist
    #[error("not found: {0}")]
    NotFound(String),

    /// Unique constraint would be violated (account name taken)
    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// Request is well-formed but violates a state precondition
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Database operation failed
    #[error("database error: {0}")]
    Database(#[from] DatabaseError),

    /// SQLx database error
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    /// Download-related error
    #[error("download error: {0}")]
    Download(#[from] DownloadError),

    /// Object store read/write failure
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// Event bus publish/consume failure
    #[error("event bus error: {0}")]
    Bus(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Outbound HTTP error
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Other internal error
    #[error("{0}")]
    Internal(String),
}

/// Database-related errors
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Failed to connect to database
    #[error("failed to connect to database: {0}")]
    ConnectionFailed(String),

    /// Failed to run migrations
    #[error("failed to run migrations: {0}")]
    MigrationFailed(String),

    /// Query failed
    #[error("query failed: {0}")]
    QueryFailed(String),

    /// Stored column value could not be decoded into a domain type
    #[error("corrupt row: {0}")]
    CorruptRow(String),
}

/// Errors surfaced by the HTTP downloader
#[derive(Debug, Error)]
pub enum DownloadError {
    /// The probe and its HEAD fallback both failed to classify the URL
    #[error("range probe failed with status {status}")]
    ProbeFailed {
        /// Status code of the probe GET
        status: u16,
    },

    /// A ranged chunk fetch did not return 206 Partial Content
    #[error("expected 206 Partial Content for chunk {index}, got {status}")]
    UnexpectedChunkStatus {
        /// Chunk index whose fetch misbehaved
        index: usize,
        /// Status code the origin returned
        status: u16,
    },

    /// The origin rejected the plain GET
    #[error("origin returned status {status}")]
    OriginStatus {
        /// Status code the origin returned
        status: u16,
    },

    /// The download was cancelled before completion
    #[error("download cancelled")]
    Cancelled,
}

/// Errors surfaced by the file store backends
#[derive(Debug, Error)]
pub enum StorageError {
    /// Could not open or create the target object/file
    #[error("failed to open {path}: {message}")]
    Open {
        /// Logical path of the object
        path: String,
        /// Underlying failure description
        message: String,
    },

    /// Streaming upload to the object store failed
    #[error("upload of {path} failed: {message}")]
    Upload {
        /// Logical path of the object
        path: String,
        /// Underlying failure description
        message: String,
    },
}

/// Structured API error response body
///
/// Rendered as `{"error": {"code": "...", "message": "..."}}` so clients can
/// dispatch on the machine-readable code without parsing messages.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApiError {
    /// Error payload
    pub error: ApiErrorBody,
}

/// Inner payload of an [`ApiError`]
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApiErrorBody {
    /// Machine-readable error code (e.g. "permission_denied")
    pub code: String,
    /// Human-readable message
    pub message: String,
}

/// Mapping from domain errors to HTTP status codes and machine codes
pub trait ToHttpStatus {
    /// Get the HTTP status code for this error
    fn status_code(&self) -> u16;

    /// Get the machine-readable error code
    fn error_code(&self) -> &str;
}

impl ToHttpStatus for Error {
    fn status_code(&self) -> u16 {
        match self {
            Error::Unauthenticated(_) => 401,
            Error::PermissionDenied(_) => 403,
            Error::NotFound(_) => 404,
            Error::AlreadyExists(_) => 409,
            Error::InvalidArgument(_) => 400,
            Error::Config { .. } => 400,

            // Upstream origin failures
            Error::Download(_) => 502,
            Error::Network(_) => 502,

            // Server-side issues
            Error::Database(_) => 500,
            Error::Sqlx(_) => 500,
            Error::Storage(_) => 500,
            Error::Bus(_) => 500,
            Error::Io(_) => 500,
            Error::Serialization(_) => 500,
            Error::Internal(_) => 500,
        }
    }

    fn error_code(&self) -> &str {
        match self {
            Error::Unauthenticated(_) => "unauthenticated",
            Error::PermissionDenied(_) => "permission_denied",
            Error::NotFound(_) => "not_found",
            Error::AlreadyExists(_) => "already_exists",
            Error::InvalidArgument(_) => "invalid_argument",
            Error::Config { .. } => "config_error",
            Error::Database(_) => "database_error",
            Error::Sqlx(_) => "database_error",
            Error::Download(_) => "download_error",
            Error::Storage(_) => "storage_error",
            Error::Bus(_) => "bus_error",
            Error::Io(_) => "io_error",
            Error::Network(_) => "network_error",
            Error::Serialization(_) => "serialization_error",
            Error::Internal(_) => "internal",
        }
    }
}

impl From<Error> for ApiError {
    fn from(error: Error) -> Self {
        ApiError {
            error: ApiErrorBody {
                code: error.error_code().to_string(),
                message: error.to_string(),
            },
        }
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_codes_map_to_http_statuses() {
        assert_eq!(Error::Unauthenticated("bad token".into()).status_code(), 401);
        assert_eq!(Error::PermissionDenied("not yours".into()).status_code(), 403);
        assert_eq!(Error::NotFound("task 7".into()).status_code(), 404);
        assert_eq!(Error::AlreadyExists("alice".into()).status_code(), 409);
        assert_eq!(
            Error::InvalidArgument("task not succeeded".into()).status_code(),
            400
        );
    }

    #[test]
    fn io_failures_are_internal() {
        let error = Error::Database(DatabaseError::QueryFailed("boom".into()));
        assert_eq!(error.status_code(), 500);
        assert_eq!(error.error_code(), "database_error");

        let error = Error::Storage(StorageError::Upload {
            path: "download_file_1".into(),
            message: "connection reset".into(),
        });
        assert_eq!(error.status_code(), 500);
    }

    #[test]
    fn origin_failures_are_bad_gateway() {
        let error = Error::Download(DownloadError::UnexpectedChunkStatus {
            index: 3,
            status: 500,
        });
        assert_eq!(error.status_code(), 502);
        assert_eq!(error.error_code(), "download_error");
    }

    #[test]
    fn api_error_carries_code_and_message() {
        let api_error: ApiError = Error::PermissionDenied(
            "trying to delete a download task the account does not own".to_string(),
        )
        .into();
        assert_eq!(api_error.error.code, "permission_denied");
        assert!(api_error.error.message.contains("does not own"));
    }
}
