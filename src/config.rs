//! Configuration types for fetchd

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use utoipa::ToSchema;

/// Authentication configuration (token signing and password hashing)
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AuthConfig {
    /// HMAC-SHA256 secret used to sign and verify session tokens
    #[serde(default = "default_jwt_secret")]
    pub jwt_secret: String,

    /// Session token lifetime in seconds (default: 3600)
    #[serde(default = "default_token_expiry_secs")]
    pub token_expiry_secs: u64,

    /// bcrypt cost factor for password hashing (default: 12)
    #[serde(default = "default_bcrypt_cost")]
    pub bcrypt_cost: u32,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: default_jwt_secret(),
            token_expiry_secs: default_token_expiry_secs(),
            bcrypt_cost: default_bcrypt_cost(),
        }
    }
}

/// Database configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite database file path (default: "./fetchd.db")
    #[serde(default = "default_database_path")]
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
        }
    }
}

/// Storage backend selector for downloaded files
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum StoreMode {
    /// Store blobs under a local directory
    Local,
    /// Store blobs in an S3-compatible bucket
    S3,
}

/// Downloaded-file storage configuration (local directory or S3 bucket)
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DownloadConfig {
    /// Storage mode (default: local)
    #[serde(default = "default_store_mode")]
    pub mode: StoreMode,

    /// Local mode: directory downloads are written to (default: "./downloads")
    #[serde(default = "default_download_dir")]
    pub directory: PathBuf,

    /// S3 mode: bucket name
    #[serde(default)]
    pub bucket: String,

    /// S3 mode: endpoint URL (e.g. "http://127.0.0.1:9000" for a local
    /// MinIO); empty means the SDK's default AWS endpoint
    #[serde(default)]
    pub endpoint: String,

    /// S3 mode: region (default: "us-east-1")
    #[serde(default = "default_s3_region")]
    pub region: String,

    /// S3 mode: access key id
    #[serde(default)]
    pub access_key: String,

    /// S3 mode: secret access key
    #[serde(default)]
    pub secret_key: String,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            mode: default_store_mode(),
            directory: default_download_dir(),
            bucket: String::new(),
            endpoint: String::new(),
            region: default_s3_region(),
            access_key: String::new(),
            secret_key: String::new(),
        }
    }
}

/// HTTP downloader tuning
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DownloaderConfig {
    /// Bytes per ranged chunk (default: 5 MiB)
    #[serde(default = "default_chunk_size")]
    pub chunk_size_bytes: u64,

    /// Concurrent range fetchers per download (default: 8)
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Files smaller than this are fetched sequentially (default: 5 MiB)
    #[serde(default = "default_parallel_threshold")]
    pub parallel_threshold_bytes: u64,
}

impl Default for DownloaderConfig {
    fn default() -> Self {
        Self {
            chunk_size_bytes: default_chunk_size(),
            workers: default_workers(),
            parallel_threshold_bytes: default_parallel_threshold(),
        }
    }
}

/// API server configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Address the HTTP server binds to (default: 127.0.0.1:8080)
    #[serde(default = "default_bind_address")]
    pub bind_address: SocketAddr,

    /// Serve interactive Swagger UI at /swagger-ui (default: true)
    #[serde(default = "default_true")]
    pub enable_swagger_ui: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            enable_swagger_ui: true,
        }
    }
}

/// Top-level configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Authentication settings
    #[serde(default)]
    pub auth: AuthConfig,

    /// Database settings
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Downloaded-file storage settings
    #[serde(default)]
    pub download: DownloadConfig,

    /// HTTP downloader tuning
    #[serde(default)]
    pub downloader: DownloaderConfig,

    /// API server settings
    #[serde(default)]
    pub api: ApiConfig,
}

impl Config {
    /// Load configuration from a YAML file
    pub fn from_yaml_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| Error::Config {
            message: format!("failed to read {}: {}", path.display(), e),
            key: None,
        })?;

        let config: Config = serde_yaml::from_str(&contents).map_err(|e| Error::Config {
            message: format!("failed to parse {}: {}", path.display(), e),
            key: None,
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Validate cross-field constraints that serde cannot express
    pub fn validate(&self) -> Result<()> {
        if self.download.mode == StoreMode::S3 && self.download.bucket.is_empty() {
            return Err(Error::Config {
                message: "s3 mode requires a bucket name".to_string(),
                key: Some("download.bucket".to_string()),
            });
        }

        if self.downloader.workers == 0 {
            return Err(Error::Config {
                message: "downloader.workers must be at least 1".to_string(),
                key: Some("downloader.workers".to_string()),
            });
        }

        if self.downloader.chunk_size_bytes == 0 {
            return Err(Error::Config {
                message: "downloader.chunk_size_bytes must be positive".to_string(),
                key: Some("downloader.chunk_size_bytes".to_string()),
            });
        }

        Ok(())
    }
}

fn default_jwt_secret() -> String {
    // Development fallback; deployments set auth.jwt_secret in the config file
    "fetchd-insecure-dev-secret".to_string()
}

fn default_token_expiry_secs() -> u64 {
    3600
}

fn default_bcrypt_cost() -> u32 {
    12
}

fn default_database_path() -> PathBuf {
    PathBuf::from("./fetchd.db")
}

fn default_store_mode() -> StoreMode {
    StoreMode::Local
}

fn default_download_dir() -> PathBuf {
    PathBuf::from("./downloads")
}

fn default_s3_region() -> String {
    "us-east-1".to_string()
}

fn default_chunk_size() -> u64 {
    5 * 1024 * 1024
}

fn default_workers() -> usize {
    8
}

fn default_parallel_threshold() -> u64 {
    5 * 1024 * 1024
}

fn default_bind_address() -> SocketAddr {
    "127.0.0.1:8080".parse().unwrap_or_else(|_| unreachable!())
}

fn default_true() -> bool {
    true
}
