//! # fetchd
//!
//! Server-side download manager: clients submit URLs, the server fetches
//! them asynchronously (with parallel byte-range requests when the origin
//! supports them), stores the result in a pluggable object store, and later
//! streams the file back to the owning account.
//!
//! ## Architecture
//!
//! - Creating a task inserts the row and publishes a `download.task.created`
//!   event in the same transaction
//! - A consumer worker claims the task (Pending→Downloading under a row
//!   lock, so duplicate deliveries are harmless) and runs the download
//! - The HTTP downloader probes for range support and fetches large files as
//!   parallel 5 MiB chunks reassembled in strict offset order
//! - Files land in a [`store::FileStore`] (local directory or S3-compatible
//!   bucket) and stream back through the owner-scoped API
//!
//! ## Quick Start
//!
//! ```no_run
//! use fetchd::{api, bus::EventBus, Config};
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> fetchd::Result<()> {
//!     let config = Config::default();
//!     let cancel = CancellationToken::new();
//!
//!     let db = fetchd::db::Database::new(&config.database.path).await?;
//!     let store = fetchd::store::from_config(&config.download).await?;
//!     let bus = Arc::new(fetchd::bus::InProcessBus::new());
//!
//!     let token_auth = fetchd::auth::TokenAuth::new(&config.auth);
//!     let task_service = Arc::new(fetchd::service::TaskService::new(
//!         db.clone(),
//!         token_auth.clone(),
//!         bus.clone(),
//!         store,
//!         reqwest::Client::new(),
//!         config.downloader.clone(),
//!     ));
//!     let account_service = Arc::new(fetchd::service::AccountService::new(
//!         db,
//!         Arc::new(fetchd::cache::InMemoryNameCache::new()),
//!         token_auth,
//!         &config.auth,
//!     ));
//!
//!     fetchd::service::register_task_consumer(
//!         bus.as_ref(),
//!         task_service.clone(),
//!         cancel.clone(),
//!     )
//!     .await;
//!     bus.start(cancel.clone()).await;
//!
//!     let state = api::AppState::new(account_service, task_service);
//!     api::start_api_server(state, &config, cancel).await
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// REST API module
pub mod api;
/// Session tokens and password hashing
pub mod auth;
/// Event bus between the create path and the executor
pub mod bus;
/// Account-name membership cache
pub mod cache;
/// Configuration types
pub mod config;
/// Database persistence layer
pub mod db;
/// HTTP downloader (range probe, sequential and parallel strategies)
pub mod download;
/// Error types
pub mod error;
/// Business logic: accounts, sessions, and the task state machine
pub mod service;
/// Pluggable blob storage
pub mod store;
/// Core types
pub mod types;

pub use config::Config;
pub use error::{Error, Result};
