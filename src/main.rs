//! fetchd server binary: load config, wire the services, serve.

use fetchd::api::{self, AppState};
use fetchd::auth::TokenAuth;
use fetchd::bus::{EventBus, InProcessBus};
use fetchd::cache::InMemoryNameCache;
use fetchd::db::Database;
use fetchd::service::{register_task_consumer, AccountService, TaskService};
use fetchd::{store, Config};
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> fetchd::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = load_config()?;

    let db = Database::new(&config.database.path).await?;
    let store = store::from_config(&config.download).await?;
    let bus = Arc::new(InProcessBus::new());
    let token_auth = TokenAuth::new(&config.auth);
    let http_client = reqwest::Client::new();

    let account_service = Arc::new(AccountService::new(
        db.clone(),
        Arc::new(InMemoryNameCache::new()),
        token_auth.clone(),
        &config.auth,
    ));
    let task_service = Arc::new(TaskService::new(
        db.clone(),
        token_auth,
        bus.clone(),
        store,
        http_client,
        config.downloader.clone(),
    ));

    let cancel = CancellationToken::new();

    register_task_consumer(bus.as_ref(), task_service.clone(), cancel.clone()).await;
    bus.start(cancel.clone()).await;

    // Ctrl-C cancels the consumer workers, in-flight downloads, and the
    // server's graceful shutdown in one go
    let shutdown_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("shutdown signal received");
            shutdown_cancel.cancel();
        }
    });

    let state = AppState::new(account_service, task_service);
    api::start_api_server(state, &config, cancel).await?;

    db.close().await;
    Ok(())
}

/// Resolve the config file from argv[1] or `FETCHD_CONFIG`; built-in
/// defaults apply when neither is given.
fn load_config() -> fetchd::Result<Config> {
    let path = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("FETCHD_CONFIG").ok())
        .map(PathBuf::from);

    match path {
        Some(path) => {
            tracing::info!(path = %path.display(), "loading configuration");
            Config::from_yaml_file(&path)
        }
        None => {
            tracing::info!("no configuration file given, using defaults");
            Ok(Config::default())
        }
    }
}
