use crate::auth::TokenAuth;
use crate::bus::{EventBus, EventHandler, InProcessBus};
use crate::cache::{InMemoryNameCache, NameCache};
use crate::config::{AuthConfig, DownloaderConfig};
use crate::db::{Database, TaskRecord};
use crate::error::{Error, Result};
use crate::service::{AccountService, TaskService};
use crate::store::LocalStore;
use crate::types::{AccountId, TaskId};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tempfile::{NamedTempFile, TempDir};
use tokio::sync::mpsc;


/// Everything a service test needs, with scratch files kept alive.
struct Harness {
    db: Database,
    token_auth: TokenAuth,
    bus: Arc<dyn EventBus>,
    store_dir: TempDir,
    account_service: AccountService,
    task_service: Arc<TaskService>,
    _db_file: NamedTempFile,
}

fn test_auth_config() -> AuthConfig {
    AuthConfig {
        jwt_secret: "service-test-secret".to_string(),
        token_expiry_secs: 3600,
        // cheap rounds keep account tests fast
        bcrypt_cost: 4,
    }
}

async fn build_harness(bus: Arc<dyn EventBus>, cache: Arc<dyn NameCache>) -> Harness {
    let db_file = NamedTempFile::new().unwrap();
    let db = Database::new(db_file.path()).await.unwrap();

    let store_dir = TempDir::new().unwrap();
    let store = Arc::new(LocalStore::new(store_dir.path()).await.unwrap());

    let auth_config = test_auth_config();
    let token_auth = TokenAuth::new(&auth_config);

    let account_service =
        AccountService::new(db.clone(), cache, token_auth.clone(), &auth_config);
    let task_service = Arc::new(TaskService::new(
        db.clone(),
        token_auth.clone(),
        bus.clone(),
        store,
        reqwest::Client::new(),
        DownloaderConfig::default(),
    ));

    Harness {
        db,
        token_auth,
        bus,
        store_dir,
        account_service,
        task_service,
        _db_file: db_file,
    }
}

async fn harness() -> Harness {
    build_harness(
        Arc::new(InProcessBus::new()),
        Arc::new(InMemoryNameCache::new()),
    )
    .await
}

impl Harness {
    /// Create an account and hand back its id plus a valid session token.
    async fn signup(&self, name: &str) -> (AccountId, String) {
        let account = self
            .account_service
            .create_account(name, "hunter2-hunter2")
            .await
            .unwrap();
        let (token, _expires_at) = self.token_auth.issue(account.id).unwrap();
        (account.id, token)
    }

    async fn task_record(&self, id: TaskId) -> TaskRecord {
        self.db.get_task(self.db.pool(), id).await.unwrap().unwrap()
    }
}

/// Deterministic test payload.
fn pattern(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i * 31 % 251) as u8).collect()
}

/// Bus double whose publish always fails, for rollback tests.
struct FailingBus;

#[async_trait]
impl EventBus for FailingBus {
    async fn publish(&self, _topic: &str, _payload: Vec<u8>) -> Result<()> {
        Err(Error::Bus("broker unavailable".to_string()))
    }

    async fn subscribe(&self, _topic: &str, _handler: Arc<dyn EventHandler>) {}

    async fn start(&self, _cancel: tokio_util::sync::CancellationToken) {}
}

/// Cache double that errors on every call, for the outage scenario.
struct FailingCache;

#[async_trait]
impl NameCache for FailingCache {
    async fn contains(&self, _name: &str) -> Result<bool> {
        Err(Error::Internal("cache offline".to_string()))
    }

    async fn add(&self, _name: &str) -> Result<()> {
        Err(Error::Internal("cache offline".to_string()))
    }
}

/// Event handler that forwards payloads to a channel.
struct RecordingHandler {
    tx: mpsc::UnboundedSender<Vec<u8>>,
}

#[async_trait]
impl EventHandler for RecordingHandler {
    async fn handle(&self, _topic: &str, payload: &[u8]) -> Result<()> {
        self.tx.send(payload.to_vec()).unwrap();
        Ok(())
    }
}

fn recording_handler() -> (Arc<RecordingHandler>, mpsc::UnboundedReceiver<Vec<u8>>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (Arc::new(RecordingHandler { tx }), rx)
}

async fn recv_payload(rx: &mut mpsc::UnboundedReceiver<Vec<u8>>) -> Vec<u8> {
    tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("timed out waiting for event")
        .expect("event channel closed")
}
