use super::{create_router, AppState};
use crate::auth::TokenAuth;
use crate::bus::InProcessBus;
use crate::cache::InMemoryNameCache;
use crate::config::{AuthConfig, DownloaderConfig};
use crate::db::Database;
use crate::service::{AccountService, TaskService};
use crate::store::LocalStore;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use std::sync::Arc;
use tempfile::{NamedTempFile, TempDir};
use tower::ServiceExt; // for oneshot()


/// Router plus the scratch state backing it.
struct ApiHarness {
    router: Router,
    db: Database,
    store_dir: TempDir,
    _db_file: NamedTempFile,
}

async fn api_harness() -> ApiHarness {
    let db_file = NamedTempFile::new().unwrap();
    let db = Database::new(db_file.path()).await.unwrap();

    let store_dir = TempDir::new().unwrap();
    let store = Arc::new(LocalStore::new(store_dir.path()).await.unwrap());

    let auth_config = AuthConfig {
        jwt_secret: "api-test-secret".to_string(),
        token_expiry_secs: 3600,
        bcrypt_cost: 4,
    };
    let token_auth = TokenAuth::new(&auth_config);

    let account_service = Arc::new(AccountService::new(
        db.clone(),
        Arc::new(InMemoryNameCache::new()),
        token_auth.clone(),
        &auth_config,
    ));
    let task_service = Arc::new(TaskService::new(
        db.clone(),
        token_auth,
        Arc::new(InProcessBus::new()),
        store,
        reqwest::Client::new(),
        DownloaderConfig::default(),
    ));

    ApiHarness {
        router: create_router(AppState::new(account_service, task_service), false),
        db,
        store_dir,
        _db_file: db_file,
    }
}

impl ApiHarness {
    /// Fire one request; returns status and the raw response body.
    async fn request(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<serde_json::Value>,
    ) -> (StatusCode, Vec<u8>) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("Authorization", format!("Bearer {token}"));
        }

        let request = match body {
            Some(json) => builder
                .header("Content-Type", "application/json")
                .body(Body::from(serde_json::to_vec(&json).unwrap()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, bytes.to_vec())
    }

    /// Like [`ApiHarness::request`] but decodes a JSON response body.
    async fn request_json(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<serde_json::Value>,
    ) -> (StatusCode, serde_json::Value) {
        let (status, bytes) = self.request(method, uri, token, body).await;
        let json = if bytes.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    /// Register an account and return a working bearer token.
    async fn signup(&self, name: &str) -> String {
        let (status, _) = self
            .request_json(
                "POST",
                "/api/v1/accounts",
                None,
                Some(serde_json::json!({"name": name, "password": "hunter2-hunter2"})),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, session) = self
            .request_json(
                "POST",
                "/api/v1/sessions",
                None,
                Some(serde_json::json!({"name": name, "password": "hunter2-hunter2"})),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        session["token"].as_str().unwrap().to_string()
    }
}
