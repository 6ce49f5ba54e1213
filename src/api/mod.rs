//! REST API server module
//!
//! Exposes the account, session, and download task operations over HTTP.
//!
//! # Routes
//!
//! ## Accounts & Sessions
//! - `POST /api/v1/accounts` - Create an account
//! - `POST /api/v1/sessions` - Exchange credentials for a bearer token
//!
//! ## Download Tasks (bearer auth)
//! - `POST /api/v1/tasks` - Submit a URL for download
//! - `GET /api/v1/tasks` - List the caller's tasks (paginated)
//! - `PUT /api/v1/tasks/{id}` - Change a task's URL
//! - `DELETE /api/v1/tasks/{id}` - Delete a task
//! - `GET /api/v1/tasks/{id}/file` - Stream the downloaded file back
//!
//! ## System
//! - `GET /health` - Health check
//! - `GET /api/v1/openapi.json` - OpenAPI specification
//! - `GET /swagger-ui` - Interactive documentation (if enabled)

use crate::config::Config;
use crate::error::Result;
use axum::routing::{delete, get, post, put};
use axum::Router;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub mod error_response;
pub mod extract;
pub mod openapi;
pub mod routes;
pub mod state;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;

pub use openapi::ApiDoc;
pub use state::AppState;

/// Create the API router with all route definitions
pub fn create_router(state: AppState, swagger_ui: bool) -> Router {
    let router = Router::new()
        // Accounts & sessions
        .route("/api/v1/accounts", post(routes::create_account))
        .route("/api/v1/sessions", post(routes::create_session))
        // Download tasks
        .route("/api/v1/tasks", post(routes::create_task))
        .route("/api/v1/tasks", get(routes::list_tasks))
        .route("/api/v1/tasks/:id", put(routes::update_task))
        .route("/api/v1/tasks/:id", delete(routes::delete_task))
        .route("/api/v1/tasks/:id/file", get(routes::get_task_file))
        // System
        .route("/health", get(routes::health));

    // SwaggerUi serves the spec itself; register the plain route only when
    // the UI is off, so the paths never collide
    let router = if swagger_ui {
        router.merge(SwaggerUi::new("/swagger-ui").url("/api/v1/openapi.json", ApiDoc::openapi()))
    } else {
        router.route(
            "/api/v1/openapi.json",
            get(|| async { axum::Json(ApiDoc::openapi()) }),
        )
    };

    router.with_state(state).layer(
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any),
    )
}

/// Start the API server on the configured bind address.
///
/// Serves until `cancel` fires, then shuts down gracefully.
pub async fn start_api_server(
    state: AppState,
    config: &Config,
    cancel: CancellationToken,
) -> Result<()> {
    let router = create_router(state, config.api.enable_swagger_ui);

    let listener = TcpListener::bind(config.api.bind_address).await?;
    tracing::info!(bind_address = %config.api.bind_address, "API server listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(async move { cancel.cancelled().await })
        .await?;

    Ok(())
}
