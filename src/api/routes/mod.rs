//! Route handlers.

mod accounts;
mod tasks;

pub use accounts::*;
pub use tasks::*;

/// GET /health - Health check
#[utoipa::path(
    get,
    path = "/health",
    tag = "system",
    responses((status = 200, description = "Service is up"))
)]
pub async fn health() -> &'static str {
    "ok"
}
