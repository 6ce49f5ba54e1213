//! OpenAPI documentation and schema generation

use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

/// OpenAPI documentation for the fetchd REST API
///
/// The spec can be accessed via:
/// - `/api/v1/openapi.json` - JSON format OpenAPI specification
/// - `/swagger-ui` - Interactive Swagger UI documentation
#[derive(OpenApi)]
#[openapi(
    info(
        title = "fetchd REST API",
        version = "0.3.1",
        description = "Server-side download manager: submit URLs, fetch them asynchronously, stream the stored files back",
        license(name = "MIT")
    ),
    paths(
        crate::api::routes::create_account,
        crate::api::routes::create_session,
        crate::api::routes::create_task,
        crate::api::routes::list_tasks,
        crate::api::routes::update_task,
        crate::api::routes::delete_task,
        crate::api::routes::get_task_file,
        crate::api::routes::health,
    ),
    components(schemas(
        crate::api::routes::CreateAccountRequest,
        crate::api::routes::AccountResponse,
        crate::api::routes::CreateSessionRequest,
        crate::api::routes::SessionResponse,
        crate::api::routes::CreateTaskRequest,
        crate::api::routes::UpdateTaskRequest,
        crate::api::routes::TaskListResponse,
        crate::error::ApiError,
        crate::error::ApiErrorBody,
        crate::types::TaskInfo,
        crate::types::TaskId,
        crate::types::AccountId,
        crate::types::DownloadStatus,
        crate::types::DownloadType,
    )),
    modifiers(&SecurityAddon),
    tags(
        (name = "accounts", description = "Account and session management"),
        (name = "tasks", description = "Download task management"),
        (name = "system", description = "Health and diagnostics"),
    )
)]
pub struct ApiDoc;

/// Registers the bearer-token security scheme referenced by the task routes.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}
