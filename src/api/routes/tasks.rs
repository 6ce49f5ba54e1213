//! Download task handlers.

use crate::api::extract::BearerToken;
use crate::api::AppState;
use crate::error::Error;
use crate::types::{DownloadType, TaskId, TaskInfo};
use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::Response;
use axum::Json;
use serde::{Deserialize, Serialize};
use tokio_util::io::ReaderStream;
use utoipa::ToSchema;

/// Request body for task creation
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateTaskRequest {
    /// Protocol used to fetch the URL
    pub download_type: DownloadType,
    /// Source URL; validated by the downloader at fetch time
    pub url: String,
}

/// Request body for a task URL update
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateTaskRequest {
    /// Replacement URL
    pub url: String,
}

/// Pagination query parameters
#[derive(Debug, Deserialize, ToSchema)]
pub struct ListTasksQuery {
    /// Rows to skip (default 0)
    #[serde(default)]
    pub offset: u64,
    /// Page size (default 50)
    #[serde(default = "default_limit")]
    pub limit: u64,
}

fn default_limit() -> u64 {
    50
}

/// One page of tasks plus the account's total
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TaskListResponse {
    /// Tasks in this page, oldest first
    pub tasks: Vec<TaskInfo>,
    /// Total task count for the account
    pub total: u64,
}

/// POST /api/v1/tasks - Submit a URL for download
#[utoipa::path(
    post,
    path = "/api/v1/tasks",
    tag = "tasks",
    request_body = CreateTaskRequest,
    responses(
        (status = 201, description = "Task created and queued", body = TaskInfo),
        (status = 401, description = "Missing or invalid token"),
    ),
    security(("bearer" = []))
)]
pub async fn create_task(
    State(state): State<AppState>,
    BearerToken(token): BearerToken,
    Json(request): Json<CreateTaskRequest>,
) -> Result<(StatusCode, Json<TaskInfo>), Error> {
    let task = state
        .task_service
        .create_task(&token, request.download_type, request.url)
        .await?;

    Ok((StatusCode::CREATED, Json(task)))
}

/// GET /api/v1/tasks - List the caller's tasks
#[utoipa::path(
    get,
    path = "/api/v1/tasks",
    tag = "tasks",
    params(
        ("offset" = Option<u64>, Query, description = "Rows to skip"),
        ("limit" = Option<u64>, Query, description = "Page size"),
    ),
    responses(
        (status = 200, description = "Page of tasks", body = TaskListResponse),
        (status = 401, description = "Missing or invalid token"),
    ),
    security(("bearer" = []))
)]
pub async fn list_tasks(
    State(state): State<AppState>,
    BearerToken(token): BearerToken,
    Query(query): Query<ListTasksQuery>,
) -> Result<Json<TaskListResponse>, Error> {
    let (tasks, total) = state
        .task_service
        .list_tasks(&token, query.offset, query.limit)
        .await?;

    Ok(Json(TaskListResponse { tasks, total }))
}

/// PUT /api/v1/tasks/{id} - Change a task's URL
#[utoipa::path(
    put,
    path = "/api/v1/tasks/{id}",
    tag = "tasks",
    params(("id" = i64, Path, description = "Task ID")),
    request_body = UpdateTaskRequest,
    responses(
        (status = 200, description = "Updated task", body = TaskInfo),
        (status = 403, description = "Task belongs to another account"),
        (status = 404, description = "No such task"),
    ),
    security(("bearer" = []))
)]
pub async fn update_task(
    State(state): State<AppState>,
    BearerToken(token): BearerToken,
    Path(id): Path<TaskId>,
    Json(request): Json<UpdateTaskRequest>,
) -> Result<Json<TaskInfo>, Error> {
    let task = state
        .task_service
        .update_task(&token, id, request.url)
        .await?;

    Ok(Json(task))
}

/// DELETE /api/v1/tasks/{id} - Delete a task
#[utoipa::path(
    delete,
    path = "/api/v1/tasks/{id}",
    tag = "tasks",
    params(("id" = i64, Path, description = "Task ID")),
    responses(
        (status = 204, description = "Task deleted"),
        (status = 403, description = "Task belongs to another account"),
        (status = 404, description = "No such task"),
    ),
    security(("bearer" = []))
)]
pub async fn delete_task(
    State(state): State<AppState>,
    BearerToken(token): BearerToken,
    Path(id): Path<TaskId>,
) -> Result<StatusCode, Error> {
    state.task_service.delete_task(&token, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/tasks/{id}/file - Stream the downloaded file back
#[utoipa::path(
    get,
    path = "/api/v1/tasks/{id}/file",
    tag = "tasks",
    params(("id" = i64, Path, description = "Task ID")),
    responses(
        (status = 200, description = "File contents", content_type = "application/octet-stream"),
        (status = 400, description = "Task has not succeeded"),
        (status = 403, description = "Task belongs to another account"),
        (status = 404, description = "No such task"),
    ),
    security(("bearer" = []))
)]
pub async fn get_task_file(
    State(state): State<AppState>,
    BearerToken(token): BearerToken,
    Path(id): Path<TaskId>,
) -> Result<Response, Error> {
    let reader = state.task_service.get_file(&token, id).await?;

    let body = axum::body::Body::from_stream(ReaderStream::new(reader));
    Response::builder()
        .header(header::CONTENT_TYPE, "application/octet-stream")
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"download_file_{}\"", id),
        )
        .body(body)
        .map_err(|e| Error::Internal(format!("failed to build response: {}", e)))
}
