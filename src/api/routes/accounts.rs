//! Account and session handlers.

use crate::api::AppState;
use crate::error::Error;
use crate::types::AccountId;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Request body for account creation
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateAccountRequest {
    /// Desired account name (unique)
    pub name: String,
    /// Plaintext password; stored only as a bcrypt hash
    pub password: String,
}

/// A created account
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AccountResponse {
    /// Account ID
    pub id: AccountId,
    /// Account name
    pub name: String,
}

/// Request body for session creation
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateSessionRequest {
    /// Account name
    pub name: String,
    /// Account password
    pub password: String,
}

/// An issued session token
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SessionResponse {
    /// Bearer token for subsequent requests
    pub token: String,
    /// When the token stops being valid
    pub expires_at: DateTime<Utc>,
}

/// POST /api/v1/accounts - Create an account
#[utoipa::path(
    post,
    path = "/api/v1/accounts",
    tag = "accounts",
    request_body = CreateAccountRequest,
    responses(
        (status = 201, description = "Account created", body = AccountResponse),
        (status = 409, description = "Account name already taken"),
    )
)]
pub async fn create_account(
    State(state): State<AppState>,
    Json(request): Json<CreateAccountRequest>,
) -> Result<(StatusCode, Json<AccountResponse>), Error> {
    let account = state
        .account_service
        .create_account(&request.name, &request.password)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(AccountResponse {
            id: account.id,
            name: account.account_name,
        }),
    ))
}

/// POST /api/v1/sessions - Exchange credentials for a bearer token
#[utoipa::path(
    post,
    path = "/api/v1/sessions",
    tag = "accounts",
    request_body = CreateSessionRequest,
    responses(
        (status = 200, description = "Session created", body = SessionResponse),
        (status = 401, description = "Incorrect account name or password"),
    )
)]
pub async fn create_session(
    State(state): State<AppState>,
    Json(request): Json<CreateSessionRequest>,
) -> Result<Json<SessionResponse>, Error> {
    let (token, expires_at) = state
        .account_service
        .create_session(&request.name, &request.password)
        .await?;

    Ok(Json(SessionResponse { token, expires_at }))
}
