//! HTTP error response handling for the API
//!
//! Converts domain errors to HTTP responses with the canonical status
//! mapping and a JSON body carrying a machine-readable error code.

use crate::error::{ApiError, Error, ToHttpStatus};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

/// Convert errors to HTTP responses automatically at handler boundaries
impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status_code =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if status_code.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }

        let api_error: ApiError = self.into();

        (status_code, Json(api_error)).into_response()
    }
}
