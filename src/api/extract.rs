//! Request extractors.

use crate::error::Error;
use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;

/// Bearer token pulled from the `Authorization` header.
///
/// Only extraction happens here; validating the token is the service
/// layer's job.
pub struct BearerToken(pub String);

#[async_trait]
impl<S> FromRequestParts<S> for BearerToken
where
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| Error::Unauthenticated("missing authorization header".to_string()))?;

        let token = header.strip_prefix("Bearer ").ok_or_else(|| {
            Error::Unauthenticated("authorization header is not a bearer token".to_string())
        })?;

        Ok(BearerToken(token.to_string()))
    }
}
