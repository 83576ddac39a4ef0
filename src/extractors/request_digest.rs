//! Require a form digest header on state-changing requests.

use crate::error::AppError;
use async_trait::async_trait;
use axum::{extract::FromRequestParts, http::request::Parts};

/// Header carrying the form digest. Any non-empty value is accepted.
pub const REQUEST_DIGEST_HEADER: &str = "X-RequestDigest";

/// Digest returned by `POST /contextinfo`.
pub const FORM_DIGEST_VALUE: &str = "1111-2222-3333-4444";

#[derive(Clone, Debug)]
pub struct RequestDigest(pub String);

#[async_trait]
impl<S> FromRequestParts<S> for RequestDigest
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(REQUEST_DIGEST_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .map(RequestDigest)
            .ok_or(AppError::MissingDigest)
    }
}
