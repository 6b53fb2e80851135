use async_trait::async_trait;
use axum::{extract::FromRequestParts, http::header::AUTHORIZATION, http::request::Parts};
use tracing::warn;

use crate::errors::AppError;

/// Bearer token forwarded untouched to the profile and analysis backends.
/// Verification is the backends' job; a missing token is rejected here so the
/// SPA can send the user back to sign-in.
#[derive(Clone)]
pub struct BearerToken(pub String);

impl std::fmt::Debug for BearerToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("BearerToken(***)")
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for BearerToken
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok());

        match header.and_then(|h| h.strip_prefix("Bearer ")) {
            Some(token) if !token.trim().is_empty() => Ok(BearerToken(token.trim().to_string())),
            Some(_) => {
                warn!("Empty bearer token");
                Err(AppError::Unauthorized)
            }
            None => {
                warn!("Missing or malformed Authorization header");
                Err(AppError::Unauthorized)
            }
        }
    }
}
