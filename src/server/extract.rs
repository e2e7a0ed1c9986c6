use super::error::ApiError;
use super::{blocking, AppState};
use crate::auth::{bearer_token, hash_token};
use crate::error::PlantGuardError;
use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::http::HeaderMap;

/// The signed-in user behind a bearer token
///
/// The only place a token is resolved to an identity. Rejects with 401 when
/// the header is missing, malformed, unknown or expired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthUser(pub i64);

/// Extract the raw bearer token from request headers
pub fn request_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(bearer_token)
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token_hash = request_token(&parts.headers)
            .map(hash_token)
            .ok_or_else(|| PlantGuardError::Authentication("Unauthorized".to_string()))?;

        let storage = state.storage.clone();
        let user_id = blocking(move || storage.resolve_session(&token_hash))
            .await?
            .ok_or_else(|| PlantGuardError::Authentication("Invalid or expired token".to_string()))?;

        Ok(AuthUser(user_id))
    }
}
