//! Request handlers

use super::error::{body_rejection, multipart_rejection, ApiResult};
use super::extract::{request_token, AuthUser};
use super::{blocking, AppState};
use crate::auth::{hash_password_with_rounds, hash_token, issue_token, verify_password};
use crate::error::PlantGuardError;
use crate::history::{HistoryEntry, HistoryEntryInput};
use crate::prediction::PredictionResult;
use crate::storage::{ProfileUpdate, UserProfile};
use axum::body::Bytes;
use axum::extract::multipart::MultipartRejection;
use axum::extract::rejection::BytesRejection;
use axum::extract::{Multipart, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Multipart field carrying the uploaded image
pub const IMAGE_FIELD: &str = "image";

/// `GET /`
pub async fn index() -> Json<Value> {
    Json(json!({ "message": "PlantGuard backend running" }))
}

/// `GET /health`
pub async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "classifier": state.handler.classifier_name(),
    }))
}

/// `POST /predict`
///
/// Classifies the multipart `image` field. Never touches history.
pub async fn predict(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<Json<PredictionResult>> {
    let mut multipart = multipart.map_err(|rejection| {
        tracing::debug!("Rejected predict body: {}", rejection);
        PlantGuardError::Validation("no image provided".to_string())
    })?;

    let mut upload = None;
    while let Some(field) = multipart.next_field().await.map_err(multipart_rejection)? {
        if field.name() != Some(IMAGE_FIELD) {
            continue;
        }
        let content_type = field.content_type().map(str::to_string);
        let bytes = field.bytes().await.map_err(multipart_rejection)?;
        upload = Some((bytes, content_type));
        break;
    }

    let (bytes, content_type) = upload.unwrap_or_default();
    let result = state.handler.predict(&bytes, content_type.as_deref()).await?;
    Ok(Json(result))
}

/// Parse a JSON body leniently; an empty or invalid body is `null`
fn lenient_json(body: &Bytes) -> Value {
    if body.is_empty() {
        return Value::Null;
    }
    serde_json::from_slice(body).unwrap_or_else(|e| {
        tracing::debug!("Ignoring unparsable JSON body: {}", e);
        Value::Null
    })
}

/// `POST /history`
pub async fn save_history(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    body: Result<Bytes, BytesRejection>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let body = body.map_err(body_rejection)?;
    let input = HistoryEntryInput::from_raw(&lenient_json(&body));
    if input.canonical_label().is_none() {
        tracing::warn!(user_id, "Saving history entry without a label");
    }

    let storage = state.storage.clone();
    let entry = blocking(move || storage.insert_history(Some(user_id), &input)).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "entry": entry })),
    ))
}

/// `GET /history`, newest first
pub async fn list_history(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> ApiResult<Json<Vec<HistoryEntry>>> {
    let storage = state.storage.clone();
    let limit = state.settings.server.history_limit;
    let entries = blocking(move || storage.list_history(user_id, limit)).await?;
    Ok(Json(entries))
}

/// `GET /profile`
pub async fn get_profile(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> ApiResult<Json<UserProfile>> {
    let storage = state.storage.clone();
    let profile = blocking(move || storage.get_user(user_id))
        .await?
        .ok_or_else(|| PlantGuardError::NotFound("User not found".to_string()))?;
    Ok(Json(profile))
}

/// `PUT /profile`
pub async fn update_profile(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    body: Result<Bytes, BytesRejection>,
) -> ApiResult<Json<Value>> {
    let body = body.map_err(body_rejection)?;
    let update: ProfileUpdate = serde_json::from_value(lenient_json(&body)).unwrap_or_default();

    let storage = state.storage.clone();
    let profile = blocking(move || storage.update_profile(user_id, &update))
        .await?
        .ok_or_else(|| PlantGuardError::NotFound("User not found".to_string()))?;
    Ok(Json(json!({ "success": true, "user": profile })))
}

#[derive(Debug, Default, Deserialize)]
struct Credentials {
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    password: Option<String>,
}

impl Credentials {
    fn from_body(body: &Bytes) -> Result<(String, String), PlantGuardError> {
        let credentials: Credentials =
            serde_json::from_value(lenient_json(body)).unwrap_or_default();
        match (credentials.email, credentials.password) {
            (Some(email), Some(password)) if !email.trim().is_empty() && !password.is_empty() => {
                Ok((email, password))
            }
            _ => Err(PlantGuardError::Validation(
                "email and password required".to_string(),
            )),
        }
    }
}

/// Response of `signup` and `login`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthResponse {
    /// The account
    pub user: UserProfile,
    /// Bearer token for subsequent requests
    pub access_token: String,
}

async fn start_session(state: &AppState, user: UserProfile) -> ApiResult<AuthResponse> {
    let issued = issue_token(state.settings.auth.token_ttl_hours);
    let storage = state.storage.clone();
    let user_id = user.id;
    let token_hash = issued.token_hash.clone();
    blocking(move || storage.create_session(user_id, &token_hash, issued.expires_at)).await?;
    Ok(AuthResponse {
        user,
        access_token: issued.token,
    })
}

/// `POST /auth/signup`
pub async fn signup(
    State(state): State<AppState>,
    body: Result<Bytes, BytesRejection>,
) -> ApiResult<(StatusCode, Json<AuthResponse>)> {
    let body = body.map_err(body_rejection)?;
    let (email, password) = Credentials::from_body(&body)?;

    let storage = state.storage.clone();
    let rounds = state.settings.auth.password_rounds;
    let user = blocking(move || {
        let password_hash = hash_password_with_rounds(&password, rounds);
        storage.create_user(&email, &password_hash)
    })
    .await?;

    let response = start_session(&state, user).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// `POST /auth/login`
pub async fn login(
    State(state): State<AppState>,
    body: Result<Bytes, BytesRejection>,
) -> ApiResult<Json<AuthResponse>> {
    let body = body.map_err(body_rejection)?;
    let (email, password) = Credentials::from_body(&body)?;

    let storage = state.storage.clone();
    let user = blocking(move || {
        let user = storage
            .find_user_by_email(&email)?
            .filter(|user| verify_password(&password, &user.password_hash))
            .ok_or_else(|| PlantGuardError::Authentication("Invalid credentials".to_string()))?;
        Ok(user.profile)
    })
    .await?;

    tracing::info!(user_id = user.id, "User signed in");
    let response = start_session(&state, user).await?;
    Ok(Json(response))
}

/// `POST /auth/logout`
///
/// Revokes the presented token. Succeeds even when the token is unknown.
pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> ApiResult<StatusCode> {
    if let Some(token_hash) = request_token(&headers).map(hash_token) {
        let storage = state.storage.clone();
        let removed = blocking(move || storage.delete_session(&token_hash)).await?;
        tracing::debug!(removed, "Session revoked");
    }
    Ok(StatusCode::NO_CONTENT)
}

/// Fallback for known routes hit with an unsupported method
pub async fn method_not_allowed() -> ApiResult<()> {
    Err(PlantGuardError::rejected(405, "method not allowed").into())
}

/// Fallback for unknown routes
pub async fn not_found() -> ApiResult<()> {
    Err(PlantGuardError::NotFound("not found".to_string()).into())
}
