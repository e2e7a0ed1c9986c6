//! HTTP client for a PlantGuard backend
//!
//! Used by the CLI commands. Error statuses are mapped back onto the error
//! taxonomy so callers can react to authentication failures specifically.

use crate::config::ClientConfig;
use crate::error::{upstream_error_message, PlantGuardError, Result};
use crate::history::HistoryRecorder;
use crate::storage::{ProfileUpdate, UserProfile};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;

/// Signed-in account and its bearer token
#[derive(Debug, Clone, Deserialize)]
pub struct AuthSession {
    /// The account
    pub user: UserProfile,
    /// Bearer token for subsequent requests
    pub access_token: String,
}

#[derive(Debug, Deserialize)]
struct ProfileUpdated {
    user: UserProfile,
}

/// Which error a non-auth failure maps to
#[derive(Debug, Clone, Copy)]
enum Failure {
    Inference,
    Store,
}

/// Client for the backend HTTP API
///
/// # Examples
///
/// ```
/// use plantguard::client::BackendClient;
/// use plantguard::config::ClientConfig;
///
/// let client = BackendClient::new(&ClientConfig::default()).unwrap();
/// assert_eq!(client.endpoint("/predict"), "http://localhost:5000/predict");
/// ```
#[derive(Debug, Clone)]
pub struct BackendClient {
    client: Client,
    base_url: String,
}

impl BackendClient {
    /// Create a client for the configured backend
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be built
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent(concat!("plantguard/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| PlantGuardError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Absolute URL for an API path
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// History recorder sharing this client's connection pool
    pub fn history(&self) -> HistoryRecorder {
        HistoryRecorder::with_client(self.client.clone(), &self.base_url)
    }

    /// Upload an image for classification
    ///
    /// Returns the raw response: its shape is reconciled by
    /// [`crate::prediction::normalize`].
    pub async fn predict(&self, image: Vec<u8>, file_name: &str, content_type: Option<&str>) -> Result<Value> {
        let mut part = Part::bytes(image).file_name(file_name.to_string());
        if let Some(mime) = content_type {
            part = part
                .mime_str(mime)
                .map_err(|e| PlantGuardError::Validation(format!("invalid content type: {}", e)))?;
        }
        let form = Form::new().part("image", part);

        tracing::debug!(url = %self.endpoint("/predict"), "Uploading image");
        let request = self.client.post(self.endpoint("/predict")).multipart(form);
        self.send(request, Failure::Inference).await
    }

    /// Create an account
    pub async fn signup(&self, email: &str, password: &str) -> Result<AuthSession> {
        let request = self
            .client
            .post(self.endpoint("/auth/signup"))
            .json(&json!({ "email": email, "password": password }));
        self.send(request, Failure::Store).await
    }

    /// Sign in
    pub async fn login(&self, email: &str, password: &str) -> Result<AuthSession> {
        let request = self
            .client
            .post(self.endpoint("/auth/login"))
            .json(&json!({ "email": email, "password": password }));
        self.send(request, Failure::Store).await
    }

    /// Revoke a session token on the server
    pub async fn logout(&self, token: &str) -> Result<()> {
        let response = self
            .client
            .post(self.endpoint("/auth/logout"))
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| PlantGuardError::Store(format!("request failed: {}", e)))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(map_status(status, &body, Failure::Store).into());
        }
        Ok(())
    }

    /// Fetch the signed-in user's profile
    pub async fn get_profile(&self, token: &str) -> Result<UserProfile> {
        let request = self.client.get(self.endpoint("/profile")).bearer_auth(token);
        self.send(request, Failure::Store).await
    }

    /// Update profile fields; `None` fields are left unchanged
    pub async fn update_profile(&self, token: &str, update: &ProfileUpdate) -> Result<UserProfile> {
        let request = self
            .client
            .put(self.endpoint("/profile"))
            .bearer_auth(token)
            .json(update);
        let updated: ProfileUpdated = self.send(request, Failure::Store).await?;
        Ok(updated.user)
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder, failure: Failure) -> Result<T> {
        let response = request.send().await.map_err(|e| {
            tracing::error!("Backend request failed: {}", e);
            match failure {
                Failure::Inference => {
                    PlantGuardError::inference(None, format!("backend unreachable: {}", e))
                }
                Failure::Store => PlantGuardError::Store(format!("backend unreachable: {}", e)),
            }
        })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| PlantGuardError::Store(format!("failed to read response: {}", e)))?;

        if !status.is_success() {
            return Err(map_status(status, &body, failure).into());
        }

        serde_json::from_str(&body).map_err(|e| {
            PlantGuardError::Store(format!("unexpected response from backend: {}", e)).into()
        })
    }
}

fn map_status(status: StatusCode, body: &str, failure: Failure) -> PlantGuardError {
    let message = upstream_error_message(body);
    match status {
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY | StatusCode::PAYLOAD_TOO_LARGE => {
            PlantGuardError::Validation(message)
        }
        StatusCode::UNAUTHORIZED => PlantGuardError::Authentication(message),
        StatusCode::NOT_FOUND => PlantGuardError::NotFound(message),
        _ => match failure {
            Failure::Inference => PlantGuardError::inference(Some(status.as_u16()), message),
            Failure::Store => {
                PlantGuardError::Store(format!("backend returned {}: {}", status.as_u16(), message))
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_joins_paths() {
        let client = BackendClient::new(&ClientConfig {
            base_url: "http://10.0.0.5:5000/".to_string(),
            timeout_seconds: 5,
        })
        .unwrap();
        assert_eq!(client.endpoint("predict"), "http://10.0.0.5:5000/predict");
        assert_eq!(client.endpoint("/history"), "http://10.0.0.5:5000/history");
        assert_eq!(client.history().endpoint(), "http://10.0.0.5:5000/history");
    }

    #[test]
    fn test_map_status_taxonomy() {
        let body = r#"{"error": "no image provided"}"#;
        assert!(matches!(
            map_status(StatusCode::BAD_REQUEST, body, Failure::Inference),
            PlantGuardError::Validation(m) if m == "no image provided"
        ));
        assert!(matches!(
            map_status(StatusCode::UNAUTHORIZED, "", Failure::Store),
            PlantGuardError::Authentication(_)
        ));
        assert!(matches!(
            map_status(StatusCode::INTERNAL_SERVER_ERROR, "boom", Failure::Inference),
            PlantGuardError::Inference {
                status: Some(500),
                ..
            }
        ));
        assert!(matches!(
            map_status(StatusCode::INTERNAL_SERVER_ERROR, "boom", Failure::Store),
            PlantGuardError::Store(_)
        ));
    }
}
