use super::envelope::{normalize_entries, normalize_entry};
use super::types::{HistoryEntry, HistoryEntryInput};
use crate::error::{find_plantguard_error, is_auth_error, upstream_error_message, PlantGuardError, Result};
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::time::Duration;

/// HTTP client for the history store (`/history` on the backend)
///
/// # Examples
///
/// ```
/// use plantguard::history::HistoryRecorder;
///
/// let recorder = HistoryRecorder::new("http://localhost:5000/", 30).unwrap();
/// assert_eq!(recorder.endpoint(), "http://localhost:5000/history");
/// ```
#[derive(Debug, Clone)]
pub struct HistoryRecorder {
    client: Client,
    endpoint: String,
}

impl HistoryRecorder {
    /// Create a recorder for the backend at `base_url`
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be built
    pub fn new(base_url: &str, timeout_seconds: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .user_agent(concat!("plantguard/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| PlantGuardError::Config(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self::with_client(client, base_url))
    }

    /// Create a recorder sharing an existing HTTP client
    pub fn with_client(client: Client, base_url: &str) -> Self {
        Self {
            client,
            endpoint: format!("{}/history", base_url.trim_end_matches('/')),
        }
    }

    /// History endpoint URL
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Persist one prediction record
    ///
    /// The response may be the bare record or `{"entry": record}`.
    ///
    /// # Errors
    ///
    /// - `Authentication` when no token is given (no request is sent) or
    ///   the store answers 401
    /// - `Store` for any other failure
    pub async fn save(&self, input: &HistoryEntryInput, token: Option<&str>) -> Result<HistoryEntry> {
        let token = require_token(token)?;

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(token)
            .json(input)
            .send()
            .await
            .map_err(|e| PlantGuardError::Store(format!("history request failed: {}", e)))?;

        let body = read_body(response).await?;
        let record = match body.get("entry") {
            Some(entry) if entry.is_object() => entry,
            _ => &body,
        };

        normalize_entry(record).ok_or_else(|| {
            PlantGuardError::Store("history store returned an unexpected response".to_string())
                .into()
        })
    }

    /// Fetch the signed-in user's history, newest first as the store orders it
    ///
    /// # Errors
    ///
    /// Same as [`HistoryRecorder::save`]. An empty or unrecognized envelope is
    /// an empty list, not an error.
    pub async fn list(&self, token: Option<&str>) -> Result<Vec<HistoryEntry>> {
        let token = require_token(token)?;

        let response = self
            .client
            .get(&self.endpoint)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| PlantGuardError::Store(format!("history request failed: {}", e)))?;

        let body = read_body(response).await?;
        let entries = normalize_entries(&body);
        tracing::debug!(count = entries.len(), "Fetched history");
        Ok(entries)
    }
}

fn require_token(token: Option<&str>) -> Result<&str> {
    token
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| PlantGuardError::Authentication("sign in to use history".to_string()).into())
}

async fn read_body(response: reqwest::Response) -> Result<Value> {
    let status = response.status();
    let text = response
        .text()
        .await
        .map_err(|e| PlantGuardError::Store(format!("failed to read history response: {}", e)))?;

    if status == StatusCode::UNAUTHORIZED {
        return Err(PlantGuardError::Authentication(upstream_error_message(&text)).into());
    }
    if !status.is_success() {
        return Err(PlantGuardError::Store(format!(
            "history store returned {}: {}",
            status.as_u16(),
            upstream_error_message(&text)
        ))
        .into());
    }
    if text.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(&text)
        .map_err(|e| PlantGuardError::Store(format!("invalid history response: {}", e)).into())
}

/// Outcome of a best-effort history save
#[derive(Debug, Clone, PartialEq)]
pub enum SaveOutcome {
    /// No token: nothing was sent
    Skipped,
    /// The store accepted the record
    Saved(HistoryEntry),
    /// The token was rejected; the caller should sign in again
    Unauthorized(String),
    /// The store failed; the prediction itself is unaffected
    Failed(String),
}

/// Save a prediction without letting failure escape
///
/// Anonymous predictions are never persisted: without a token no request is
/// made. Failures are logged and returned as a [`SaveOutcome`], never
/// retried.
pub async fn record_best_effort(
    recorder: &HistoryRecorder,
    input: &HistoryEntryInput,
    token: Option<&str>,
) -> SaveOutcome {
    let Some(token) = token.filter(|t| !t.trim().is_empty()) else {
        tracing::debug!("Not signed in; skipping history save");
        return SaveOutcome::Skipped;
    };

    match recorder.save(input, Some(token)).await {
        Ok(entry) => {
            tracing::info!(id = ?entry.id, "Saved prediction to history");
            SaveOutcome::Saved(entry)
        }
        Err(e) => {
            let message = find_plantguard_error(&e)
                .map(PlantGuardError::public_message)
                .unwrap_or_else(|| e.to_string());
            tracing::warn!("Failed to save prediction history: {:#}", e);
            if is_auth_error(&e) {
                SaveOutcome::Unauthorized(message)
            } else {
                SaveOutcome::Failed(message)
            }
        }
    }
}
