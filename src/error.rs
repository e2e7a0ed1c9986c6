//! Error types for PlantGuard
//!
//! This module defines the error taxonomy shared by the prediction handler,
//! the history recorder, the storage layer and the HTTP surface, using
//! `thiserror` for ergonomic error handling.

use serde_json::Value;
use thiserror::Error;

/// Main error type for PlantGuard operations
///
/// Request handlers recover these from an `anyhow::Error` by downcasting and
/// convert them into the `{ "error": message }` envelope using
/// [`PlantGuardError::status_code`] and [`PlantGuardError::public_message`].
#[derive(Error, Debug)]
pub enum PlantGuardError {
    /// Missing or malformed request input (user-correctable)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Classifier unavailable or erroring
    #[error("Inference error: {message}")]
    Inference {
        /// Upstream HTTP status, when the classifier answered at all
        status: Option<u16>,
        /// Upstream or local failure description
        message: String,
    },

    /// Missing or invalid bearer token on a protected operation
    #[error("Authentication error: {0}")]
    Authentication(String),

    /// Persistence failure (history store, user store)
    #[error("Store error: {0}")]
    Store(String),

    /// Requested record does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Request refused by the HTTP layer before reaching a handler
    ///
    /// Carries the status the framework chose (413 for an oversized body,
    /// 405 for a wrong method, ...).
    #[error("Request rejected ({status}): {message}")]
    Rejected {
        /// HTTP status to answer with
        status: u16,
        /// Framework-provided description
        message: String,
    },

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// OS credential store errors
    #[error("Keyring error: {0}")]
    Keyring(#[from] keyring::Error),
}

impl PlantGuardError {
    /// Build an inference error with an optional upstream status
    ///
    /// # Examples
    ///
    /// ```
    /// use plantguard::error::PlantGuardError;
    ///
    /// let err = PlantGuardError::inference(Some(503), "model warming up");
    /// assert_eq!(err.status_code(), 502);
    /// ```
    pub fn inference(status: Option<u16>, message: impl Into<String>) -> Self {
        Self::Inference {
            status,
            message: message.into(),
        }
    }

    /// Build a rejection with the status chosen by the HTTP layer
    pub fn rejected(status: u16, message: impl Into<String>) -> Self {
        Self::Rejected {
            status,
            message: message.into(),
        }
    }

    /// HTTP status used when this error reaches the request boundary
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Validation(_) => 400,
            Self::Authentication(_) => 401,
            Self::NotFound(_) => 404,
            Self::Inference {
                status: Some(_), ..
            } => 502,
            Self::Rejected { status, .. } if (400..600).contains(status) => *status,
            _ => 500,
        }
    }

    /// Message placed in the JSON error envelope
    ///
    /// User-correctable errors carry their bare message; everything else
    /// keeps the category prefix.
    pub fn public_message(&self) -> String {
        match self {
            Self::Validation(msg) | Self::Authentication(msg) | Self::NotFound(msg) => {
                msg.clone()
            }
            Self::Rejected { message, .. } => message.clone(),
            Self::Inference {
                status: Some(status),
                message,
            } => format!("classifier returned {}: {}", status, message),
            Self::Inference {
                status: None,
                message,
            } => message.clone(),
            other => other.to_string(),
        }
    }
}

/// Result type alias for PlantGuard operations
///
/// This is a convenience alias that uses `anyhow::Error` as the error type,
/// allowing for rich error context and easy error propagation.
pub type Result<T> = anyhow::Result<T>;

/// Find the first [`PlantGuardError`] in an error chain
pub fn find_plantguard_error(err: &anyhow::Error) -> Option<&PlantGuardError> {
    err.chain()
        .find_map(|cause| cause.downcast_ref::<PlantGuardError>())
}

/// Returns `true` if the error chain carries an authentication failure
pub fn is_auth_error(err: &anyhow::Error) -> bool {
    matches!(
        find_plantguard_error(err),
        Some(PlantGuardError::Authentication(_))
    )
}

/// Extract a human-readable message from an upstream error body
///
/// Tries `{"error": ..}`, then `{"message": ..}`, then the raw text.
pub fn upstream_error_message(body: &str) -> String {
    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(body) {
        if let Some(message) = ["error", "message"]
            .iter()
            .find_map(|key| map.get(*key).and_then(Value::as_str))
        {
            return message.to_string();
        }
    }
    let trimmed = body.trim();
    if trimmed.is_empty() {
        "no response body".to_string()
    } else {
        trimmed.to_string()
    }
}
