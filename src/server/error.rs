//! JSON error envelope for the HTTP surface

use crate::error::{find_plantguard_error, PlantGuardError};
use axum::extract::multipart::MultipartError;
use axum::extract::rejection::BytesRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

/// Any handler failure, rendered as `{"error": message}`
///
/// Status and message come from the [`crate::error::PlantGuardError`] in the
/// chain; anything else is an opaque 500.
#[derive(Debug)]
pub struct ApiError(anyhow::Error);

/// Result type for request handlers
pub type ApiResult<T> = std::result::Result<T, ApiError>;

impl<E> From<E> for ApiError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

impl ApiError {
    /// Status code and public message for this error
    pub fn parts(&self) -> (StatusCode, String) {
        match find_plantguard_error(&self.0) {
            Some(err) => (
                StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
                err.public_message(),
            ),
            None => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal server error".to_string(),
            ),
        }
    }
}

/// Envelope a body extraction failure, keeping axum's status (413 when the
/// body limit is exceeded)
pub fn body_rejection(rejection: BytesRejection) -> ApiError {
    PlantGuardError::rejected(rejection.status().as_u16(), rejection.body_text()).into()
}

/// Envelope a multipart stream failure, keeping axum's status
pub fn multipart_rejection(err: MultipartError) -> ApiError {
    PlantGuardError::rejected(err.status().as_u16(), err.body_text()).into()
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = self.parts();
        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), "Request failed: {:#}", self.0);
        } else {
            tracing::debug!(status = status.as_u16(), "Request rejected: {}", message);
        }
        (status, Json(json!({ "error": message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_maps_to_400_with_bare_message() {
        let err = ApiError::from(PlantGuardError::Validation("no image provided".to_string()));
        assert_eq!(
            err.parts(),
            (StatusCode::BAD_REQUEST, "no image provided".to_string())
        );
    }

    #[test]
    fn test_upstream_inference_maps_to_502() {
        let err = ApiError::from(PlantGuardError::inference(Some(503), "busy"));
        let (status, message) = err.parts();
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(message, "classifier returned 503: busy");
    }

    #[test]
    fn test_rejection_keeps_status_and_message() {
        let err = ApiError::from(PlantGuardError::rejected(413, "length limit exceeded"));
        assert_eq!(
            err.parts(),
            (
                StatusCode::PAYLOAD_TOO_LARGE,
                "length limit exceeded".to_string()
            )
        );
    }

    #[test]
    fn test_foreign_error_is_opaque_500() {
        let err = ApiError::from(anyhow::anyhow!("secret detail"));
        assert_eq!(
            err.parts(),
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal server error".to_string()
            )
        );
    }
}
