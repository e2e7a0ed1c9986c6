//! Remote labelled-inference adapter
//!
//! Forwards the upload unchanged as multipart field `image` and returns the
//! service's JSON object as-is.

use super::{Classifier, RawClassification};
use crate::config::RemoteClassifierConfig;
use crate::error::{upstream_error_message, PlantGuardError, Result};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;

/// Classifier backed by an HTTP inference service
///
/// # Examples
///
/// ```
/// use plantguard::classifier::{Classifier, RemoteClassifier};
/// use plantguard::config::RemoteClassifierConfig;
///
/// let classifier = RemoteClassifier::new(RemoteClassifierConfig::default()).unwrap();
/// assert_eq!(classifier.name(), "remote");
/// assert_eq!(classifier.url(), "http://localhost:8500/classify");
/// ```
#[derive(Debug, Clone)]
pub struct RemoteClassifier {
    client: Client,
    config: RemoteClassifierConfig,
}

impl RemoteClassifier {
    /// Create a new remote classifier
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be built
    pub fn new(config: RemoteClassifierConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent(concat!("plantguard/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| PlantGuardError::Config(format!("Failed to create HTTP client: {}", e)))?;

        tracing::info!("Initialized remote classifier: url={}", config.url);

        Ok(Self { client, config })
    }

    /// Inference endpoint
    pub fn url(&self) -> &str {
        &self.config.url
    }
}

#[async_trait]
impl Classifier for RemoteClassifier {
    async fn classify(&self, image: &[u8], content_type: Option<&str>) -> Result<RawClassification> {
        let form = Form::new().part("image", image_part(image, content_type));

        tracing::debug!(url = %self.config.url, bytes = image.len(), "Sending image to classifier");

        let response = self
            .client
            .post(&self.config.url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Classifier request failed: {}", e);
                PlantGuardError::inference(None, format!("classifier request failed: {}", e))
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            tracing::error!("Failed to read classifier response: {}", e);
            PlantGuardError::inference(
                Some(status.as_u16()),
                format!("failed to read classifier response: {}", e),
            )
        })?;

        if !status.is_success() {
            let message = upstream_error_message(&body);
            tracing::error!("Classifier returned error {}: {}", status, message);
            return Err(PlantGuardError::inference(Some(status.as_u16()), message).into());
        }

        match serde_json::from_str::<Value>(&body) {
            Ok(Value::Object(raw)) => {
                tracing::debug!(fields = raw.len(), "Classifier response received");
                Ok(raw)
            }
            Ok(_) => Err(PlantGuardError::inference(
                None,
                "classifier returned a non-object response",
            )
            .into()),
            Err(e) => {
                tracing::error!("Failed to parse classifier response: {}", e);
                Err(PlantGuardError::inference(
                    None,
                    format!("failed to parse classifier response: {}", e),
                )
                .into())
            }
        }
    }

    fn name(&self) -> &str {
        "remote"
    }
}

fn image_part(image: &[u8], content_type: Option<&str>) -> Part {
    let part = || Part::bytes(image.to_vec()).file_name("upload");
    match content_type {
        Some(mime) => part().mime_str(mime).unwrap_or_else(|_| part()),
        None => part(),
    }
}
