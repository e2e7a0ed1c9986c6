//! Classifier adapters
//!
//! The trained model is an external collaborator: image bytes in, a loosely
//! shaped JSON object out. Adapters only transport and decode; field names
//! are reconciled later by the prediction handler.

pub mod preprocess;
pub mod remote;
pub mod tensor;
pub mod unavailable;

pub use remote::RemoteClassifier;
pub use tensor::TensorClassifier;
pub use unavailable::UnavailableClassifier;

use crate::config::ClassifierConfig;
use crate::error::{PlantGuardError, Result};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::sync::Arc;

/// Raw classifier output, e.g. `{"disease_label": "...", "conf": 0.9}`
pub type RawClassification = Map<String, Value>;

/// Classifier adapter trait
///
/// Implementations must be safe to share across concurrent requests:
/// inference is read-only.
#[async_trait]
pub trait Classifier: Send + Sync {
    /// Classify one image
    ///
    /// # Arguments
    ///
    /// * `image` - Raw upload bytes, never empty
    /// * `content_type` - MIME type reported by the uploader, if any
    ///
    /// # Errors
    ///
    /// Returns `Inference` when the model is unavailable or fails, and
    /// `Validation` when the bytes are not an image the adapter can read.
    async fn classify(&self, image: &[u8], content_type: Option<&str>) -> Result<RawClassification>;

    /// Adapter name for logs and health output
    fn name(&self) -> &str;
}

/// Create a classifier from configuration
///
/// # Errors
///
/// Returns error if the classifier type is unknown or the adapter cannot
/// be initialized.
pub fn create_classifier(config: &ClassifierConfig) -> Result<Arc<dyn Classifier>> {
    match config.classifier_type.as_str() {
        "remote" => Ok(Arc::new(RemoteClassifier::new(config.remote.clone())?)),
        "tensor" => Ok(Arc::new(TensorClassifier::new(config.tensor.clone())?)),
        other => Err(PlantGuardError::Config(format!(
            "Unknown classifier type: {}",
            other
        ))
        .into()),
    }
}

/// Create the configured classifier, degrading to [`UnavailableClassifier`]
///
/// The server keeps answering (with an error envelope on `/predict`) when
/// the model cannot be loaded at startup.
pub fn load_classifier(config: &ClassifierConfig) -> Arc<dyn Classifier> {
    match create_classifier(config) {
        Ok(classifier) => {
            tracing::info!(classifier = classifier.name(), "Classifier loaded");
            classifier
        }
        Err(e) => {
            tracing::error!("Failed to load classifier: {:#}", e);
            Arc::new(UnavailableClassifier)
        }
    }
}
