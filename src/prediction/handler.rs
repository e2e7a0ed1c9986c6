use super::fields;
use super::treatments::TreatmentCatalog;
use super::types::PredictionResult;
use super::view::UNKNOWN_LABEL;
use crate::classifier::Classifier;
use crate::error::{PlantGuardError, Result};
use serde_json::Value;
use std::sync::Arc;

/// Orchestrates one prediction: validate, classify, reconcile, attach advice
///
/// The handler owns no mutable state. The classifier is shared read-only by
/// every concurrent request, and nothing is persisted here: saving to
/// history is a separate step taken by the caller.
#[derive(Clone)]
pub struct PredictionHandler {
    classifier: Arc<dyn Classifier>,
    catalog: Arc<TreatmentCatalog>,
}

impl PredictionHandler {
    /// Create a handler over a loaded classifier and treatment catalog
    pub fn new(classifier: Arc<dyn Classifier>, catalog: TreatmentCatalog) -> Self {
        Self {
            classifier,
            catalog: Arc::new(catalog),
        }
    }

    /// Name of the underlying classifier adapter
    pub fn classifier_name(&self) -> &str {
        self.classifier.name()
    }

    /// Classify an uploaded image
    ///
    /// # Errors
    ///
    /// - `Validation("no image provided")` when `image` is empty; the
    ///   classifier is not called
    /// - whatever the classifier fails with, unchanged (no retry)
    pub async fn predict(&self, image: &[u8], content_type: Option<&str>) -> Result<PredictionResult> {
        if image.is_empty() {
            return Err(PlantGuardError::Validation("no image provided".to_string()).into());
        }

        tracing::debug!(
            classifier = self.classifier.name(),
            bytes = image.len(),
            content_type = content_type.unwrap_or("unknown"),
            "Classifying image"
        );

        let raw = self.classifier.classify(image, content_type).await?;

        let class_index = raw.get("class_index").and_then(Value::as_u64);
        let label = fields::pick_label(&raw)
            .or_else(|| class_index.map(|i| i.to_string()))
            .unwrap_or_else(|| UNKNOWN_LABEL.to_string());
        let confidence = fields::pick_confidence(&raw);

        let treatment = fields::pick_treatment(&raw)
            .or_else(|| self.catalog.get(&label))
            .cloned();
        let treatments = treatment
            .as_ref()
            .map(fields::normalize_treatments)
            .unwrap_or_default();

        tracing::info!(
            label = %label,
            confidence,
            treatments = treatments.len(),
            "Prediction complete"
        );

        Ok(PredictionResult {
            label,
            confidence,
            treatments,
            treatment,
            class_index,
        })
    }
}
