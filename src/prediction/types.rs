use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One piece of treatment advice for a predicted disease
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Treatment {
    /// Short heading (e.g. "Fungicide")
    pub title: String,
    /// Instructions; multi-step advice is newline separated
    pub steps: String,
}

impl Treatment {
    /// Create a treatment entry
    pub fn new(title: impl Into<String>, steps: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            steps: steps.into(),
        }
    }
}

/// Normalized result of a single prediction request
///
/// Transient: lives only for the duration of the request that produced it.
/// `label` is the canonical class name as reported by the classifier (for
/// example `Tomato___Late_blight`); presentation transforms happen elsewhere.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    /// Canonical class label
    pub label: String,
    /// Classifier confidence, `0.0` when the classifier omitted it
    pub confidence: f64,
    /// Ordered treatment advice, possibly empty
    pub treatments: Vec<Treatment>,
    /// Treatment value exactly as supplied by the classifier or catalog
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub treatment: Option<Value>,
    /// Index of the winning class, when the classifier reports one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_index: Option<u64>,
}
