//! Tensor-serving adapter
//!
//! Preprocesses the image locally and posts the tensor to a model server
//! speaking the `{"instances": [...]}` predict protocol. The raw scores are
//! turned into `{label, class_index, confidence}`.

use super::preprocess;
use super::{Classifier, RawClassification};
use crate::config::TensorClassifierConfig;
use crate::error::{upstream_error_message, PlantGuardError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Tolerance when deciding whether scores already sum to one
const DISTRIBUTION_TOLERANCE: f64 = 1e-3;

/// Classifier backed by a tensor-serving predict endpoint
#[derive(Debug, Clone)]
pub struct TensorClassifier {
    client: Client,
    config: TensorClassifierConfig,
    class_names: Arc<Vec<String>>,
}

impl TensorClassifier {
    /// Create a new tensor classifier
    ///
    /// A class-names file that cannot be loaded is not fatal: labels then
    /// fall back to the class index.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be built
    pub fn new(config: TensorClassifierConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent(concat!("plantguard/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| PlantGuardError::Config(format!("Failed to create HTTP client: {}", e)))?;

        let class_names = match config.class_names_path.as_deref() {
            Some(path) => load_class_names(path).unwrap_or_else(|e| {
                tracing::warn!("Failed to load class names: {:#}", e);
                Vec::new()
            }),
            None => {
                tracing::warn!("No class names configured; predictions will report class indices");
                Vec::new()
            }
        };

        tracing::info!(
            "Initialized tensor classifier: url={}, classes={}",
            config.url,
            class_names.len()
        );

        Ok(Self {
            client,
            config,
            class_names: Arc::new(class_names),
        })
    }

    /// Number of known class names
    pub fn class_count(&self) -> usize {
        self.class_names.len()
    }

    fn label_for(&self, index: usize) -> String {
        self.class_names
            .get(index)
            .cloned()
            .unwrap_or_else(|| index.to_string())
    }
}

#[async_trait]
impl Classifier for TensorClassifier {
    async fn classify(&self, image: &[u8], _content_type: Option<&str>) -> Result<RawClassification> {
        let bytes = image.to_vec();
        let target_size = self.config.target_size;
        let mode = self.config.preprocessing;
        let tensor = tokio::task::spawn_blocking(move || {
            preprocess::preprocess(&bytes, target_size, mode)
        })
        .await
        .map_err(|e| PlantGuardError::inference(None, format!("preprocessing task failed: {}", e)))??;

        tracing::debug!(url = %self.config.url, "Sending tensor to model server");

        let response = self
            .client
            .post(&self.config.url)
            .json(&json!({ "instances": [tensor] }))
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Model server request failed: {}", e);
                PlantGuardError::inference(None, format!("model prediction failed: {}", e))
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = upstream_error_message(&body);
            tracing::error!("Model server returned error {}: {}", status, message);
            return Err(PlantGuardError::inference(Some(status.as_u16()), message).into());
        }

        let body: Value = response.json().await.map_err(|e| {
            tracing::error!("Failed to parse model server response: {}", e);
            PlantGuardError::inference(None, format!("failed to parse model output: {}", e))
        })?;

        let scores = extract_scores(&body)?;
        let probabilities = to_probabilities(&scores);
        let (index, confidence) = argmax(&probabilities)
            .ok_or_else(|| PlantGuardError::inference(None, "model returned no scores"))?;

        let mut raw = RawClassification::new();
        raw.insert("label".to_string(), Value::String(self.label_for(index)));
        raw.insert("class_index".to_string(), json!(index));
        raw.insert("confidence".to_string(), json!(confidence));
        Ok(raw)
    }

    fn name(&self) -> &str {
        "tensor"
    }
}

/// Load class names from a JSON array of strings
pub fn load_class_names(path: &Path) -> Result<Vec<String>> {
    let contents = std::fs::read_to_string(path).map_err(|e| {
        PlantGuardError::Config(format!(
            "Failed to read class names {}: {}",
            path.display(),
            e
        ))
    })?;
    let names: Vec<String> = serde_json::from_str(&contents).map_err(|e| {
        PlantGuardError::Config(format!(
            "Class names {} must be a JSON array of strings: {}",
            path.display(),
            e
        ))
    })?;
    Ok(names)
}

/// Read the score vector from a predict response
///
/// Accepts `predictions` or `outputs`, with or without a leading batch
/// dimension of one.
pub fn extract_scores(body: &Value) -> Result<Vec<f64>> {
    let output = body
        .get("predictions")
        .or_else(|| body.get("outputs"))
        .ok_or_else(|| PlantGuardError::inference(None, "model output missing predictions"))?;

    let row = match output.as_array().map(Vec::as_slice) {
        Some([only]) if only.is_array() => only,
        _ => output,
    };

    row.as_array()
        .ok_or_else(|| PlantGuardError::inference(None, "model output is not a score vector"))?
        .iter()
        .map(|v| {
            v.as_f64().ok_or_else(|| {
                anyhow::Error::from(PlantGuardError::inference(
                    None,
                    "model output contains non-numeric scores",
                ))
            })
        })
        .collect()
}

/// Returns `true` if the scores already form a probability distribution
pub fn is_distribution(scores: &[f64]) -> bool {
    !scores.is_empty()
        && scores.iter().all(|s| (0.0..=1.0).contains(s))
        && (scores.iter().sum::<f64>() - 1.0).abs() <= DISTRIBUTION_TOLERANCE
}

/// Numerically stable softmax
pub fn softmax(scores: &[f64]) -> Vec<f64> {
    let max = scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let exps: Vec<f64> = scores.iter().map(|s| (s - max).exp()).collect();
    let sum: f64 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}

/// Convert raw scores to probabilities, leaving distributions untouched
pub fn to_probabilities(scores: &[f64]) -> Vec<f64> {
    if is_distribution(scores) {
        scores.to_vec()
    } else {
        softmax(scores)
    }
}

/// Index and value of the largest element; first wins on ties
pub fn argmax(values: &[f64]) -> Option<(usize, f64)> {
    values
        .iter()
        .copied()
        .enumerate()
        .fold(None, |best, (i, v)| match best {
            Some((_, b)) if b >= v => best,
            _ => Some((i, v)),
        })
}
