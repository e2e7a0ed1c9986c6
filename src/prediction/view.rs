//! Client-side view model for prediction responses
//!
//! The backend response schema is not fixed, so [`normalize`] is total:
//! whatever arrives, the caller gets something renderable.

use super::fields;
use super::types::Treatment;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Label shown when a response carries none
pub const UNKNOWN_LABEL: &str = "Unknown";

/// Canonical, display-ready shape of a prediction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionViewModel {
    /// Canonical label, untransformed
    pub label: String,
    /// Human-readable label for rendering
    pub display_label: String,
    /// Confidence in `[0, 1]` as reported; `0.0` when absent
    pub confidence: f64,
    /// Treatment advice, possibly empty
    pub treatments: Vec<Treatment>,
}

impl PredictionViewModel {
    /// Confidence formatted as a percentage with one decimal
    ///
    /// # Examples
    ///
    /// ```
    /// use plantguard::prediction::normalize;
    /// use serde_json::json;
    ///
    /// let view = normalize(&json!({"label": "Corn___healthy", "confidence": 0.8765}));
    /// assert_eq!(view.confidence_percent(), "87.7%");
    /// ```
    pub fn confidence_percent(&self) -> String {
        format!("{:.1}%", self.confidence * 100.0)
    }
}

/// Reshape any backend response into a [`PredictionViewModel`]
///
/// Never fails: a missing label becomes `"Unknown"`, a missing or
/// non-numeric confidence becomes `0.0`, missing treatments become an empty
/// list.
pub fn normalize(raw: &Value) -> PredictionViewModel {
    let Some(record) = raw.as_object() else {
        return PredictionViewModel {
            label: UNKNOWN_LABEL.to_string(),
            display_label: UNKNOWN_LABEL.to_string(),
            confidence: 0.0,
            treatments: Vec::new(),
        };
    };

    let label = fields::pick_label(record).unwrap_or_else(|| UNKNOWN_LABEL.to_string());
    let treatments = fields::pick_treatment(record)
        .map(fields::normalize_treatments)
        .unwrap_or_default();

    PredictionViewModel {
        display_label: display_label(&label),
        confidence: fields::pick_confidence(record),
        label,
        treatments,
    }
}

/// Presentation form of a canonical label
///
/// Triple underscores separate plant from condition and become `" - "`;
/// remaining underscores become spaces.
///
/// # Examples
///
/// ```
/// use plantguard::prediction::display_label;
///
/// assert_eq!(display_label("Apple___Cedar_apple_rust"), "Apple - Cedar apple rust");
/// ```
pub fn display_label(label: &str) -> String {
    label.replace("___", " - ").replace('_', " ")
}
