use crate::prediction::{display_label, fields, PredictionViewModel, UNKNOWN_LABEL};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Body of a history save request
///
/// Mirrors what clients send to `POST /history`. Every field is optional:
/// partial records are stored, not rejected.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntryInput {
    /// Canonical class label
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Alternative label field sent by some clients
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disease_label: Option<String>,
    /// Prediction confidence
    #[serde(default)]
    pub confidence: f64,
    /// Treatment advice, string or structured
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub treatment: Option<Value>,
    /// Free-form key/value metadata
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub metadata: Map<String, Value>,
}

impl HistoryEntryInput {
    /// Read a save request from an arbitrary JSON body
    ///
    /// Field names are reconciled the same way prediction responses are, so
    /// `{"name": .., "conf": .., "treatments": ..}` is accepted too.
    pub fn from_raw(raw: &Value) -> Self {
        let Some(record) = raw.as_object() else {
            return Self::default();
        };

        Self {
            label: fields::pick_label(record),
            disease_label: fields::pick_id(record, "disease_label"),
            confidence: fields::pick_confidence(record),
            treatment: fields::pick_treatment(record).cloned(),
            metadata: metadata_map(record.get("metadata")),
        }
    }

    /// Build a save request from a displayed prediction
    ///
    /// The canonical label is stored, never the display form.
    pub fn from_view(
        view: &PredictionViewModel,
        treatment: Option<Value>,
        metadata: Map<String, Value>,
    ) -> Self {
        Self {
            label: Some(view.label.clone()),
            disease_label: None,
            confidence: view.confidence,
            treatment,
            metadata,
        }
    }

    /// Label to persist: `label`, else `disease_label`
    pub fn canonical_label(&self) -> Option<&str> {
        self.label
            .as_deref()
            .or(self.disease_label.as_deref())
            .filter(|l| !l.trim().is_empty())
    }
}

/// A persisted prediction record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Store-assigned identifier, opaque
    pub id: Option<String>,
    /// Owner, absent for anonymous records
    pub user_id: Option<String>,
    /// Canonical label exactly as saved
    pub label: Option<String>,
    /// Prediction confidence, `0.0` when absent
    pub confidence: f64,
    /// Treatment advice, string or structured
    pub treatment: Option<Value>,
    /// Free-form key/value metadata
    #[serde(default)]
    pub metadata: Map<String, Value>,
    /// Insert time as reported by the store
    pub created_at: Option<String>,
}

impl HistoryEntry {
    /// Presentation form of the label
    pub fn display_label(&self) -> String {
        self.label
            .as_deref()
            .map(display_label)
            .unwrap_or_else(|| UNKNOWN_LABEL.to_string())
    }
}

/// Metadata must be a key/value map; anything else is kept under `value`
pub(crate) fn metadata_map(raw: Option<&Value>) -> Map<String, Value> {
    match raw {
        None | Some(Value::Null) => Map::new(),
        Some(Value::Object(map)) => map.clone(),
        Some(other) => {
            let mut map = Map::new();
            map.insert("value".to_string(), other.clone());
            map
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prediction::normalize;
    use serde_json::json;

    #[test]
    fn test_input_from_raw_reconciles_fields() {
        let input = HistoryEntryInput::from_raw(&json!({
            "disease_label": "Apple___Black_rot",
            "conf": "0.66",
            "treatments": ["Prune"],
            "metadata": {"source": "cli"}
        }));
        assert_eq!(input.label.as_deref(), Some("Apple___Black_rot"));
        assert_eq!(input.disease_label.as_deref(), Some("Apple___Black_rot"));
        assert_eq!(input.confidence, 0.66);
        assert_eq!(input.treatment, Some(json!(["Prune"])));
        assert_eq!(input.metadata.get("source"), Some(&json!("cli")));
    }

    #[test]
    fn test_input_from_raw_tolerates_garbage() {
        assert_eq!(HistoryEntryInput::from_raw(&json!("nope")), HistoryEntryInput::default());
        let input = HistoryEntryInput::from_raw(&json!({"metadata": 5}));
        assert_eq!(input.canonical_label(), None);
        assert_eq!(input.metadata.get("value"), Some(&json!(5)));
    }

    #[test]
    fn test_input_from_view_keeps_canonical_label() {
        let view = normalize(&json!({"label": "Tomato___Late_blight", "confidence": 0.9}));
        let input = HistoryEntryInput::from_view(&view, None, Map::new());
        assert_eq!(input.canonical_label(), Some("Tomato___Late_blight"));
        assert_eq!(input.confidence, 0.9);
    }

    #[test]
    fn test_input_serializes_only_present_fields() {
        let input = HistoryEntryInput {
            label: Some("Corn___healthy".to_string()),
            confidence: 0.5,
            ..Default::default()
        };
        assert_eq!(
            serde_json::to_value(&input).unwrap(),
            json!({"label": "Corn___healthy", "confidence": 0.5})
        );
    }

    #[test]
    fn test_entry_display_label() {
        let entry = HistoryEntry {
            id: Some("1".to_string()),
            user_id: None,
            label: Some("Tomato___Late_blight".to_string()),
            confidence: 0.9,
            treatment: None,
            metadata: Map::new(),
            created_at: None,
        };
        assert_eq!(entry.display_label(), "Tomato - Late blight");
        assert_eq!(entry.label.as_deref(), Some("Tomato___Late_blight"));

        let unlabeled = HistoryEntry { label: None, ..entry };
        assert_eq!(unlabeled.display_label(), "Unknown");
    }
}
