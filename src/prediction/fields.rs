//! Field reconciliation for loosely-shaped JSON records
//!
//! Classifier responses, history records and client payloads do not agree
//! on field names. Every reader goes through these helpers so the
//! precedence rules live in one place:
//!
//! - label: `label`, then `disease_label`, then `name`
//! - confidence: `confidence`, then `conf`, else `0.0`
//! - treatment: `treatment`, then `treatments`
//! - creation time: `created_at`, then `timestamp`, then `createdAt`

use super::types::Treatment;
use serde_json::{Map, Value};

/// Accepted label field names, in order of preference
pub const LABEL_FIELDS: [&str; 3] = ["label", "disease_label", "name"];

/// Accepted confidence field names, in order of preference
pub const CONFIDENCE_FIELDS: [&str; 2] = ["confidence", "conf"];

/// Accepted treatment field names, in order of preference
pub const TREATMENT_FIELDS: [&str; 2] = ["treatment", "treatments"];

/// Accepted creation-time field names, in order of preference
pub const CREATED_AT_FIELDS: [&str; 3] = ["created_at", "timestamp", "createdAt"];

/// Pick the first present label
///
/// A field is present when it holds a non-blank string or a number (class
/// indices are reported as numbers by some classifiers).
///
/// # Examples
///
/// ```
/// use plantguard::prediction::fields::pick_label;
/// use serde_json::json;
///
/// let raw = json!({"name": "fallback", "disease_label": "Apple___Black_rot"});
/// assert_eq!(
///     pick_label(raw.as_object().unwrap()).as_deref(),
///     Some("Apple___Black_rot")
/// );
/// ```
pub fn pick_label(record: &Map<String, Value>) -> Option<String> {
    LABEL_FIELDS
        .iter()
        .filter_map(|field| record.get(*field))
        .find_map(text_value)
}

/// Pick the first numeric confidence, defaulting to `0.0`
///
/// Numeric strings are accepted. Non-finite values never escape.
pub fn pick_confidence(record: &Map<String, Value>) -> f64 {
    CONFIDENCE_FIELDS
        .iter()
        .filter_map(|field| record.get(*field))
        .find_map(number_value)
        .unwrap_or(0.0)
}

/// Pick the first non-null treatment value
pub fn pick_treatment(record: &Map<String, Value>) -> Option<&Value> {
    TREATMENT_FIELDS
        .iter()
        .filter_map(|field| record.get(*field))
        .find(|value| !value.is_null())
}

/// Pick the first creation time, as text
pub fn pick_created_at(record: &Map<String, Value>) -> Option<String> {
    CREATED_AT_FIELDS
        .iter()
        .filter_map(|field| record.get(*field))
        .find_map(text_value)
}

/// Render an identifier (string or number) as text
pub fn pick_id(record: &Map<String, Value>, field: &str) -> Option<String> {
    record.get(field).and_then(text_value)
}

fn text_value(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn number_value(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    number.is_finite().then_some(number)
}

/// Turn any treatment value into an ordered list of [`Treatment`]s
///
/// - a string becomes a single entry
/// - an array yields one entry per string or `{title, steps}` object
/// - an object with `title`/`steps` keys is a single entry
/// - any other object yields one entry per key, in document order
///
/// `steps` given as an array of strings are joined with newlines.
pub fn normalize_treatments(value: &Value) -> Vec<Treatment> {
    match value {
        Value::Null => Vec::new(),
        Value::String(s) if s.trim().is_empty() => Vec::new(),
        Value::String(s) => vec![Treatment::new("Treatment", s.clone())],
        Value::Array(items) => items
            .iter()
            .enumerate()
            .filter_map(|(index, item)| treatment_from_item(index, item))
            .collect(),
        Value::Object(map) if is_single_treatment(map) => {
            treatment_from_item(0, value).into_iter().collect()
        }
        Value::Object(map) => map
            .iter()
            .filter_map(|(title, steps)| steps_text(steps).map(|s| Treatment::new(title.clone(), s)))
            .collect(),
        other => vec![Treatment::new("Treatment", other.to_string())],
    }
}

fn is_single_treatment(map: &Map<String, Value>) -> bool {
    map.contains_key("title") || map.contains_key("steps")
}

fn treatment_from_item(index: usize, item: &Value) -> Option<Treatment> {
    let default_title = || format!("Step {}", index + 1);
    match item {
        Value::String(s) if !s.trim().is_empty() => Some(Treatment::new(default_title(), s.clone())),
        Value::Object(map) => {
            let title = map
                .get("title")
                .or_else(|| map.get("name"))
                .and_then(Value::as_str)
                .filter(|t| !t.trim().is_empty())
                .map(str::to_string);
            let steps = map
                .get("steps")
                .or_else(|| map.get("description"))
                .and_then(steps_text);
            if title.is_none() && steps.is_none() {
                return None;
            }
            Some(Treatment::new(
                title.unwrap_or_else(default_title),
                steps.unwrap_or_default(),
            ))
        }
        _ => None,
    }
}

fn steps_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Array(items) => Some(
            items
                .iter()
                .map(|item| match item {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .collect::<Vec<_>>()
                .join("\n"),
        ),
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn obj(value: Value) -> Map<String, Value> {
        value.as_object().cloned().expect("object")
    }

    #[test]
    fn test_label_prefers_label_over_disease_label_over_name() {
        let all = obj(json!({"name": "c", "disease_label": "b", "label": "a"}));
        assert_eq!(pick_label(&all).as_deref(), Some("a"));

        let two = obj(json!({"name": "c", "disease_label": "b"}));
        assert_eq!(pick_label(&two).as_deref(), Some("b"));

        let one = obj(json!({"name": "c"}));
        assert_eq!(pick_label(&one).as_deref(), Some("c"));
    }

    #[test]
    fn test_label_skips_blank_and_null_values() {
        let record = obj(json!({"label": "", "disease_label": null, "name": "Corn___healthy"}));
        assert_eq!(pick_label(&record).as_deref(), Some("Corn___healthy"));
    }

    #[test]
    fn test_label_accepts_numeric_class_index() {
        let record = obj(json!({"label": 17}));
        assert_eq!(pick_label(&record).as_deref(), Some("17"));
    }

    #[test]
    fn test_label_missing_is_none() {
        assert_eq!(pick_label(&obj(json!({"confidence": 0.5}))), None);
    }

    #[test]
    fn test_confidence_prefers_confidence_over_conf() {
        let record = obj(json!({"conf": 0.2, "confidence": 0.9}));
        assert_eq!(pick_confidence(&record), 0.9);
    }

    #[test]
    fn test_confidence_falls_back_to_conf_when_not_numeric() {
        let record = obj(json!({"confidence": "high", "conf": 0.4}));
        assert_eq!(pick_confidence(&record), 0.4);
    }

    #[test]
    fn test_confidence_accepts_numeric_string() {
        let record = obj(json!({"confidence": " 0.75 "}));
        assert_eq!(pick_confidence(&record), 0.75);
    }

    #[test]
    fn test_confidence_defaults_to_zero() {
        for raw in [
            json!({}),
            json!({"confidence": null}),
            json!({"confidence": "NaN"}),
            json!({"conf": [0.3]}),
        ] {
            let value = pick_confidence(&obj(raw));
            assert_eq!(value, 0.0);
            assert!(!value.is_nan());
        }
    }

    #[test]
    fn test_treatment_prefers_treatment_and_skips_null() {
        let record = obj(json!({"treatment": null, "treatments": ["Remove leaves"]}));
        assert_eq!(pick_treatment(&record), Some(&json!(["Remove leaves"])));

        let record = obj(json!({"treatment": "Spray", "treatments": ["Other"]}));
        assert_eq!(pick_treatment(&record), Some(&json!("Spray")));
    }

    #[test]
    fn test_created_at_precedence() {
        let record = obj(json!({"createdAt": "c", "timestamp": "b"}));
        assert_eq!(pick_created_at(&record).as_deref(), Some("b"));

        let record = obj(json!({"createdAt": "c", "created_at": "a"}));
        assert_eq!(pick_created_at(&record).as_deref(), Some("a"));
    }

    #[test]
    fn test_pick_id_renders_numbers() {
        let record = obj(json!({"id": 42, "user_id": "u-1"}));
        assert_eq!(pick_id(&record, "id").as_deref(), Some("42"));
        assert_eq!(pick_id(&record, "user_id").as_deref(), Some("u-1"));
        assert_eq!(pick_id(&record, "missing"), None);
    }

    #[test]
    fn test_normalize_treatments_string() {
        let treatments = normalize_treatments(&json!("Apply copper fungicide"));
        assert_eq!(
            treatments,
            vec![Treatment::new("Treatment", "Apply copper fungicide")]
        );
        assert!(normalize_treatments(&json!("   ")).is_empty());
        assert!(normalize_treatments(&Value::Null).is_empty());
    }

    #[test]
    fn test_normalize_treatments_array_of_mixed_items() {
        let treatments = normalize_treatments(&json!([
            "Prune infected branches",
            {"title": "Fungicide", "steps": ["Mix 2g/L", "Spray weekly"]},
            {"unrelated": true},
            42
        ]));
        assert_eq!(
            treatments,
            vec![
                Treatment::new("Step 1", "Prune infected branches"),
                Treatment::new("Fungicide", "Mix 2g/L\nSpray weekly"),
            ]
        );
    }

    #[test]
    fn test_normalize_treatments_single_object() {
        let treatments = normalize_treatments(&json!({"steps": "Water at the base"}));
        assert_eq!(treatments, vec![Treatment::new("Step 1", "Water at the base")]);
    }

    #[test]
    fn test_normalize_treatments_keyed_object_keeps_document_order() {
        let treatments = normalize_treatments(&json!({
            "Cultural": "Rotate crops",
            "Chemical": ["Chlorothalonil", "Mancozeb"],
            "Notes": null
        }));
        assert_eq!(
            treatments,
            vec![
                Treatment::new("Cultural", "Rotate crops"),
                Treatment::new("Chemical", "Chlorothalonil\nMancozeb"),
            ]
        );
    }
}
