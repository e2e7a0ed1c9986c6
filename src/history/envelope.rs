//! Tolerant reading of history store responses
//!
//! The store's wire format is not fixed. A list response may be:
//!
//! 1. a bare array
//! 2. an object with a `history` array
//! 3. an object with an `entries` array
//! 4. an object whose first array-valued field holds the records
//!
//! The options are tried in that order; anything else is an empty list.

use super::types::{metadata_map, HistoryEntry};
use crate::prediction::fields;
use serde_json::Value;

const ENVELOPE_FIELDS: [&str; 2] = ["history", "entries"];

/// Locate the record array inside a list response
///
/// # Examples
///
/// ```
/// use plantguard::history::extract_entries;
/// use serde_json::json;
///
/// assert_eq!(extract_entries(&json!({"entries": [1, 2]})).len(), 2);
/// assert!(extract_entries(&json!({})).is_empty());
/// ```
pub fn extract_entries(body: &Value) -> &[Value] {
    match body {
        Value::Array(items) => items,
        Value::Object(map) => ENVELOPE_FIELDS
            .iter()
            .find_map(|field| map.get(*field).and_then(Value::as_array))
            .or_else(|| map.values().find_map(Value::as_array))
            .map(Vec::as_slice)
            .unwrap_or(&[]),
        _ => &[],
    }
}

/// Reconcile one raw record into a [`HistoryEntry`]
///
/// Returns `None` for records that are not JSON objects.
pub fn normalize_entry(raw: &Value) -> Option<HistoryEntry> {
    let record = raw.as_object()?;
    Some(HistoryEntry {
        id: fields::pick_id(record, "id"),
        user_id: fields::pick_id(record, "user_id"),
        label: fields::pick_label(record),
        confidence: fields::pick_confidence(record),
        treatment: fields::pick_treatment(record).cloned(),
        metadata: metadata_map(record.get("metadata")),
        created_at: fields::pick_created_at(record),
    })
}

/// Extract and normalize every record in a list response
pub fn normalize_entries(body: &Value) -> Vec<HistoryEntry> {
    let raw = extract_entries(body);
    let entries: Vec<HistoryEntry> = raw.iter().filter_map(normalize_entry).collect();
    if entries.len() < raw.len() {
        tracing::debug!(
            skipped = raw.len() - entries.len(),
            "Ignored non-object history records"
        );
    }
    entries
}
