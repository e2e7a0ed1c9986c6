use super::{store_error, SqliteStorage};
use crate::error::Result;
use crate::history::types::metadata_map;
use crate::history::{HistoryEntry, HistoryEntryInput};
use anyhow::Context;
use chrono::{SecondsFormat, Utc};
use rusqlite::params;
use serde_json::Value;

impl SqliteStorage {
    /// Persist a prediction record
    ///
    /// The label is stored exactly as given. Treatment and metadata are
    /// stored as JSON text.
    pub fn insert_history(&self, user_id: Option<i64>, input: &HistoryEntryInput) -> Result<HistoryEntry> {
        let conn = self.connect()?;

        let label = input.canonical_label().map(str::to_string);
        let treatment = input
            .treatment
            .as_ref()
            .filter(|t| !t.is_null())
            .map(serde_json::to_string)
            .transpose()
            .context("Failed to serialize treatment")
            .map_err(store_error)?;
        let metadata = if input.metadata.is_empty() {
            None
        } else {
            Some(
                serde_json::to_string(&input.metadata)
                    .context("Failed to serialize metadata")
                    .map_err(store_error)?,
            )
        };
        let created_at = Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true);

        conn.execute(
            "INSERT INTO prediction_history (user_id, label, confidence, treatment, metadata, created_at)
             VALUES (?, ?, ?, ?, ?, ?)",
            params![user_id, label, input.confidence, treatment, metadata, created_at],
        )
        .context("Failed to insert history entry")
        .map_err(store_error)?;

        let id = conn.last_insert_rowid();
        tracing::debug!(id, ?user_id, "Inserted history entry");

        Ok(HistoryEntry {
            id: Some(id.to_string()),
            user_id: user_id.map(|u| u.to_string()),
            label,
            confidence: input.confidence,
            treatment: input.treatment.clone().filter(|t| !t.is_null()),
            metadata: input.metadata.clone(),
            created_at: Some(created_at),
        })
    }

    /// A user's history, newest first
    pub fn list_history(&self, user_id: i64, limit: usize) -> Result<Vec<HistoryEntry>> {
        let conn = self.connect()?;
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);

        let mut stmt = conn
            .prepare(
                "SELECT id, user_id, label, confidence, treatment, metadata, created_at
                 FROM prediction_history
                 WHERE user_id = ?
                 ORDER BY created_at DESC, id DESC
                 LIMIT ?",
            )
            .context("Failed to prepare history query")
            .map_err(store_error)?;

        let rows = stmt
            .query_map(params![user_id, limit], |row| {
                let id: i64 = row.get(0)?;
                let user_id: Option<i64> = row.get(1)?;
                let treatment: Option<String> = row.get(4)?;
                let metadata: Option<String> = row.get(5)?;
                Ok(HistoryEntry {
                    id: Some(id.to_string()),
                    user_id: user_id.map(|u| u.to_string()),
                    label: row.get(2)?,
                    confidence: row.get::<_, Option<f64>>(3)?.unwrap_or(0.0),
                    treatment: decode_stored_json(treatment),
                    metadata: metadata_map(decode_stored_json(metadata).as_ref()),
                    created_at: row.get(6)?,
                })
            })
            .context("Failed to query history")
            .map_err(store_error)?;

        let mut entries = Vec::new();
        for row in rows {
            entries.push(row.context("Failed to read history row").map_err(store_error)?);
        }
        Ok(entries)
    }
}

/// Decode JSON text written by [`SqliteStorage::insert_history`]
///
/// Text that is not valid JSON (rows written by other tools) is returned
/// as a plain string.
fn decode_stored_json(raw: Option<String>) -> Option<Value> {
    let raw = raw?;
    Some(serde_json::from_str(&raw).unwrap_or(Value::String(raw)))
}
