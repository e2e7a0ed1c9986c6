use super::{forget_on_auth_error, require_token};
use crate::client::BackendClient;
use crate::config::Config;
use crate::error::Result;
use crate::history::HistoryEntry;
use crate::prediction::fields::normalize_treatments;
use crate::session::TokenStore;
use chrono::DateTime;
use colored::Colorize;
use prettytable::{format, Table};

/// Handle the history command
pub async fn handle_history(config: Config, json_output: bool) -> Result<()> {
    let store = TokenStore::new()?;
    let token = require_token(&store)?;
    let client = BackendClient::new(&config.client)?;

    let entries = client
        .history()
        .list(Some(&token))
        .await
        .map_err(|e| forget_on_auth_error(&store, e))?;

    if json_output {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    if entries.is_empty() {
        println!("{}", "No predictions saved yet.".yellow());
        return Ok(());
    }

    let mut table = Table::new();
    table.set_format(*format::consts::FORMAT_BORDERS_ONLY);

    table.add_row(prettytable::row![
        "When".bold(),
        "Prediction".bold(),
        "Confidence".bold(),
        "Treatment".bold()
    ]);

    for entry in &entries {
        let label = entry.display_label();
        let label = if label.chars().count() > 40 {
            format!("{}...", label.chars().take(37).collect::<String>())
        } else {
            label
        };

        table.add_row(prettytable::row![
            format_created_at(entry),
            label.cyan(),
            format!("{:.1}%", entry.confidence * 100.0),
            treatment_summary(entry)
        ]);
    }

    println!("\nPrediction History:");
    table.printstd();
    println!();
    Ok(())
}

fn format_created_at(entry: &HistoryEntry) -> String {
    match entry.created_at.as_deref() {
        Some(raw) => DateTime::parse_from_rfc3339(raw)
            .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|_| raw.to_string()),
        None => "-".to_string(),
    }
}

fn treatment_summary(entry: &HistoryEntry) -> String {
    let treatments = entry
        .treatment
        .as_ref()
        .map(normalize_treatments)
        .unwrap_or_default();
    match treatments.as_slice() {
        [] => "-".to_string(),
        [only] => only.title.clone(),
        [first, rest @ ..] => format!("{} (+{} more)", first.title, rest.len()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Map};

    fn entry(created_at: Option<&str>, treatment: Option<serde_json::Value>) -> HistoryEntry {
        HistoryEntry {
            id: Some("1".to_string()),
            user_id: Some("7".to_string()),
            label: Some("Tomato___Late_blight".to_string()),
            confidence: 0.87,
            treatment,
            metadata: Map::new(),
            created_at: created_at.map(str::to_string),
        }
    }

    #[test]
    fn test_format_created_at() {
        assert_eq!(
            format_created_at(&entry(Some("2026-03-01T09:30:00.000000Z"), None)),
            "2026-03-01 09:30"
        );
        assert_eq!(format_created_at(&entry(Some("yesterday"), None)), "yesterday");
        assert_eq!(format_created_at(&entry(None, None)), "-");
    }

    #[test]
    fn test_treatment_summary() {
        assert_eq!(treatment_summary(&entry(None, None)), "-");
        assert_eq!(
            treatment_summary(&entry(None, Some(json!("Remove infected leaves")))),
            "Treatment"
        );
        assert_eq!(
            treatment_summary(&entry(
                None,
                Some(json!([
                    {"title": "Cultural", "steps": "Rotate crops"},
                    {"title": "Chemical", "steps": "Copper spray"}
                ]))
            )),
            "Cultural (+1 more)"
        );
    }
}
