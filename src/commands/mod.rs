/*!
Command handlers for the CLI

This module provides command handlers invoked by the CLI entrypoint.

- `serve`: Run the prediction backend
- `predict`: Classify a leaf photo, then save it to history when signed in
- `history`: List past predictions
- `auth`: Sign up, sign in, sign out
- `profile`: Show or edit the signed-in user's profile
*/

use crate::error::{is_auth_error, PlantGuardError, Result};
use crate::session::TokenStore;
use colored::Colorize;

// History listing
pub mod history;

/// Bearer token for commands that require a signed-in user
fn require_token(store: &TokenStore) -> Result<String> {
    store.token()?.ok_or_else(|| {
        PlantGuardError::Authentication("Not signed in. Run `plantguard login` first.".to_string())
            .into()
    })
}

/// Drop the stored token when the backend rejected it
///
/// Returns the error with a hint to sign in again.
fn forget_on_auth_error(store: &TokenStore, err: anyhow::Error) -> anyhow::Error {
    if !is_auth_error(&err) {
        return err;
    }
    match store.clear() {
        Ok(_) => tracing::info!("Cleared rejected session token"),
        Err(e) => tracing::warn!("Failed to clear session token: {}", e),
    }
    eprintln!(
        "{}",
        "Your session is no longer valid. Run `plantguard login` to sign in again.".yellow()
    );
    err
}

/// Serve command
pub mod serve {
    use crate::config::Config;
    use crate::error::Result;

    /// Run the backend until interrupted
    pub async fn run_serve(config: Config) -> Result<()> {
        tracing::info!(
            classifier = %config.classifier.classifier_type,
            "Starting PlantGuard backend"
        );
        crate::server::serve(config).await
    }
}

/// Predict command
///
/// The prediction is rendered first. Saving to history happens afterwards
/// as a separate task whose outcome is reported on stderr and never changes
/// the exit status.
pub mod predict {
    use crate::client::BackendClient;
    use crate::config::Config;
    use crate::error::{PlantGuardError, Result};
    use crate::history::{record_best_effort, HistoryEntryInput, SaveOutcome};
    use crate::prediction::{fields, normalize, PredictionViewModel};
    use crate::session::TokenStore;
    use anyhow::Context;
    use colored::Colorize;
    use serde_json::{json, Map, Value};
    use std::path::{Path, PathBuf};

    /// Guess an image MIME type from the file extension
    ///
    /// Non-image guesses are dropped so the backend sniffs the bytes instead.
    pub fn content_type_for(path: &Path) -> Option<&'static str> {
        mime_guess::from_path(path)
            .first_raw()
            .filter(|mime| mime.starts_with("image/"))
    }

    /// Upload an image, show the result, then save it to history
    ///
    /// # Arguments
    ///
    /// * `config` - Global configuration (consumed)
    /// * `image` - Path of the leaf photo
    /// * `no_save` - Skip the history save even when signed in
    /// * `json_output` - Print the normalized result as JSON
    pub async fn run_predict(config: Config, image: PathBuf, no_save: bool, json_output: bool) -> Result<()> {
        let bytes = tokio::fs::read(&image)
            .await
            .with_context(|| format!("Failed to read {}", image.display()))?;
        if bytes.is_empty() {
            return Err(PlantGuardError::Validation("no image provided".to_string()).into());
        }

        let file_name = image
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("upload")
            .to_string();

        let client = BackendClient::new(&config.client)?;
        let raw = client
            .predict(bytes, &file_name, content_type_for(&image))
            .await?;
        let view = normalize(&raw);

        if json_output {
            println!("{}", serde_json::to_string_pretty(&view)?);
        } else {
            render(&view);
        }

        if no_save {
            tracing::debug!("History save disabled by --no-save");
            return Ok(());
        }

        let store = TokenStore::new()?;
        let token = store.token().unwrap_or_else(|e| {
            tracing::warn!("Failed to read session token: {}", e);
            None
        });

        let treatment = raw
            .as_object()
            .and_then(fields::pick_treatment)
            .cloned();
        let mut metadata = Map::new();
        metadata.insert("source".to_string(), json!("cli"));
        metadata.insert("file_name".to_string(), Value::String(file_name));
        let input = HistoryEntryInput::from_view(&view, treatment, metadata);

        let recorder = client.history();
        let save =
            tokio::spawn(async move { record_best_effort(&recorder, &input, token.as_deref()).await });

        match save.await {
            Ok(outcome) => report_save_outcome(&outcome, &store),
            Err(e) => tracing::warn!("History save task failed: {}", e),
        }
        Ok(())
    }

    /// Print a prediction for humans
    pub fn render(view: &PredictionViewModel) {
        println!();
        println!("{} {}", "Prediction:".bold(), view.display_label.green().bold());
        println!("{} {}", "Confidence:".bold(), view.confidence_percent());

        if view.treatments.is_empty() {
            println!("{}", "No treatment advice available.".dimmed());
        } else {
            for treatment in &view.treatments {
                println!();
                println!("{}", treatment.title.cyan().bold());
                for line in treatment.steps.lines() {
                    println!("  {}", line);
                }
            }
        }
        println!();
    }

    /// Report the history save as a notification on stderr
    pub fn report_save_outcome(outcome: &SaveOutcome, store: &TokenStore) {
        match outcome {
            SaveOutcome::Skipped => eprintln!(
                "{}",
                "Not signed in: result not saved. Run `plantguard login` to keep a history."
                    .dimmed()
            ),
            SaveOutcome::Saved(_) => eprintln!("{}", "Saved to history.".green()),
            SaveOutcome::Unauthorized(message) => {
                if let Err(e) = store.clear() {
                    tracing::warn!("Failed to clear session token: {}", e);
                }
                eprintln!(
                    "{}",
                    format!(
                        "Not saved: {}. Run `plantguard login` to sign in again.",
                        message
                    )
                    .yellow()
                );
            }
            SaveOutcome::Failed(message) => {
                eprintln!("{}", format!("Could not save to history: {}", message).yellow())
            }
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_content_type_for_known_extensions() {
            assert_eq!(content_type_for(Path::new("leaf.JPG")), Some("image/jpeg"));
            assert_eq!(content_type_for(Path::new("a/b/leaf.png")), Some("image/png"));
            assert_eq!(content_type_for(Path::new("leaf.webp")), Some("image/webp"));
            assert_eq!(content_type_for(Path::new("leaf")), None);
        }

        #[test]
        fn test_content_type_for_skips_non_images() {
            assert_eq!(content_type_for(Path::new("leaf.txt")), None);
            assert_eq!(content_type_for(Path::new("notes.json")), None);
        }

        #[tokio::test]
        async fn test_predict_missing_file_fails() {
            let result = run_predict(
                Config::default(),
                PathBuf::from("/nonexistent/leaf.jpg"),
                true,
                false,
            )
            .await;
            assert!(result.is_err());
        }

        #[tokio::test]
        async fn test_predict_empty_file_is_validation_error() {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("empty.png");
            std::fs::write(&path, b"").unwrap();

            let err = run_predict(Config::default(), path, true, false)
                .await
                .unwrap_err();
            assert_eq!(
                crate::error::find_plantguard_error(&err).map(|e| e.status_code()),
                Some(400)
            );
        }
    }
}

/// Account commands
pub mod auth {
    use super::forget_on_auth_error;
    use crate::client::{AuthSession, BackendClient};
    use crate::config::Config;
    use crate::error::Result;
    use crate::session::TokenStore;
    use colored::Colorize;

    fn remember(store: &TokenStore, session: &AuthSession) -> Result<()> {
        store.save(&session.access_token, Some(&session.user.email))?;
        tracing::debug!(keyring = store.uses_keyring(), "Stored session");
        Ok(())
    }

    /// Create an account and sign in
    pub async fn signup(config: Config, email: String, password: String) -> Result<()> {
        let client = BackendClient::new(&config.client)?;
        let session = client.signup(&email, &password).await?;
        remember(&TokenStore::new()?, &session)?;
        println!(
            "{}",
            format!("Account created for {}. You are signed in.", session.user.email).green()
        );
        Ok(())
    }

    /// Sign in
    pub async fn login(config: Config, email: String, password: String) -> Result<()> {
        let client = BackendClient::new(&config.client)?;
        let session = client.login(&email, &password).await?;
        remember(&TokenStore::new()?, &session)?;
        println!("{}", format!("Signed in as {}.", session.user.email).green());
        Ok(())
    }

    /// Revoke the session on the backend and forget it locally
    pub async fn logout(config: Config) -> Result<()> {
        let store = TokenStore::new()?;
        let Some(token) = store.token()? else {
            println!("{}", "Not signed in.".yellow());
            return Ok(());
        };

        let client = BackendClient::new(&config.client)?;
        if let Err(e) = client.logout(&token).await {
            let e = forget_on_auth_error(&store, e);
            tracing::warn!("Server-side logout failed: {:#}", e);
        }
        store.clear()?;
        println!("{}", "Signed out.".green());
        Ok(())
    }
}

/// Profile commands
pub mod profile {
    use super::{forget_on_auth_error, require_token};
    use crate::client::BackendClient;
    use crate::config::Config;
    use crate::error::Result;
    use crate::session::TokenStore;
    use crate::storage::{ProfileUpdate, UserProfile};
    use colored::Colorize;

    fn print_profile(profile: &UserProfile) {
        let dash = || "-".to_string();
        println!("{} {}", "Email:   ".bold(), profile.email);
        println!("{} {}", "Name:    ".bold(), profile.name.clone().unwrap_or_else(dash));
        println!("{} {}", "Location:".bold(), profile.location.clone().unwrap_or_else(dash));
        println!("{} {}", "Bio:     ".bold(), profile.bio.clone().unwrap_or_else(dash));
        println!("{} {}", "Joined:  ".bold(), profile.created_at);
    }

    /// Show the signed-in user's profile
    pub async fn show(config: Config) -> Result<()> {
        let store = TokenStore::new()?;
        let token = require_token(&store)?;
        let client = BackendClient::new(&config.client)?;
        let profile = client
            .get_profile(&token)
            .await
            .map_err(|e| forget_on_auth_error(&store, e))?;
        print_profile(&profile);
        Ok(())
    }

    /// Update profile fields
    pub async fn update(config: Config, update: ProfileUpdate) -> Result<()> {
        if update.is_empty() {
            println!("{}", "Nothing to update.".yellow());
            return Ok(());
        }
        let store = TokenStore::new()?;
        let token = require_token(&store)?;
        let client = BackendClient::new(&config.client)?;
        let profile = client
            .update_profile(&token, &update)
            .await
            .map_err(|e| forget_on_auth_error(&store, e))?;
        println!("{}", "Profile updated.".green());
        print_profile(&profile);
        Ok(())
    }
}
