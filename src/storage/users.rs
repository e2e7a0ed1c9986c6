use super::types::{ProfileUpdate, StoredUser, UserProfile};
use super::{store_error, SqliteStorage};
use crate::error::{PlantGuardError, Result};
use anyhow::Context;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, ErrorCode, OptionalExtension, Row};

const USER_COLUMNS: &str = "id, email, name, location, bio, created_at, password_hash";

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<StoredUser> {
    Ok(StoredUser {
        profile: UserProfile {
            id: row.get(0)?,
            email: row.get(1)?,
            name: row.get(2)?,
            location: row.get(3)?,
            bio: row.get(4)?,
            created_at: row.get(5)?,
        },
        password_hash: row.get(6)?,
    })
}

/// Emails are matched case-insensitively
fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

impl SqliteStorage {
    /// Create an account
    ///
    /// # Errors
    ///
    /// Returns `Validation("User already exists")` when the email is taken
    pub fn create_user(&self, email: &str, password_hash: &str) -> Result<UserProfile> {
        let conn = self.connect()?;
        let email = normalize_email(email);
        let created_at = timestamp(Utc::now());

        let inserted = conn.execute(
            "INSERT INTO users (email, password_hash, created_at) VALUES (?, ?, ?)",
            params![email, password_hash, created_at],
        );

        match inserted {
            Ok(_) => {}
            Err(rusqlite::Error::SqliteFailure(err, _)) if err.code == ErrorCode::ConstraintViolation => {
                return Err(PlantGuardError::Validation("User already exists".to_string()).into());
            }
            Err(e) => {
                return Err(store_error(anyhow::Error::new(e).context("Failed to insert user")).into());
            }
        }

        let id = conn.last_insert_rowid();
        tracing::info!(user_id = id, "Created user");

        Ok(UserProfile {
            id,
            email,
            name: None,
            location: None,
            bio: None,
            created_at,
        })
    }

    /// Look up an account by email, including its password hash
    pub fn find_user_by_email(&self, email: &str) -> Result<Option<StoredUser>> {
        let conn = self.connect()?;
        conn.query_row(
            &format!("SELECT {} FROM users WHERE email = ?", USER_COLUMNS),
            params![normalize_email(email)],
            user_from_row,
        )
        .optional()
        .context("Failed to query user")
        .map_err(|e| store_error(e).into())
    }

    /// Look up an account by id
    pub fn get_user(&self, user_id: i64) -> Result<Option<UserProfile>> {
        let conn = self.connect()?;
        let user = conn
            .query_row(
                &format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS),
                params![user_id],
                user_from_row,
            )
            .optional()
            .context("Failed to query user")
            .map_err(store_error)?;
        Ok(user.map(|u| u.profile))
    }

    /// Apply a partial profile update
    ///
    /// Returns the updated profile, or `None` if the user does not exist.
    pub fn update_profile(&self, user_id: i64, update: &ProfileUpdate) -> Result<Option<UserProfile>> {
        let conn = self.connect()?;
        let changed = conn
            .execute(
                "UPDATE users SET
                    name = COALESCE(?, name),
                    location = COALESCE(?, location),
                    bio = COALESCE(?, bio)
                 WHERE id = ?",
                params![update.name, update.location, update.bio, user_id],
            )
            .context("Failed to update profile")
            .map_err(store_error)?;

        if changed == 0 {
            return Ok(None);
        }
        tracing::debug!(user_id, "Updated profile");
        self.get_user(user_id)
    }

    /// Record a session token hash for a user
    ///
    /// Expired sessions are purged on the way in.
    pub fn create_session(&self, user_id: i64, token_hash: &str, expires_at: DateTime<Utc>) -> Result<()> {
        let conn = self.connect()?;
        let now = Utc::now();

        let purged = conn
            .execute(
                "DELETE FROM sessions WHERE expires_at <= ?",
                params![timestamp(now)],
            )
            .context("Failed to purge expired sessions")
            .map_err(store_error)?;
        if purged > 0 {
            tracing::debug!(purged, "Purged expired sessions");
        }

        conn.execute(
            "INSERT INTO sessions (token_hash, user_id, created_at, expires_at) VALUES (?, ?, ?, ?)",
            params![token_hash, user_id, timestamp(now), timestamp(expires_at)],
        )
        .context("Failed to insert session")
        .map_err(store_error)?;
        Ok(())
    }

    /// Resolve a token hash to its user id; expired sessions resolve to `None`
    pub fn resolve_session(&self, token_hash: &str) -> Result<Option<i64>> {
        let conn = self.connect()?;
        let session: Option<(i64, String)> = conn
            .query_row(
                "SELECT user_id, expires_at FROM sessions WHERE token_hash = ?",
                params![token_hash],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()
            .context("Failed to query session")
            .map_err(store_error)?;

        let Some((user_id, expires_at)) = session else {
            return Ok(None);
        };

        let expired = DateTime::parse_from_rfc3339(&expires_at)
            .map(|at| at.with_timezone(&Utc) <= Utc::now())
            .unwrap_or(true);
        if expired {
            tracing::debug!(user_id, "Session expired");
            return Ok(None);
        }
        Ok(Some(user_id))
    }

    /// Remove a session; returns `true` if one existed
    pub fn delete_session(&self, token_hash: &str) -> Result<bool> {
        let conn = self.connect()?;
        let deleted = conn
            .execute("DELETE FROM sessions WHERE token_hash = ?", params![token_hash])
            .context("Failed to delete session")
            .map_err(store_error)?;
        Ok(deleted > 0)
    }
}
