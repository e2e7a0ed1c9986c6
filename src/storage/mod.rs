//! SQLite persistence for accounts, sessions and prediction history
//!
//! A connection is opened per operation; callers on the async runtime run
//! these methods on the blocking pool.

use crate::config::StorageConfig;
use crate::error::{PlantGuardError, Result};
use anyhow::Context;
use directories::ProjectDirs;
use rusqlite::Connection;
use std::path::{Path, PathBuf};

pub mod history;
pub mod types;
pub mod users;

pub use types::{ProfileUpdate, StoredUser, UserProfile};

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS users (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        email TEXT NOT NULL UNIQUE,
        password_hash TEXT NOT NULL,
        name TEXT,
        location TEXT,
        bio TEXT,
        created_at TEXT NOT NULL
    );
    CREATE TABLE IF NOT EXISTS sessions (
        token_hash TEXT PRIMARY KEY,
        user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        created_at TEXT NOT NULL,
        expires_at TEXT NOT NULL
    );
    CREATE TABLE IF NOT EXISTS prediction_history (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id INTEGER REFERENCES users(id) ON DELETE CASCADE,
        label TEXT,
        confidence REAL NOT NULL DEFAULT 0,
        treatment TEXT,
        metadata TEXT,
        created_at TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_history_user_created
        ON prediction_history (user_id, created_at);
";

/// Platform data directory for PlantGuard state
pub fn data_dir() -> Result<PathBuf> {
    let proj_dirs = ProjectDirs::from("org", "plantguard", "plantguard")
        .ok_or_else(|| PlantGuardError::Store("Could not determine data directory".into()))?;
    Ok(proj_dirs.data_dir().to_path_buf())
}

/// Storage backend for users, sessions and prediction history
#[derive(Debug, Clone)]
pub struct SqliteStorage {
    db_path: PathBuf,
}

impl SqliteStorage {
    /// Open the configured database, creating it when missing
    ///
    /// Without `database_path` the file lives in the user's data directory.
    pub fn new(config: &StorageConfig) -> Result<Self> {
        match &config.database_path {
            Some(path) => Self::new_with_path(path.clone()),
            None => Self::new_with_path(data_dir()?.join("plantguard.db")),
        }
    }

    /// Open a database at the specified path
    ///
    /// # Examples
    ///
    /// ```
    /// use plantguard::storage::SqliteStorage;
    ///
    /// let dir = tempfile::tempdir().unwrap();
    /// let storage = SqliteStorage::new_with_path(dir.path().join("plantguard.db")).unwrap();
    /// assert!(storage.db_path().exists());
    /// ```
    pub fn new_with_path<P: Into<PathBuf>>(db_path: P) -> Result<Self> {
        let db_path = db_path.into();

        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .context("Failed to create parent directory for database")
                .map_err(store_error)?;
        }

        let storage = Self { db_path };
        storage.init()?;
        tracing::debug!("Opened database at {}", storage.db_path.display());
        Ok(storage)
    }

    /// Database file location
    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    fn init(&self) -> Result<()> {
        let conn = self.connect()?;
        conn.execute_batch(SCHEMA)
            .context("Failed to create tables")
            .map_err(store_error)?;
        Ok(())
    }

    pub(crate) fn connect(&self) -> Result<Connection> {
        let conn = Connection::open(&self.db_path)
            .context("Failed to open database")
            .map_err(store_error)?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")
            .context("Failed to enable foreign keys")
            .map_err(store_error)?;
        Ok(conn)
    }
}

pub(crate) fn store_error(e: anyhow::Error) -> PlantGuardError {
    PlantGuardError::Store(format!("{:#}", e))
}
