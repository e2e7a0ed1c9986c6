//! Bearer token persistence for the CLI
//!
//! The token issued by `signup`/`login` is kept in the operating system's
//! credential store (Keychain on macOS, Secret Service on Linux, Windows
//! Credential Manager on Windows) as a small JSON document.
//!
//! Hosts without a usable credential store (headless Linux without a
//! Secret Service daemon, containers) fall back to a `0600` JSON file in the
//! data directory. `PLANTGUARD_TOKEN` takes precedence over both, which is
//! handy for scripts and CI.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{PlantGuardError, Result};

/// Environment variable overriding the stored token
pub const TOKEN_ENV_VAR: &str = "PLANTGUARD_TOKEN";

const KEYRING_SERVICE: &str = "plantguard";
const KEYRING_USER: &str = "session";

/// A saved sign-in
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedSession {
    /// Bearer token
    pub access_token: String,
    /// Account the token belongs to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// When the token was stored
    pub saved_at: DateTime<Utc>,
}

/// Token store backed by the OS keyring
///
/// # Examples
///
/// ```no_run
/// use plantguard::session::TokenStore;
///
/// # fn example() -> plantguard::error::Result<()> {
/// let store = TokenStore::new()?;
/// store.save("access-token", Some("grower@example.com"))?;
/// assert_eq!(store.token()?.as_deref(), Some("access-token"));
/// store.clear()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct TokenStore {
    fallback: PathBuf,
    use_keyring: bool,
}

impl TokenStore {
    /// Keyring store, with the data directory as fallback
    pub fn new() -> Result<Self> {
        Ok(Self {
            fallback: crate::storage::data_dir()?.join("session.json"),
            use_keyring: true,
        })
    }

    /// File-only store at an explicit path
    ///
    /// Skips the keyring entirely; used by tests and hosts without a
    /// credential store.
    pub fn with_path<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            fallback: path.into(),
            use_keyring: false,
        }
    }

    /// Location of the fallback session file
    pub fn path(&self) -> &Path {
        &self.fallback
    }

    /// Whether the OS keyring is consulted
    pub fn uses_keyring(&self) -> bool {
        self.use_keyring
    }

    /// Current bearer token, if signed in
    ///
    /// An empty token counts as no token.
    pub fn token(&self) -> Result<Option<String>> {
        if let Ok(token) = std::env::var(TOKEN_ENV_VAR) {
            let token = token.trim().to_string();
            if !token.is_empty() {
                tracing::debug!("Using token from {}", TOKEN_ENV_VAR);
                return Ok(Some(token));
            }
        }
        Ok(self
            .load()?
            .map(|s| s.access_token)
            .filter(|t| !t.trim().is_empty()))
    }

    /// Read the saved session
    ///
    /// The keyring wins when it holds an entry; otherwise the fallback file
    /// is read.
    pub fn load(&self) -> Result<Option<SavedSession>> {
        if let Some(entry) = self.entry()? {
            match entry.get_password() {
                Ok(json) => return Ok(parse_session(&json, "keyring entry")),
                Err(keyring::Error::NoEntry) => {}
                Err(e) if keyring_unavailable(&e) => {
                    tracing::debug!("Keyring unavailable, reading session file: {}", e);
                }
                Err(e) => return Err(PlantGuardError::Keyring(e).into()),
            }
        }
        self.load_file()
    }

    /// Persist a token
    pub fn save(&self, access_token: &str, email: Option<&str>) -> Result<()> {
        let session = SavedSession {
            access_token: access_token.to_string(),
            email: email.map(str::to_string),
            saved_at: Utc::now(),
        };
        let json = serde_json::to_string(&session)?;

        if let Some(entry) = self.entry()? {
            match entry.set_password(&json) {
                Ok(()) => {
                    tracing::debug!("Saved session to the OS keyring");
                    return Ok(());
                }
                Err(e) if keyring_unavailable(&e) => {
                    tracing::warn!(
                        "Keyring unavailable, saving session to {}: {}",
                        self.fallback.display(),
                        e
                    );
                }
                Err(e) => return Err(PlantGuardError::Keyring(e).into()),
            }
        }
        self.save_file(&json)
    }

    /// Forget the saved token; returns `true` if one was removed
    pub fn clear(&self) -> Result<bool> {
        let mut removed = false;
        if let Some(entry) = self.entry()? {
            match entry.delete_password() {
                Ok(()) => removed = true,
                Err(keyring::Error::NoEntry) => {}
                Err(e) if keyring_unavailable(&e) => {
                    tracing::debug!("Keyring unavailable, clearing session file only: {}", e);
                }
                Err(e) => return Err(PlantGuardError::Keyring(e).into()),
            }
        }
        match std::fs::remove_file(&self.fallback) {
            Ok(()) => removed = true,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(PlantGuardError::Io(e).into()),
        }
        Ok(removed)
    }

    fn entry(&self) -> Result<Option<keyring::Entry>> {
        if !self.use_keyring {
            return Ok(None);
        }
        match keyring::Entry::new(KEYRING_SERVICE, KEYRING_USER) {
            Ok(entry) => Ok(Some(entry)),
            Err(e) if keyring_unavailable(&e) => {
                tracing::debug!("Keyring unavailable: {}", e);
                Ok(None)
            }
            Err(e) => Err(PlantGuardError::Keyring(e).into()),
        }
    }

    fn load_file(&self) -> Result<Option<SavedSession>> {
        if !self.fallback.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(&self.fallback)?;
        Ok(parse_session(&contents, &self.fallback.display().to_string()))
    }

    fn save_file(&self, json: &str) -> Result<()> {
        if let Some(parent) = self.fallback.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.fallback, json)?;
        restrict_permissions(&self.fallback)?;
        tracing::debug!("Saved session to {}", self.fallback.display());
        Ok(())
    }
}

/// Errors meaning "no credential store here" rather than a real failure
fn keyring_unavailable(err: &keyring::Error) -> bool {
    matches!(
        err,
        keyring::Error::PlatformFailure(_) | keyring::Error::NoStorageAccess(_)
    )
}

fn parse_session(json: &str, source: &str) -> Option<SavedSession> {
    match serde_json::from_str(json) {
        Ok(session) => Some(session),
        Err(e) => {
            tracing::warn!("Ignoring unreadable session in {}: {}", source, e);
            None
        }
    }
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
    Ok(())
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> Result<()> {
    Ok(())
}
