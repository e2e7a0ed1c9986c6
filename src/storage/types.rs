use serde::{Deserialize, Serialize};

/// Public view of an account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    /// Store-assigned identifier
    pub id: i64,
    /// Login email, lowercased
    pub email: String,
    /// Display name
    pub name: Option<String>,
    /// Free-form location
    pub location: Option<String>,
    /// Short biography
    pub bio: Option<String>,
    /// Account creation time (RFC 3339)
    pub created_at: String,
}

/// An account together with its password hash
///
/// Never serialized: the hash stays inside the server.
#[derive(Debug, Clone)]
pub struct StoredUser {
    /// Public fields
    pub profile: UserProfile,
    /// Encoded password hash, see [`crate::auth::hash_password`]
    pub password_hash: String,
}

/// Partial profile update; `None` leaves a field unchanged
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileUpdate {
    /// New display name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// New location
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    /// New biography
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
}

impl ProfileUpdate {
    /// Returns `true` when no field would change
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.location.is_none() && self.bio.is_none()
    }
}
