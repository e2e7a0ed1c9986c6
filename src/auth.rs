//! Credentials and bearer sessions
//!
//! Passwords are stored as salted, iterated SHA-256 digests encoded as
//! `sha256$<rounds>$<salt>$<digest>` (salt and digest base64url without
//! padding). The iteration count follows the sha256_crypt default of
//! 535000 rounds and is configurable through `auth.password_rounds`; stored
//! hashes carry their own count, so changing it never locks anyone out.
//! Session tokens are 32 random bytes in base64url; only their
//! SHA-256 is ever persisted, so a leaked database cannot be replayed.

use base64::Engine as _;
use chrono::{DateTime, Duration, Utc};
use sha2::{Digest, Sha256};

const SCHEME: &str = "sha256";
/// Default iteration count for new password hashes
pub const DEFAULT_PASSWORD_ROUNDS: u32 = 535_000;
/// Largest iteration count accepted when hashing or verifying
pub const MAX_PASSWORD_ROUNDS: u32 = 1_000_000;
const SALT_BYTES: usize = 16;
const TOKEN_BYTES: usize = 32;
const MAX_TOKEN_TTL_HOURS: u64 = 24 * 365;

fn random_bytes<const N: usize>() -> [u8; N] {
    use rand::RngCore as _;

    let mut bytes = [0u8; N];
    rand::rng().fill_bytes(&mut bytes);
    bytes
}

fn encode(bytes: &[u8]) -> String {
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

fn iterate_digest(password: &str, salt: &str, rounds: u32) -> Vec<u8> {
    let mut digest = Sha256::new()
        .chain_update(salt.as_bytes())
        .chain_update(password.as_bytes())
        .finalize();
    for _ in 1..rounds {
        digest = Sha256::new()
            .chain_update(digest)
            .chain_update(salt.as_bytes())
            .chain_update(password.as_bytes())
            .finalize();
    }
    digest.to_vec()
}

/// Hash a password for storage with the default iteration count
pub fn hash_password(password: &str) -> String {
    hash_password_with_rounds(password, DEFAULT_PASSWORD_ROUNDS)
}

/// Hash a password with an explicit iteration count
///
/// The count is clamped to `1..=MAX_PASSWORD_ROUNDS`.
///
/// # Examples
///
/// ```
/// use plantguard::auth::{hash_password_with_rounds, verify_password};
///
/// let encoded = hash_password_with_rounds("correct horse", 1000);
/// assert!(encoded.starts_with("sha256$1000$"));
/// assert!(verify_password("correct horse", &encoded));
/// assert!(!verify_password("battery staple", &encoded));
/// ```
pub fn hash_password_with_rounds(password: &str, rounds: u32) -> String {
    let rounds = rounds.clamp(1, MAX_PASSWORD_ROUNDS);
    let salt = encode(&random_bytes::<SALT_BYTES>());
    let digest = encode(&iterate_digest(password, &salt, rounds));
    format!("{}${}${}${}", SCHEME, rounds, salt, digest)
}

/// Check a password against an encoded hash
///
/// Malformed hashes never verify.
pub fn verify_password(password: &str, encoded: &str) -> bool {
    let parts: Vec<&str> = encoded.split('$').collect();
    let [scheme, rounds, salt, expected] = parts.as_slice() else {
        return false;
    };
    if *scheme != SCHEME {
        return false;
    }
    let Some(rounds) = rounds
        .parse::<u32>()
        .ok()
        .filter(|r| (1..=MAX_PASSWORD_ROUNDS).contains(r))
    else {
        return false;
    };

    let actual = encode(&iterate_digest(password, salt, rounds));
    constant_time_eq(actual.as_bytes(), expected.as_bytes())
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// A freshly issued bearer token
#[derive(Debug, Clone)]
pub struct IssuedToken {
    /// Token handed to the client, never stored
    pub token: String,
    /// Hash persisted in the sessions table
    pub token_hash: String,
    /// Expiry instant
    pub expires_at: DateTime<Utc>,
}

/// Issue a new session token valid for `ttl_hours` (clamped to one year)
pub fn issue_token(ttl_hours: u64) -> IssuedToken {
    let token = encode(&random_bytes::<TOKEN_BYTES>());
    let hours = ttl_hours.clamp(1, MAX_TOKEN_TTL_HOURS) as i64;
    IssuedToken {
        token_hash: hash_token(&token),
        expires_at: Utc::now() + Duration::hours(hours),
        token,
    }
}

/// Hash a bearer token for lookup
pub fn hash_token(token: &str) -> String {
    format!("{:x}", Sha256::digest(token.as_bytes()))
}

/// Extract the token from an `Authorization: Bearer <token>` header value
///
/// # Examples
///
/// ```
/// use plantguard::auth::bearer_token;
///
/// assert_eq!(bearer_token("Bearer abc"), Some("abc"));
/// assert_eq!(bearer_token("bearer  abc "), Some("abc"));
/// assert_eq!(bearer_token("Basic abc"), None);
/// assert_eq!(bearer_token("Bearer "), None);
/// ```
pub fn bearer_token(header: &str) -> Option<&str> {
    let (scheme, token) = header.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_password_is_salted() {
        let a = hash_password_with_rounds("hunter2", 100);
        let b = hash_password_with_rounds("hunter2", 100);
        assert_ne!(a, b);
        assert!(verify_password("hunter2", &a));
        assert!(verify_password("hunter2", &b));
    }

    #[test]
    fn test_default_rounds_match_sha256_crypt() {
        let encoded = hash_password("hunter2");
        assert!(encoded.starts_with("sha256$535000$"));
        assert!(verify_password("hunter2", &encoded));
    }

    #[test]
    fn test_rounds_are_clamped() {
        let encoded = hash_password_with_rounds("pw", 0);
        assert!(encoded.starts_with("sha256$1$"));
        assert!(verify_password("pw", &encoded));
    }

    #[test]
    fn test_verify_rejects_malformed_hashes() {
        assert!(!verify_password("pw", ""));
        assert!(!verify_password("pw", "sha256$abc$salt$digest"));
        assert!(!verify_password("pw", "sha256$0$salt$digest"));
        assert!(!verify_password("pw", "md5$5000$salt$digest"));
        assert!(!verify_password("pw", "sha256$5000$salt"));
    }

    #[test]
    fn test_verify_honors_stored_rounds() {
        let salt = "fixedsalt";
        let digest = encode(&iterate_digest("pw", salt, 3));
        let encoded = format!("sha256$3${}${}", salt, digest);
        assert!(verify_password("pw", &encoded));
        assert!(!verify_password("pw2", &encoded));
    }

    #[test]
    fn test_issue_token_hashes_and_expires() {
        let issued = issue_token(24);
        assert_eq!(issued.token.len(), 43);
        assert_eq!(issued.token_hash, hash_token(&issued.token));
        assert_ne!(issued.token_hash, issued.token);
        let ttl = issued.expires_at - Utc::now();
        assert!(ttl > Duration::hours(23) && ttl <= Duration::hours(24));
    }

    #[test]
    fn test_issue_token_clamps_ttl() {
        let issued = issue_token(0);
        assert!(issued.expires_at > Utc::now());
        let issued = issue_token(u64::MAX);
        assert!(issued.expires_at <= Utc::now() + Duration::hours(MAX_TOKEN_TTL_HOURS as i64));
    }

    #[test]
    fn test_hash_token_is_stable_hex() {
        let hash = hash_token("abc");
        assert_eq!(
            hash,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
