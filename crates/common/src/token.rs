//! Anonymous voter tokens.
//!
//! A voter is identified only by a random per-browser token. The raw token
//! lives in a cookie; everything persisted is the salted SHA-256 digest.

use rand::RngCore;
use sha2::{Digest, Sha256};

use crate::{AppError, AppResult};

/// Placeholder secret shipped in sample configuration files.
const INSECURE_PLACEHOLDER: &str = "put your unique phrase here";

/// Number of random bytes in a freshly issued token.
const TOKEN_BYTES: usize = 16;

/// Generate a new raw voter token (32 lowercase hex characters).
#[must_use]
pub fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Compare two secrets without short-circuiting on the first differing byte.
///
/// Both sides are digested first, so inputs of any length compare in equal time.
#[must_use]
pub fn secrets_match(presented: &str, expected: &str) -> bool {
    let a = Sha256::digest(presented.as_bytes());
    let b = Sha256::digest(expected.as_bytes());
    a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// Hashes raw voter tokens with the server secret.
#[derive(Clone)]
pub struct TokenHasher {
    secret: String,
}

impl std::fmt::Debug for TokenHasher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenHasher").finish_non_exhaustive()
    }
}

impl TokenHasher {
    /// Create a hasher, rejecting an empty or placeholder secret.
    ///
    /// Votes must never be stored with an unsalted digest, so a missing
    /// secret is a configuration error rather than a degraded mode.
    pub fn new(secret: &str) -> AppResult<Self> {
        let secret = secret.trim();
        if secret.is_empty() || secret == INSECURE_PLACEHOLDER {
            return Err(AppError::Config(
                "voting.token_secret must be set to a unique value".to_string(),
            ));
        }
        Ok(Self {
            secret: secret.to_string(),
        })
    }

    /// Lowercase hex SHA-256 of `raw + secret`.
    #[must_use]
    pub fn hash(&self, raw: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(raw.as_bytes());
        hasher.update(self.secret.as_bytes());
        hex::encode(hasher.finalize())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_token_shape() {
        let token = generate_token();
        assert_eq!(token.len(), 32);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        assert_ne!(token, generate_token());
    }

    #[test]
    fn test_rejects_missing_secret() {
        assert!(matches!(TokenHasher::new(""), Err(AppError::Config(_))));
        assert!(matches!(TokenHasher::new("   "), Err(AppError::Config(_))));
        assert!(matches!(
            TokenHasher::new("put your unique phrase here"),
            Err(AppError::Config(_))
        ));
    }

    #[test]
    fn test_hash_is_salted_sha256() {
        let hasher = TokenHasher::new("secret").unwrap();
        // sha256("abcsecret")
        let expected = hex::encode(Sha256::digest(b"abcsecret"));
        assert_eq!(hasher.hash("abc"), expected);
        assert_eq!(hasher.hash("abc").len(), 64);

        let other = TokenHasher::new("other").unwrap();
        assert_ne!(hasher.hash("abc"), other.hash("abc"));
    }

    #[test]
    fn test_secrets_match() {
        assert!(secrets_match("admin-token", "admin-token"));
        assert!(!secrets_match("admin-tokem", "admin-token"));
        assert!(!secrets_match("admin", "admin-token"));
        assert!(!secrets_match("", "admin-token"));
    }
}
