//! Random token generation and the one-way hash used for storage and lookup.
//!
//! Raw tokens are handed to the client and never persisted; only the hash
//! touches the database.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use rand::{rngs::OsRng, RngCore};
use secrecy::SecretString;
use sha2::{Digest, Sha256};
use std::fmt;

use super::error::{AuthError, AuthResult};

/// Callers asking for fewer bytes get this many instead.
pub const MIN_BYTES_PER_TOKEN: usize = 32;

/// SHA-256 digest of a raw token, URL-safe base64 encoded.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct TokenHash(String);

impl TokenHash {
    /// Wrap a hash read back from the store.
    #[must_use]
    pub fn from_stored(value: String) -> Self {
        Self(value)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for TokenHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("TokenHash([REDACTED])")
    }
}

/// Generate `byte_length` random bytes (at least [`MIN_BYTES_PER_TOKEN`]) as a URL-safe string.
///
/// # Errors
/// Returns `AuthError::RandomSource` if the OS random source fails.
pub fn generate(byte_length: usize) -> AuthResult<SecretString> {
    let mut bytes = vec![0u8; byte_length.max(MIN_BYTES_PER_TOKEN)];
    OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(AuthError::RandomSource)?;
    Ok(SecretString::from(URL_SAFE_NO_PAD.encode(bytes)))
}

/// Hash a raw token. No salt: the token already carries full entropy.
#[must_use]
pub fn hash(token: &str) -> TokenHash {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    TokenHash(URL_SAFE_NO_PAD.encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use std::collections::HashSet;

    fn decoded_len(byte_length: usize) -> Option<usize> {
        generate(byte_length)
            .ok()
            .and_then(|token| URL_SAFE_NO_PAD.decode(token.expose_secret()).ok())
            .map(|bytes| bytes.len())
    }

    #[test]
    fn generate_honors_requested_length_above_floor() {
        for length in [32, 33, 48, 64, 100] {
            assert_eq!(decoded_len(length), Some(length));
        }
    }

    #[test]
    fn generate_raises_short_requests_to_floor() {
        for length in [0, 1, 16, 31] {
            assert_eq!(decoded_len(length), Some(MIN_BYTES_PER_TOKEN));
        }
    }

    #[test]
    fn generate_is_url_safe() {
        let token = generate(64).ok();
        let token = token.as_ref().map(|t| t.expose_secret().to_string());
        assert!(token.is_some_and(|t| t
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')));
    }

    #[test]
    fn hash_is_stable() {
        assert_eq!(hash("token"), hash("token"));
        assert_ne!(hash("token"), hash("other"));
    }

    #[test]
    fn hash_is_fixed_size() {
        // 32 digest bytes without padding.
        assert_eq!(hash("").as_str().len(), 43);
        assert_eq!(hash("a much longer raw token value").as_str().len(), 43);
    }

    #[test]
    fn hashes_of_random_tokens_do_not_collide() {
        let mut seen = HashSet::new();
        for _ in 0..1000 {
            let token = generate(MIN_BYTES_PER_TOKEN).ok();
            let digest = token.map(|t| hash(t.expose_secret()));
            assert!(digest.is_some_and(|d| seen.insert(d)));
        }
    }

    #[test]
    fn debug_output_redacts_hash() {
        let digest = hash("secret");
        assert!(!format!("{digest:?}").contains(digest.as_str()));
    }
}
