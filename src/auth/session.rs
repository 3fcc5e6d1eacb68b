//! Session issuance, resolution, and revocation.
//!
//! Flow Overview: generate a raw token, store only its hash (one row per
//! user, upserted), and hand the raw value back exactly once so the caller
//! can set the cookie. Later requests present the raw token, which is hashed
//! again for lookup.

use secrecy::{ExposeSecret, SecretString};
use std::sync::Arc;
use tracing::{debug, instrument};

use super::{
    error::AuthResult,
    token::{generate, hash},
};
use crate::store::{CredentialStore, SessionId, User, UserId};

/// A freshly minted session. The raw token exists only in this value.
#[derive(Debug)]
pub struct IssuedSession {
    pub id: SessionId,
    pub user_id: UserId,
    token: SecretString,
}

impl IssuedSession {
    #[must_use]
    pub fn token(&self) -> &str {
        self.token.expose_secret()
    }
}

#[derive(Clone)]
pub struct SessionManager {
    store: Arc<dyn CredentialStore>,
    token_bytes: usize,
}

impl SessionManager {
    #[must_use]
    pub fn new(store: Arc<dyn CredentialStore>, token_bytes: usize) -> Self {
        Self { store, token_bytes }
    }

    /// Mint a session for `user_id`, replacing any session the user already had.
    ///
    /// # Errors
    /// `RandomSource` if token generation fails, `Persistence` on store failure.
    #[instrument(skip(self))]
    pub async fn create(&self, user_id: UserId) -> AuthResult<IssuedSession> {
        let token = generate(self.token_bytes)?;
        let token_hash = hash(token.expose_secret());
        let id = self.store.upsert_session(user_id, &token_hash).await?;
        debug!(session_id = id, "session issued");
        Ok(IssuedSession { id, user_id, token })
    }

    /// Resolve a raw token to its user. A miss is `Ok(None)`, not an error.
    ///
    /// # Errors
    /// `Persistence` on store failure.
    #[instrument(skip_all)]
    pub async fn resolve(&self, token: &str) -> AuthResult<Option<User>> {
        self.store
            .find_user_by_session_token_hash(&hash(token))
            .await
    }

    /// Delete the session for a raw token. Unknown tokens are a no-op.
    ///
    /// # Errors
    /// `Persistence` on store failure.
    #[instrument(skip_all)]
    pub async fn revoke(&self, token: &str) -> AuthResult<()> {
        self.store.delete_session_by_token_hash(&hash(token)).await
    }
}
