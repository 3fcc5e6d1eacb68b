//! Password-reset tickets.
//!
//! Flow Overview:
//! 1) `issue` looks up the user by normalized email and upserts a ticket
//!    (one per user) holding the token hash and expiry.
//! 2) `check_valid` reads the expiry only, so a form can be shown for live links.
//! 3) `consume` loads ticket and user together, then claims the ticket with a
//!    conditional delete. Only the caller whose delete removed the row wins, so
//!    concurrent attempts with one token yield a single success.
//! 4) `complete` consumes, stores the new password, and mints a fresh session.

use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use std::sync::Arc;
use tracing::{debug, instrument};

use super::{
    clock::Clock,
    config::AuthConfig,
    error::{AuthError, AuthResult},
    session::{IssuedSession, SessionManager},
    token::{generate, hash},
    users::{hash_password, normalize_email, validate_password},
};
use crate::store::{CredentialStore, ResetId, User, UserId};

/// A freshly issued ticket; the raw token is only available here.
#[derive(Debug)]
pub struct ResetTicket {
    pub id: ResetId,
    pub user_id: UserId,
    pub expires_at: DateTime<Utc>,
    token: SecretString,
}

impl ResetTicket {
    #[must_use]
    pub fn token(&self) -> &str {
        self.token.expose_secret()
    }
}

#[derive(Clone)]
pub struct PasswordResetManager {
    store: Arc<dyn CredentialStore>,
    clock: Arc<dyn Clock>,
    config: AuthConfig,
}

impl PasswordResetManager {
    #[must_use]
    pub fn new(store: Arc<dyn CredentialStore>, clock: Arc<dyn Clock>, config: AuthConfig) -> Self {
        Self {
            store,
            clock,
            config,
        }
    }

    /// Issue a ticket for `email`, superseding any outstanding one.
    ///
    /// # Errors
    /// `UserNotFound` if no user has that email, `RandomSource` or `Persistence` otherwise.
    #[instrument(skip_all)]
    pub async fn issue(&self, email: &str) -> AuthResult<ResetTicket> {
        let email = normalize_email(email);
        let user_id = self
            .store
            .find_user_id_by_email(&email)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        let token = generate(self.config.reset_token_bytes())?;
        let expires_at = self.clock.now() + self.config.reset_ttl();
        let id = self
            .store
            .upsert_password_reset(user_id, &hash(token.expose_secret()), expires_at)
            .await?;
        debug!(reset_id = id, user_id, "password reset issued");

        Ok(ResetTicket {
            id,
            user_id,
            expires_at,
            token,
        })
    }

    /// Check that a token refers to a live ticket without consuming it.
    ///
    /// # Errors
    /// `NotFound` for unknown tokens, `Expired` past the expiry, `Persistence` on store failure.
    #[instrument(skip_all)]
    pub async fn check_valid(&self, token: &str) -> AuthResult<()> {
        let expires_at = self
            .store
            .find_reset_expiry_by_token_hash(&hash(token))
            .await?
            .ok_or(AuthError::NotFound)?;
        if self.clock.now() > expires_at {
            return Err(AuthError::Expired);
        }
        Ok(())
    }

    /// Consume a ticket and return its user. The ticket is deleted on success
    /// and when it is found expired.
    ///
    /// # Errors
    /// `NotFound` for unknown or already consumed tokens, `Expired` past the expiry.
    #[instrument(skip_all)]
    pub async fn consume(&self, token: &str) -> AuthResult<User> {
        let token_hash = hash(token);
        let (reset, user) = self
            .store
            .find_reset_and_user_by_token_hash(&token_hash)
            .await?
            .ok_or(AuthError::NotFound)?;

        if !self
            .store
            .delete_password_reset(reset.id, &token_hash)
            .await?
        {
            debug!(reset_id = reset.id, "password reset already claimed");
            return Err(AuthError::NotFound);
        }

        if self.clock.now() > reset.expires_at {
            debug!(reset_id = reset.id, "expired password reset discarded");
            return Err(AuthError::Expired);
        }

        debug!(reset_id = reset.id, user_id = user.id, "password reset consumed");
        Ok(user)
    }

    /// Consume a ticket, set the new password, and sign the user in. Returns the
    /// user alongside the new session.
    ///
    /// The password is validated before the ticket is touched so a rejected
    /// password does not burn the link.
    ///
    /// # Errors
    /// Everything `consume` returns, plus `InvalidInput` and `PasswordHash`.
    #[instrument(skip_all)]
    pub async fn complete(
        &self,
        token: &str,
        password: &str,
        sessions: &SessionManager,
    ) -> AuthResult<(User, IssuedSession)> {
        validate_password(password)?;
        let mut user = self.consume(token).await?;
        let password_hash = hash_password(password)?;
        self.store
            .update_user_password_hash(user.id, &password_hash)
            .await?;
        user.password_hash = password_hash;
        let session = sessions.create(user.id).await?;
        Ok((user, session))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::clock::FixedClock;
    use crate::auth::users::verify_password;
    use crate::auth::token::TokenHash;
    use crate::store::{MemoryCredentialStore, PasswordResetRecord, SessionId};
    use async_trait::async_trait;
    use chrono::Duration;

    /// Memory store that yields after each ticket lookup, like a DB round trip,
    /// so concurrent consumers interleave between find and delete.
    struct InterleavingStore {
        inner: Arc<MemoryCredentialStore>,
    }

    #[async_trait]
    impl CredentialStore for InterleavingStore {
        async fn create_user(&self, email: &str, password_hash: &str) -> AuthResult<User> {
            self.inner.create_user(email, password_hash).await
        }

        async fn find_user_by_email(&self, email: &str) -> AuthResult<Option<User>> {
            self.inner.find_user_by_email(email).await
        }

        async fn find_user_id_by_email(&self, email: &str) -> AuthResult<Option<UserId>> {
            self.inner.find_user_id_by_email(email).await
        }

        async fn update_user_password_hash(
            &self,
            user_id: UserId,
            password_hash: &str,
        ) -> AuthResult<()> {
            self.inner.update_user_password_hash(user_id, password_hash).await
        }

        async fn upsert_session(
            &self,
            user_id: UserId,
            token_hash: &TokenHash,
        ) -> AuthResult<SessionId> {
            self.inner.upsert_session(user_id, token_hash).await
        }

        async fn find_user_by_session_token_hash(
            &self,
            token_hash: &TokenHash,
        ) -> AuthResult<Option<User>> {
            self.inner.find_user_by_session_token_hash(token_hash).await
        }

        async fn delete_session_by_token_hash(&self, token_hash: &TokenHash) -> AuthResult<()> {
            self.inner.delete_session_by_token_hash(token_hash).await
        }

        async fn upsert_password_reset(
            &self,
            user_id: UserId,
            token_hash: &TokenHash,
            expires_at: DateTime<Utc>,
        ) -> AuthResult<ResetId> {
            self.inner
                .upsert_password_reset(user_id, token_hash, expires_at)
                .await
        }

        async fn find_reset_expiry_by_token_hash(
            &self,
            token_hash: &TokenHash,
        ) -> AuthResult<Option<DateTime<Utc>>> {
            self.inner.find_reset_expiry_by_token_hash(token_hash).await
        }

        async fn find_reset_and_user_by_token_hash(
            &self,
            token_hash: &TokenHash,
        ) -> AuthResult<Option<(PasswordResetRecord, User)>> {
            let found = self.inner.find_reset_and_user_by_token_hash(token_hash).await;
            tokio::task::yield_now().await;
            found
        }

        async fn delete_password_reset(
            &self,
            reset_id: ResetId,
            token_hash: &TokenHash,
        ) -> AuthResult<bool> {
            self.inner.delete_password_reset(reset_id, token_hash).await
        }
    }

    struct Harness {
        store: Arc<MemoryCredentialStore>,
        clock: Arc<FixedClock>,
        resets: PasswordResetManager,
    }

    async fn harness(ttl_seconds: i64) -> AuthResult<Harness> {
        let store = Arc::new(MemoryCredentialStore::new());
        store
            .insert_user(User {
                id: 7,
                email: "a@x.com".to_string(),
                password_hash: hash_password("old password")?,
            })
            .await?;
        let clock = Arc::new(FixedClock::new(Utc::now()));
        let config = AuthConfig::default().with_reset_ttl_seconds(ttl_seconds);
        let resets = PasswordResetManager::new(store.clone(), clock.clone(), config);
        Ok(Harness {
            store,
            clock,
            resets,
        })
    }

    #[tokio::test]
    async fn issue_check_consume_then_not_found() -> AuthResult<()> {
        let h = harness(3600).await?;

        let ticket = h.resets.issue("a@x.com").await?;
        assert_eq!(ticket.user_id, 7);
        h.resets.check_valid(ticket.token()).await?;

        let user = h.resets.consume(ticket.token()).await?;
        assert_eq!(user.id, 7);

        assert!(matches!(
            h.resets.consume(ticket.token()).await,
            Err(AuthError::NotFound)
        ));
        assert!(matches!(
            h.resets.check_valid(ticket.token()).await,
            Err(AuthError::NotFound)
        ));
        Ok(())
    }

    #[tokio::test]
    async fn issue_normalizes_email() -> AuthResult<()> {
        let h = harness(3600).await?;
        let ticket = h.resets.issue("  A@X.COM ").await?;
        assert_eq!(ticket.user_id, 7);
        Ok(())
    }

    #[tokio::test]
    async fn issue_for_unknown_email_fails() -> AuthResult<()> {
        let h = harness(3600).await?;
        assert!(matches!(
            h.resets.issue("nobody@x.com").await,
            Err(AuthError::UserNotFound)
        ));
        Ok(())
    }

    #[tokio::test]
    async fn check_valid_respects_expiry_boundary() -> AuthResult<()> {
        let h = harness(600).await?;
        let ticket = h.resets.issue("a@x.com").await?;
        assert_eq!(ticket.expires_at, h.clock.now() + Duration::seconds(600));

        h.clock.advance(Duration::seconds(599));
        h.resets.check_valid(ticket.token()).await?;

        h.clock.advance(Duration::seconds(2));
        assert!(matches!(
            h.resets.check_valid(ticket.token()).await,
            Err(AuthError::Expired)
        ));
        // checking never mutates
        assert!(h.store.password_reset_for_user(7).await.is_some());
        Ok(())
    }

    #[tokio::test]
    async fn consume_expired_ticket_fails_and_discards_it() -> AuthResult<()> {
        let h = harness(60).await?;
        let ticket = h.resets.issue("a@x.com").await?;
        h.clock.advance(Duration::seconds(61));

        assert!(matches!(
            h.resets.consume(ticket.token()).await,
            Err(AuthError::Expired)
        ));
        assert!(h.store.password_reset_for_user(7).await.is_none());
        assert!(matches!(
            h.resets.consume(ticket.token()).await,
            Err(AuthError::NotFound)
        ));
        Ok(())
    }

    #[tokio::test]
    async fn reissue_invalidates_previous_token() -> AuthResult<()> {
        let h = harness(3600).await?;
        let first = h.resets.issue("a@x.com").await?;
        let second = h.resets.issue("a@x.com").await?;

        assert_eq!(first.id, second.id);
        assert!(matches!(
            h.resets.check_valid(first.token()).await,
            Err(AuthError::NotFound)
        ));
        h.resets.check_valid(second.token()).await?;
        Ok(())
    }

    #[tokio::test]
    async fn complete_updates_password_and_signs_in() -> AuthResult<()> {
        let h = harness(3600).await?;
        let sessions = SessionManager::new(h.store.clone(), 32);
        let ticket = h.resets.issue("a@x.com").await?;

        let (completed, session) = h
            .resets
            .complete(ticket.token(), "brand new password", &sessions)
            .await?;
        assert_eq!(completed.id, 7);
        assert!(verify_password("brand new password", &completed.password_hash));

        let user = sessions.resolve(session.token()).await?;
        assert!(user.is_some_and(|u| u.id == 7
            && verify_password("brand new password", &u.password_hash)
            && !verify_password("old password", &u.password_hash)));
        Ok(())
    }

    #[tokio::test]
    async fn complete_with_short_password_keeps_ticket() -> AuthResult<()> {
        let h = harness(3600).await?;
        let sessions = SessionManager::new(h.store.clone(), 32);
        let ticket = h.resets.issue("a@x.com").await?;

        assert!(matches!(
            h.resets.complete(ticket.token(), "short", &sessions).await,
            Err(AuthError::InvalidInput(_))
        ));
        h.resets.check_valid(ticket.token()).await?;
        Ok(())
    }

    #[tokio::test]
    async fn concurrent_consumers_redeem_ticket_once() -> AuthResult<()> {
        let h = harness(3600).await?;
        let store = Arc::new(InterleavingStore {
            inner: h.store.clone(),
        });
        let resets = PasswordResetManager::new(store, h.clock.clone(), AuthConfig::default());
        let ticket = resets.issue("a@x.com").await?;

        let (first, second) = tokio::join!(
            resets.consume(ticket.token()),
            resets.consume(ticket.token())
        );

        let redeemed = [&first, &second].iter().filter(|r| r.is_ok()).count();
        assert_eq!(redeemed, 1, "ticket redeemed {redeemed} times");
        assert!(
            matches!(first, Err(AuthError::NotFound)) || matches!(second, Err(AuthError::NotFound))
        );
        assert!(h.store.password_reset_for_user(7).await.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn concurrent_completes_mint_one_session() -> AuthResult<()> {
        let h = harness(3600).await?;
        let store: Arc<dyn CredentialStore> = Arc::new(InterleavingStore {
            inner: h.store.clone(),
        });
        let resets = PasswordResetManager::new(store.clone(), h.clock.clone(), AuthConfig::default());
        let sessions = SessionManager::new(store, 32);
        let ticket = resets.issue("a@x.com").await?;

        let (first, second) = tokio::join!(
            resets.complete(ticket.token(), "password one", &sessions),
            resets.complete(ticket.token(), "password two", &sessions)
        );

        assert_eq!(u8::from(first.is_ok()) + u8::from(second.is_ok()), 1);
        Ok(())
    }
}
