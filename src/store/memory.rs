//! In-process store with the same uniqueness rules as the Postgres schema.
//!
//! A single lock covers every table, so each operation is atomic the way a
//! single SQL statement is. Used by tests and local demos.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use tokio::sync::Mutex;

use super::{
    CredentialStore, Gallery, GalleryId, GalleryStore, PasswordResetRecord, ResetId, SessionId,
    SessionRecord, User, UserId,
};
use crate::auth::{
    error::{AuthError, AuthResult},
    token::TokenHash,
};

#[derive(Debug, Default)]
struct Tables {
    next_id: i64,
    users: BTreeMap<UserId, User>,
    // keyed by user_id, mirroring the unique constraint
    sessions: BTreeMap<UserId, SessionRecord>,
    password_resets: BTreeMap<UserId, PasswordResetRecord>,
    galleries: BTreeMap<GalleryId, Gallery>,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    tables: Mutex<Tables>,
}

impl MemoryCredentialStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a user with a caller-chosen id.
    ///
    /// # Errors
    /// Returns `AuthError::EmailTaken` if the email or id is already present.
    pub async fn insert_user(&self, user: User) -> AuthResult<()> {
        let mut tables = self.tables.lock().await;
        if tables.users.contains_key(&user.id)
            || tables.users.values().any(|u| u.email == user.email)
        {
            return Err(AuthError::EmailTaken);
        }
        tables.next_id = tables.next_id.max(user.id);
        tables.users.insert(user.id, user);
        Ok(())
    }

    /// Session rows currently held for a user (zero or one).
    pub async fn sessions_for_user(&self, user_id: UserId) -> Vec<SessionRecord> {
        let tables = self.tables.lock().await;
        tables.sessions.get(&user_id).cloned().into_iter().collect()
    }

    pub async fn password_reset_for_user(&self, user_id: UserId) -> Option<PasswordResetRecord> {
        let tables = self.tables.lock().await;
        tables.password_resets.get(&user_id).cloned()
    }

    pub async fn session_count(&self) -> usize {
        self.tables.lock().await.sessions.len()
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn create_user(&self, email: &str, password_hash: &str) -> AuthResult<User> {
        let mut tables = self.tables.lock().await;
        if tables.users.values().any(|u| u.email == email) {
            return Err(AuthError::EmailTaken);
        }
        let user = User {
            id: tables.next_id(),
            email: email.to_string(),
            password_hash: password_hash.to_string(),
        };
        tables.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_user_by_email(&self, email: &str) -> AuthResult<Option<User>> {
        let tables = self.tables.lock().await;
        Ok(tables.users.values().find(|u| u.email == email).cloned())
    }

    async fn find_user_id_by_email(&self, email: &str) -> AuthResult<Option<UserId>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .users
            .values()
            .find(|u| u.email == email)
            .map(|u| u.id))
    }

    async fn update_user_password_hash(
        &self,
        user_id: UserId,
        password_hash: &str,
    ) -> AuthResult<()> {
        let mut tables = self.tables.lock().await;
        if let Some(user) = tables.users.get_mut(&user_id) {
            password_hash.clone_into(&mut user.password_hash);
        }
        Ok(())
    }

    async fn upsert_session(
        &self,
        user_id: UserId,
        token_hash: &TokenHash,
    ) -> AuthResult<SessionId> {
        let mut tables = self.tables.lock().await;
        if !tables.users.contains_key(&user_id) {
            return Err(AuthError::Persistence(anyhow::anyhow!(
                "session references unknown user"
            )));
        }
        let id = match tables.sessions.get(&user_id) {
            Some(existing) => existing.id,
            None => tables.next_id(),
        };
        tables.sessions.insert(
            user_id,
            SessionRecord {
                id,
                user_id,
                token_hash: token_hash.clone(),
            },
        );
        Ok(id)
    }

    async fn find_user_by_session_token_hash(
        &self,
        token_hash: &TokenHash,
    ) -> AuthResult<Option<User>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .sessions
            .values()
            .find(|s| &s.token_hash == token_hash)
            .and_then(|s| tables.users.get(&s.user_id))
            .cloned())
    }

    async fn delete_session_by_token_hash(&self, token_hash: &TokenHash) -> AuthResult<()> {
        let mut tables = self.tables.lock().await;
        tables.sessions.retain(|_, s| &s.token_hash != token_hash);
        Ok(())
    }

    async fn upsert_password_reset(
        &self,
        user_id: UserId,
        token_hash: &TokenHash,
        expires_at: DateTime<Utc>,
    ) -> AuthResult<ResetId> {
        let mut tables = self.tables.lock().await;
        if !tables.users.contains_key(&user_id) {
            return Err(AuthError::Persistence(anyhow::anyhow!(
                "password reset references unknown user"
            )));
        }
        let id = match tables.password_resets.get(&user_id) {
            Some(existing) => existing.id,
            None => tables.next_id(),
        };
        tables.password_resets.insert(
            user_id,
            PasswordResetRecord {
                id,
                user_id,
                token_hash: token_hash.clone(),
                expires_at,
            },
        );
        Ok(id)
    }

    async fn find_reset_expiry_by_token_hash(
        &self,
        token_hash: &TokenHash,
    ) -> AuthResult<Option<DateTime<Utc>>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .password_resets
            .values()
            .find(|r| &r.token_hash == token_hash)
            .map(|r| r.expires_at))
    }

    async fn find_reset_and_user_by_token_hash(
        &self,
        token_hash: &TokenHash,
    ) -> AuthResult<Option<(PasswordResetRecord, User)>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .password_resets
            .values()
            .find(|r| &r.token_hash == token_hash)
            .and_then(|r| {
                tables
                    .users
                    .get(&r.user_id)
                    .map(|user| (r.clone(), user.clone()))
            }))
    }

    async fn delete_password_reset(
        &self,
        reset_id: ResetId,
        token_hash: &TokenHash,
    ) -> AuthResult<bool> {
        let mut tables = self.tables.lock().await;
        let before = tables.password_resets.len();
        tables
            .password_resets
            .retain(|_, r| !(r.id == reset_id && &r.token_hash == token_hash));
        Ok(tables.password_resets.len() < before)
    }
}

#[async_trait]
impl GalleryStore for MemoryCredentialStore {
    async fn create_gallery(&self, user_id: UserId, title: &str) -> AuthResult<Gallery> {
        let mut tables = self.tables.lock().await;
        let gallery = Gallery {
            id: tables.next_id(),
            user_id,
            title: title.to_string(),
        };
        tables.galleries.insert(gallery.id, gallery.clone());
        Ok(gallery)
    }

    async fn gallery_by_id(&self, gallery_id: GalleryId) -> AuthResult<Option<Gallery>> {
        Ok(self.tables.lock().await.galleries.get(&gallery_id).cloned())
    }

    async fn galleries_by_user_id(&self, user_id: UserId) -> AuthResult<Vec<Gallery>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .galleries
            .values()
            .filter(|g| g.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn update_gallery_title(&self, gallery_id: GalleryId, title: &str) -> AuthResult<()> {
        let mut tables = self.tables.lock().await;
        if let Some(gallery) = tables.galleries.get_mut(&gallery_id) {
            title.clone_into(&mut gallery.title);
        }
        Ok(())
    }

    async fn delete_gallery(&self, gallery_id: GalleryId) -> AuthResult<()> {
        self.tables.lock().await.galleries.remove(&gallery_id);
        Ok(())
    }
}
