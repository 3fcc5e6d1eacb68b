//! Persistence boundary for users, sessions, reset tickets, and galleries.
//!
//! Lookups return `Ok(None)` on a miss; `Err` is reserved for store failures.
//! Both upserts must be a single atomic statement keyed on `user_id` so two
//! concurrent requests for the same user converge on one row.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::auth::{error::AuthResult, token::TokenHash};

pub mod memory;
pub mod postgres;

pub use memory::MemoryCredentialStore;
pub use postgres::PgCredentialStore;

pub type UserId = i64;
pub type SessionId = i64;
pub type ResetId = i64;
pub type GalleryId = i64;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub password_hash: String,
}

/// Persisted session row. Holds the hash only; the raw token never reaches the store.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionRecord {
    pub id: SessionId,
    pub user_id: UserId,
    pub token_hash: TokenHash,
}

/// Persisted reset ticket row.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PasswordResetRecord {
    pub id: ResetId,
    pub user_id: UserId,
    pub token_hash: TokenHash,
    pub expires_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, ToSchema)]
pub struct Gallery {
    pub id: GalleryId,
    pub user_id: UserId,
    pub title: String,
}

#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Insert a user; `AuthError::EmailTaken` when the email is already registered.
    async fn create_user(&self, email: &str, password_hash: &str) -> AuthResult<User>;

    async fn find_user_by_email(&self, email: &str) -> AuthResult<Option<User>>;

    async fn find_user_id_by_email(&self, email: &str) -> AuthResult<Option<UserId>>;

    async fn update_user_password_hash(&self, user_id: UserId, password_hash: &str)
        -> AuthResult<()>;

    /// Insert or replace the user's session hash, returning the row id.
    async fn upsert_session(&self, user_id: UserId, token_hash: &TokenHash)
        -> AuthResult<SessionId>;

    async fn find_user_by_session_token_hash(&self, token_hash: &TokenHash)
        -> AuthResult<Option<User>>;

    /// Idempotent; deleting a missing row is not an error.
    async fn delete_session_by_token_hash(&self, token_hash: &TokenHash) -> AuthResult<()>;

    /// Insert or replace the user's reset ticket, returning the row id.
    async fn upsert_password_reset(
        &self,
        user_id: UserId,
        token_hash: &TokenHash,
        expires_at: DateTime<Utc>,
    ) -> AuthResult<ResetId>;

    async fn find_reset_expiry_by_token_hash(
        &self,
        token_hash: &TokenHash,
    ) -> AuthResult<Option<DateTime<Utc>>>;

    async fn find_reset_and_user_by_token_hash(
        &self,
        token_hash: &TokenHash,
    ) -> AuthResult<Option<(PasswordResetRecord, User)>>;

    /// Delete the ticket only if it still carries `token_hash`. Returns whether a
    /// row was removed; `false` means another caller already claimed it.
    async fn delete_password_reset(
        &self,
        reset_id: ResetId,
        token_hash: &TokenHash,
    ) -> AuthResult<bool>;
}

#[async_trait]
pub trait GalleryStore: Send + Sync {
    async fn create_gallery(&self, user_id: UserId, title: &str) -> AuthResult<Gallery>;

    async fn gallery_by_id(&self, gallery_id: GalleryId) -> AuthResult<Option<Gallery>>;

    async fn galleries_by_user_id(&self, user_id: UserId) -> AuthResult<Vec<Gallery>>;

    async fn update_gallery_title(&self, gallery_id: GalleryId, title: &str) -> AuthResult<()>;

    async fn delete_gallery(&self, gallery_id: GalleryId) -> AuthResult<()>;
}
