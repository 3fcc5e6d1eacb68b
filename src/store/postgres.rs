//! Postgres-backed store.
//!
//! Upserts rely on the `user_id` unique constraints from `sql/schema.sql`
//! (`ON CONFLICT (user_id) DO UPDATE`), so concurrent sign-ins for the same
//! user race to a single row without any in-process locking.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{postgres::PgRow, Connection, PgConnection, PgPool, Row};
use tracing::{info_span, Instrument, Span};

use super::{
    CredentialStore, Gallery, GalleryId, GalleryStore, PasswordResetRecord, ResetId, SessionId,
    User, UserId,
};
use crate::auth::{
    error::{AuthError, AuthResult},
    token::TokenHash,
};

pub const SCHEMA_SQL: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/sql/schema.sql"));

#[derive(Clone, Debug)]
pub struct PgCredentialStore {
    pool: PgPool,
}

impl PgCredentialStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn db_span(operation: &'static str, statement: &'static str) -> Span {
    info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = operation,
        db.statement = statement
    )
}

fn user_from_row(row: &PgRow) -> User {
    User {
        id: row.get("user_id"),
        email: row.get("email"),
        password_hash: row.get("password_hash"),
    }
}

pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().is_some_and(|code| code.as_ref() == "23505"),
        _ => false,
    }
}

/// Apply the embedded schema; every statement is `IF NOT EXISTS`.
///
/// # Errors
/// Returns an error if a statement fails.
pub async fn apply_schema(dsn: &str) -> Result<()> {
    let mut connection = PgConnection::connect(dsn)
        .await
        .context("failed to connect for schema setup")?;

    for (index, statement) in split_sql_statements(SCHEMA_SQL).iter().enumerate() {
        sqlx::query(statement)
            .execute(&mut connection)
            .await
            .with_context(|| format!("failed to execute schema statement {}", index + 1))?;
    }

    Ok(())
}

fn split_sql_statements(sql: &str) -> Vec<String> {
    let mut statements = Vec::new();
    let mut current = String::new();

    for line in sql.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with("--") {
            continue;
        }
        current.push_str(line);
        current.push('\n');

        if trimmed.ends_with(';') {
            let statement = current.trim();
            if !statement.is_empty() {
                statements.push(statement.to_string());
            }
            current.clear();
        }
    }

    let leftover = current.trim();
    if !leftover.is_empty() {
        statements.push(leftover.to_string());
    }

    statements
}

#[async_trait]
impl CredentialStore for PgCredentialStore {
    async fn create_user(&self, email: &str, password_hash: &str) -> AuthResult<User> {
        let query = r"
            INSERT INTO users (email, password_hash)
            VALUES ($1, $2)
            RETURNING id
        ";
        let row = sqlx::query(query)
            .bind(email)
            .bind(password_hash)
            .fetch_one(&self.pool)
            .instrument(db_span("INSERT", query))
            .await;

        match row {
            Ok(row) => Ok(User {
                id: row.get("id"),
                email: email.to_string(),
                password_hash: password_hash.to_string(),
            }),
            Err(err) if is_unique_violation(&err) => Err(AuthError::EmailTaken),
            Err(err) => Err(anyhow::Error::new(err)
                .context("failed to insert user")
                .into()),
        }
    }

    async fn find_user_by_email(&self, email: &str) -> AuthResult<Option<User>> {
        let query = r"
            SELECT id AS user_id, email, password_hash
            FROM users
            WHERE email = $1
        ";
        let row = sqlx::query(query)
            .bind(email)
            .fetch_optional(&self.pool)
            .instrument(db_span("SELECT", query))
            .await
            .context("failed to lookup user by email")?;

        Ok(row.as_ref().map(user_from_row))
    }

    async fn find_user_id_by_email(&self, email: &str) -> AuthResult<Option<UserId>> {
        let query = "SELECT id FROM users WHERE email = $1";
        let row = sqlx::query(query)
            .bind(email)
            .fetch_optional(&self.pool)
            .instrument(db_span("SELECT", query))
            .await
            .context("failed to lookup user id by email")?;

        Ok(row.map(|row| row.get("id")))
    }

    async fn update_user_password_hash(
        &self,
        user_id: UserId,
        password_hash: &str,
    ) -> AuthResult<()> {
        let query = "UPDATE users SET password_hash = $2 WHERE id = $1";
        sqlx::query(query)
            .bind(user_id)
            .bind(password_hash)
            .execute(&self.pool)
            .instrument(db_span("UPDATE", query))
            .await
            .context("failed to update password hash")?;
        Ok(())
    }

    async fn upsert_session(
        &self,
        user_id: UserId,
        token_hash: &TokenHash,
    ) -> AuthResult<SessionId> {
        let query = r"
            INSERT INTO sessions (user_id, token_hash)
            VALUES ($1, $2)
            ON CONFLICT (user_id) DO UPDATE
            SET token_hash = EXCLUDED.token_hash
            RETURNING id
        ";
        let row = sqlx::query(query)
            .bind(user_id)
            .bind(token_hash.as_str())
            .fetch_one(&self.pool)
            .instrument(db_span("INSERT", query))
            .await
            .context("failed to upsert session")?;

        Ok(row.get("id"))
    }

    async fn find_user_by_session_token_hash(
        &self,
        token_hash: &TokenHash,
    ) -> AuthResult<Option<User>> {
        let query = r"
            SELECT users.id AS user_id, users.email, users.password_hash
            FROM sessions
            JOIN users ON users.id = sessions.user_id
            WHERE sessions.token_hash = $1
        ";
        let row = sqlx::query(query)
            .bind(token_hash.as_str())
            .fetch_optional(&self.pool)
            .instrument(db_span("SELECT", query))
            .await
            .context("failed to lookup session")?;

        Ok(row.as_ref().map(user_from_row))
    }

    async fn delete_session_by_token_hash(&self, token_hash: &TokenHash) -> AuthResult<()> {
        let query = "DELETE FROM sessions WHERE token_hash = $1";
        sqlx::query(query)
            .bind(token_hash.as_str())
            .execute(&self.pool)
            .instrument(db_span("DELETE", query))
            .await
            .context("failed to delete session")?;
        Ok(())
    }

    async fn upsert_password_reset(
        &self,
        user_id: UserId,
        token_hash: &TokenHash,
        expires_at: DateTime<Utc>,
    ) -> AuthResult<ResetId> {
        let query = r"
            INSERT INTO password_resets (user_id, token_hash, expires_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id) DO UPDATE
            SET token_hash = EXCLUDED.token_hash,
                expires_at = EXCLUDED.expires_at
            RETURNING id
        ";
        let row = sqlx::query(query)
            .bind(user_id)
            .bind(token_hash.as_str())
            .bind(expires_at)
            .fetch_one(&self.pool)
            .instrument(db_span("INSERT", query))
            .await
            .context("failed to upsert password reset")?;

        Ok(row.get("id"))
    }

    async fn find_reset_expiry_by_token_hash(
        &self,
        token_hash: &TokenHash,
    ) -> AuthResult<Option<DateTime<Utc>>> {
        let query = r"
            SELECT password_resets.expires_at
            FROM password_resets
            JOIN users ON users.id = password_resets.user_id
            WHERE password_resets.token_hash = $1
        ";
        let row = sqlx::query(query)
            .bind(token_hash.as_str())
            .fetch_optional(&self.pool)
            .instrument(db_span("SELECT", query))
            .await
            .context("failed to lookup password reset expiry")?;

        Ok(row.map(|row| row.get("expires_at")))
    }

    async fn find_reset_and_user_by_token_hash(
        &self,
        token_hash: &TokenHash,
    ) -> AuthResult<Option<(PasswordResetRecord, User)>> {
        let query = r"
            SELECT password_resets.id,
                   password_resets.token_hash,
                   password_resets.expires_at,
                   users.id AS user_id,
                   users.email,
                   users.password_hash
            FROM password_resets
            JOIN users ON users.id = password_resets.user_id
            WHERE password_resets.token_hash = $1
        ";
        let row = sqlx::query(query)
            .bind(token_hash.as_str())
            .fetch_optional(&self.pool)
            .instrument(db_span("SELECT", query))
            .await
            .context("failed to lookup password reset")?;

        Ok(row.map(|row| {
            let user = user_from_row(&row);
            let reset = PasswordResetRecord {
                id: row.get("id"),
                user_id: user.id,
                token_hash: TokenHash::from_stored(row.get("token_hash")),
                expires_at: row.get("expires_at"),
            };
            (reset, user)
        }))
    }

    async fn delete_password_reset(
        &self,
        reset_id: ResetId,
        token_hash: &TokenHash,
    ) -> AuthResult<bool> {
        let query = "DELETE FROM password_resets WHERE id = $1 AND token_hash = $2";
        let result = sqlx::query(query)
            .bind(reset_id)
            .bind(token_hash.as_str())
            .execute(&self.pool)
            .instrument(db_span("DELETE", query))
            .await
            .context("failed to delete password reset")?;
        Ok(result.rows_affected() == 1)
    }
}

#[async_trait]
impl GalleryStore for PgCredentialStore {
    async fn create_gallery(&self, user_id: UserId, title: &str) -> AuthResult<Gallery> {
        let query = "INSERT INTO galleries (user_id, title) VALUES ($1, $2) RETURNING id";
        let row = sqlx::query(query)
            .bind(user_id)
            .bind(title)
            .fetch_one(&self.pool)
            .instrument(db_span("INSERT", query))
            .await
            .context("failed to insert gallery")?;

        Ok(Gallery {
            id: row.get("id"),
            user_id,
            title: title.to_string(),
        })
    }

    async fn gallery_by_id(&self, gallery_id: GalleryId) -> AuthResult<Option<Gallery>> {
        let query = "SELECT id, user_id, title FROM galleries WHERE id = $1";
        let row = sqlx::query(query)
            .bind(gallery_id)
            .fetch_optional(&self.pool)
            .instrument(db_span("SELECT", query))
            .await
            .context("failed to lookup gallery")?;

        Ok(row.map(|row| Gallery {
            id: row.get("id"),
            user_id: row.get("user_id"),
            title: row.get("title"),
        }))
    }

    async fn galleries_by_user_id(&self, user_id: UserId) -> AuthResult<Vec<Gallery>> {
        let query = "SELECT id, user_id, title FROM galleries WHERE user_id = $1 ORDER BY id";
        let rows = sqlx::query(query)
            .bind(user_id)
            .fetch_all(&self.pool)
            .instrument(db_span("SELECT", query))
            .await
            .context("failed to list galleries")?;

        Ok(rows
            .into_iter()
            .map(|row| Gallery {
                id: row.get("id"),
                user_id: row.get("user_id"),
                title: row.get("title"),
            })
            .collect())
    }

    async fn update_gallery_title(&self, gallery_id: GalleryId, title: &str) -> AuthResult<()> {
        let query = "UPDATE galleries SET title = $2 WHERE id = $1";
        sqlx::query(query)
            .bind(gallery_id)
            .bind(title)
            .execute(&self.pool)
            .instrument(db_span("UPDATE", query))
            .await
            .context("failed to update gallery")?;
        Ok(())
    }

    async fn delete_gallery(&self, gallery_id: GalleryId) -> AuthResult<()> {
        let query = "DELETE FROM galleries WHERE id = $1";
        sqlx::query(query)
            .bind(gallery_id)
            .execute(&self.pool)
            .instrument(db_span("DELETE", query))
            .await
            .context("failed to delete gallery")?;
        Ok(())
    }
}
