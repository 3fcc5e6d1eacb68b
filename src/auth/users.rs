//! User accounts: sign-up, sign-in, and password storage.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use regex::Regex;
use std::sync::Arc;
use tracing::instrument;

use super::error::{AuthError, AuthResult};
use crate::store::{CredentialStore, User, UserId};

pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Normalize an email for lookup/uniqueness checks.
#[must_use]
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Basic email format check on already-normalized input.
#[must_use]
pub fn valid_email(email_normalized: &str) -> bool {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").is_ok_and(|regex| regex.is_match(email_normalized))
}

/// # Errors
/// `InvalidInput` when the password is shorter than [`MIN_PASSWORD_LENGTH`].
pub fn validate_password(password: &str) -> AuthResult<()> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::InvalidInput("password too short"));
    }
    Ok(())
}

/// Argon2id PHC string with a random salt.
///
/// # Errors
/// `PasswordHash` if hashing fails.
pub fn hash_password(password: &str) -> AuthResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|err| AuthError::PasswordHash(err.to_string()))
}

#[must_use]
pub fn verify_password(password: &str, password_hash: &str) -> bool {
    PasswordHash::new(password_hash).is_ok_and(|parsed| {
        Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok()
    })
}

#[derive(Clone)]
pub struct UserService {
    store: Arc<dyn CredentialStore>,
}

impl UserService {
    #[must_use]
    pub fn new(store: Arc<dyn CredentialStore>) -> Self {
        Self { store }
    }

    /// Register a new user.
    ///
    /// # Errors
    /// `InvalidInput` for a malformed email or short password, `EmailTaken` on conflict.
    #[instrument(skip_all)]
    pub async fn create(&self, email: &str, password: &str) -> AuthResult<User> {
        let email = normalize_email(email);
        if !valid_email(&email) {
            return Err(AuthError::InvalidInput("invalid email"));
        }
        validate_password(password)?;
        let password_hash = hash_password(password)?;
        self.store.create_user(&email, &password_hash).await
    }

    /// Check credentials and return the matching user.
    ///
    /// # Errors
    /// `InvalidCredentials` for an unknown email or wrong password.
    #[instrument(skip_all)]
    pub async fn authenticate(&self, email: &str, password: &str) -> AuthResult<User> {
        let email = normalize_email(email);
        let user = self
            .store
            .find_user_by_email(&email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;
        if !verify_password(password, &user.password_hash) {
            return Err(AuthError::InvalidCredentials);
        }
        Ok(user)
    }

    /// # Errors
    /// `InvalidInput` for a short password, `PasswordHash` or `Persistence` otherwise.
    #[instrument(skip(self, password))]
    pub async fn update_password(&self, user_id: UserId, password: &str) -> AuthResult<()> {
        validate_password(password)?;
        let password_hash = hash_password(password)?;
        self.store
            .update_user_password_hash(user_id, &password_hash)
            .await
    }
}
