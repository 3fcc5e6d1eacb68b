use thiserror::Error;

/// Failures produced by the credential lifecycle.
///
/// Variants never carry a raw token or a token hash.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("resource could not be found")]
    NotFound,
    #[error("link has expired")]
    Expired,
    #[error("no user registered for that email")]
    UserNotFound,
    #[error("email address is already in use")]
    EmailTaken,
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("invalid input: {0}")]
    InvalidInput(&'static str),
    #[error("forbidden")]
    Forbidden,
    #[error("secure random source unavailable")]
    RandomSource(#[source] rand::Error),
    #[error("persistence failure")]
    Persistence(#[source] anyhow::Error),
    #[error("password hashing failed: {0}")]
    PasswordHash(String),
    #[error("email delivery failed")]
    Delivery(#[source] anyhow::Error),
}

impl AuthError {
    /// Outcomes the caller maps to a specific response instead of a generic failure.
    #[must_use]
    pub fn is_expected(&self) -> bool {
        matches!(
            self,
            Self::NotFound
                | Self::Expired
                | Self::UserNotFound
                | Self::EmailTaken
                | Self::InvalidCredentials
                | Self::InvalidInput(_)
                | Self::Forbidden
        )
    }
}

impl From<anyhow::Error> for AuthError {
    fn from(err: anyhow::Error) -> Self {
        Self::Persistence(err)
    }
}

pub type AuthResult<T> = Result<T, AuthError>;

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    #[test]
    fn expected_outcomes_are_flagged() {
        assert!(AuthError::NotFound.is_expected());
        assert!(AuthError::Expired.is_expected());
        assert!(AuthError::UserNotFound.is_expected());
        assert!(AuthError::Forbidden.is_expected());
        assert!(!AuthError::Persistence(anyhow!("db down")).is_expected());
        assert!(!AuthError::Delivery(anyhow!("smtp down")).is_expected());
    }

    #[test]
    fn anyhow_errors_become_persistence_failures() {
        let err: AuthError = anyhow!("failed to upsert session").into();
        assert!(matches!(err, AuthError::Persistence(_)));
        assert_eq!(err.to_string(), "persistence failure");
    }
}
