//! Auth configuration shared by the session and reset managers.

use chrono::Duration;

use super::token::MIN_BYTES_PER_TOKEN;

const DEFAULT_RESET_TTL_SECONDS: i64 = 60 * 60;
const DEFAULT_FRONTEND_BASE_URL: &str = "https://localhost:443";
const DEFAULT_EMAIL_FROM: &str = "noreply@lensgate.dev";

#[derive(Clone, Debug)]
pub struct AuthConfig {
    frontend_base_url: String,
    session_token_bytes: usize,
    reset_token_bytes: usize,
    reset_ttl_seconds: i64,
    email_from: String,
}

impl AuthConfig {
    #[must_use]
    pub fn new(frontend_base_url: String) -> Self {
        Self {
            frontend_base_url,
            session_token_bytes: MIN_BYTES_PER_TOKEN,
            reset_token_bytes: MIN_BYTES_PER_TOKEN,
            reset_ttl_seconds: DEFAULT_RESET_TTL_SECONDS,
            email_from: DEFAULT_EMAIL_FROM.to_string(),
        }
    }

    #[must_use]
    pub fn with_session_token_bytes(mut self, bytes: usize) -> Self {
        self.session_token_bytes = bytes;
        self
    }

    #[must_use]
    pub fn with_reset_token_bytes(mut self, bytes: usize) -> Self {
        self.reset_token_bytes = bytes;
        self
    }

    #[must_use]
    pub fn with_reset_ttl_seconds(mut self, seconds: i64) -> Self {
        self.reset_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_email_from(mut self, email_from: String) -> Self {
        self.email_from = email_from;
        self
    }

    #[must_use]
    pub fn frontend_base_url(&self) -> &str {
        &self.frontend_base_url
    }

    /// Configured size; the token generator enforces the floor.
    #[must_use]
    pub fn session_token_bytes(&self) -> usize {
        self.session_token_bytes
    }

    #[must_use]
    pub fn reset_token_bytes(&self) -> usize {
        self.reset_token_bytes
    }

    /// Reset ticket lifetime. Non-positive values fall back to one hour.
    #[must_use]
    pub fn reset_ttl(&self) -> Duration {
        if self.reset_ttl_seconds > 0 {
            Duration::seconds(self.reset_ttl_seconds)
        } else {
            Duration::seconds(DEFAULT_RESET_TTL_SECONDS)
        }
    }

    #[must_use]
    pub fn email_from(&self) -> &str {
        &self.email_from
    }

    #[must_use]
    pub fn session_cookie_secure(&self) -> bool {
        self.frontend_base_url.starts_with("https://")
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self::new(DEFAULT_FRONTEND_BASE_URL.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_config_defaults_and_overrides() {
        let config = AuthConfig::default();

        assert_eq!(config.frontend_base_url(), DEFAULT_FRONTEND_BASE_URL);
        assert_eq!(config.session_token_bytes(), MIN_BYTES_PER_TOKEN);
        assert_eq!(config.reset_token_bytes(), MIN_BYTES_PER_TOKEN);
        assert_eq!(config.reset_ttl(), Duration::hours(1));
        assert_eq!(config.email_from(), DEFAULT_EMAIL_FROM);
        assert!(config.session_cookie_secure());

        let config = AuthConfig::new("http://localhost:3000".to_string())
            .with_session_token_bytes(64)
            .with_reset_token_bytes(48)
            .with_reset_ttl_seconds(120)
            .with_email_from("support@lensgate.dev".to_string());

        assert_eq!(config.session_token_bytes(), 64);
        assert_eq!(config.reset_token_bytes(), 48);
        assert_eq!(config.reset_ttl(), Duration::seconds(120));
        assert_eq!(config.email_from(), "support@lensgate.dev");
        assert!(!config.session_cookie_secure());
    }

    #[test]
    fn non_positive_reset_ttl_falls_back_to_default() {
        let config = AuthConfig::default().with_reset_ttl_seconds(0);
        assert_eq!(config.reset_ttl(), Duration::hours(1));
        let config = AuthConfig::default().with_reset_ttl_seconds(-5);
        assert_eq!(config.reset_ttl(), Duration::hours(1));
    }
}
