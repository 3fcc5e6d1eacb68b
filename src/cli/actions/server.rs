use crate::{api, auth::AuthConfig};
use anyhow::{Context, Result};
use tracing::debug;
use url::Url;

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub dsn: String,
    pub frontend_base_url: String,
    pub session_token_bytes: usize,
    pub reset_token_bytes: usize,
    pub reset_ttl_seconds: i64,
    pub email_from: String,
}

impl Args {
    #[must_use]
    pub fn auth_config(&self) -> AuthConfig {
        AuthConfig::new(self.frontend_base_url.clone())
            .with_session_token_bytes(self.session_token_bytes)
            .with_reset_token_bytes(self.reset_token_bytes)
            .with_reset_ttl_seconds(self.reset_ttl_seconds)
            .with_email_from(self.email_from.clone())
    }
}

/// Execute the server action.
/// # Errors
/// Returns an error if the frontend URL is invalid or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    Url::parse(&args.frontend_base_url)
        .with_context(|| format!("Invalid frontend base URL: {}", args.frontend_base_url))?;

    let auth_config = args.auth_config();
    debug!(
        frontend_base_url = auth_config.frontend_base_url(),
        reset_ttl_seconds = auth_config.reset_ttl().num_seconds(),
        "starting server"
    );

    api::new(args.port, args.dsn, auth_config).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_config_from_args() {
        let args = Args {
            port: 8080,
            dsn: "postgres://localhost/lensgate".to_string(),
            frontend_base_url: "http://localhost:3000".to_string(),
            session_token_bytes: 48,
            reset_token_bytes: 40,
            reset_ttl_seconds: 900,
            email_from: "support@lensgate.dev".to_string(),
        };
        let config = args.auth_config();
        assert_eq!(config.frontend_base_url(), "http://localhost:3000");
        assert_eq!(config.session_token_bytes(), 48);
        assert_eq!(config.reset_token_bytes(), 40);
        assert_eq!(config.reset_ttl(), chrono::Duration::seconds(900));
        assert_eq!(config.email_from(), "support@lensgate.dev");
        assert!(!config.session_cookie_secure());
    }
}
