use anyhow::{Context, Result};
use clap::{Arg, ArgMatches, Command};

pub const ARG_FRONTEND_BASE_URL: &str = "frontend-base-url";
pub const ARG_SESSION_TOKEN_BYTES: &str = "session-token-bytes";
pub const ARG_RESET_TOKEN_BYTES: &str = "reset-token-bytes";
pub const ARG_RESET_TTL_SECONDS: &str = "reset-ttl";
pub const ARG_EMAIL_FROM: &str = "email-from";

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_FRONTEND_BASE_URL)
                .long(ARG_FRONTEND_BASE_URL)
                .help("Frontend base URL used for password reset links")
                .env("LENSGATE_FRONTEND_BASE_URL")
                .default_value("https://localhost:443"),
        )
        .arg(
            Arg::new(ARG_SESSION_TOKEN_BYTES)
                .long(ARG_SESSION_TOKEN_BYTES)
                .help("Random bytes per session token (minimum 32)")
                .env("LENSGATE_SESSION_TOKEN_BYTES")
                .default_value("32")
                .value_parser(clap::value_parser!(usize)),
        )
        .arg(
            Arg::new(ARG_RESET_TOKEN_BYTES)
                .long(ARG_RESET_TOKEN_BYTES)
                .help("Random bytes per password reset token (minimum 32)")
                .env("LENSGATE_RESET_TOKEN_BYTES")
                .default_value("32")
                .value_parser(clap::value_parser!(usize)),
        )
        .arg(
            Arg::new(ARG_RESET_TTL_SECONDS)
                .long(ARG_RESET_TTL_SECONDS)
                .help("Password reset link TTL in seconds")
                .env("LENSGATE_RESET_TTL_SECONDS")
                .default_value("3600")
                .value_parser(clap::value_parser!(i64)),
        )
        .arg(
            Arg::new(ARG_EMAIL_FROM)
                .long(ARG_EMAIL_FROM)
                .help("Sender address for password reset emails")
                .env("LENSGATE_EMAIL_FROM")
                .default_value("noreply@lensgate.dev"),
        )
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Options {
    pub frontend_base_url: String,
    pub session_token_bytes: usize,
    pub reset_token_bytes: usize,
    pub reset_ttl_seconds: i64,
    pub email_from: String,
}

impl Options {
    /// # Errors
    /// Returns an error if a defaulted argument is missing from the matches.
    pub fn parse(matches: &ArgMatches) -> Result<Self> {
        Ok(Self {
            frontend_base_url: matches
                .get_one::<String>(ARG_FRONTEND_BASE_URL)
                .cloned()
                .context("missing --frontend-base-url")?,
            session_token_bytes: matches
                .get_one::<usize>(ARG_SESSION_TOKEN_BYTES)
                .copied()
                .context("missing --session-token-bytes")?,
            reset_token_bytes: matches
                .get_one::<usize>(ARG_RESET_TOKEN_BYTES)
                .copied()
                .context("missing --reset-token-bytes")?,
            reset_ttl_seconds: matches
                .get_one::<i64>(ARG_RESET_TTL_SECONDS)
                .copied()
                .context("missing --reset-ttl")?,
            email_from: matches
                .get_one::<String>(ARG_EMAIL_FROM)
                .cloned()
                .context("missing --email-from")?,
        })
    }
}
