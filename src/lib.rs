//! # Lensgate
//!
//! `lensgate` authenticates users and authorizes access to their image
//! galleries over HTTP.
//!
//! ## Tokens
//!
//! Session tokens and password-reset tokens are 32+ random bytes encoded as
//! URL-safe base64. Clients hold the raw value; the database only stores its
//! SHA-256 hash. Each user has at most one session and at most one
//! outstanding reset ticket, enforced with `ON CONFLICT (user_id)` upserts.
//!
//! ## Identity
//!
//! Every request is resolved once to an [`auth::Identity`] (a user or
//! anonymous) which downstream handlers read explicitly. Routes that need a
//! user stop before the handler runs when the request is anonymous.

pub mod api;
pub mod auth;
pub mod cli;
pub mod store;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_git_commit_hash_format() {
        if GIT_COMMIT_HASH == "unknown" {
            // Acceptable in non-git build environments
            return;
        }
        assert!(
            GIT_COMMIT_HASH.chars().all(|c| c.is_ascii_hexdigit()),
            "GIT_COMMIT_HASH should be a hex string, got: {GIT_COMMIT_HASH}"
        );
    }
}
