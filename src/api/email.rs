//! Outbound email abstraction.
//!
//! The reset flow only needs "deliver this link to this address". Transport
//! lives behind `EmailSender`; the default `LogEmailSender` logs the message
//! for local development. A delivery error fails the request, with no retry.

use anyhow::Result;
use tracing::info;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EmailMessage {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub plaintext: String,
    pub html: String,
}

/// Email delivery abstraction.
pub trait EmailSender: Send + Sync {
    /// Deliver a message or return an error to fail the request.
    ///
    /// # Errors
    /// Any transport failure.
    fn send(&self, message: &EmailMessage) -> Result<()>;
}

/// Local dev sender that logs instead of sending real email.
#[derive(Clone, Debug)]
pub struct LogEmailSender;

impl EmailSender for LogEmailSender {
    fn send(&self, message: &EmailMessage) -> Result<()> {
        // The body embeds the reset link; keep it out of the logs.
        info!(
            from = %message.from,
            to = %message.to,
            subject = %message.subject,
            "email send stub"
        );
        Ok(())
    }
}

/// Build the frontend reset link included in the outbound email.
#[must_use]
pub fn build_reset_url(frontend_base_url: &str, token: &str) -> String {
    let base = frontend_base_url.trim_end_matches('/');
    format!("{base}/reset-pw?token={token}")
}

#[must_use]
pub fn forgot_password_message(from: &str, to: &str, reset_url: &str) -> EmailMessage {
    EmailMessage {
        from: from.to_string(),
        to: to.to_string(),
        subject: "Reset your password".to_string(),
        plaintext: format!("To reset your password, please visit the following link: {reset_url}"),
        html: format!(
            r#"<p>To reset your password, please visit the following link: <a href="{reset_url}">{reset_url}</a></p>"#
        ),
    }
}
