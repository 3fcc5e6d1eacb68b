use axum::response::{IntoResponse, Json};
use utoipa::{
    openapi::{Contact, License},
    OpenApi,
};

use super::handlers::{galleries, health, password_reset, users, ErrorBody};
use crate::store::Gallery;

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health,
        users::signup,
        users::signin,
        users::signout,
        users::me,
        password_reset::forgot_password,
        password_reset::check_reset_token,
        password_reset::reset_password,
        galleries::show,
        galleries::list,
        galleries::create,
        galleries::update,
        galleries::delete,
    ),
    components(schemas(
        health::Health,
        users::Credentials,
        users::UserResponse,
        password_reset::ForgotPasswordRequest,
        password_reset::ForgotPasswordResponse,
        password_reset::ResetPasswordRequest,
        galleries::GalleryRequest,
        Gallery,
        ErrorBody,
    )),
    tags(
        (name = "health", description = "Service status"),
        (name = "users", description = "Sign-up, sign-in and sessions"),
        (name = "password-reset", description = "Forgot and reset password"),
        (name = "galleries", description = "Per-user galleries")
    )
)]
struct ApiDoc;

/// Generated document with title, version, contact, and license taken from Cargo.toml.
#[must_use]
pub fn openapi() -> utoipa::openapi::OpenApi {
    let mut doc = ApiDoc::openapi();
    doc.info.title = env!("CARGO_PKG_NAME").to_string();
    doc.info.version = env!("CARGO_PKG_VERSION").to_string();
    doc.info.description = optional_str(env!("CARGO_PKG_DESCRIPTION")).map(str::to_string);
    doc.info.contact = cargo_contact();
    doc.info.license = optional_str(env!("CARGO_PKG_LICENSE")).map(|id| {
        let mut license = License::new(id);
        license.identifier = Some(id.to_string());
        license
    });
    doc
}

pub async fn openapi_json() -> impl IntoResponse {
    Json(openapi())
}

fn cargo_contact() -> Option<Contact> {
    // Cargo authors are `:` separated and may include "Name <email>".
    let primary = env!("CARGO_PKG_AUTHORS").split(':').next().map(str::trim)?;
    let (name, email) = parse_author(primary);
    if name.is_none() && email.is_none() {
        return None;
    }
    let mut contact = Contact::new();
    contact.name = name.map(str::to_string);
    contact.email = email.map(str::to_string);
    Some(contact)
}

fn optional_str(value: &'static str) -> Option<&'static str> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}

fn parse_author(author: &str) -> (Option<&str>, Option<&str>) {
    match author.split_once('<') {
        Some((name, rest)) => {
            let email = rest.trim_end_matches('>').trim();
            (optional(name.trim()), optional(email))
        }
        None => (optional(author.trim()), None),
    }
}

fn optional(value: &str) -> Option<&str> {
    (!value.is_empty()).then_some(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_info_from_cargo() {
        let spec = openapi();
        assert_eq!(spec.info.title, env!("CARGO_PKG_NAME"));
        assert_eq!(spec.info.version, env!("CARGO_PKG_VERSION"));

        let contact = spec.info.contact;
        assert!(contact.is_some());
        if let Some(contact) = contact {
            assert_eq!(contact.name.as_deref(), Some("Team Lensgate"));
            assert_eq!(contact.email.as_deref(), Some("team@lensgate.dev"));
        }
    }

    #[test]
    fn openapi_documents_auth_and_gallery_paths() {
        let spec = openapi();
        for path in [
            "/health",
            "/v1/users",
            "/v1/signin",
            "/v1/signout",
            "/v1/users/me",
            "/v1/forgot-pw",
            "/v1/reset-pw",
            "/v1/galleries",
            "/v1/galleries/{id}",
            "/v1/galleries/{id}/delete",
        ] {
            assert!(spec.paths.paths.contains_key(path), "missing {path}");
        }
    }

    #[test]
    fn parse_author_splits_name_and_email() {
        assert_eq!(
            parse_author("Jane Doe <jane@example.com>"),
            (Some("Jane Doe"), Some("jane@example.com"))
        );
        assert_eq!(parse_author("Jane Doe"), (Some("Jane Doe"), None));
        assert_eq!(parse_author(""), (None, None));
    }
}
