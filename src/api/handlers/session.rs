//! Session cookie transport and the identity middleware.
//!
//! Flow Overview: `attach_identity` runs for every request, resolves the
//! cookie (or bearer token) once, and stores the resulting `Identity` in the
//! request extensions. Guards read that value; they never look it up again.

use axum::{
    async_trait,
    extract::{Extension, FromRequestParts, Request},
    http::{
        header::{AUTHORIZATION, COOKIE, LOCATION},
        request::Parts,
        HeaderMap, HeaderValue, StatusCode,
    },
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;

use crate::api::state::AppState;
use crate::auth::{require_identity, AuthConfig, DenyPolicy, Identity};
use crate::store::User;

pub const SESSION_COOKIE_NAME: &str = "lensgate_session";
pub const SIGN_IN_PATH: &str = "/signin";

/// Build a secure `HttpOnly` cookie for the session token.
pub(crate) fn session_cookie(config: &AuthConfig, token: &str) -> Option<HeaderValue> {
    let mut cookie = format!("{SESSION_COOKIE_NAME}={token}; Path=/; HttpOnly; SameSite=Lax");
    // Only mark cookies secure when the frontend is served over HTTPS.
    if config.session_cookie_secure() {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie).ok()
}

pub(crate) fn clear_session_cookie(config: &AuthConfig) -> Option<HeaderValue> {
    let mut cookie = format!("{SESSION_COOKIE_NAME}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0");
    if config.session_cookie_secure() {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie).ok()
}

pub(crate) fn extract_session_token(headers: &HeaderMap) -> Option<String> {
    if let Some(token) = extract_bearer_token(headers) {
        return Some(token);
    }
    let value = headers.get(COOKIE)?.to_str().ok()?;
    value.split(';').find_map(|pair| {
        let (key, val) = pair.trim().split_once('=')?;
        (key.trim() == SESSION_COOKIE_NAME && !val.trim().is_empty())
            .then(|| val.trim().to_string())
    })
}

fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let trimmed = value.trim();
    let token = trimmed
        .strip_prefix("Bearer ")
        .or_else(|| trimmed.strip_prefix("bearer "))?
        .trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

/// Resolve the presented token and attach the identity. Never rejects.
pub async fn attach_identity(
    Extension(state): Extension<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Response {
    let token = extract_session_token(request.headers());
    let identity = state.gate().attach_identity(token.as_deref()).await;
    request.extensions_mut().insert(identity);
    next.run(request).await
}

fn deny(policy: DenyPolicy) -> Response {
    match policy {
        DenyPolicy::Redirect(location) => {
            (StatusCode::FOUND, [(LOCATION, location)]).into_response()
        }
        DenyPolicy::Unauthorized => StatusCode::UNAUTHORIZED.into_response(),
    }
}

async fn guard(policy: DenyPolicy, request: Request, next: Next) -> Response {
    let identity = request
        .extensions()
        .get::<Identity>()
        .cloned()
        .unwrap_or_default();
    if let Err(policy) = require_identity(&identity, policy) {
        // Stop here: the inner handler must never see an anonymous request.
        return deny(policy);
    }
    next.run(request).await
}

/// Guard for resource endpoints: anonymous requests get 401.
pub async fn require_user(request: Request, next: Next) -> Response {
    guard(DenyPolicy::Unauthorized, request, next).await
}

/// Guard for interactive pages: anonymous requests are sent to sign-in.
pub async fn require_user_or_redirect(request: Request, next: Next) -> Response {
    guard(DenyPolicy::Redirect(SIGN_IN_PATH), request, next).await
}

/// Extractor for handlers that need a user. Rejects anonymous requests with 401
/// before the handler body runs.
#[derive(Clone, Debug)]
pub struct CurrentUser(pub User);

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Identity>()
            .and_then(Identity::user)
            .cloned()
            .map(CurrentUser)
            .ok_or(StatusCode::UNAUTHORIZED)
    }
}
