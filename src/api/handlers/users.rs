//! Sign-up, sign-in, sign-out, and the current-user endpoint.

use axum::{
    extract::Extension,
    http::{header::SET_COOKIE, HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;
use utoipa::ToSchema;

use super::{
    error_response, internal_error,
    session::{clear_session_cookie, extract_session_token, session_cookie, CurrentUser},
};
use crate::api::state::AppState;
use crate::auth::AuthError;
use crate::store::User;

#[derive(ToSchema, Deserialize, Debug)]
#[serde(deny_unknown_fields)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

#[derive(ToSchema, Serialize, Debug, PartialEq, Eq)]
pub struct UserResponse {
    pub id: i64,
    pub email: String,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
        }
    }
}

/// Mint a session for `user` and answer with `status`, the user body, and the cookie.
async fn signed_in(state: &AppState, user: &User, status: StatusCode) -> Response {
    match state.sessions().create(user.id).await {
        Ok(session) => {
            let mut headers = HeaderMap::new();
            if let Some(cookie) = session_cookie(state.config(), session.token()) {
                headers.insert(SET_COOKIE, cookie);
            }
            (status, headers, Json(UserResponse::from(user))).into_response()
        }
        Err(err) => internal_error("Failed to create session", &err),
    }
}

#[utoipa::path(
    post,
    path = "/v1/users",
    request_body = Credentials,
    responses(
        (status = 201, description = "User created and signed in", body = UserResponse),
        (status = 400, description = "Invalid email or password"),
        (status = 409, description = "Email already registered")
    ),
    tag = "users"
)]
pub async fn signup(
    state: Extension<Arc<AppState>>,
    Json(request): Json<Credentials>,
) -> Response {
    match state.users().create(&request.email, &request.password).await {
        Ok(user) => signed_in(&state, &user, StatusCode::CREATED).await,
        Err(AuthError::EmailTaken) => error_response(
            StatusCode::CONFLICT,
            "That email address is already associated with an account.",
        ),
        Err(AuthError::InvalidInput(reason)) => error_response(StatusCode::BAD_REQUEST, reason),
        Err(err) => internal_error("Failed to create user", &err),
    }
}

#[utoipa::path(
    post,
    path = "/v1/signin",
    request_body = Credentials,
    responses(
        (status = 200, description = "Signed in", body = UserResponse),
        (status = 401, description = "Invalid credentials")
    ),
    tag = "users"
)]
pub async fn signin(
    state: Extension<Arc<AppState>>,
    Json(request): Json<Credentials>,
) -> Response {
    match state
        .users()
        .authenticate(&request.email, &request.password)
        .await
    {
        Ok(user) => signed_in(&state, &user, StatusCode::OK).await,
        Err(AuthError::InvalidCredentials) => {
            debug!("sign-in rejected");
            error_response(StatusCode::UNAUTHORIZED, "Invalid credentials")
        }
        Err(err) => internal_error("Failed to authenticate", &err),
    }
}

#[utoipa::path(
    post,
    path = "/v1/signout",
    responses(
        (status = 204, description = "Session cleared")
    ),
    tag = "users"
)]
pub async fn signout(headers: HeaderMap, state: Extension<Arc<AppState>>) -> Response {
    if let Some(token) = extract_session_token(&headers) {
        if let Err(err) = state.sessions().revoke(&token).await {
            return internal_error("Failed to delete session", &err);
        }
    }

    let mut response_headers = HeaderMap::new();
    if let Some(cookie) = clear_session_cookie(state.config()) {
        response_headers.insert(SET_COOKIE, cookie);
    }
    (StatusCode::NO_CONTENT, response_headers).into_response()
}

#[utoipa::path(
    get,
    path = "/v1/users/me",
    responses(
        (status = 200, description = "Current user", body = UserResponse),
        (status = 302, description = "Not signed in, redirected to sign-in")
    ),
    tag = "users"
)]
pub async fn me(CurrentUser(user): CurrentUser) -> Json<UserResponse> {
    Json(UserResponse::from(&user))
}
