//! Forgot-password and reset-password endpoints.
//!
//! Flow Overview:
//! 1) `POST /v1/forgot-pw` issues a ticket and emails a link with the raw token.
//! 2) `GET /v1/reset-pw?token=` tells the frontend whether the link is live.
//! 3) `POST /v1/reset-pw` consumes the ticket, sets the password, and signs in.
//!
//! Unknown emails get the same "Invalid data provided" answer as malformed
//! input so the endpoint does not confirm which addresses are registered.

use axum::{
    extract::{Extension, Query},
    http::{header::SET_COOKIE, HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::{IntoParams, ToSchema};

use super::{
    error_response, internal_error,
    session::session_cookie,
    users::UserResponse,
};
use crate::api::{
    email::{build_reset_url, forgot_password_message},
    state::AppState,
};
use crate::auth::{users::normalize_email, AuthError};

#[derive(ToSchema, Deserialize, Debug)]
#[serde(deny_unknown_fields)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

#[derive(ToSchema, Serialize, Debug)]
pub struct ForgotPasswordResponse {
    pub message: String,
}

#[derive(IntoParams, Deserialize, Debug)]
#[into_params(parameter_in = Query)]
pub struct TokenQuery {
    pub token: Option<String>,
}

#[derive(ToSchema, Deserialize, Debug)]
#[serde(deny_unknown_fields)]
pub struct ResetPasswordRequest {
    pub token: String,
    pub password: String,
}

#[utoipa::path(
    post,
    path = "/v1/forgot-pw",
    request_body = ForgotPasswordRequest,
    responses(
        (status = 202, description = "Reset email sent", body = ForgotPasswordResponse),
        (status = 400, description = "Invalid data provided")
    ),
    tag = "password-reset"
)]
pub async fn forgot_password(
    state: Extension<Arc<AppState>>,
    Json(request): Json<ForgotPasswordRequest>,
) -> Response {
    let ticket = match state.resets().issue(&request.email).await {
        Ok(ticket) => ticket,
        Err(AuthError::UserNotFound) => {
            return error_response(StatusCode::BAD_REQUEST, "Invalid data provided");
        }
        Err(err) => return internal_error("Failed to issue password reset", &err),
    };

    let reset_url = build_reset_url(state.config().frontend_base_url(), ticket.token());
    let message = forgot_password_message(
        state.config().email_from(),
        &normalize_email(&request.email),
        &reset_url,
    );
    if let Err(err) = state.email().send(&message) {
        return internal_error("Failed to send reset email", &AuthError::Delivery(err));
    }

    (
        StatusCode::ACCEPTED,
        Json(ForgotPasswordResponse {
            message: "Check your email".to_string(),
        }),
    )
        .into_response()
}

#[utoipa::path(
    get,
    path = "/v1/reset-pw",
    params(TokenQuery),
    responses(
        (status = 204, description = "Reset link is live"),
        (status = 400, description = "Unknown reset link"),
        (status = 410, description = "Reset link expired")
    ),
    tag = "password-reset"
)]
pub async fn check_reset_token(
    state: Extension<Arc<AppState>>,
    Query(query): Query<TokenQuery>,
) -> Response {
    let Some(token) = query.token.filter(|t| !t.is_empty()) else {
        return error_response(StatusCode::BAD_REQUEST, "Invalid credentials");
    };
    match state.resets().check_valid(&token).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(AuthError::NotFound) => error_response(StatusCode::BAD_REQUEST, "Invalid credentials"),
        Err(AuthError::Expired) => error_response(StatusCode::GONE, "Link expired"),
        Err(err) => internal_error("Failed to check password reset", &err),
    }
}

#[utoipa::path(
    post,
    path = "/v1/reset-pw",
    request_body = ResetPasswordRequest,
    responses(
        (status = 200, description = "Password updated and signed in", body = UserResponse),
        (status = 400, description = "Invalid information provided"),
        (status = 410, description = "Reset link expired")
    ),
    tag = "password-reset"
)]
pub async fn reset_password(
    state: Extension<Arc<AppState>>,
    Json(request): Json<ResetPasswordRequest>,
) -> Response {
    let (user, session) = match state
        .resets()
        .complete(&request.token, &request.password, state.sessions())
        .await
    {
        Ok(completed) => completed,
        Err(AuthError::NotFound) => {
            return error_response(StatusCode::BAD_REQUEST, "Invalid information provided");
        }
        Err(AuthError::Expired) => return error_response(StatusCode::GONE, "Link expired"),
        Err(AuthError::InvalidInput(reason)) => {
            return error_response(StatusCode::BAD_REQUEST, reason);
        }
        Err(err) => return internal_error("Failed to reset password", &err),
    };

    let mut headers = HeaderMap::new();
    if let Some(cookie) = session_cookie(state.config(), session.token()) {
        headers.insert(SET_COOKIE, cookie);
    }
    (StatusCode::OK, headers, Json(UserResponse::from(&user))).into_response()
}
