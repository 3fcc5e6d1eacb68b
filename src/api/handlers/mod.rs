pub mod galleries;
pub mod health;
pub mod password_reset;
pub mod session;
pub mod users;

// common helpers for the handlers
use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use tracing::{error, warn};
use utoipa::ToSchema;

use crate::auth::AuthError;

#[derive(ToSchema, Serialize, Debug)]
pub struct ErrorBody {
    pub error: String,
}

pub(crate) fn error_response(status: StatusCode, message: &str) -> Response {
    (
        status,
        Json(ErrorBody {
            error: message.to_string(),
        }),
    )
        .into_response()
}

/// Log the full error server-side and answer with an opaque 500.
///
/// Expected outcomes reaching this point mean a handler missed a mapping, so
/// they are logged at `warn`; infrastructure failures at `error`.
pub(crate) fn internal_error(context: &str, err: &AuthError) -> Response {
    if err.is_expected() {
        warn!("{context}: unmapped outcome: {err}");
    } else {
        error!("{context}: {err:#}");
        if let Some(source) = std::error::Error::source(err) {
            error!("caused by: {source:#}");
        }
    }
    error_response(StatusCode::INTERNAL_SERVER_ERROR, "Something went wrong")
}
