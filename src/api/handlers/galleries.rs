//! Gallery endpoints. Reads by id are public; everything else runs behind the
//! identity guard and mutations additionally check ownership.

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::debug;
use utoipa::ToSchema;

use super::{error_response, internal_error, session::CurrentUser};
use crate::api::state::AppState;
use crate::auth::{authorize_owner, AuthError};
use crate::store::{Gallery, GalleryId, User};

#[derive(ToSchema, Deserialize, Debug)]
#[serde(deny_unknown_fields)]
pub struct GalleryRequest {
    pub title: String,
}

fn valid_title(title: &str) -> Option<&str> {
    let title = title.trim();
    (!title.is_empty()).then_some(title)
}

/// Load a gallery and confirm `user` owns it, mapping failures to responses.
async fn owned_gallery(
    state: &AppState,
    user: &User,
    gallery_id: GalleryId,
) -> Result<Gallery, Response> {
    let gallery = match state.galleries().gallery_by_id(gallery_id).await {
        Ok(Some(gallery)) => gallery,
        Ok(None) => return Err(error_response(StatusCode::NOT_FOUND, "Gallery not found")),
        Err(err) => return Err(internal_error("Failed to load gallery", &err)),
    };
    match authorize_owner(user, gallery.user_id) {
        Ok(()) => Ok(gallery),
        Err(AuthError::Forbidden) => {
            debug!(gallery_id, user_id = user.id, "gallery ownership check failed");
            Err(error_response(
                StatusCode::FORBIDDEN,
                "You do not have permission to edit this gallery",
            ))
        }
        Err(err) => Err(internal_error("Failed to authorize gallery access", &err)),
    }
}

#[utoipa::path(
    get,
    path = "/v1/galleries/{id}",
    params(("id" = i64, Path, description = "Gallery id")),
    responses(
        (status = 200, description = "Gallery", body = Gallery),
        (status = 404, description = "Gallery not found")
    ),
    tag = "galleries"
)]
pub async fn show(state: Extension<Arc<AppState>>, Path(gallery_id): Path<GalleryId>) -> Response {
    match state.galleries().gallery_by_id(gallery_id).await {
        Ok(Some(gallery)) => Json(gallery).into_response(),
        Ok(None) => error_response(StatusCode::NOT_FOUND, "Gallery not found"),
        Err(err) => internal_error("Failed to load gallery", &err),
    }
}

#[utoipa::path(
    get,
    path = "/v1/galleries",
    responses(
        (status = 200, description = "Galleries owned by the current user", body = [Gallery]),
        (status = 401, description = "Not signed in")
    ),
    tag = "galleries"
)]
pub async fn list(state: Extension<Arc<AppState>>, CurrentUser(user): CurrentUser) -> Response {
    match state.galleries().galleries_by_user_id(user.id).await {
        Ok(galleries) => Json(galleries).into_response(),
        Err(err) => internal_error("Failed to list galleries", &err),
    }
}

#[utoipa::path(
    post,
    path = "/v1/galleries",
    request_body = GalleryRequest,
    responses(
        (status = 201, description = "Gallery created", body = Gallery),
        (status = 400, description = "Missing title"),
        (status = 401, description = "Not signed in")
    ),
    tag = "galleries"
)]
pub async fn create(
    state: Extension<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Json(request): Json<GalleryRequest>,
) -> Response {
    let Some(title) = valid_title(&request.title) else {
        return error_response(StatusCode::BAD_REQUEST, "Title is required");
    };
    match state.galleries().create_gallery(user.id, title).await {
        Ok(gallery) => (StatusCode::CREATED, Json(gallery)).into_response(),
        Err(err) => internal_error("Failed to create gallery", &err),
    }
}

#[utoipa::path(
    post,
    path = "/v1/galleries/{id}",
    params(("id" = i64, Path, description = "Gallery id")),
    request_body = GalleryRequest,
    responses(
        (status = 200, description = "Gallery renamed", body = Gallery),
        (status = 401, description = "Not signed in"),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Gallery not found")
    ),
    tag = "galleries"
)]
pub async fn update(
    state: Extension<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(gallery_id): Path<GalleryId>,
    Json(request): Json<GalleryRequest>,
) -> Response {
    let mut gallery = match owned_gallery(&state, &user, gallery_id).await {
        Ok(gallery) => gallery,
        Err(response) => return response,
    };
    let Some(title) = valid_title(&request.title) else {
        return error_response(StatusCode::BAD_REQUEST, "Title is required");
    };
    if let Err(err) = state.galleries().update_gallery_title(gallery.id, title).await {
        return internal_error("Failed to update gallery", &err);
    }
    gallery.title = title.to_string();
    Json(gallery).into_response()
}

#[utoipa::path(
    post,
    path = "/v1/galleries/{id}/delete",
    params(("id" = i64, Path, description = "Gallery id")),
    responses(
        (status = 204, description = "Gallery deleted"),
        (status = 401, description = "Not signed in"),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Gallery not found")
    ),
    tag = "galleries"
)]
pub async fn delete(
    state: Extension<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(gallery_id): Path<GalleryId>,
) -> Response {
    let gallery = match owned_gallery(&state, &user, gallery_id).await {
        Ok(gallery) => gallery,
        Err(response) => return response,
    };
    match state.galleries().delete_gallery(gallery.id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => internal_error("Failed to delete gallery", &err),
    }
}
