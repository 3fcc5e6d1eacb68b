use anyhow::{Context, Result};
use axum::{
    body::Body,
    extract::MatchedPath,
    http::{HeaderName, HeaderValue, Request},
    middleware,
    routing::{get, post},
    Extension, Router,
};
use sqlx::postgres::PgPoolOptions;
use std::{sync::Arc, time::Duration};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    request_id::PropagateRequestIdLayer, set_header::SetRequestHeaderLayer, trace::TraceLayer,
};
use tracing::{info, info_span, Span};
use ulid::Ulid;

use crate::auth::{AuthConfig, SystemClock};
use crate::store::{postgres::apply_schema, PgCredentialStore};
use handlers::{galleries, health, password_reset, session, users};

pub mod email;
pub mod handlers;
pub mod openapi;
pub mod state;

pub use state::AppState;

/// Build the HTTP router.
///
/// Every request first passes `attach_identity`; routes that need a user add a
/// guard (`require_user` answers 401, `require_user_or_redirect` answers 302).
pub fn router(state: Arc<AppState>) -> Router {
    let protected = Router::new()
        .route(
            "/v1/galleries",
            get(galleries::list).post(galleries::create),
        )
        .route("/v1/galleries/:id/delete", post(galleries::delete))
        .route_layer(middleware::from_fn(session::require_user));

    let interactive = Router::new()
        .route("/v1/users/me", get(users::me))
        .route_layer(middleware::from_fn(session::require_user_or_redirect));

    Router::new()
        .route("/health", get(health::health))
        .route("/openapi.json", get(openapi::openapi_json))
        .route("/v1/users", post(users::signup))
        .route("/v1/signin", post(users::signin))
        .route("/v1/signout", post(users::signout))
        .route("/v1/forgot-pw", post(password_reset::forgot_password))
        .route(
            "/v1/reset-pw",
            get(password_reset::check_reset_token).post(password_reset::reset_password),
        )
        // GET is public; renaming goes through the `CurrentUser` extractor.
        .route(
            "/v1/galleries/:id",
            get(galleries::show).post(galleries::update),
        )
        .merge(protected)
        .merge(interactive)
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestHeaderLayer::if_not_present(
                    HeaderName::from_static("x-request-id"),
                    |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
                ))
                .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                    "x-request-id",
                )))
                .layer(TraceLayer::new_for_http().make_span_with(make_span))
                .layer(Extension(state))
                .layer(middleware::from_fn(session::attach_identity)),
        )
}

/// Start the server
/// # Errors
/// Return error if failed to start the server
pub async fn new(port: u16, dsn: String, auth_config: AuthConfig) -> Result<()> {
    apply_schema(&dsn).await?;

    // Connect to database
    let pool = PgPoolOptions::new()
        .min_connections(1)
        .max_connections(5)
        .max_lifetime(Duration::from_secs(60 * 2))
        .test_before_acquire(true)
        .connect(&dsn)
        .await
        .context("Failed to connect to database")?;

    let state = Arc::new(AppState::new(
        auth_config,
        Arc::new(PgCredentialStore::new(pool)),
        Arc::new(SystemClock),
        Arc::new(email::LogEmailSender),
    ));

    let app = router(state);

    let listener = TcpListener::bind(format!("::0:{port}")).await?;

    info!("Listening on [::]:{}", port);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(async {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Gracefully shutdown");
            }
        })
        .await?;

    Ok(())
}

fn make_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");
    let matched_path = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| request.uri().path(), MatchedPath::as_str);

    info_span!(
        "http.request",
        http.method = %request.method(),
        http.route = matched_path,
        request_id
    )
}
