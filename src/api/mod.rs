//! API layer - HTTP handlers and routing
//!
//! All endpoints live under `/api` and answer with the envelope from
//! [`responses`]:
//! - Auth: login, current user, token refresh
//! - Posts and pages: public reads, authenticated writes
//! - Media: authenticated library with multipart upload
//! - Users: admin-managed accounts
//! - Health check and frontend log forwarding
//!
//! Uploaded files are served from `/uploads`.

pub mod auth;
pub mod common;
pub mod media;
pub mod middleware;
pub mod pages;
pub mod posts;
pub mod responses;
pub mod system;
pub mod users;

use anyhow::Context;
use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method},
    middleware as axum_middleware, Router,
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

pub use middleware::{ApiError, AppState, AuthenticatedUser};

/// Extra room on top of the file size cap for multipart framing
const MULTIPART_OVERHEAD: usize = 1024 * 1024;

/// Build the `/api` router
pub fn build_api_router(state: AppState) -> Router<AppState> {
    let upload_limit = usize::try_from(state.upload_config.max_file_size)
        .unwrap_or(usize::MAX)
        .saturating_add(MULTIPART_OVERHEAD);

    // Protected routes (need a valid bearer token)
    let protected_routes = Router::new()
        .nest("/auth", auth::protected_router())
        .nest("/posts", posts::protected_router())
        .nest("/pages", pages::protected_router())
        .nest("/media", media::router().layer(DefaultBodyLimit::max(upload_limit)))
        .nest("/users", users::router())
        .route_layer(axum_middleware::from_fn_with_state(
            state,
            middleware::require_auth,
        ));

    // Public routes
    Router::new()
        .nest("/auth", auth::public_router())
        .nest("/posts", posts::public_router())
        .nest("/pages", pages::public_router())
        .merge(system::router())
        .merge(protected_routes)
        .fallback(not_found)
}

async fn not_found() -> ApiError {
    ApiError::not_found("Not found")
}

/// Build the complete router with middleware
pub fn build_router(state: AppState, cors_origin: &str) -> anyhow::Result<Router> {
    let origin = cors_origin
        .parse::<HeaderValue>()
        .with_context(|| format!("Invalid CORS origin: {}", cors_origin))?;

    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_credentials(true);

    let uploads = ServeDir::new(&state.upload_config.path);

    Ok(Router::new()
        .nest("/api", build_api_router(state.clone()))
        .nest_service("/uploads", uploads)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state))
}
