//! API middleware
//!
//! Contains:
//! - Shared application state
//! - The error type every handler returns, rendered as the response envelope
//! - Bearer token authentication

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::sync::Arc;

use crate::cache::create_cache;
use crate::config::{Config, UploadConfig};
use crate::db::repositories::{
    SqlxMediaRepository, SqlxPageRepository, SqlxPostRepository, SqlxUserRepository,
};
use crate::db::DynDatabasePool;
use crate::models::Actor;
use crate::services::{
    bearer_token, ContentRenderer, MediaService, PageService, PostService, ServiceError,
    TokenService, UserService,
};

/// Application state containing shared services
#[derive(Clone)]
pub struct AppState {
    pub pool: DynDatabasePool,
    pub user_service: Arc<UserService>,
    pub post_service: Arc<PostService>,
    pub page_service: Arc<PageService>,
    pub media_service: Arc<MediaService>,
    pub tokens: Arc<TokenService>,
    pub upload_config: Arc<UploadConfig>,
}

impl AppState {
    /// Wire repositories and services over a migrated pool.
    pub fn new(pool: DynDatabasePool, config: &Config, tokens: TokenService) -> Self {
        let tokens = Arc::new(tokens);
        let upload_config = Arc::new(config.upload.clone());
        let renderer = ContentRenderer::new(create_cache(&config.cache));

        let user_repo = SqlxUserRepository::boxed(pool.clone());
        let post_repo = SqlxPostRepository::boxed(pool.clone());
        let page_repo = SqlxPageRepository::boxed(pool.clone());
        let media_repo = SqlxMediaRepository::boxed(pool.clone());

        let user_service = Arc::new(UserService::new(
            user_repo,
            post_repo.clone(),
            page_repo.clone(),
            media_repo.clone(),
            tokens.clone(),
        ));
        let post_service = Arc::new(PostService::new(post_repo, renderer.clone()));
        let page_service = Arc::new(PageService::new(page_repo, renderer));
        let media_service = Arc::new(MediaService::new(media_repo, upload_config.clone()));

        Self {
            pool,
            user_service,
            post_service,
            page_service,
            media_service,
            tokens,
            upload_config,
        }
    }
}

/// Authenticated user extracted from request
#[derive(Debug, Clone, Copy)]
pub struct AuthenticatedUser(pub Actor);

/// Error response, serialized as `{ "success": false, "error": "..." }`
#[derive(Debug, Clone)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    success: bool,
    error: &'a str,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn validation_error(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            success: false,
            error: &self.message,
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::NotFound(m) => Self::not_found(m),
            ServiceError::Validation(m) => Self::validation_error(m),
            ServiceError::Forbidden(m) => Self::forbidden(m),
            ServiceError::Unauthorized(m) => Self::unauthorized(m),
            ServiceError::Internal(e) => {
                tracing::error!("Internal error: {:#}", e);
                Self::internal_error("Internal server error")
            }
        }
    }
}

/// Authentication middleware
///
/// Verifies the bearer token and stores the caller in the request
/// extensions. The token carries id and role, so no database lookup happens.
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(bearer_token)
        .ok_or_else(|| ApiError::unauthorized("Access token required"))?;

    let claims = state.tokens.verify(token).map_err(|e| {
        tracing::debug!("Rejected access token: {}", e);
        ApiError::unauthorized("Invalid or expired token")
    })?;

    request
        .extensions_mut()
        .insert(AuthenticatedUser(Actor::new(claims.user_id, claims.role)));
    Ok(next.run(request).await)
}

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .copied()
            .ok_or_else(|| ApiError::unauthorized("Authentication required"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_errors_map_to_status_codes() {
        let cases = [
            (ServiceError::not_found("x"), StatusCode::NOT_FOUND),
            (ServiceError::validation("x"), StatusCode::BAD_REQUEST),
            (ServiceError::forbidden("x"), StatusCode::FORBIDDEN),
            (ServiceError::unauthorized("x"), StatusCode::UNAUTHORIZED),
        ];
        for (err, status) in cases {
            let api: ApiError = err.into();
            assert_eq!(api.status, status);
            assert_eq!(api.message, "x");
        }
    }

    #[test]
    fn test_internal_error_hides_details() {
        let api: ApiError = ServiceError::Internal(anyhow::anyhow!("database exploded")).into();
        assert_eq!(api.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(api.message, "Internal server error");
    }
}
