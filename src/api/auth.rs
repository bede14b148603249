//! Authentication API endpoints
//!
//! - POST /api/auth/login - Exchange credentials for an access token
//! - GET /api/auth/me - Current user
//! - POST /api/auth/refresh - New token for the current caller

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::api::responses::{success, ApiJson, ApiResponse};
use crate::models::User;
use crate::services::LoginResult;

/// Request body for login. `username` may also hold the email address.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub token: String,
}

/// Build public auth routes (no auth required)
pub fn public_router() -> Router<AppState> {
    Router::new().route("/login", post(login))
}

/// Build protected auth routes (requires auth middleware)
pub fn protected_router() -> Router<AppState> {
    Router::new()
        .route("/me", get(get_current_user))
        .route("/refresh", post(refresh))
}

/// POST /api/auth/login
async fn login(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<LoginRequest>,
) -> Result<Json<ApiResponse<LoginResult>>, ApiError> {
    let result = state.user_service.login(&body.username, &body.password).await?;
    Ok(success(result))
}

/// GET /api/auth/me
async fn get_current_user(
    State(state): State<AppState>,
    AuthenticatedUser(actor): AuthenticatedUser,
) -> Result<Json<ApiResponse<User>>, ApiError> {
    Ok(success(state.user_service.get(actor.id).await?))
}

/// POST /api/auth/refresh
async fn refresh(
    State(state): State<AppState>,
    AuthenticatedUser(actor): AuthenticatedUser,
) -> Json<ApiResponse<TokenResponse>> {
    success(TokenResponse {
        token: state.user_service.refresh(&actor),
    })
}
