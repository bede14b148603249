//! User management API endpoints

use axum::{
    extract::State,
    routing::get,
    Json, Router,
};

use crate::api::common::{ListQuery, DEFAULT_PAGE_SIZE};
use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::api::responses::{success, ApiJson, ApiPath, ApiQuery, ApiResponse, MessageResponse};
use crate::models::{CreateUserInput, PagedResult, UpdateUserInput, User, UserFilter};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_users).post(create_user))
        .route("/{id}", get(get_user).put(update_user).delete(delete_user))
}

async fn list_users(
    State(state): State<AppState>,
    AuthenticatedUser(actor): AuthenticatedUser,
    ApiQuery(query): ApiQuery<ListQuery>,
) -> Result<Json<ApiResponse<PagedResult<User>>>, ApiError> {
    let filter = UserFilter {
        role: query.role(),
        search: query.search(),
    };
    let users = state
        .user_service
        .list(&actor, &filter, &query.params(DEFAULT_PAGE_SIZE))
        .await?;
    Ok(success(users))
}

async fn get_user(
    State(state): State<AppState>,
    AuthenticatedUser(actor): AuthenticatedUser,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<ApiResponse<User>>, ApiError> {
    Ok(success(state.user_service.get_for(&actor, id).await?))
}

async fn create_user(
    State(state): State<AppState>,
    AuthenticatedUser(actor): AuthenticatedUser,
    ApiJson(input): ApiJson<CreateUserInput>,
) -> Result<Json<ApiResponse<User>>, ApiError> {
    Ok(success(state.user_service.create(&actor, input).await?))
}

async fn update_user(
    State(state): State<AppState>,
    AuthenticatedUser(actor): AuthenticatedUser,
    ApiPath(id): ApiPath<i64>,
    ApiJson(input): ApiJson<UpdateUserInput>,
) -> Result<Json<ApiResponse<User>>, ApiError> {
    Ok(success(state.user_service.update(&actor, id, input).await?))
}

async fn delete_user(
    State(state): State<AppState>,
    AuthenticatedUser(actor): AuthenticatedUser,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    state.user_service.delete(&actor, id).await?;
    Ok(success(MessageResponse {
        message: "User deleted successfully".to_string(),
    }))
}
