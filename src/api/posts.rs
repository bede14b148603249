//! Posts API endpoints
//!
//! Reading is public; writing requires authentication and, for existing
//! posts, ownership or the admin role.

use axum::{
    extract::State,
    routing::{get, post, put},
    Json, Router,
};

use crate::api::common::{ListQuery, DEFAULT_PAGE_SIZE};
use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::api::responses::{success, ApiJson, ApiPath, ApiQuery, ApiResponse, IdResponse};
use crate::models::{CreatePostInput, PagedResult, Post, PostFilter, UpdatePostInput};
use crate::services::RenderedPost;

pub fn public_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_posts))
        .route("/{id}", get(get_post))
}

pub fn protected_router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_post))
        .route("/{id}", put(update_post).delete(delete_post))
}

async fn list_posts(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ListQuery>,
) -> Result<Json<ApiResponse<PagedResult<Post>>>, ApiError> {
    let filter = PostFilter {
        status: query.status(),
        search: query.search(),
    };
    let posts = state
        .post_service
        .list(&filter, &query.params(DEFAULT_PAGE_SIZE))
        .await?;
    Ok(success(posts))
}

async fn get_post(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<ApiResponse<RenderedPost>>, ApiError> {
    Ok(success(state.post_service.get_rendered(id).await?))
}

async fn create_post(
    State(state): State<AppState>,
    AuthenticatedUser(actor): AuthenticatedUser,
    ApiJson(input): ApiJson<CreatePostInput>,
) -> Result<Json<ApiResponse<Post>>, ApiError> {
    Ok(success(state.post_service.create(&actor, input).await?))
}

async fn update_post(
    State(state): State<AppState>,
    AuthenticatedUser(actor): AuthenticatedUser,
    ApiPath(id): ApiPath<i64>,
    ApiJson(input): ApiJson<UpdatePostInput>,
) -> Result<Json<ApiResponse<Post>>, ApiError> {
    Ok(success(state.post_service.update(&actor, id, input).await?))
}

async fn delete_post(
    State(state): State<AppState>,
    AuthenticatedUser(actor): AuthenticatedUser,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<ApiResponse<IdResponse>>, ApiError> {
    let id = state.post_service.delete(&actor, id).await?;
    Ok(success(IdResponse { id }))
}
