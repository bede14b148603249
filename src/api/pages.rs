//! Pages API endpoints

use axum::{
    extract::State,
    routing::{get, post, put},
    Json, Router,
};

use crate::api::common::{ListQuery, DEFAULT_PAGE_SIZE};
use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::api::responses::{success, ApiJson, ApiPath, ApiQuery, ApiResponse, IdResponse};
use crate::models::{CreatePageInput, Page, PageFilter, PagedResult, UpdatePageInput};
use crate::services::RenderedPage;

pub fn public_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_pages))
        .route("/{id}", get(get_page))
}

pub fn protected_router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_page))
        .route("/{id}", put(update_page).delete(delete_page))
}

async fn list_pages(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ListQuery>,
) -> Result<Json<ApiResponse<PagedResult<Page>>>, ApiError> {
    let filter = PageFilter {
        status: query.status(),
        search: query.search(),
    };
    let pages = state
        .page_service
        .list(&filter, &query.params(DEFAULT_PAGE_SIZE))
        .await?;
    Ok(success(pages))
}

async fn get_page(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<ApiResponse<RenderedPage>>, ApiError> {
    Ok(success(state.page_service.get_rendered(id).await?))
}

async fn create_page(
    State(state): State<AppState>,
    AuthenticatedUser(actor): AuthenticatedUser,
    ApiJson(input): ApiJson<CreatePageInput>,
) -> Result<Json<ApiResponse<Page>>, ApiError> {
    Ok(success(state.page_service.create(&actor, input).await?))
}

async fn update_page(
    State(state): State<AppState>,
    AuthenticatedUser(actor): AuthenticatedUser,
    ApiPath(id): ApiPath<i64>,
    ApiJson(input): ApiJson<UpdatePageInput>,
) -> Result<Json<ApiResponse<Page>>, ApiError> {
    Ok(success(state.page_service.update(&actor, id, input).await?))
}

async fn delete_page(
    State(state): State<AppState>,
    AuthenticatedUser(actor): AuthenticatedUser,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<ApiResponse<IdResponse>>, ApiError> {
    let id = state.page_service.delete(&actor, id).await?;
    Ok(success(IdResponse { id }))
}
