//! Media library API endpoints
//!
//! All routes require authentication. Uploads are multipart/form-data with a
//! single file field named "file".

use axum::{
    extract::{
        multipart::{Multipart, MultipartError, MultipartRejection},
        State,
    },
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};

use crate::api::common::{ListQuery, DEFAULT_MEDIA_PAGE_SIZE};
use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::api::responses::{success, ApiJson, ApiPath, ApiQuery, ApiResponse, IdResponse, INVALID_REQUEST};
use crate::models::{Media, MediaFilter, PagedResult, UpdateMediaInput};
use crate::services::UploadedFile;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_media))
        .route("/upload", post(upload_media))
        .route("/{id}", get(get_media).put(update_media).delete(delete_media))
}

async fn list_media(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ListQuery>,
) -> Result<Json<ApiResponse<PagedResult<Media>>>, ApiError> {
    let filter = MediaFilter {
        mime_prefix: query.mime_prefix(),
        search: query.search(),
    };
    let media = state
        .media_service
        .list(&filter, &query.params(DEFAULT_MEDIA_PAGE_SIZE))
        .await?;
    Ok(success(media))
}

async fn get_media(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<ApiResponse<Media>>, ApiError> {
    Ok(success(state.media_service.get(id).await?))
}

/// POST /api/media/upload
async fn upload_media(
    State(state): State<AppState>,
    AuthenticatedUser(actor): AuthenticatedUser,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<ApiResponse<Media>>, ApiError> {
    let mut multipart = multipart.map_err(|e| {
        tracing::debug!("Rejected upload: {}", e.body_text());
        ApiError::validation_error(INVALID_REQUEST)
    })?;

    while let Some(field) = multipart.next_field().await.map_err(read_error)? {
        if field.name() != Some("file") {
            continue;
        }

        let original_name = field
            .file_name()
            .map(|s| s.to_string())
            .unwrap_or_else(|| "unknown".to_string());
        let mime_type = field
            .content_type()
            .map(|s| s.to_string())
            .unwrap_or_else(|| "application/octet-stream".to_string());
        let data = field.bytes().await.map_err(read_error)?;

        let media = state
            .media_service
            .upload(
                &actor,
                UploadedFile {
                    original_name,
                    mime_type,
                    data: &data,
                },
            )
            .await?;
        return Ok(success(media));
    }

    Err(ApiError::validation_error("No file provided"))
}

fn read_error(err: MultipartError) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        return ApiError::validation_error("File size too large");
    }
    tracing::warn!("Failed to read upload: {}", err.body_text());
    ApiError::internal_error("Upload failed")
}

async fn update_media(
    State(state): State<AppState>,
    AuthenticatedUser(actor): AuthenticatedUser,
    ApiPath(id): ApiPath<i64>,
    ApiJson(input): ApiJson<UpdateMediaInput>,
) -> Result<Json<ApiResponse<Media>>, ApiError> {
    Ok(success(state.media_service.update(&actor, id, input).await?))
}

async fn delete_media(
    State(state): State<AppState>,
    AuthenticatedUser(actor): AuthenticatedUser,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<ApiResponse<IdResponse>>, ApiError> {
    let id = state.media_service.delete(&actor, id).await?;
    Ok(success(IdResponse { id }))
}
