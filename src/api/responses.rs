//! Response envelope and request extractors
//!
//! Every endpoint answers with `{ "success": bool, "data"?: T, "error"?: string }`.
//! Failures are produced by [`ApiError`]; the extractors here make sure that
//! malformed bodies, path parameters and query strings come back in the same
//! envelope.

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        FromRequest, FromRequestParts,
    },
    Json,
};
use serde::Serialize;

use crate::api::middleware::ApiError;

/// Message returned for bodies or parameters that cannot be decoded
pub const INVALID_REQUEST: &str = "Invalid request data";

/// Successful response envelope
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

/// Wrap `data` in a successful envelope.
pub fn success<T: Serialize>(data: T) -> Json<ApiResponse<T>> {
    Json(ApiResponse {
        success: true,
        data: Some(data),
    })
}

/// A successful envelope without data
pub fn ok() -> Json<ApiResponse<()>> {
    Json(ApiResponse {
        success: true,
        data: None,
    })
}

/// `{ "id": ... }`, returned by content deletions
#[derive(Debug, Serialize)]
pub struct IdResponse {
    pub id: i64,
}

/// `{ "message": ... }`
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

/// JSON body extractor whose rejection is an enveloped 400
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

/// Path extractor whose rejection is an enveloped 400
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ApiError))]
pub struct ApiPath<T>(pub T);

/// Query string extractor whose rejection is an enveloped 400
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct ApiQuery<T>(pub T);

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        tracing::debug!("Rejected request body: {}", rejection.body_text());
        ApiError::validation_error(INVALID_REQUEST)
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        tracing::debug!("Rejected path parameters: {}", rejection.body_text());
        ApiError::validation_error(INVALID_REQUEST)
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        tracing::debug!("Rejected query string: {}", rejection.body_text());
        ApiError::validation_error(INVALID_REQUEST)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_shape() {
        let json = serde_json::to_value(success(IdResponse { id: 7 }).0).unwrap();
        assert_eq!(json, serde_json::json!({ "success": true, "data": { "id": 7 } }));

        let json = serde_json::to_value(ok().0).unwrap();
        assert_eq!(json, serde_json::json!({ "success": true }));
    }
}
