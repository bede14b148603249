//! Media model
//!
//! A media row describes an uploaded file. The bytes live on disk under the
//! configured upload directory and are served from `url`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::User;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Media {
    pub id: i64,
    /// Stored file name, unique within the upload directory
    pub filename: String,
    /// File name as sent by the client
    pub original_name: String,
    pub mime_type: String,
    /// Size in bytes
    pub size: i64,
    /// Public URL, `/uploads/<filename>`
    pub url: String,
    pub alt: Option<String>,
    pub caption: Option<String>,
    pub created_at: DateTime<Utc>,
    pub author_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<User>,
}

impl Media {
    pub fn new(filename: String, original_name: String, mime_type: String, size: i64, author_id: i64) -> Self {
        let url = format!("/uploads/{}", filename);
        Self {
            id: 0,
            filename,
            original_name,
            mime_type,
            size,
            url,
            alt: None,
            caption: None,
            created_at: Utc::now(),
            author_id,
            author: None,
        }
    }
}

/// Metadata update; absent fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateMediaInput {
    #[serde(default)]
    pub alt: Option<String>,
    #[serde(default)]
    pub caption: Option<String>,
}

/// Filters accepted by the media listing
#[derive(Debug, Clone, Default)]
pub struct MediaFilter {
    /// MIME type prefix, e.g. `image` or `image/png`
    pub mime_prefix: Option<String>,
    /// Substring matched against original name, alt text and caption
    pub search: Option<String>,
}
