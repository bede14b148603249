//! Page model
//!
//! Pages are standalone documents. Unlike posts they carry no excerpt and no
//! publication timestamp.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{ContentStatus, User};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    pub id: i64,
    pub title: String,
    pub slug: String,
    /// Serialized block document
    pub content: String,
    pub status: ContentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub author_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<User>,
}

impl Page {
    pub fn new(title: String, slug: String, content: String, author_id: i64) -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            title,
            slug,
            content,
            status: ContentStatus::Draft,
            created_at: now,
            updated_at: now,
            author_id,
            author: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePageInput {
    pub title: String,
    pub slug: String,
    pub content: String,
    #[serde(default)]
    pub status: Option<ContentStatus>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePageInput {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub status: Option<ContentStatus>,
}

/// Filters accepted by the page listing
#[derive(Debug, Clone, Default)]
pub struct PageFilter {
    pub status: Option<ContentStatus>,
    /// Substring matched against the title
    pub search: Option<String>,
}
