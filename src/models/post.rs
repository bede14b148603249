//! Post model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{ContentStatus, User};

/// A blog post whose content is a serialized Gutenberg block document.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: i64,
    pub title: String,
    /// URL-safe unique identifier
    pub slug: String,
    /// Serialized block document (comment-delimited markup or a JSON block array)
    pub content: String,
    pub excerpt: Option<String>,
    pub status: ContentStatus,
    /// Set when the post is first published
    pub published_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub author_id: i64,
    /// Embedded author, loaded with the post
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<User>,
}

impl Post {
    pub fn new(title: String, slug: String, content: String, author_id: i64) -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            title,
            slug,
            content,
            excerpt: None,
            status: ContentStatus::Draft,
            published_at: None,
            created_at: now,
            updated_at: now,
            author_id,
            author: None,
        }
    }
}

/// Input for creating a post
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePostInput {
    pub title: String,
    pub slug: String,
    pub content: String,
    #[serde(default)]
    pub excerpt: Option<String>,
    #[serde(default)]
    pub status: Option<ContentStatus>,
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
}

/// Partial update of a post; absent fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePostInput {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub excerpt: Option<String>,
    #[serde(default)]
    pub status: Option<ContentStatus>,
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
}

/// Filters accepted by the post listing
#[derive(Debug, Clone, Default)]
pub struct PostFilter {
    pub status: Option<ContentStatus>,
    /// Substring matched against title and excerpt
    pub search: Option<String>,
}
