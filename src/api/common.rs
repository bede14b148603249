//! Common API utilities and shared types
//!
//! Listing query strings are parsed leniently: a value that does not parse
//! is treated as absent instead of failing the request.

use serde::Deserialize;

use crate::models::{ContentStatus, ListParams, UserRole};

/// Default page size for post, page and user listings
pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// Default page size for the media library
pub const DEFAULT_MEDIA_PAGE_SIZE: u32 = 20;

/// Query parameters accepted by the listing endpoints
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub page: Option<String>,
    pub limit: Option<String>,
    pub status: Option<String>,
    pub search: Option<String>,
    pub role: Option<String>,
    #[serde(rename = "type")]
    pub mime_type: Option<String>,
}

impl ListQuery {
    pub fn params(&self, default_limit: u32) -> ListParams {
        ListParams::from_query(self.page.as_deref(), self.limit.as_deref(), default_limit)
    }

    pub fn search(&self) -> Option<String> {
        non_empty(&self.search)
    }

    pub fn status(&self) -> Option<ContentStatus> {
        self.status.as_deref().and_then(|s| s.parse().ok())
    }

    pub fn role(&self) -> Option<UserRole> {
        self.role.as_deref().and_then(|r| r.parse().ok())
    }

    pub fn mime_prefix(&self) -> Option<String> {
        non_empty(&self.mime_type)
    }
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
