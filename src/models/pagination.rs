//! Pagination parameters and paged results shared by every listing.

use serde::Serialize;

/// Upper bound on `limit` for any listing
pub const MAX_PAGE_SIZE: u32 = 100;

/// Pagination parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListParams {
    /// Page number (1-indexed)
    pub page: u32,
    /// Number of items per page
    pub limit: u32,
}

impl Default for ListParams {
    fn default() -> Self {
        Self { page: 1, limit: 10 }
    }
}

impl ListParams {
    /// Create pagination parameters, clamping out-of-range values
    pub fn new(page: u32, limit: u32) -> Self {
        Self {
            page: page.max(1),
            limit: limit.clamp(1, MAX_PAGE_SIZE),
        }
    }

    /// Build from raw query string values, falling back to defaults for
    /// anything missing or unparsable.
    pub fn from_query(page: Option<&str>, limit: Option<&str>, default_limit: u32) -> Self {
        let page = page.and_then(|p| p.trim().parse::<u32>().ok()).unwrap_or(1);
        let limit = limit
            .and_then(|l| l.trim().parse::<u32>().ok())
            .unwrap_or(default_limit);
        Self::new(page, limit)
    }

    /// Offset for database queries
    pub fn offset(&self) -> i64 {
        (self.page.saturating_sub(1) as i64) * self.limit as i64
    }

    pub fn limit(&self) -> i64 {
        self.limit as i64
    }
}

/// One page of a listing, serialized as
/// `{ items, total, page, limit, totalPages }`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PagedResult<T> {
    pub items: Vec<T>,
    /// Total number of matching items across all pages
    pub total: i64,
    pub page: u32,
    pub limit: u32,
    pub total_pages: i64,
}

impl<T> PagedResult<T> {
    pub fn new(items: Vec<T>, total: i64, params: &ListParams) -> Self {
        let limit = params.limit.max(1) as i64;
        Self {
            items,
            total,
            page: params.page,
            limit: params.limit,
            total_pages: (total + limit - 1) / limit,
        }
    }
}
