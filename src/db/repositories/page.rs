//! Page repository

use super::{author_from_row, like_pattern, mysql, sqlite, Conditions, RowExt, AUTHOR_COLUMNS};
use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::{ContentStatus, ListParams, Page, PageFilter};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::str::FromStr;
use std::sync::Arc;

#[async_trait]
pub trait PageRepository: Send + Sync {
    async fn create(&self, page: &Page) -> Result<Page>;
    async fn get_by_id(&self, id: i64) -> Result<Option<Page>>;
    async fn slug_exists(&self, slug: &str, exclude_id: Option<i64>) -> Result<bool>;
    async fn update(&self, page: &Page) -> Result<Page>;
    async fn delete(&self, id: i64) -> Result<bool>;
    async fn list(&self, filter: &PageFilter, params: &ListParams) -> Result<(Vec<Page>, i64)>;
    async fn count_by_author(&self, author_id: i64) -> Result<i64>;
}

pub struct SqlxPageRepository {
    pool: DynDatabasePool,
}

impl SqlxPageRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn PageRepository> {
        Arc::new(Self::new(pool))
    }
}

fn select_page() -> String {
    format!(
        "SELECT p.id, p.title, p.slug, p.content, p.status, p.created_at, p.updated_at, p.author_id, {} \
         FROM pages p LEFT JOIN users u ON u.id = p.author_id",
        AUTHOR_COLUMNS
    )
}

#[async_trait]
impl PageRepository for SqlxPageRepository {
    async fn create(&self, page: &Page) -> Result<Page> {
        let now = Utc::now();
        let sql = r#"
            INSERT INTO pages (title, slug, content, status, author_id, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
        "#;

        let id = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(sql)
                .bind(&page.title)
                .bind(&page.slug)
                .bind(&page.content)
                .bind(page.status.as_str())
                .bind(page.author_id)
                .bind(now)
                .bind(now)
                .execute(sqlite(&self.pool)?)
                .await
                .context("Failed to create page")?
                .last_insert_rowid(),
            DatabaseDriver::Mysql => sqlx::query(sql)
                .bind(&page.title)
                .bind(&page.slug)
                .bind(&page.content)
                .bind(page.status.as_str())
                .bind(page.author_id)
                .bind(now)
                .bind(now)
                .execute(mysql(&self.pool)?)
                .await
                .context("Failed to create page")?
                .last_insert_id() as i64,
        };

        self.get_by_id(id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Page not found after insert"))
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Page>> {
        let sql = format!("{} WHERE p.id = ?", select_page());

        match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(&sql)
                .bind(id)
                .fetch_optional(sqlite(&self.pool)?)
                .await
                .context("Failed to get page by ID")?
                .map(|row| row_to_page(&row))
                .transpose(),
            DatabaseDriver::Mysql => sqlx::query(&sql)
                .bind(id)
                .fetch_optional(mysql(&self.pool)?)
                .await
                .context("Failed to get page by ID")?
                .map(|row| row_to_page(&row))
                .transpose(),
        }
    }

    async fn slug_exists(&self, slug: &str, exclude_id: Option<i64>) -> Result<bool> {
        let sql = "SELECT COUNT(*) AS count FROM pages WHERE slug = ? AND id <> ?";
        let exclude_id = exclude_id.unwrap_or(0);

        let count = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(sql)
                .bind(slug)
                .bind(exclude_id)
                .fetch_one(sqlite(&self.pool)?)
                .await
                .context("Failed to check page slug")?
                .int("count")?,
            DatabaseDriver::Mysql => sqlx::query(sql)
                .bind(slug)
                .bind(exclude_id)
                .fetch_one(mysql(&self.pool)?)
                .await
                .context("Failed to check page slug")?
                .int("count")?,
        };

        Ok(count > 0)
    }

    async fn update(&self, page: &Page) -> Result<Page> {
        let now = Utc::now();
        let sql = "UPDATE pages SET title = ?, slug = ?, content = ?, status = ?, updated_at = ? WHERE id = ?";

        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                sqlx::query(sql)
                    .bind(&page.title)
                    .bind(&page.slug)
                    .bind(&page.content)
                    .bind(page.status.as_str())
                    .bind(now)
                    .bind(page.id)
                    .execute(sqlite(&self.pool)?)
                    .await
                    .context("Failed to update page")?;
            }
            DatabaseDriver::Mysql => {
                sqlx::query(sql)
                    .bind(&page.title)
                    .bind(&page.slug)
                    .bind(&page.content)
                    .bind(page.status.as_str())
                    .bind(now)
                    .bind(page.id)
                    .execute(mysql(&self.pool)?)
                    .await
                    .context("Failed to update page")?;
            }
        }

        self.get_by_id(page.id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Page not found after update"))
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let sql = "DELETE FROM pages WHERE id = ?";

        let affected = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(sql)
                .bind(id)
                .execute(sqlite(&self.pool)?)
                .await
                .context("Failed to delete page")?
                .rows_affected(),
            DatabaseDriver::Mysql => sqlx::query(sql)
                .bind(id)
                .execute(mysql(&self.pool)?)
                .await
                .context("Failed to delete page")?
                .rows_affected(),
        };

        Ok(affected > 0)
    }

    async fn list(&self, filter: &PageFilter, params: &ListParams) -> Result<(Vec<Page>, i64)> {
        let mut conditions = Conditions::default();
        if let Some(status) = filter.status {
            conditions.push("p.status = ?", [status.as_str().to_string()]);
        }
        if let Some(search) = filter.search.as_deref() {
            conditions.push("p.title LIKE ? ESCAPE '!'", [like_pattern(search)]);
        }

        let where_sql = conditions.sql();
        let list_sql = format!(
            "{}{} ORDER BY p.created_at DESC, p.id DESC LIMIT ? OFFSET ?",
            select_page(),
            where_sql
        );
        let count_sql = format!("SELECT COUNT(*) AS count FROM pages p{}", where_sql);

        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let pool = sqlite(&self.pool)?;

                let mut query = sqlx::query(&list_sql);
                for value in conditions.binds() {
                    query = query.bind(value.as_str());
                }
                let rows = query
                    .bind(params.limit())
                    .bind(params.offset())
                    .fetch_all(pool)
                    .await
                    .context("Failed to list pages")?;

                let mut count_query = sqlx::query(&count_sql);
                for value in conditions.binds() {
                    count_query = count_query.bind(value.as_str());
                }
                let total = count_query
                    .fetch_one(pool)
                    .await
                    .context("Failed to count pages")?
                    .int("count")?;

                let pages = rows.iter().map(row_to_page).collect::<Result<Vec<_>>>()?;
                Ok((pages, total))
            }
            DatabaseDriver::Mysql => {
                let pool = mysql(&self.pool)?;

                let mut query = sqlx::query(&list_sql);
                for value in conditions.binds() {
                    query = query.bind(value.as_str());
                }
                let rows = query
                    .bind(params.limit())
                    .bind(params.offset())
                    .fetch_all(pool)
                    .await
                    .context("Failed to list pages")?;

                let mut count_query = sqlx::query(&count_sql);
                for value in conditions.binds() {
                    count_query = count_query.bind(value.as_str());
                }
                let total = count_query
                    .fetch_one(pool)
                    .await
                    .context("Failed to count pages")?
                    .int("count")?;

                let pages = rows.iter().map(row_to_page).collect::<Result<Vec<_>>>()?;
                Ok((pages, total))
            }
        }
    }

    async fn count_by_author(&self, author_id: i64) -> Result<i64> {
        let sql = "SELECT COUNT(*) AS count FROM pages WHERE author_id = ?";

        match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(sql)
                .bind(author_id)
                .fetch_one(sqlite(&self.pool)?)
                .await
                .context("Failed to count pages by author")?
                .int("count"),
            DatabaseDriver::Mysql => sqlx::query(sql)
                .bind(author_id)
                .fetch_one(mysql(&self.pool)?)
                .await
                .context("Failed to count pages by author")?
                .int("count"),
        }
    }
}

fn row_to_page(row: &impl RowExt) -> Result<Page> {
    let status_str = row.text("status")?;
    let status = ContentStatus::from_str(&status_str)
        .with_context(|| format!("Invalid status in database: {}", status_str))?;
    let author_id = row.int("author_id")?;

    Ok(Page {
        id: row.int("id")?,
        title: row.text("title")?,
        slug: row.text("slug")?,
        content: row.text("content")?,
        status,
        created_at: row.timestamp("created_at")?,
        updated_at: row.timestamp("updated_at")?,
        author_id,
        author: author_from_row(row, author_id)?,
    })
}
