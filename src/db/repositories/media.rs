//! Media repository
//!
//! Rows describing uploaded files. The files themselves are managed by
//! `services::media`.

use super::{
    author_from_row, like_pattern, mysql, prefix_pattern, sqlite, Conditions, RowExt, AUTHOR_COLUMNS,
};
use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::{ListParams, Media, MediaFilter};
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::sync::Arc;

#[async_trait]
pub trait MediaRepository: Send + Sync {
    async fn create(&self, media: &Media) -> Result<Media>;
    async fn get_by_id(&self, id: i64) -> Result<Option<Media>>;
    /// Update alt text and caption
    async fn update(&self, media: &Media) -> Result<Media>;
    async fn delete(&self, id: i64) -> Result<bool>;
    /// List media, newest first
    async fn list(&self, filter: &MediaFilter, params: &ListParams) -> Result<(Vec<Media>, i64)>;
    async fn count_by_author(&self, author_id: i64) -> Result<i64>;
}

pub struct SqlxMediaRepository {
    pool: DynDatabasePool,
}

impl SqlxMediaRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn MediaRepository> {
        Arc::new(Self::new(pool))
    }
}

fn select_media() -> String {
    format!(
        "SELECT m.id, m.filename, m.original_name, m.mime_type, m.size, m.url, m.alt, m.caption, \
         m.created_at, m.author_id, {} \
         FROM media m LEFT JOIN users u ON u.id = m.author_id",
        AUTHOR_COLUMNS
    )
}

#[async_trait]
impl MediaRepository for SqlxMediaRepository {
    async fn create(&self, media: &Media) -> Result<Media> {
        let sql = r#"
            INSERT INTO media (filename, original_name, mime_type, size, url, alt, caption, author_id, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#;

        let id = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(sql)
                .bind(&media.filename)
                .bind(&media.original_name)
                .bind(&media.mime_type)
                .bind(media.size)
                .bind(&media.url)
                .bind(&media.alt)
                .bind(&media.caption)
                .bind(media.author_id)
                .bind(media.created_at)
                .execute(sqlite(&self.pool)?)
                .await
                .context("Failed to create media")?
                .last_insert_rowid(),
            DatabaseDriver::Mysql => sqlx::query(sql)
                .bind(&media.filename)
                .bind(&media.original_name)
                .bind(&media.mime_type)
                .bind(media.size)
                .bind(&media.url)
                .bind(&media.alt)
                .bind(&media.caption)
                .bind(media.author_id)
                .bind(media.created_at)
                .execute(mysql(&self.pool)?)
                .await
                .context("Failed to create media")?
                .last_insert_id() as i64,
        };

        self.get_by_id(id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Media not found after insert"))
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Media>> {
        let sql = format!("{} WHERE m.id = ?", select_media());

        match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(&sql)
                .bind(id)
                .fetch_optional(sqlite(&self.pool)?)
                .await
                .context("Failed to get media by ID")?
                .map(|row| row_to_media(&row))
                .transpose(),
            DatabaseDriver::Mysql => sqlx::query(&sql)
                .bind(id)
                .fetch_optional(mysql(&self.pool)?)
                .await
                .context("Failed to get media by ID")?
                .map(|row| row_to_media(&row))
                .transpose(),
        }
    }

    async fn update(&self, media: &Media) -> Result<Media> {
        let sql = "UPDATE media SET alt = ?, caption = ? WHERE id = ?";

        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                sqlx::query(sql)
                    .bind(&media.alt)
                    .bind(&media.caption)
                    .bind(media.id)
                    .execute(sqlite(&self.pool)?)
                    .await
                    .context("Failed to update media")?;
            }
            DatabaseDriver::Mysql => {
                sqlx::query(sql)
                    .bind(&media.alt)
                    .bind(&media.caption)
                    .bind(media.id)
                    .execute(mysql(&self.pool)?)
                    .await
                    .context("Failed to update media")?;
            }
        }

        self.get_by_id(media.id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Media not found after update"))
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let sql = "DELETE FROM media WHERE id = ?";

        let affected = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(sql)
                .bind(id)
                .execute(sqlite(&self.pool)?)
                .await
                .context("Failed to delete media")?
                .rows_affected(),
            DatabaseDriver::Mysql => sqlx::query(sql)
                .bind(id)
                .execute(mysql(&self.pool)?)
                .await
                .context("Failed to delete media")?
                .rows_affected(),
        };

        Ok(affected > 0)
    }

    async fn list(&self, filter: &MediaFilter, params: &ListParams) -> Result<(Vec<Media>, i64)> {
        let mut conditions = Conditions::default();
        if let Some(prefix) = filter.mime_prefix.as_deref() {
            conditions.push("m.mime_type LIKE ? ESCAPE '!'", [prefix_pattern(prefix)]);
        }
        if let Some(search) = filter.search.as_deref() {
            let pattern = like_pattern(search);
            conditions.push(
                "(m.original_name LIKE ? ESCAPE '!' OR m.alt LIKE ? ESCAPE '!' OR m.caption LIKE ? ESCAPE '!')",
                [pattern.clone(), pattern.clone(), pattern],
            );
        }

        let where_sql = conditions.sql();
        let list_sql = format!(
            "{}{} ORDER BY m.created_at DESC, m.id DESC LIMIT ? OFFSET ?",
            select_media(),
            where_sql
        );
        let count_sql = format!("SELECT COUNT(*) AS count FROM media m{}", where_sql);

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
                    .context("Failed to list media")?;

                let mut count_query = sqlx::query(&count_sql);
                for value in conditions.binds() {
                    count_query = count_query.bind(value.as_str());
                }
                let total = count_query
                    .fetch_one(pool)
                    .await
                    .context("Failed to count media")?
                    .int("count")?;

                let items = rows.iter().map(row_to_media).collect::<Result<Vec<_>>>()?;
                Ok((items, total))
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
                    .context("Failed to list media")?;

                let mut count_query = sqlx::query(&count_sql);
                for value in conditions.binds() {
                    count_query = count_query.bind(value.as_str());
                }
                let total = count_query
                    .fetch_one(pool)
                    .await
                    .context("Failed to count media")?
                    .int("count")?;

                let items = rows.iter().map(row_to_media).collect::<Result<Vec<_>>>()?;
                Ok((items, total))
            }
        }
    }

    async fn count_by_author(&self, author_id: i64) -> Result<i64> {
        let sql = "SELECT COUNT(*) AS count FROM media WHERE author_id = ?";

        match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(sql)
                .bind(author_id)
                .fetch_one(sqlite(&self.pool)?)
                .await
                .context("Failed to count media by author")?
                .int("count"),
            DatabaseDriver::Mysql => sqlx::query(sql)
                .bind(author_id)
                .fetch_one(mysql(&self.pool)?)
                .await
                .context("Failed to count media by author")?
                .int("count"),
        }
    }
}

fn row_to_media(row: &impl RowExt) -> Result<Media> {
    let author_id = row.int("author_id")?;

    Ok(Media {
        id: row.int("id")?,
        filename: row.text("filename")?,
        original_name: row.text("original_name")?,
        mime_type: row.text("mime_type")?,
        size: row.int("size")?,
        url: row.text("url")?,
        alt: row.opt_text("alt")?,
        caption: row.opt_text("caption")?,
        created_at: row.timestamp("created_at")?,
        author_id,
        author: author_from_row(row, author_id)?,
    })
}
