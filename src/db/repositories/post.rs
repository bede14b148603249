//! Post repository
//!
//! Database operations for posts. Every read joins the author so that
//! listings and detail views can embed it without a second query.

use super::{author_from_row, like_pattern, mysql, sqlite, Conditions, RowExt, AUTHOR_COLUMNS};
use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::{ContentStatus, ListParams, Post, PostFilter};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::str::FromStr;
use std::sync::Arc;

/// Post repository trait
#[async_trait]
pub trait PostRepository: Send + Sync {
    /// Insert a post and return it with its author
    async fn create(&self, post: &Post) -> Result<Post>;

    async fn get_by_id(&self, id: i64) -> Result<Option<Post>>;

    /// Whether a post other than `exclude_id` already uses the slug
    async fn slug_exists(&self, slug: &str, exclude_id: Option<i64>) -> Result<bool>;

    /// Update a post and return it with its author
    async fn update(&self, post: &Post) -> Result<Post>;

    /// Delete a post, returning whether a row was removed
    async fn delete(&self, id: i64) -> Result<bool>;

    /// List posts, newest first
    async fn list(&self, filter: &PostFilter, params: &ListParams) -> Result<(Vec<Post>, i64)>;

    /// Number of posts owned by a user
    async fn count_by_author(&self, author_id: i64) -> Result<i64>;
}

/// SQLx-based post repository implementation
pub struct SqlxPostRepository {
    pool: DynDatabasePool,
}

impl SqlxPostRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn PostRepository> {
        Arc::new(Self::new(pool))
    }
}

fn select_post() -> String {
    format!(
        "SELECT p.id, p.title, p.slug, p.content, p.excerpt, p.status, p.published_at, \
         p.created_at, p.updated_at, p.author_id, {} \
         FROM posts p LEFT JOIN users u ON u.id = p.author_id",
        AUTHOR_COLUMNS
    )
}

#[async_trait]
impl PostRepository for SqlxPostRepository {
    async fn create(&self, post: &Post) -> Result<Post> {
        let now = Utc::now();
        let sql = r#"
            INSERT INTO posts (title, slug, content, excerpt, status, published_at, author_id, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#;

        let id = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(sql)
                .bind(&post.title)
                .bind(&post.slug)
                .bind(&post.content)
                .bind(&post.excerpt)
                .bind(post.status.as_str())
                .bind(post.published_at)
                .bind(post.author_id)
                .bind(now)
                .bind(now)
                .execute(sqlite(&self.pool)?)
                .await
                .context("Failed to create post")?
                .last_insert_rowid(),
            DatabaseDriver::Mysql => sqlx::query(sql)
                .bind(&post.title)
                .bind(&post.slug)
                .bind(&post.content)
                .bind(&post.excerpt)
                .bind(post.status.as_str())
                .bind(post.published_at)
                .bind(post.author_id)
                .bind(now)
                .bind(now)
                .execute(mysql(&self.pool)?)
                .await
                .context("Failed to create post")?
                .last_insert_id() as i64,
        };

        self.get_by_id(id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Post not found after insert"))
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Post>> {
        let sql = format!("{} WHERE p.id = ?", select_post());

        match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(&sql)
                .bind(id)
                .fetch_optional(sqlite(&self.pool)?)
                .await
                .context("Failed to get post by ID")?
                .map(|row| row_to_post(&row))
                .transpose(),
            DatabaseDriver::Mysql => sqlx::query(&sql)
                .bind(id)
                .fetch_optional(mysql(&self.pool)?)
                .await
                .context("Failed to get post by ID")?
                .map(|row| row_to_post(&row))
                .transpose(),
        }
    }

    async fn slug_exists(&self, slug: &str, exclude_id: Option<i64>) -> Result<bool> {
        let sql = "SELECT COUNT(*) AS count FROM posts WHERE slug = ? AND id <> ?";
        // Ids start at 1, so 0 excludes nothing.
        let exclude_id = exclude_id.unwrap_or(0);

        let count = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(sql)
                .bind(slug)
                .bind(exclude_id)
                .fetch_one(sqlite(&self.pool)?)
                .await
                .context("Failed to check post slug")?
                .int("count")?,
            DatabaseDriver::Mysql => sqlx::query(sql)
                .bind(slug)
                .bind(exclude_id)
                .fetch_one(mysql(&self.pool)?)
                .await
                .context("Failed to check post slug")?
                .int("count")?,
        };

        Ok(count > 0)
    }

    async fn update(&self, post: &Post) -> Result<Post> {
        let now = Utc::now();
        let sql = r#"
            UPDATE posts
            SET title = ?, slug = ?, content = ?, excerpt = ?, status = ?, published_at = ?, updated_at = ?
            WHERE id = ?
        "#;

        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                sqlx::query(sql)
                    .bind(&post.title)
                    .bind(&post.slug)
                    .bind(&post.content)
                    .bind(&post.excerpt)
                    .bind(post.status.as_str())
                    .bind(post.published_at)
                    .bind(now)
                    .bind(post.id)
                    .execute(sqlite(&self.pool)?)
                    .await
                    .context("Failed to update post")?;
            }
            DatabaseDriver::Mysql => {
                sqlx::query(sql)
                    .bind(&post.title)
                    .bind(&post.slug)
                    .bind(&post.content)
                    .bind(&post.excerpt)
                    .bind(post.status.as_str())
                    .bind(post.published_at)
                    .bind(now)
                    .bind(post.id)
                    .execute(mysql(&self.pool)?)
                    .await
                    .context("Failed to update post")?;
            }
        }

        self.get_by_id(post.id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Post not found after update"))
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let sql = "DELETE FROM posts WHERE id = ?";

        let affected = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(sql)
                .bind(id)
                .execute(sqlite(&self.pool)?)
                .await
                .context("Failed to delete post")?
                .rows_affected(),
            DatabaseDriver::Mysql => sqlx::query(sql)
                .bind(id)
                .execute(mysql(&self.pool)?)
                .await
                .context("Failed to delete post")?
                .rows_affected(),
        };

        Ok(affected > 0)
    }

    async fn list(&self, filter: &PostFilter, params: &ListParams) -> Result<(Vec<Post>, i64)> {
        let mut conditions = Conditions::default();
        if let Some(status) = filter.status {
            conditions.push("p.status = ?", [status.as_str().to_string()]);
        }
        if let Some(search) = filter.search.as_deref() {
            let pattern = like_pattern(search);
            conditions.push("(p.title LIKE ? ESCAPE '!' OR p.excerpt LIKE ? ESCAPE '!')", [pattern.clone(), pattern]);
        }

        let where_sql = conditions.sql();
        let list_sql = format!(
            "{}{} ORDER BY p.created_at DESC, p.id DESC LIMIT ? OFFSET ?",
            select_post(),
            where_sql
        );
        let count_sql = format!("SELECT COUNT(*) AS count FROM posts p{}", where_sql);

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
                    .context("Failed to list posts")?;

                let mut count_query = sqlx::query(&count_sql);
                for value in conditions.binds() {
                    count_query = count_query.bind(value.as_str());
                }
                let total = count_query
                    .fetch_one(pool)
                    .await
                    .context("Failed to count posts")?
                    .int("count")?;

                let posts = rows.iter().map(row_to_post).collect::<Result<Vec<_>>>()?;
                Ok((posts, total))
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
                    .context("Failed to list posts")?;

                let mut count_query = sqlx::query(&count_sql);
                for value in conditions.binds() {
                    count_query = count_query.bind(value.as_str());
                }
                let total = count_query
                    .fetch_one(pool)
                    .await
                    .context("Failed to count posts")?
                    .int("count")?;

                let posts = rows.iter().map(row_to_post).collect::<Result<Vec<_>>>()?;
                Ok((posts, total))
            }
        }
    }

    async fn count_by_author(&self, author_id: i64) -> Result<i64> {
        let sql = "SELECT COUNT(*) AS count FROM posts WHERE author_id = ?";

        match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(sql)
                .bind(author_id)
                .fetch_one(sqlite(&self.pool)?)
                .await
                .context("Failed to count posts by author")?
                .int("count"),
            DatabaseDriver::Mysql => sqlx::query(sql)
                .bind(author_id)
                .fetch_one(mysql(&self.pool)?)
                .await
                .context("Failed to count posts by author")?
                .int("count"),
        }
    }
}

fn row_to_post(row: &impl RowExt) -> Result<Post> {
    let status_str = row.text("status")?;
    let status = ContentStatus::from_str(&status_str)
        .with_context(|| format!("Invalid status in database: {}", status_str))?;
    let author_id = row.int("author_id")?;

    Ok(Post {
        id: row.int("id")?,
        title: row.text("title")?,
        slug: row.text("slug")?,
        content: row.text("content")?,
        excerpt: row.opt_text("excerpt")?,
        status,
        published_at: row.opt_timestamp("published_at")?,
        created_at: row.timestamp("created_at")?,
        updated_at: row.timestamp("updated_at")?,
        author_id,
        author: author_from_row(row, author_id)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{is_unique_violation, SqlxUserRepository, UserRepository};
    use crate::db::{create_test_pool, migrations};
    use crate::models::{User, UserRole};

    async fn setup_test_repo() -> (SqlxPostRepository, User) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        let author = SqlxUserRepository::new(pool.clone())
            .create(&User::new(
                "author".to_string(),
                "author@example.com".to_string(),
                "hash".to_string(),
                UserRole::Author,
            ))
            .await
            .expect("Failed to create author");

        (SqlxPostRepository::new(pool), author)
    }

    fn post(slug: &str, author_id: i64) -> Post {
        Post::new(format!("Title {}", slug), slug.to_string(), String::new(), author_id)
    }

    #[tokio::test]
    async fn test_create_embeds_author() {
        let (repo, author) = setup_test_repo().await;
        let mut new_post = post("hello-world", author.id);
        new_post.excerpt = Some("An excerpt".to_string());

        let created = repo.create(&new_post).await.expect("Failed to create post");

        assert!(created.id > 0);
        assert_eq!(created.slug, "hello-world");
        assert_eq!(created.excerpt.as_deref(), Some("An excerpt"));
        assert_eq!(created.status, ContentStatus::Draft);
        assert!(created.published_at.is_none());

        let embedded = created.author.expect("author should be embedded");
        assert_eq!(embedded.id, author.id);
        assert_eq!(embedded.username, "author");
        assert!(embedded.password_hash.is_empty());
    }

    #[tokio::test]
    async fn test_slug_exists() {
        let (repo, author) = setup_test_repo().await;
        let created = repo.create(&post("unique", author.id)).await.unwrap();

        assert!(repo.slug_exists("unique", None).await.unwrap());
        assert!(!repo.slug_exists("unique", Some(created.id)).await.unwrap());
        assert!(!repo.slug_exists("missing", None).await.unwrap());
    }

    #[tokio::test]
    async fn test_duplicate_slug_rejected_by_schema() {
        let (repo, author) = setup_test_repo().await;
        repo.create(&post("same", author.id)).await.unwrap();

        let err = repo.create(&post("same", author.id)).await.unwrap_err();
        assert!(is_unique_violation(&err));

        let mut other = repo.create(&post("other", author.id)).await.unwrap();
        other.slug = "same".to_string();
        let err = repo.update(&other).await.unwrap_err();
        assert!(is_unique_violation(&err));
    }

    #[tokio::test]
    async fn test_search_matches_wildcards_literally() {
        let (repo, author) = setup_test_repo().await;
        for (slug, title) in [
            ("a", "100% pure"),
            ("b", "1000 pure"),
            ("c", "snake_case"),
            ("d", "snakeXcase"),
            ("e", "C:\\temp"),
            ("f", "C:temp"),
        ] {
            let mut p = post(slug, author.id);
            p.title = title.to_string();
            repo.create(&p).await.unwrap();
        }

        for (term, expected) in [("100%", "100% pure"), ("snake_case", "snake_case"), ("C:\\", "C:\\temp")] {
            let (posts, total) = repo
                .list(
                    &PostFilter { status: None, search: Some(term.to_string()) },
                    &ListParams::default(),
                )
                .await
                .unwrap();
            assert_eq!(total, 1, "search {:?}", term);
            assert_eq!(posts[0].title, expected);
        }
    }

    #[tokio::test]
    async fn test_update_post() {
        let (repo, author) = setup_test_repo().await;
        let mut created = repo.create(&post("draft", author.id)).await.unwrap();

        let published_at = Utc::now();
        created.title = "Published".to_string();
        created.status = ContentStatus::Published;
        created.published_at = Some(published_at);

        let updated = repo.update(&created).await.unwrap();
        assert_eq!(updated.title, "Published");
        assert_eq!(updated.status, ContentStatus::Published);
        assert_eq!(
            updated.published_at.map(|t| t.timestamp()),
            Some(published_at.timestamp())
        );
        assert!(updated.author.is_some());
    }

    #[tokio::test]
    async fn test_delete_post() {
        let (repo, author) = setup_test_repo().await;
        let created = repo.create(&post("bye", author.id)).await.unwrap();

        assert!(repo.delete(created.id).await.unwrap());
        assert!(repo.get_by_id(created.id).await.unwrap().is_none());
        assert!(!repo.delete(created.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_list_filters_search_and_order() {
        let (repo, author) = setup_test_repo().await;
        for i in 0..3 {
            repo.create(&post(&format!("draft-{}", i), author.id)).await.unwrap();
        }
        let mut published = post("published", author.id);
        published.status = ContentStatus::Published;
        published.excerpt = Some("all about ferris".to_string());
        repo.create(&published).await.unwrap();

        let (posts, total) = repo
            .list(&PostFilter::default(), &ListParams::new(1, 2))
            .await
            .unwrap();
        assert_eq!(total, 4);
        assert_eq!(posts.len(), 2);
        assert_eq!(posts[0].slug, "published");
        assert!(posts.iter().all(|p| p.author.is_some()));

        let (posts, total) = repo
            .list(
                &PostFilter { status: Some(ContentStatus::Draft), search: None },
                &ListParams::default(),
            )
            .await
            .unwrap();
        assert_eq!(total, 3);
        assert!(posts.iter().all(|p| p.status == ContentStatus::Draft));

        // Search covers the excerpt as well as the title.
        let (posts, total) = repo
            .list(
                &PostFilter { status: None, search: Some("ferris".to_string()) },
                &ListParams::default(),
            )
            .await
            .unwrap();
        assert_eq!(total, 1);
        assert_eq!(posts[0].slug, "published");

        let (posts, _) = repo
            .list(
                &PostFilter { status: None, search: Some("Title draft-1".to_string()) },
                &ListParams::default(),
            )
            .await
            .unwrap();
        assert_eq!(posts.len(), 1);
    }

    #[tokio::test]
    async fn test_count_by_author() {
        let (repo, author) = setup_test_repo().await;
        assert_eq!(repo.count_by_author(author.id).await.unwrap(), 0);

        repo.create(&post("one", author.id)).await.unwrap();
        repo.create(&post("two", author.id)).await.unwrap();

        assert_eq!(repo.count_by_author(author.id).await.unwrap(), 2);
        assert_eq!(repo.count_by_author(author.id + 1).await.unwrap(), 0);
    }
}
