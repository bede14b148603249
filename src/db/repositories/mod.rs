//! Database repositories
//!
//! Repository pattern implementations for database access.
//! Each repository handles CRUD operations for a specific entity and hides
//! the SQLite / MySQL split behind an `async_trait`.

pub mod media;
pub mod page;
pub mod post;
pub mod user;

pub use media::{MediaRepository, SqlxMediaRepository};
pub use page::{PageRepository, SqlxPageRepository};
pub use post::{PostRepository, SqlxPostRepository};
pub use user::{SqlxUserRepository, UserRepository};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::mysql::MySqlRow;
use sqlx::sqlite::SqliteRow;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::str::FromStr;

use crate::db::DynDatabasePool;
use crate::models::{User, UserRole};

pub(crate) fn sqlite(pool: &DynDatabasePool) -> Result<&SqlitePool> {
    pool.as_sqlite().context("SQLite pool not available")
}

pub(crate) fn mysql(pool: &DynDatabasePool) -> Result<&MySqlPool> {
    pool.as_mysql().context("MySQL pool not available")
}

/// Typed column access shared by the SQLite and MySQL row mappers.
pub(crate) trait RowExt {
    fn int(&self, column: &str) -> Result<i64>;
    fn text(&self, column: &str) -> Result<String>;
    fn opt_text(&self, column: &str) -> Result<Option<String>>;
    fn timestamp(&self, column: &str) -> Result<DateTime<Utc>>;
    fn opt_timestamp(&self, column: &str) -> Result<Option<DateTime<Utc>>>;
}

macro_rules! impl_row_ext {
    ($row:ty) => {
        impl RowExt for $row {
            fn int(&self, column: &str) -> Result<i64> {
                self.try_get(column)
                    .with_context(|| format!("Failed to read column {}", column))
            }

            fn text(&self, column: &str) -> Result<String> {
                self.try_get(column)
                    .with_context(|| format!("Failed to read column {}", column))
            }

            fn opt_text(&self, column: &str) -> Result<Option<String>> {
                self.try_get(column)
                    .with_context(|| format!("Failed to read column {}", column))
            }

            fn timestamp(&self, column: &str) -> Result<DateTime<Utc>> {
                self.try_get(column)
                    .with_context(|| format!("Failed to read column {}", column))
            }

            fn opt_timestamp(&self, column: &str) -> Result<Option<DateTime<Utc>>> {
                self.try_get(column)
                    .with_context(|| format!("Failed to read column {}", column))
            }
        }
    };
}

impl_row_ext!(SqliteRow);
impl_row_ext!(MySqlRow);

/// Columns of the joined author, aliased so they do not clash with the
/// content table. Expects the users table to be aliased `u`.
pub(crate) const AUTHOR_COLUMNS: &str = "u.email AS author_email, u.username AS author_username, \
     u.role AS author_role, u.created_at AS author_created_at, u.updated_at AS author_updated_at";

/// Build the embedded author from the aliased `author_*` columns.
///
/// Returns `None` when the join found no user.
pub(crate) fn author_from_row(row: &impl RowExt, author_id: i64) -> Result<Option<User>> {
    let Some(username) = row.opt_text("author_username")? else {
        return Ok(None);
    };
    let role_str = row.text("author_role")?;

    Ok(Some(User {
        id: author_id,
        email: row.text("author_email")?,
        username,
        password_hash: String::new(),
        role: UserRole::from_str(&role_str)
            .with_context(|| format!("Invalid role in database: {}", role_str))?,
        created_at: row.timestamp("author_created_at")?,
        updated_at: row.timestamp("author_updated_at")?,
    }))
}

/// A `WHERE` clause assembled from optional filters.
///
/// Every filter value is bound as a string, in the order the clauses were
/// added.
#[derive(Debug, Default)]
pub(crate) struct Conditions {
    clauses: Vec<String>,
    binds: Vec<String>,
}

impl Conditions {
    pub fn push(&mut self, clause: &str, binds: impl IntoIterator<Item = String>) {
        self.clauses.push(clause.to_string());
        self.binds.extend(binds);
    }

    /// `" WHERE a AND b"`, or an empty string without filters
    pub fn sql(&self) -> String {
        if self.clauses.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", self.clauses.join(" AND "))
        }
    }

    pub fn binds(&self) -> &[String] {
        &self.binds
    }
}

/// Escape character for `LIKE` patterns. Every `LIKE ?` clause must be
/// followed by `ESCAPE '!'`.
const LIKE_ESCAPE: char = '!';

fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '%' | '_') || c == LIKE_ESCAPE {
            escaped.push(LIKE_ESCAPE);
        }
        escaped.push(c);
    }
    escaped
}

/// `%term%` for a substring `LIKE ... ESCAPE '!'` match. Wildcards in the
/// term match literally.
pub(crate) fn like_pattern(term: &str) -> String {
    format!("%{}%", escape_like(term))
}

/// `prefix%` for a `LIKE ... ESCAPE '!'` prefix match.
pub(crate) fn prefix_pattern(prefix: &str) -> String {
    format!("{}%", escape_like(prefix))
}

/// Whether a repository write failed on a UNIQUE constraint.
pub fn is_unique_violation(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| {
        matches!(
            cause.downcast_ref::<sqlx::Error>(),
            Some(sqlx::Error::Database(db)) if db.is_unique_violation()
        )
    })
}
