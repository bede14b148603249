//! User repository
//!
//! Database operations for users.
//!
//! This module provides:
//! - `UserRepository` trait defining the interface for user data access
//! - `SqlxUserRepository` implementing the trait for SQLite and MySQL

use super::{like_pattern, mysql, sqlite, Conditions, RowExt};
use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::{ListParams, User, UserFilter, UserRole};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::str::FromStr;
use std::sync::Arc;

/// User repository trait
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Create a new user
    async fn create(&self, user: &User) -> Result<User>;

    /// Get user by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<User>>;

    /// Get user by username or, failing that, by email
    async fn get_by_login(&self, login: &str) -> Result<Option<User>>;

    /// Whether another user already holds this email or username.
    ///
    /// `exclude_id` leaves one user out of the check (the one being updated).
    async fn exists_conflict(&self, email: &str, username: &str, exclude_id: Option<i64>) -> Result<bool>;

    /// Update a user
    async fn update(&self, user: &User) -> Result<User>;

    /// Delete a user, returning whether a row was removed
    async fn delete(&self, id: i64) -> Result<bool>;

    /// List users, newest first
    async fn list(&self, filter: &UserFilter, params: &ListParams) -> Result<(Vec<User>, i64)>;

    /// Count users holding a role
    async fn count_by_role(&self, role: UserRole) -> Result<i64>;
}

/// SQLx-based user repository implementation
///
/// Supports both SQLite and MySQL databases.
pub struct SqlxUserRepository {
    pool: DynDatabasePool,
}

impl SqlxUserRepository {
    /// Create a new SQLx user repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn UserRepository> {
        Arc::new(Self::new(pool))
    }
}

const SELECT_USER: &str =
    "SELECT id, email, username, password_hash, role, created_at, updated_at FROM users";

#[async_trait]
impl UserRepository for SqlxUserRepository {
    async fn create(&self, user: &User) -> Result<User> {
        let now = Utc::now();
        let sql = r#"
            INSERT INTO users (email, username, password_hash, role, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
        "#;

        let id = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(sql)
                .bind(&user.email)
                .bind(&user.username)
                .bind(&user.password_hash)
                .bind(user.role.as_str())
                .bind(now)
                .bind(now)
                .execute(sqlite(&self.pool)?)
                .await
                .context("Failed to create user")?
                .last_insert_rowid(),
            DatabaseDriver::Mysql => sqlx::query(sql)
                .bind(&user.email)
                .bind(&user.username)
                .bind(&user.password_hash)
                .bind(user.role.as_str())
                .bind(now)
                .bind(now)
                .execute(mysql(&self.pool)?)
                .await
                .context("Failed to create user")?
                .last_insert_id() as i64,
        };

        Ok(User {
            id,
            email: user.email.clone(),
            username: user.username.clone(),
            password_hash: user.password_hash.clone(),
            role: user.role,
            created_at: now,
            updated_at: now,
        })
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<User>> {
        let sql = format!("{} WHERE id = ?", SELECT_USER);

        match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(&sql)
                .bind(id)
                .fetch_optional(sqlite(&self.pool)?)
                .await
                .context("Failed to get user by ID")?
                .map(|row| row_to_user(&row))
                .transpose(),
            DatabaseDriver::Mysql => sqlx::query(&sql)
                .bind(id)
                .fetch_optional(mysql(&self.pool)?)
                .await
                .context("Failed to get user by ID")?
                .map(|row| row_to_user(&row))
                .transpose(),
        }
    }

    async fn get_by_login(&self, login: &str) -> Result<Option<User>> {
        // A username match wins over an email match.
        let sql = format!(
            "{} WHERE username = ? OR email = ? ORDER BY CASE WHEN username = ? THEN 0 ELSE 1 END LIMIT 1",
            SELECT_USER
        );

        match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(&sql)
                .bind(login)
                .bind(login)
                .bind(login)
                .fetch_optional(sqlite(&self.pool)?)
                .await
                .context("Failed to get user by login")?
                .map(|row| row_to_user(&row))
                .transpose(),
            DatabaseDriver::Mysql => sqlx::query(&sql)
                .bind(login)
                .bind(login)
                .bind(login)
                .fetch_optional(mysql(&self.pool)?)
                .await
                .context("Failed to get user by login")?
                .map(|row| row_to_user(&row))
                .transpose(),
        }
    }

    async fn exists_conflict(&self, email: &str, username: &str, exclude_id: Option<i64>) -> Result<bool> {
        let mut sql = "SELECT COUNT(*) AS count FROM users WHERE (email = ? OR username = ?)".to_string();
        if exclude_id.is_some() {
            sql.push_str(" AND id <> ?");
        }

        let count = match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let mut query = sqlx::query(&sql).bind(email).bind(username);
                if let Some(id) = exclude_id {
                    query = query.bind(id);
                }
                let row = query
                    .fetch_one(sqlite(&self.pool)?)
                    .await
                    .context("Failed to check user uniqueness")?;
                row.int("count")?
            }
            DatabaseDriver::Mysql => {
                let mut query = sqlx::query(&sql).bind(email).bind(username);
                if let Some(id) = exclude_id {
                    query = query.bind(id);
                }
                let row = query
                    .fetch_one(mysql(&self.pool)?)
                    .await
                    .context("Failed to check user uniqueness")?;
                row.int("count")?
            }
        };

        Ok(count > 0)
    }

    async fn update(&self, user: &User) -> Result<User> {
        let now = Utc::now();
        let sql = r#"
            UPDATE users
            SET email = ?, username = ?, password_hash = ?, role = ?, updated_at = ?
            WHERE id = ?
        "#;

        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                sqlx::query(sql)
                    .bind(&user.email)
                    .bind(&user.username)
                    .bind(&user.password_hash)
                    .bind(user.role.as_str())
                    .bind(now)
                    .bind(user.id)
                    .execute(sqlite(&self.pool)?)
                    .await
                    .context("Failed to update user")?;
            }
            DatabaseDriver::Mysql => {
                sqlx::query(sql)
                    .bind(&user.email)
                    .bind(&user.username)
                    .bind(&user.password_hash)
                    .bind(user.role.as_str())
                    .bind(now)
                    .bind(user.id)
                    .execute(mysql(&self.pool)?)
                    .await
                    .context("Failed to update user")?;
            }
        }

        self.get_by_id(user.id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("User not found after update"))
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let sql = "DELETE FROM users WHERE id = ?";

        let affected = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(sql)
                .bind(id)
                .execute(sqlite(&self.pool)?)
                .await
                .context("Failed to delete user")?
                .rows_affected(),
            DatabaseDriver::Mysql => sqlx::query(sql)
                .bind(id)
                .execute(mysql(&self.pool)?)
                .await
                .context("Failed to delete user")?
                .rows_affected(),
        };

        Ok(affected > 0)
    }

    async fn list(&self, filter: &UserFilter, params: &ListParams) -> Result<(Vec<User>, i64)> {
        let mut conditions = Conditions::default();
        if let Some(role) = filter.role {
            conditions.push("role = ?", [role.as_str().to_string()]);
        }
        if let Some(search) = filter.search.as_deref() {
            let pattern = like_pattern(search);
            conditions.push("(username LIKE ? ESCAPE '!' OR email LIKE ? ESCAPE '!')", [pattern.clone(), pattern]);
        }

        let where_sql = conditions.sql();
        let list_sql = format!(
            "{}{} ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?",
            SELECT_USER, where_sql
        );
        let count_sql = format!("SELECT COUNT(*) AS count FROM users{}", where_sql);

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
                    .context("Failed to list users")?;

                let mut count_query = sqlx::query(&count_sql);
                for value in conditions.binds() {
                    count_query = count_query.bind(value.as_str());
                }
                let total = count_query
                    .fetch_one(pool)
                    .await
                    .context("Failed to count users")?
                    .int("count")?;

                let users = rows.iter().map(row_to_user).collect::<Result<Vec<_>>>()?;
                Ok((users, total))
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
                    .context("Failed to list users")?;

                let mut count_query = sqlx::query(&count_sql);
                for value in conditions.binds() {
                    count_query = count_query.bind(value.as_str());
                }
                let total = count_query
                    .fetch_one(pool)
                    .await
                    .context("Failed to count users")?
                    .int("count")?;

                let users = rows.iter().map(row_to_user).collect::<Result<Vec<_>>>()?;
                Ok((users, total))
            }
        }
    }

    async fn count_by_role(&self, role: UserRole) -> Result<i64> {
        let sql = "SELECT COUNT(*) AS count FROM users WHERE role = ?";

        match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(sql)
                .bind(role.as_str())
                .fetch_one(sqlite(&self.pool)?)
                .await
                .context("Failed to count users by role")?
                .int("count"),
            DatabaseDriver::Mysql => sqlx::query(sql)
                .bind(role.as_str())
                .fetch_one(mysql(&self.pool)?)
                .await
                .context("Failed to count users by role")?
                .int("count"),
        }
    }
}

fn row_to_user(row: &impl RowExt) -> Result<User> {
    let role_str = row.text("role")?;
    let role = UserRole::from_str(&role_str)
        .with_context(|| format!("Invalid role in database: {}", role_str))?;

    Ok(User {
        id: row.int("id")?,
        email: row.text("email")?,
        username: row.text("username")?,
        password_hash: row.text("password_hash")?,
        role,
        created_at: row.timestamp("created_at")?,
        updated_at: row.timestamp("updated_at")?,
    })
}
