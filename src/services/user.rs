//! User service
//!
//! Implements business logic for user management:
//! - Login with username or email, token refresh
//! - Admin-only user creation, listing and deletion
//! - Self-service profile updates with the role-change rule
//! - Bootstrap of the default administrator

use crate::config::DefaultAdminConfig;
use crate::db::repositories::{MediaRepository, PageRepository, PostRepository, UserRepository};
use crate::models::{
    Actor, CreateUserInput, ListParams, PagedResult, UpdateUserInput, User, UserFilter, UserRole,
};
use crate::services::error::{ServiceError, ServiceResult, INSUFFICIENT_PERMISSIONS};
use crate::services::password::{hash_password, verify_password};
use crate::services::token::TokenService;
use std::sync::Arc;

/// Minimum password length for new and changed passwords
pub const MIN_PASSWORD_LENGTH: usize = 6;

const INVALID_CREDENTIALS: &str = "Invalid credentials";
const INVALID_REQUEST: &str = "Invalid request data";
const USER_NOT_FOUND: &str = "User not found";
const USER_EXISTS: &str = "Email or username already exists";

/// A signed-in user together with a fresh access token
#[derive(Debug, Clone, serde::Serialize)]
pub struct LoginResult {
    pub token: String,
    pub user: User,
}

/// User service for managing users and authentication
pub struct UserService {
    user_repo: Arc<dyn UserRepository>,
    post_repo: Arc<dyn PostRepository>,
    page_repo: Arc<dyn PageRepository>,
    media_repo: Arc<dyn MediaRepository>,
    tokens: Arc<TokenService>,
}

impl UserService {
    pub fn new(
        user_repo: Arc<dyn UserRepository>,
        post_repo: Arc<dyn PostRepository>,
        page_repo: Arc<dyn PageRepository>,
        media_repo: Arc<dyn MediaRepository>,
        tokens: Arc<TokenService>,
    ) -> Self {
        Self {
            user_repo,
            post_repo,
            page_repo,
            media_repo,
            tokens,
        }
    }

    /// Authenticate with a username (or email) and password.
    pub async fn login(&self, login: &str, password: &str) -> ServiceResult<LoginResult> {
        if login.is_empty() || password.is_empty() {
            return Err(ServiceError::validation(INVALID_REQUEST));
        }

        let user = self
            .user_repo
            .get_by_login(login)
            .await?
            .ok_or_else(|| ServiceError::unauthorized(INVALID_CREDENTIALS))?;

        if !verify_password(password, &user.password_hash)? {
            tracing::info!("Failed login attempt for {}", login);
            return Err(ServiceError::unauthorized(INVALID_CREDENTIALS));
        }

        tracing::info!("User {} logged in", user.username);
        Ok(LoginResult {
            token: self.tokens.issue(user.id, user.role),
            user,
        })
    }

    /// Issue a new token for the same identity.
    pub fn refresh(&self, actor: &Actor) -> String {
        self.tokens.issue(actor.id, actor.role)
    }

    /// Get a user by ID
    pub async fn get(&self, id: i64) -> ServiceResult<User> {
        self.user_repo
            .get_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::not_found(USER_NOT_FOUND))
    }

    /// Get a user on behalf of `actor`: admins see everyone, others only themselves.
    pub async fn get_for(&self, actor: &Actor, id: i64) -> ServiceResult<User> {
        if !actor.can_manage(id) {
            return Err(ServiceError::forbidden(INSUFFICIENT_PERMISSIONS));
        }
        self.get(id).await
    }

    /// List users (admin only)
    pub async fn list(
        &self,
        actor: &Actor,
        filter: &UserFilter,
        params: &ListParams,
    ) -> ServiceResult<PagedResult<User>> {
        require_admin(actor)?;
        let (users, total) = self.user_repo.list(filter, params).await?;
        Ok(PagedResult::new(users, total, params))
    }

    /// Create a user (admin only). The role defaults to `EDITOR`.
    pub async fn create(&self, actor: &Actor, input: CreateUserInput) -> ServiceResult<User> {
        require_admin(actor)?;

        let email = input.email.trim();
        let username = input.username.trim();
        if !is_valid_email(email) || username.is_empty() || !is_valid_password(&input.password) {
            return Err(ServiceError::validation(INVALID_REQUEST));
        }

        if self.user_repo.exists_conflict(email, username, None).await? {
            return Err(ServiceError::validation(USER_EXISTS));
        }

        let user = User::new(
            username.to_string(),
            email.to_string(),
            hash_password(&input.password)?,
            input.role.unwrap_or_default(),
        );
        let created = self
            .user_repo
            .create(&user)
            .await
            .map_err(|e| ServiceError::from_write(e, USER_EXISTS))?;

        tracing::info!("User {} created with role {}", created.username, created.role);
        Ok(created)
    }

    /// Update a user. Only admins may edit other users or change roles.
    pub async fn update(&self, actor: &Actor, id: i64, input: UpdateUserInput) -> ServiceResult<User> {
        if !actor.can_manage(id) {
            return Err(ServiceError::forbidden(INSUFFICIENT_PERMISSIONS));
        }
        if let Some(role) = input.role {
            if !actor.is_admin() && role != actor.role {
                return Err(ServiceError::forbidden("Cannot change role without admin permissions"));
            }
        }

        let email = input.email.as_deref().map(str::trim);
        let username = input.username.as_deref().map(str::trim);
        if email.is_some_and(|e| !is_valid_email(e))
            || username.is_some_and(str::is_empty)
            || input.password.as_deref().is_some_and(|p| !is_valid_password(p))
        {
            return Err(ServiceError::validation(INVALID_REQUEST));
        }

        let mut user = self.get(id).await?;

        if email.is_some() || username.is_some() {
            let email = email.unwrap_or(&user.email);
            let username = username.unwrap_or(&user.username);
            if self.user_repo.exists_conflict(email, username, Some(id)).await? {
                return Err(ServiceError::validation(USER_EXISTS));
            }
        }

        if let Some(email) = email {
            user.email = email.to_string();
        }
        if let Some(username) = username {
            user.username = username.to_string();
        }
        if let Some(role) = input.role {
            user.role = role;
        }
        if let Some(password) = input.password.as_deref() {
            user.password_hash = hash_password(password)?;
        }

        self.user_repo
            .update(&user)
            .await
            .map_err(|e| ServiceError::from_write(e, USER_EXISTS))
    }

    /// Delete a user (admin only).
    ///
    /// Admins cannot delete themselves, and users who still own posts, pages
    /// or media cannot be deleted.
    pub async fn delete(&self, actor: &Actor, id: i64) -> ServiceResult<()> {
        require_admin(actor)?;
        if actor.id == id {
            return Err(ServiceError::validation("Cannot delete your own account"));
        }

        let user = self.get(id).await?;

        let owned = self.post_repo.count_by_author(id).await?
            + self.page_repo.count_by_author(id).await?
            + self.media_repo.count_by_author(id).await?;
        if owned > 0 {
            return Err(ServiceError::validation(
                "Cannot delete a user who still owns content",
            ));
        }

        if !self.user_repo.delete(id).await? {
            return Err(ServiceError::not_found(USER_NOT_FOUND));
        }

        tracing::info!("User {} deleted", user.username);
        Ok(())
    }

    /// Create the configured administrator when no admin exists yet.
    ///
    /// Returns the created user, or `None` when nothing had to be done.
    pub async fn ensure_default_admin(&self, config: &DefaultAdminConfig) -> ServiceResult<Option<User>> {
        if self.user_repo.count_by_role(UserRole::Admin).await? > 0 {
            return Ok(None);
        }

        if self
            .user_repo
            .exists_conflict(&config.email, &config.username, None)
            .await?
        {
            tracing::warn!(
                "No admin exists, but the default admin name {} or email {} is taken",
                config.username,
                config.email
            );
            return Ok(None);
        }

        let admin = User::new(
            config.username.clone(),
            config.email.clone(),
            hash_password(&config.password)?,
            UserRole::Admin,
        );
        let created = self.user_repo.create(&admin).await?;

        tracing::info!("Created default admin user {}", created.username);
        Ok(Some(created))
    }
}

/// At least [`MIN_PASSWORD_LENGTH`] characters (not bytes)
fn is_valid_password(password: &str) -> bool {
    password.chars().count() >= MIN_PASSWORD_LENGTH
}

fn require_admin(actor: &Actor) -> ServiceResult<()> {
    if actor.is_admin() {
        Ok(())
    } else {
        Err(ServiceError::forbidden(INSUFFICIENT_PERMISSIONS))
    }
}

/// Loose email check: one `@`, a non-empty local part and a dotted domain.
pub fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !domain.contains("..")
}
