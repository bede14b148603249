//! Service-level errors
//!
//! Every service returns `ServiceError`; the API layer maps each variant to
//! an HTTP status. The message is shown to the client as is, except for
//! `Internal`, which is logged and replaced by a generic message.

use crate::db::repositories::is_unique_violation;

/// Error returned by the user, post, page and media services
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// The addressed entity does not exist
    #[error("{0}")]
    NotFound(String),

    /// Invalid input or a violated business rule
    #[error("{0}")]
    Validation(String),

    /// Authenticated but not allowed
    #[error("{0}")]
    Forbidden(String),

    /// Credentials missing or wrong
    #[error("{0}")]
    Unauthorized(String),

    /// Storage or other unexpected failure
    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

pub type ServiceResult<T> = Result<T, ServiceError>;

impl ServiceError {
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden(message.into())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized(message.into())
    }

    /// Map a failed insert or update: a UNIQUE constraint violation becomes
    /// `Validation(conflict)`, anything else stays `Internal`.
    pub fn from_write(err: anyhow::Error, conflict: &str) -> Self {
        if is_unique_violation(&err) {
            Self::validation(conflict)
        } else {
            Self::Internal(err)
        }
    }
}

/// Message used whenever the acting user may not touch another user's content
pub const INSUFFICIENT_PERMISSIONS: &str = "Insufficient permissions";

/// Message used for a slug already taken by another post or page
pub const SLUG_EXISTS: &str = "Slug already exists";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_is_the_client_message() {
        assert_eq!(ServiceError::not_found("Post not found").to_string(), "Post not found");
        assert_eq!(ServiceError::validation(SLUG_EXISTS).to_string(), "Slug already exists");
    }

    #[test]
    fn test_anyhow_converts_to_internal() {
        let err: ServiceError = anyhow::anyhow!("disk on fire").into();
        assert!(matches!(err, ServiceError::Internal(_)));
    }

    #[test]
    fn test_from_write_keeps_other_errors_internal() {
        let err = ServiceError::from_write(anyhow::anyhow!("disk on fire"), SLUG_EXISTS);
        assert!(matches!(err, ServiceError::Internal(_)));

        let err = ServiceError::from_write(anyhow::Error::new(sqlx::Error::RowNotFound), SLUG_EXISTS);
        assert!(matches!(err, ServiceError::Internal(_)));
    }
}
