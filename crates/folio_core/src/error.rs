//! Request-boundary error taxonomy.
//!
//! # Responsibility
//! - Name every caller-visible failure of the core.
//! - Map each failure to the HTTP status the outer layer must answer with.
//!
//! # Invariants
//! - Every variant is scoped to one request; none is fatal or retried.
//! - Only `Repo` and `Config` map to a 5xx status.

use crate::model::identity::UserId;
use crate::repo::RepoError;
use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type CoreResult<T> = Result<T, CoreError>;

/// Malformed caller input on one named field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl Error for ValidationError {}

/// Core failure surfaced to the request boundary.
#[derive(Debug)]
pub enum CoreError {
    /// Access policy denied the request.
    Authorization { action: String },
    /// Referenced entity is absent or not visible to the caller.
    NotFound { entity: &'static str, id: String },
    /// Malformed filter, ordering, pagination or body value.
    Validation(ValidationError),
    /// Follower and followee are the same identity.
    SelfFollow,
    /// The follow edge already exists.
    AlreadyFollowing(UserId),
    /// No follow edge exists to remove.
    NotFollowing(UserId),
    /// Persistence fault.
    Repo(RepoError),
    /// Invalid server-side configuration.
    Config(String),
}

impl CoreError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation(ValidationError::new(field, message))
    }

    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// HTTP status the boundary answers with.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Authorization { .. } => 403,
            Self::NotFound { .. } => 404,
            Self::Validation(_)
            | Self::SelfFollow
            | Self::AlreadyFollowing(_)
            | Self::NotFollowing(_) => 400,
            Self::Repo(_) | Self::Config(_) => 500,
        }
    }

    /// Stable machine-readable code.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Authorization { .. } => "permission_denied",
            Self::NotFound { .. } => "not_found",
            Self::Validation(_) => "invalid",
            Self::SelfFollow => "self_follow",
            Self::AlreadyFollowing(_) => "already_following",
            Self::NotFollowing(_) => "not_following",
            Self::Repo(_) => "internal_error",
            Self::Config(_) => "config_error",
        }
    }

    /// Structured body for the boundary response.
    ///
    /// Persistence details are not exposed to callers.
    pub fn to_body(&self) -> ErrorBody {
        let message = match self {
            Self::Repo(_) => "internal storage error".to_string(),
            Self::Config(_) => "internal configuration error".to_string(),
            other => other.to_string(),
        };
        let field = match self {
            Self::Validation(err) => Some(err.field.clone()),
            _ => None,
        };
        ErrorBody {
            status: self.status_code(),
            code: self.error_code(),
            message,
            field,
        }
    }
}

impl Display for CoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Authorization { action } => {
                write!(f, "you do not have permission to perform `{action}`")
            }
            Self::NotFound { entity, id } => write!(f, "{entity} not found: {id}"),
            Self::Validation(err) => write!(f, "{err}"),
            Self::SelfFollow => write!(f, "you cannot follow or unfollow yourself"),
            Self::AlreadyFollowing(id) => write!(f, "you are already following user {id}"),
            Self::NotFollowing(id) => write!(f, "you are not following user {id}"),
            Self::Repo(err) => write!(f, "{err}"),
            Self::Config(message) => write!(f, "invalid configuration: {message}"),
        }
    }
}

impl Error for CoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ValidationError> for CoreError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<RepoError> for CoreError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound { entity, id } => Self::NotFound {
                entity,
                id: id.to_string(),
            },
            other => Self::Repo(other),
        }
    }
}

/// JSON error body `{status, code, message, field?}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorBody {
    pub status: u16,
    pub code: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::{CoreError, ValidationError};
    use crate::repo::RepoError;
    use uuid::Uuid;

    #[test]
    fn status_codes_follow_boundary_mapping() {
        let id = Uuid::new_v4();
        assert_eq!(
            CoreError::Authorization {
                action: "create".to_string()
            }
            .status_code(),
            403
        );
        assert_eq!(CoreError::not_found("book", id).status_code(), 404);
        assert_eq!(CoreError::validation("year", "bad").status_code(), 400);
        assert_eq!(CoreError::SelfFollow.status_code(), 400);
        assert_eq!(CoreError::AlreadyFollowing(id).status_code(), 400);
        assert_eq!(CoreError::NotFollowing(id).status_code(), 400);
        assert_eq!(
            CoreError::Repo(RepoError::InvalidData("x".to_string())).status_code(),
            500
        );
    }

    #[test]
    fn repo_not_found_becomes_boundary_not_found() {
        let id = Uuid::new_v4();
        let err = CoreError::from(RepoError::NotFound { entity: "post", id });
        assert!(matches!(err, CoreError::NotFound { entity: "post", .. }));
    }

    #[test]
    fn body_carries_validation_field_and_hides_storage_details() {
        let body = CoreError::from(ValidationError::new("publication_year", "not a number"))
            .to_body();
        assert_eq!(body.status, 400);
        assert_eq!(body.field.as_deref(), Some("publication_year"));

        let hidden = CoreError::Repo(RepoError::InvalidData("secret row".to_string())).to_body();
        assert!(!hidden.message.contains("secret"));
    }
}
