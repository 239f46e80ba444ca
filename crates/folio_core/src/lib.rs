//! Core domain logic for folio: catalog and social access rules,
//! query-parameter driven listings, follows and notifications.

pub mod clock;
pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod model;
pub mod policy;
pub mod query;
pub mod repo;
pub mod service;
pub mod social;

pub use config::CoreConfig;
pub use db::{open_db, open_db_in_memory, DbError, DbResult};
pub use error::{CoreError, CoreResult, ErrorBody, ValidationError};
pub use logging::{default_log_level, init_logging, init_logging_from_config, logging_status};
pub use model::book::{Author, AuthorSummary, Book, BookDraft, BookPatch, BookStatistics};
pub use model::identity::{Identity, Profile, User, UserId};
pub use model::notification::{Notification, NotificationVerb, TargetKind, TargetRef};
pub use model::post::{Comment, Post, PostDraft};
pub use model::resource::OwnedResource;
pub use policy::access::{
    authorize_object, authorize_view, can_access_object, can_access_view, AccessRule, Method,
    ObjectPolicy, OwnershipMode, ViewAction, ViewPolicy,
};
pub use policy::request::RequestContext;
pub use query::composer::{compose, QuerySpec};
pub use query::config::CollectionConfig;
pub use query::page::{Page, PageRequest};
pub use query::{query_params, QueryParams};
pub use repo::book_repo::{BookRepository, SqliteBookRepository};
pub use repo::notification_repo::{NotificationRepository, SqliteNotificationRepository};
pub use repo::post_repo::{PostRepository, SqlitePostRepository};
pub use repo::user_repo::{SqliteUserRepository, UserRepository};
pub use repo::{ReferenceLookup, RepoError, RepoResult, SqliteReferenceLookup};
pub use service::account_service::{AccountService, FollowOutcome};
pub use service::book_service::BookService;
pub use service::notification_service::NotificationService;
pub use service::post_service::PostService;
pub use service::ListSettings;
pub use social::follow_graph::{FollowGraph, SqliteFollowGraph};

/// Minimal health-check API for embedders.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
