//! Notification records and domain-event verbs.
//!
//! # Invariants
//! - `actor_id != recipient_id`: self-actions never produce a record.
//! - `read` only moves from `false` to `true`.

use crate::model::identity::UserId;
use crate::model::resource::OwnedResource;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type NotificationId = Uuid;

/// Kind of record a notification points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetKind {
    Post,
    Comment,
    User,
}

impl TargetKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Post => "post",
            Self::Comment => "comment",
            Self::User => "user",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "post" => Some(Self::Post),
            "comment" => Some(Self::Comment),
            "user" => Some(Self::User),
            _ => None,
        }
    }
}

/// Typed pointer to a notification target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetRef {
    pub kind: TargetKind,
    pub id: Uuid,
}

impl TargetRef {
    pub fn post(id: Uuid) -> Self {
        Self {
            kind: TargetKind::Post,
            id,
        }
    }

    pub fn user(id: Uuid) -> Self {
        Self {
            kind: TargetKind::User,
            id,
        }
    }
}

/// Domain events that notify another user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationVerb {
    LikedPost,
    CommentedOnPost,
    StartedFollowing,
}

impl NotificationVerb {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::LikedPost => "liked your post",
            Self::CommentedOnPost => "commented on your post",
            Self::StartedFollowing => "started following you",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub id: NotificationId,
    pub recipient_id: UserId,
    pub actor_id: UserId,
    pub verb: String,
    pub target: Option<TargetRef>,
    pub read: bool,
    pub created_at: i64,
}

impl OwnedResource for Notification {
    fn owner_id(&self) -> Option<UserId> {
        Some(self.recipient_id)
    }

    fn created_at(&self) -> i64 {
        self.created_at
    }
}
