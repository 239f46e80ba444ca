//! Social records: posts, comments and likes.

use crate::error::ValidationError;
use crate::model::identity::UserId;
use crate::model::resource::OwnedResource;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type PostId = Uuid;
pub type CommentId = Uuid;

pub const POST_TITLE_MAX_CHARS: usize = 200;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub id: PostId,
    pub author_id: UserId,
    pub title: String,
    pub content: String,
    pub comments_count: u64,
    pub likes_count: u64,
    pub created_at: i64,
    pub updated_at: i64,
}

impl OwnedResource for Post {
    fn owner_id(&self) -> Option<UserId> {
        Some(self.author_id)
    }

    fn created_at(&self) -> i64 {
        self.created_at
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: CommentId,
    pub post_id: PostId,
    pub author_id: UserId,
    pub content: String,
    pub created_at: i64,
    pub updated_at: i64,
}

impl OwnedResource for Comment {
    fn owner_id(&self) -> Option<UserId> {
        Some(self.author_id)
    }

    fn created_at(&self) -> i64 {
        self.created_at
    }
}

/// Post body for create and update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostDraft {
    pub title: String,
    pub content: String,
}

impl PostDraft {
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.title.trim().is_empty() {
            return Err(ValidationError::new("title", "title must not be blank"));
        }
        if self.title.chars().count() > POST_TITLE_MAX_CHARS {
            return Err(ValidationError::new(
                "title",
                format!("title must be at most {POST_TITLE_MAX_CHARS} characters"),
            ));
        }
        validate_content(&self.content)
    }
}

pub fn validate_content(content: &str) -> Result<(), ValidationError> {
    if content.trim().is_empty() {
        return Err(ValidationError::new("content", "content must not be blank"));
    }
    Ok(())
}
