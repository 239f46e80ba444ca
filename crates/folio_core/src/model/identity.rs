//! Principals and user accounts.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type UserId = Uuid;

/// Caller principal as established by the outer session/token layer.
///
/// Read-only to the core; passed explicitly into every policy call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: Option<UserId>,
    pub is_authenticated: bool,
    pub is_staff: bool,
}

impl Identity {
    pub fn anonymous() -> Self {
        Self {
            id: None,
            is_authenticated: false,
            is_staff: false,
        }
    }

    pub fn user(id: UserId) -> Self {
        Self {
            id: Some(id),
            is_authenticated: true,
            is_staff: false,
        }
    }

    pub fn staff(id: UserId) -> Self {
        Self {
            id: Some(id),
            is_authenticated: true,
            is_staff: true,
        }
    }

    /// Id of an authenticated principal; `None` for anonymous callers.
    pub fn authenticated_id(&self) -> Option<UserId> {
        if self.is_authenticated {
            self.id
        } else {
            None
        }
    }
}

/// Registered account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub is_staff: bool,
    pub created_at: i64,
}

impl User {
    /// Identity of this user once authenticated.
    pub fn identity(&self) -> Identity {
        if self.is_staff {
            Identity::staff(self.id)
        } else {
            Identity::user(self.id)
        }
    }
}

/// Public profile, created together with its user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub user_id: UserId,
    pub username: String,
    pub bio: String,
    pub followers_count: u64,
    pub following_count: u64,
    pub created_at: i64,
}
