//! Account use-cases: registration, profiles and follow/unfollow.
//!
//! # Invariants
//! - Registration writes the user and its profile together or not at all.
//! - Follow targets are resolved before the graph is touched; an unknown id
//!   is `NotFound`, never a graph error.
//! - A successful follow notifies the followee; the edge and the
//!   notification are committed together.

use crate::clock::now_epoch_ms;
use crate::error::{CoreError, CoreResult};
use crate::model::identity::{Profile, User, UserId};
use crate::model::notification::{NotificationVerb, TargetRef};
use crate::policy::access::ViewPolicy;
use crate::policy::request::RequestContext;
use crate::repo::notification_repo::NotificationRepository;
use crate::repo::user_repo::UserRepository;
use crate::repo::RepoError;
use crate::service::notification_service::NotificationService;
use crate::service::require_user;
use crate::social::follow_graph::FollowGraph;
use log::info;
use serde::Serialize;
use uuid::Uuid;

pub const USERNAME_MAX_CHARS: usize = 150;

/// Follow state after a follow/unfollow call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FollowOutcome {
    pub user_id: UserId,
    pub following: bool,
    pub followers_count: u64,
}

pub struct AccountService<U: UserRepository, G: FollowGraph, N: NotificationRepository> {
    users: U,
    graph: G,
    notifications: NotificationService<N>,
}

impl<U, G, N> AccountService<U, G, N>
where
    U: UserRepository,
    G: FollowGraph,
    N: NotificationRepository,
{
    pub fn new(users: U, graph: G, notifications: N) -> Self {
        Self {
            users,
            graph,
            notifications: NotificationService::new(notifications),
        }
    }

    /// Creates a user with an empty profile. Open to anonymous callers.
    pub fn register_user(&self, username: &str, is_staff: bool) -> CoreResult<User> {
        let username = username.trim();
        if username.is_empty() {
            return Err(CoreError::validation("username", "username must not be blank"));
        }
        if username.chars().count() > USERNAME_MAX_CHARS {
            return Err(CoreError::validation(
                "username",
                format!("username must be at most {USERNAME_MAX_CHARS} characters"),
            ));
        }

        let user = User {
            id: Uuid::new_v4(),
            username: username.to_string(),
            is_staff,
            created_at: now_epoch_ms(),
        };
        self.users.create_user(&user, "").map_err(|err| match err {
            RepoError::UniqueViolation(_) => {
                CoreError::validation("username", "a user with that username already exists")
            }
            other => other.into(),
        })?;
        info!("event=user_register module=account status=ok");
        Ok(user)
    }

    pub fn get_profile(&self, ctx: &RequestContext, user_id: UserId) -> CoreResult<Profile> {
        require_user(ctx, &ViewPolicy::authenticated())?;
        self.users
            .get_profile(user_id)?
            .ok_or_else(|| CoreError::not_found("user", user_id))
    }

    /// Updates the caller's own bio.
    pub fn update_bio(&self, ctx: &RequestContext, bio: &str) -> CoreResult<Profile> {
        let caller = require_user(ctx, &ViewPolicy::authenticated())?;
        self.users.update_bio(caller, bio.trim())?;
        self.users
            .get_profile(caller)?
            .ok_or_else(|| CoreError::not_found("user", caller))
    }

    pub fn follow_user(&self, ctx: &RequestContext, target: UserId) -> CoreResult<FollowOutcome> {
        let caller = require_user(ctx, &ViewPolicy::authenticated())?;
        if caller != target && !self.users.user_exists(target)? {
            return Err(CoreError::not_found("user", target));
        }
        self.graph.atomically(|| -> CoreResult<()> {
            self.graph.follow(caller, target)?;
            self.notifications.create_notification(
                target,
                caller,
                NotificationVerb::StartedFollowing,
                Some(TargetRef::user(caller)),
            )?;
            Ok(())
        })?;
        self.outcome(target, true)
    }

    pub fn unfollow_user(&self, ctx: &RequestContext, target: UserId) -> CoreResult<FollowOutcome> {
        let caller = require_user(ctx, &ViewPolicy::authenticated())?;
        if caller != target && !self.users.user_exists(target)? {
            return Err(CoreError::not_found("user", target));
        }
        self.graph.unfollow(caller, target)?;
        self.outcome(target, false)
    }

    pub fn followers(&self, ctx: &RequestContext, user_id: UserId) -> CoreResult<Vec<UserId>> {
        require_user(ctx, &ViewPolicy::authenticated())?;
        self.require_existing(user_id)?;
        Ok(self.graph.followers(user_id)?)
    }

    pub fn following(&self, ctx: &RequestContext, user_id: UserId) -> CoreResult<Vec<UserId>> {
        require_user(ctx, &ViewPolicy::authenticated())?;
        self.require_existing(user_id)?;
        Ok(self.graph.following(user_id)?)
    }

    fn require_existing(&self, user_id: UserId) -> CoreResult<()> {
        if self.users.user_exists(user_id)? {
            Ok(())
        } else {
            Err(CoreError::not_found("user", user_id))
        }
    }

    fn outcome(&self, target: UserId, following: bool) -> CoreResult<FollowOutcome> {
        Ok(FollowOutcome {
            user_id: target,
            following,
            followers_count: self.graph.followers_count(target)?,
        })
    }
}
