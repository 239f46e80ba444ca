//! Notification read-state use-cases.
//!
//! # Invariants
//! - Self-actions never create a notification.
//! - `unread_count` equals the unread entries of `list_for`.
//! - Request-level calls act only on the caller's own notifications.

use crate::clock::now_epoch_ms;
use crate::error::{CoreError, CoreResult};
use crate::model::identity::UserId;
use crate::model::notification::{Notification, NotificationId, NotificationVerb, TargetRef};
use crate::policy::access::ViewPolicy;
use crate::policy::request::RequestContext;
use crate::repo::notification_repo::NotificationRepository;
use crate::service::require_user;
use log::info;
use uuid::Uuid;

pub struct NotificationService<R: NotificationRepository> {
    repo: R,
}

impl<R: NotificationRepository> NotificationService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Records `actor` doing `verb` to `recipient`.
    ///
    /// Returns `None` and writes nothing when `recipient == actor`.
    pub fn create_notification(
        &self,
        recipient: UserId,
        actor: UserId,
        verb: NotificationVerb,
        target: Option<TargetRef>,
    ) -> CoreResult<Option<NotificationId>> {
        if recipient == actor {
            return Ok(None);
        }
        let notification = Notification {
            id: Uuid::new_v4(),
            recipient_id: recipient,
            actor_id: actor,
            verb: verb.as_str().to_string(),
            target,
            read: false,
            created_at: now_epoch_ms(),
        };
        self.repo.insert_notification(&notification)?;
        info!(
            "event=notification_create module=notification status=ok target_kind={}",
            target.map_or("none", |target| target.kind.as_str())
        );
        Ok(Some(notification.id))
    }

    /// Idempotent; `NotFound` when `id` is not one of `recipient`'s.
    pub fn mark_read(&self, id: NotificationId, recipient: UserId) -> CoreResult<()> {
        self.repo.mark_read(id, recipient)?;
        info!("event=notification_mark_read module=notification status=ok");
        Ok(())
    }

    pub fn mark_all_read(&self, recipient: UserId) -> CoreResult<usize> {
        let changed = self.repo.mark_all_read(recipient)?;
        info!("event=notification_mark_all_read module=notification status=ok changed={changed}");
        Ok(changed)
    }

    pub fn unread_count(&self, recipient: UserId) -> CoreResult<u64> {
        Ok(self.repo.unread_count(recipient)?)
    }

    /// Unread first, then newest first.
    pub fn list_for(&self, recipient: UserId) -> CoreResult<Vec<Notification>> {
        Ok(self.repo.list_for(recipient)?)
    }

    pub fn get_for(&self, id: NotificationId, recipient: UserId) -> CoreResult<Notification> {
        self.repo
            .get_for(id, recipient)?
            .ok_or_else(|| CoreError::not_found("notification", id))
    }

    pub fn list(&self, ctx: &RequestContext) -> CoreResult<Vec<Notification>> {
        let user = require_user(ctx, &ViewPolicy::authenticated())?;
        self.list_for(user)
    }

    pub fn detail(&self, ctx: &RequestContext, id: NotificationId) -> CoreResult<Notification> {
        let user = require_user(ctx, &ViewPolicy::authenticated())?;
        self.get_for(id, user)
    }

    pub fn read(&self, ctx: &RequestContext, id: NotificationId) -> CoreResult<()> {
        let user = require_user(ctx, &ViewPolicy::authenticated())?;
        self.mark_read(id, user)
    }

    pub fn read_all(&self, ctx: &RequestContext) -> CoreResult<usize> {
        let user = require_user(ctx, &ViewPolicy::authenticated())?;
        self.mark_all_read(user)
    }

    pub fn unread(&self, ctx: &RequestContext) -> CoreResult<u64> {
        let user = require_user(ctx, &ViewPolicy::authenticated())?;
        self.unread_count(user)
    }
}
