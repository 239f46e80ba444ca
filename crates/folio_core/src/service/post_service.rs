//! Post, comment, like and feed use-cases.
//!
//! # Invariants
//! - Every call requires an authenticated caller.
//! - Edits and deletes of posts/comments pass the object ownership check;
//!   staff may delete.
//! - Comments and likes notify the post author unless they are the actor;
//!   the row and its notification are committed together.

use crate::clock::now_epoch_ms;
use crate::config::CoreConfig;
use crate::error::{CoreError, CoreResult};
use crate::model::notification::{NotificationVerb, TargetRef};
use crate::model::post::{validate_content, Comment, CommentId, Post, PostDraft, PostId};
use crate::policy::access::{ObjectPolicy, ViewPolicy};
use crate::policy::request::RequestContext;
use crate::query::config::CollectionConfig;
use crate::query::page::{Page, PageRequest};
use crate::query::presets::{comment_collection, post_collection};
use crate::repo::notification_repo::NotificationRepository;
use crate::repo::post_repo::PostRepository;
use crate::repo::{ReferenceLookup, RepoError};
use crate::service::notification_service::NotificationService;
use crate::service::{plan_list, require_user, ListSettings};
use log::info;
use uuid::Uuid;

pub struct PostService<P: PostRepository, N: NotificationRepository, L: ReferenceLookup> {
    posts: P,
    notifications: NotificationService<N>,
    refs: L,
    post_config: CollectionConfig,
    comment_config: CollectionConfig,
    view_policy: ViewPolicy,
    object_policy: ObjectPolicy,
    settings: ListSettings,
}

impl<P, N, L> PostService<P, N, L>
where
    P: PostRepository,
    N: NotificationRepository,
    L: ReferenceLookup,
{
    pub fn new(posts: P, notifications: N, refs: L) -> Self {
        Self {
            posts,
            notifications: NotificationService::new(notifications),
            refs,
            post_config: post_collection(),
            comment_config: comment_collection(),
            view_policy: ViewPolicy::authenticated(),
            object_policy: ObjectPolicy::default(),
            settings: ListSettings::default(),
        }
    }

    pub fn with_settings(mut self, settings: ListSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_object_policy(mut self, policy: ObjectPolicy) -> Self {
        self.object_policy = policy;
        self
    }

    /// Applies the paging limits and ownership mode of `config`.
    pub fn with_config(self, config: &CoreConfig) -> Self {
        self.with_settings(ListSettings::from(config))
            .with_object_policy(config.object_policy())
    }

    fn require_post(&self, id: PostId) -> CoreResult<Post> {
        self.posts
            .get_post(id)?
            .ok_or_else(|| CoreError::not_found("post", id))
    }

    fn require_comment(&self, id: CommentId) -> CoreResult<Comment> {
        self.posts
            .get_comment(id)?
            .ok_or_else(|| CoreError::not_found("comment", id))
    }

    pub fn list_posts(&self, ctx: &RequestContext) -> CoreResult<Page<Post>> {
        require_user(ctx, &self.view_policy)?;
        let (plan, page) = plan_list(ctx, &self.post_config, &self.refs, self.settings)?;
        Ok(self.posts.list_posts(&plan, page)?)
    }

    pub fn get_post(&self, ctx: &RequestContext, id: PostId) -> CoreResult<Post> {
        require_user(ctx, &self.view_policy)?;
        self.require_post(id)
    }

    pub fn create_post(&self, ctx: &RequestContext, draft: PostDraft) -> CoreResult<Post> {
        let author = require_user(ctx, &self.view_policy)?;
        let draft = PostDraft::new(draft.title.trim(), draft.content);
        draft.validate()?;
        let post = self
            .posts
            .insert_post(Uuid::new_v4(), author, &draft, now_epoch_ms())?;
        info!("event=post_create module=social status=ok");
        Ok(post)
    }

    pub fn update_post(&self, ctx: &RequestContext, id: PostId, draft: PostDraft) -> CoreResult<Post> {
        require_user(ctx, &self.view_policy)?;
        let existing = self.require_post(id)?;
        self.object_policy
            .authorize(ctx.method, &ctx.identity, &existing, &ctx.action)?;
        let draft = PostDraft::new(draft.title.trim(), draft.content);
        draft.validate()?;
        let post = self.posts.update_post(id, &draft, now_epoch_ms())?;
        info!("event=post_update module=social status=ok");
        Ok(post)
    }

    pub fn delete_post(&self, ctx: &RequestContext, id: PostId) -> CoreResult<()> {
        require_user(ctx, &self.view_policy)?;
        let existing = self.require_post(id)?;
        self.object_policy
            .authorize(ctx.method, &ctx.identity, &existing, &ctx.action)?;
        self.posts.delete_post(id)?;
        info!("event=post_delete module=social status=ok");
        Ok(())
    }

    pub fn add_comment(&self, ctx: &RequestContext, post_id: PostId, content: &str) -> CoreResult<Comment> {
        let author = require_user(ctx, &self.view_policy)?;
        let post = self.require_post(post_id)?;
        let content = content.trim();
        validate_content(content)?;

        let now = now_epoch_ms();
        let comment = Comment {
            id: Uuid::new_v4(),
            post_id,
            author_id: author,
            content: content.to_string(),
            created_at: now,
            updated_at: now,
        };
        self.posts.atomically(|| -> CoreResult<()> {
            self.posts.insert_comment(&comment)?;
            self.notifications.create_notification(
                post.author_id,
                author,
                NotificationVerb::CommentedOnPost,
                Some(TargetRef::post(post_id)),
            )?;
            Ok(())
        })?;
        info!("event=comment_create module=social status=ok");
        Ok(comment)
    }

    /// Comments of one post, oldest first unless `ordering` says otherwise.
    pub fn list_comments(&self, ctx: &RequestContext, post_id: PostId) -> CoreResult<Page<Comment>> {
        require_user(ctx, &self.view_policy)?;
        self.require_post(post_id)?;
        let scoped = ctx
            .clone()
            .with_query([("post".to_string(), post_id.to_string())]);
        let (plan, page) = plan_list(&scoped, &self.comment_config, &self.refs, self.settings)?;
        Ok(self.posts.list_comments(&plan, page)?)
    }

    pub fn update_comment(&self, ctx: &RequestContext, id: CommentId, content: &str) -> CoreResult<Comment> {
        require_user(ctx, &self.view_policy)?;
        let existing = self.require_comment(id)?;
        self.object_policy
            .authorize(ctx.method, &ctx.identity, &existing, &ctx.action)?;
        let content = content.trim();
        validate_content(content)?;
        Ok(self.posts.update_comment(id, content, now_epoch_ms())?)
    }

    pub fn delete_comment(&self, ctx: &RequestContext, id: CommentId) -> CoreResult<()> {
        require_user(ctx, &self.view_policy)?;
        let existing = self.require_comment(id)?;
        self.object_policy
            .authorize(ctx.method, &ctx.identity, &existing, &ctx.action)?;
        Ok(self.posts.delete_comment(id)?)
    }

    pub fn like_post(&self, ctx: &RequestContext, post_id: PostId) -> CoreResult<Post> {
        let user = require_user(ctx, &self.view_policy)?;
        let post = self.require_post(post_id)?;
        self.posts.atomically(|| -> CoreResult<()> {
            self.posts
                .insert_like(post_id, user, now_epoch_ms())
                .map_err(|err| match err {
                    RepoError::UniqueViolation(_) => {
                        CoreError::validation("post", "you have already liked this post")
                    }
                    other => other.into(),
                })?;
            self.notifications.create_notification(
                post.author_id,
                user,
                NotificationVerb::LikedPost,
                Some(TargetRef::post(post_id)),
            )?;
            Ok(())
        })?;
        info!("event=post_like module=social status=ok");
        self.require_post(post_id)
    }

    pub fn unlike_post(&self, ctx: &RequestContext, post_id: PostId) -> CoreResult<Post> {
        let user = require_user(ctx, &self.view_policy)?;
        self.require_post(post_id)?;
        if !self.posts.delete_like(post_id, user)? {
            return Err(CoreError::validation("post", "you have not liked this post"));
        }
        info!("event=post_unlike module=social status=ok");
        self.require_post(post_id)
    }

    /// Posts by users the caller follows, newest first.
    pub fn feed(&self, ctx: &RequestContext) -> CoreResult<Page<Post>> {
        let user = require_user(ctx, &self.view_policy)?;
        let page = PageRequest::from_params(
            &ctx.query,
            self.settings.default_page_size,
            self.settings.max_page_size,
        )?;
        Ok(self.posts.feed(user, page)?)
    }
}
