//! Social content repository: posts, comments, likes and the follow feed.
//!
//! # Invariants
//! - At most one like per `(post_id, user_id)`; a repeat surfaces as
//!   `UniqueViolation("likes.post_user")`.
//! - Post reads carry live comment and like counts.

use crate::model::identity::UserId;
use crate::model::post::{Comment, CommentId, Post, PostDraft, PostId};
use crate::query::page::{Page, PageRequest};
use crate::query::sql::SqlPlan;
use crate::repo::{
    count_column, ensure_schema_ready, map_write_error, query_page, run_atomically, uuid_column,
    RepoError, RepoResult,
};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};

pub const LIKE_CONSTRAINT: &str = "likes.post_user";

const POST_COLUMNS: &str = "posts.id AS id,
    posts.author_id AS author_id,
    posts.title AS title,
    posts.content AS content,
    (SELECT COUNT(*) FROM comments WHERE comments.post_id = posts.id) AS comments_count,
    (SELECT COUNT(*) FROM likes WHERE likes.post_id = posts.id) AS likes_count,
    posts.created_at AS created_at,
    posts.updated_at AS updated_at";
const POST_FROM: &str = "FROM posts";

const COMMENT_COLUMNS: &str = "comments.id AS id,
    comments.post_id AS post_id,
    comments.author_id AS author_id,
    comments.content AS content,
    comments.created_at AS created_at,
    comments.updated_at AS updated_at";
const COMMENT_FROM: &str = "FROM comments";

pub trait PostRepository {
    fn insert_post(&self, id: PostId, author_id: UserId, draft: &PostDraft, now: i64)
        -> RepoResult<Post>;
    fn update_post(&self, id: PostId, draft: &PostDraft, now: i64) -> RepoResult<Post>;
    fn delete_post(&self, id: PostId) -> RepoResult<()>;
    fn get_post(&self, id: PostId) -> RepoResult<Option<Post>>;
    fn list_posts(&self, plan: &SqlPlan, page: PageRequest) -> RepoResult<Page<Post>>;
    /// Posts authored by users `user_id` follows, newest first.
    fn feed(&self, user_id: UserId, page: PageRequest) -> RepoResult<Page<Post>>;

    fn insert_comment(&self, comment: &Comment) -> RepoResult<()>;
    fn update_comment(&self, id: CommentId, content: &str, now: i64) -> RepoResult<Comment>;
    fn delete_comment(&self, id: CommentId) -> RepoResult<()>;
    fn get_comment(&self, id: CommentId) -> RepoResult<Option<Comment>>;
    fn list_comments(&self, plan: &SqlPlan, page: PageRequest) -> RepoResult<Page<Comment>>;

    fn insert_like(&self, post_id: PostId, user_id: UserId, now: i64) -> RepoResult<()>;
    /// Returns `false` when no like existed.
    fn delete_like(&self, post_id: PostId, user_id: UserId) -> RepoResult<bool>;

    /// Commits every write made by `work` together, or none of them.
    fn atomically<T, E, F>(&self, work: F) -> Result<T, E>
    where
        E: From<RepoError>,
        F: FnOnce() -> Result<T, E>;
}

pub struct SqlitePostRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqlitePostRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_schema_ready(conn)?;
        Ok(Self { conn })
    }

    fn require_post(&self, id: PostId) -> RepoResult<Post> {
        self.get_post(id)?
            .ok_or(RepoError::NotFound { entity: "post", id })
    }

    fn require_comment(&self, id: CommentId) -> RepoResult<Comment> {
        self.get_comment(id)?.ok_or(RepoError::NotFound {
            entity: "comment",
            id,
        })
    }
}

impl PostRepository for SqlitePostRepository<'_> {
    fn atomically<T, E, F>(&self, work: F) -> Result<T, E>
    where
        E: From<RepoError>,
        F: FnOnce() -> Result<T, E>,
    {
        run_atomically(self.conn, work)
    }

    fn insert_post(
        &self,
        id: PostId,
        author_id: UserId,
        draft: &PostDraft,
        now: i64,
    ) -> RepoResult<Post> {
        self.conn.execute(
            "INSERT INTO posts (id, author_id, title, content, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?5);",
            params![
                id.to_string(),
                author_id.to_string(),
                draft.title.as_str(),
                draft.content.as_str(),
                now,
            ],
        )?;
        self.require_post(id)
    }

    fn update_post(&self, id: PostId, draft: &PostDraft, now: i64) -> RepoResult<Post> {
        let changed = self.conn.execute(
            "UPDATE posts SET title = ?2, content = ?3, updated_at = ?4 WHERE id = ?1;",
            params![id.to_string(), draft.title.as_str(), draft.content.as_str(), now],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound { entity: "post", id });
        }
        self.require_post(id)
    }

    fn delete_post(&self, id: PostId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM posts WHERE id = ?1;", [id.to_string()])?;
        if changed == 0 {
            return Err(RepoError::NotFound { entity: "post", id });
        }
        Ok(())
    }

    fn get_post(&self, id: PostId) -> RepoResult<Option<Post>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {POST_COLUMNS} {POST_FROM} WHERE posts.id = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        match rows.next()? {
            Some(row) => map_post(row).map(Some),
            None => Ok(None),
        }
    }

    fn list_posts(&self, plan: &SqlPlan, page: PageRequest) -> RepoResult<Page<Post>> {
        query_page(self.conn, POST_COLUMNS, POST_FROM, plan, page, map_post)
    }

    fn feed(&self, user_id: UserId, page: PageRequest) -> RepoResult<Page<Post>> {
        let plan = SqlPlan {
            where_sql: "posts.author_id IN (
                SELECT followee_id FROM follows WHERE follower_id = ?
            )"
            .to_string(),
            order_sql: "posts.created_at DESC, posts.id ASC".to_string(),
            binds: vec![Value::Text(user_id.to_string())],
        };
        query_page(self.conn, POST_COLUMNS, POST_FROM, &plan, page, map_post)
    }

    fn insert_comment(&self, comment: &Comment) -> RepoResult<()> {
        self.conn.execute(
            "INSERT INTO comments (id, post_id, author_id, content, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
            params![
                comment.id.to_string(),
                comment.post_id.to_string(),
                comment.author_id.to_string(),
                comment.content.as_str(),
                comment.created_at,
                comment.updated_at,
            ],
        )?;
        Ok(())
    }

    fn update_comment(&self, id: CommentId, content: &str, now: i64) -> RepoResult<Comment> {
        let changed = self.conn.execute(
            "UPDATE comments SET content = ?2, updated_at = ?3 WHERE id = ?1;",
            params![id.to_string(), content, now],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: "comment",
                id,
            });
        }
        self.require_comment(id)
    }

    fn delete_comment(&self, id: CommentId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM comments WHERE id = ?1;", [id.to_string()])?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: "comment",
                id,
            });
        }
        Ok(())
    }

    fn get_comment(&self, id: CommentId) -> RepoResult<Option<Comment>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {COMMENT_COLUMNS} {COMMENT_FROM} WHERE comments.id = ?1;"
        ))?;
        let mut rows = stmt.query([id.to_string()])?;
        match rows.next()? {
            Some(row) => map_comment(row).map(Some),
            None => Ok(None),
        }
    }

    fn list_comments(&self, plan: &SqlPlan, page: PageRequest) -> RepoResult<Page<Comment>> {
        query_page(self.conn, COMMENT_COLUMNS, COMMENT_FROM, plan, page, map_comment)
    }

    fn insert_like(&self, post_id: PostId, user_id: UserId, now: i64) -> RepoResult<()> {
        self.conn
            .execute(
                "INSERT INTO likes (post_id, user_id, created_at) VALUES (?1, ?2, ?3);",
                params![post_id.to_string(), user_id.to_string(), now],
            )
            .map_err(|err| map_write_error(err, LIKE_CONSTRAINT))?;
        Ok(())
    }

    fn delete_like(&self, post_id: PostId, user_id: UserId) -> RepoResult<bool> {
        let changed = self.conn.execute(
            "DELETE FROM likes WHERE post_id = ?1 AND user_id = ?2;",
            params_from_iter([post_id.to_string(), user_id.to_string()]),
        )?;
        Ok(changed > 0)
    }
}

fn map_post(row: &Row<'_>) -> RepoResult<Post> {
    Ok(Post {
        id: uuid_column(row, "id")?,
        author_id: uuid_column(row, "author_id")?,
        title: row.get("title")?,
        content: row.get("content")?,
        comments_count: count_column(row, "comments_count")?,
        likes_count: count_column(row, "likes_count")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

fn map_comment(row: &Row<'_>) -> RepoResult<Comment> {
    Ok(Comment {
        id: uuid_column(row, "id")?,
        post_id: uuid_column(row, "post_id")?,
        author_id: uuid_column(row, "author_id")?,
        content: row.get("content")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}
