//! Follow-edge state machine over the `follows` table.
//!
//! # Responsibility
//! - Create and remove `(follower, followee)` edges.
//! - Answer membership and count queries.
//!
//! # Invariants
//! - `follow(u, u)` and `unfollow(u, u)` fail with `SelfFollow` before any
//!   store access.
//! - A uniqueness violation raised by the store under a concurrent follow is
//!   reported as `AlreadyFollowing`, same as the pre-check.
//! - Callers resolve unknown user ids before reaching the graph.

use crate::error::{CoreError, CoreResult};
use crate::model::identity::UserId;
use crate::repo::{
    ensure_schema_ready, map_write_error, run_atomically, uuid_column, RepoError, RepoResult,
};
use log::info;
use rusqlite::{params, Connection};

const FOLLOW_EDGE_CONSTRAINT: &str = "follows.pair";

pub trait FollowGraph {
    fn follow(&self, follower: UserId, followee: UserId) -> CoreResult<()>;
    fn unfollow(&self, follower: UserId, followee: UserId) -> CoreResult<()>;
    fn is_following(&self, follower: UserId, followee: UserId) -> RepoResult<bool>;
    fn followers_count(&self, user: UserId) -> RepoResult<u64>;
    fn following_count(&self, user: UserId) -> RepoResult<u64>;
    /// Ids following `user`, oldest edge first.
    fn followers(&self, user: UserId) -> RepoResult<Vec<UserId>>;
    /// Ids `user` follows, oldest edge first.
    fn following(&self, user: UserId) -> RepoResult<Vec<UserId>>;

    /// Commits every write made by `work` together, or none of them.
    fn atomically<T, E, F>(&self, work: F) -> Result<T, E>
    where
        E: From<RepoError>,
        F: FnOnce() -> Result<T, E>;
}

pub struct SqliteFollowGraph<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteFollowGraph<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_schema_ready(conn)?;
        Ok(Self { conn })
    }

    fn count(&self, sql: &str, user: UserId) -> RepoResult<u64> {
        let count: i64 = self
            .conn
            .query_row(sql, [user.to_string()], |row| row.get(0))?;
        Ok(u64::try_from(count).unwrap_or_default())
    }

    fn ids(&self, sql: &str, user: UserId, column: &str) -> RepoResult<Vec<UserId>> {
        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = stmt.query([user.to_string()])?;
        let mut ids = Vec::new();
        while let Some(row) = rows.next()? {
            ids.push(uuid_column(row, column)?);
        }
        Ok(ids)
    }
}

impl FollowGraph for SqliteFollowGraph<'_> {
    fn follow(&self, follower: UserId, followee: UserId) -> CoreResult<()> {
        if follower == followee {
            return Err(CoreError::SelfFollow);
        }
        if self.is_following(follower, followee)? {
            return Err(CoreError::AlreadyFollowing(followee));
        }

        let inserted = self.conn.execute(
            "INSERT INTO follows (follower_id, followee_id, created_at) VALUES (?1, ?2, ?3);",
            params![
                follower.to_string(),
                followee.to_string(),
                crate::clock::now_epoch_ms()
            ],
        );
        match inserted.map_err(|err| map_write_error(err, FOLLOW_EDGE_CONSTRAINT)) {
            Ok(_) => {}
            Err(RepoError::UniqueViolation(_)) => return Err(CoreError::AlreadyFollowing(followee)),
            Err(other) => return Err(other.into()),
        }

        info!("event=follow module=social status=ok");
        Ok(())
    }

    fn unfollow(&self, follower: UserId, followee: UserId) -> CoreResult<()> {
        if follower == followee {
            return Err(CoreError::SelfFollow);
        }
        let removed = self
            .conn
            .execute(
                "DELETE FROM follows WHERE follower_id = ?1 AND followee_id = ?2;",
                [follower.to_string(), followee.to_string()],
            )
            .map_err(RepoError::from)?;
        if removed == 0 {
            return Err(CoreError::NotFollowing(followee));
        }

        info!("event=unfollow module=social status=ok");
        Ok(())
    }

    fn is_following(&self, follower: UserId, followee: UserId) -> RepoResult<bool> {
        let exists: i64 = self.conn.query_row(
            "SELECT EXISTS(
                SELECT 1 FROM follows WHERE follower_id = ?1 AND followee_id = ?2
            );",
            [follower.to_string(), followee.to_string()],
            |row| row.get(0),
        )?;
        Ok(exists == 1)
    }

    fn followers_count(&self, user: UserId) -> RepoResult<u64> {
        self.count(
            "SELECT COUNT(*) FROM follows WHERE followee_id = ?1;",
            user,
        )
    }

    fn following_count(&self, user: UserId) -> RepoResult<u64> {
        self.count(
            "SELECT COUNT(*) FROM follows WHERE follower_id = ?1;",
            user,
        )
    }

    fn followers(&self, user: UserId) -> RepoResult<Vec<UserId>> {
        self.ids(
            "SELECT follower_id FROM follows
             WHERE followee_id = ?1
             ORDER BY created_at ASC, rowid ASC;",
            user,
            "follower_id",
        )
    }

    fn following(&self, user: UserId) -> RepoResult<Vec<UserId>> {
        self.ids(
            "SELECT followee_id FROM follows
             WHERE follower_id = ?1
             ORDER BY created_at ASC, rowid ASC;",
            user,
            "followee_id",
        )
    }

    fn atomically<T, E, F>(&self, work: F) -> Result<T, E>
    where
        E: From<RepoError>,
        F: FnOnce() -> Result<T, E>,
    {
        run_atomically(self.conn, work)
    }
}
