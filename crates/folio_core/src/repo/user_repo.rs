//! Account repository: users and their profiles.
//!
//! # Invariants
//! - A user row and its profile row are created in one transaction.
//! - Usernames are unique case-insensitively.

use crate::model::identity::{Profile, User, UserId};
use crate::repo::{
    bool_to_int, count_column, ensure_schema_ready, map_write_error, uuid_column, RepoError,
    RepoResult,
};
use rusqlite::{params, Connection, Row};

pub const USERNAME_CONSTRAINT: &str = "users.username";

const PROFILE_SELECT_SQL: &str = "SELECT
    users.id AS user_id,
    users.username AS username,
    profiles.bio AS bio,
    profiles.created_at AS created_at,
    (SELECT COUNT(*) FROM follows WHERE follows.followee_id = users.id) AS followers_count,
    (SELECT COUNT(*) FROM follows WHERE follows.follower_id = users.id) AS following_count
FROM users
INNER JOIN profiles ON profiles.user_id = users.id";

pub trait UserRepository {
    /// Inserts `user` together with an empty-bio profile.
    fn create_user(&self, user: &User, bio: &str) -> RepoResult<()>;
    fn get_user(&self, id: UserId) -> RepoResult<Option<User>>;
    fn find_by_username(&self, username: &str) -> RepoResult<Option<User>>;
    fn user_exists(&self, id: UserId) -> RepoResult<bool>;
    fn get_profile(&self, id: UserId) -> RepoResult<Option<Profile>>;
    fn update_bio(&self, id: UserId, bio: &str) -> RepoResult<()>;
}

pub struct SqliteUserRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteUserRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_schema_ready(conn)?;
        Ok(Self { conn })
    }

    fn query_user(&self, sql: &str, key: &str) -> RepoResult<Option<User>> {
        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = stmt.query([key])?;
        match rows.next()? {
            Some(row) => map_user(row).map(Some),
            None => Ok(None),
        }
    }
}

impl UserRepository for SqliteUserRepository<'_> {
    fn create_user(&self, user: &User, bio: &str) -> RepoResult<()> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "INSERT INTO users (id, username, is_staff, created_at) VALUES (?1, ?2, ?3, ?4);",
            params![
                user.id.to_string(),
                user.username.as_str(),
                bool_to_int(user.is_staff),
                user.created_at,
            ],
        )
        .map_err(|err| map_write_error(err, USERNAME_CONSTRAINT))?;
        tx.execute(
            "INSERT INTO profiles (user_id, bio, created_at) VALUES (?1, ?2, ?3);",
            params![user.id.to_string(), bio, user.created_at],
        )?;
        tx.commit()?;
        Ok(())
    }

    fn get_user(&self, id: UserId) -> RepoResult<Option<User>> {
        self.query_user(
            "SELECT id, username, is_staff, created_at FROM users WHERE id = ?1;",
            &id.to_string(),
        )
    }

    fn find_by_username(&self, username: &str) -> RepoResult<Option<User>> {
        self.query_user(
            "SELECT id, username, is_staff, created_at FROM users WHERE username = ?1;",
            username,
        )
    }

    fn user_exists(&self, id: UserId) -> RepoResult<bool> {
        let exists: i64 = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM users WHERE id = ?1);",
            [id.to_string()],
            |row| row.get(0),
        )?;
        Ok(exists == 1)
    }

    fn get_profile(&self, id: UserId) -> RepoResult<Option<Profile>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{PROFILE_SELECT_SQL} WHERE users.id = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        match rows.next()? {
            Some(row) => map_profile(row).map(Some),
            None => Ok(None),
        }
    }

    fn update_bio(&self, id: UserId, bio: &str) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE profiles SET bio = ?2 WHERE user_id = ?1;",
            params![id.to_string(), bio],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound { entity: "user", id });
        }
        Ok(())
    }
}

fn map_user(row: &Row<'_>) -> RepoResult<User> {
    let is_staff: i64 = row.get("is_staff")?;
    Ok(User {
        id: uuid_column(row, "id")?,
        username: row.get("username")?,
        is_staff: is_staff == 1,
        created_at: row.get("created_at")?,
    })
}

fn map_profile(row: &Row<'_>) -> RepoResult<Profile> {
    Ok(Profile {
        user_id: uuid_column(row, "user_id")?,
        username: row.get("username")?,
        bio: row.get("bio")?,
        followers_count: count_column(row, "followers_count")?,
        following_count: count_column(row, "following_count")?,
        created_at: row.get("created_at")?,
    })
}
