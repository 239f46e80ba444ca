//! Notification persistence.
//!
//! # Invariants
//! - Every read and write is scoped by `recipient_id`; another user's
//!   notification is indistinguishable from a missing one.
//! - `is_read` is only ever set, never cleared.
//! - Listing order: unread first, newest first, then insertion order.

use crate::model::identity::UserId;
use crate::model::notification::{Notification, NotificationId, TargetKind, TargetRef};
use crate::repo::{bool_to_int, ensure_schema_ready, parse_uuid, uuid_column, RepoError, RepoResult};
use rusqlite::{params, Connection, Row};

const NOTIFICATION_SELECT_SQL: &str = "SELECT
    id,
    recipient_id,
    actor_id,
    verb,
    target_kind,
    target_id,
    is_read,
    created_at
FROM notifications";

pub trait NotificationRepository {
    fn insert_notification(&self, notification: &Notification) -> RepoResult<()>;
    fn get_for(&self, id: NotificationId, recipient: UserId) -> RepoResult<Option<Notification>>;
    fn list_for(&self, recipient: UserId) -> RepoResult<Vec<Notification>>;
    /// Marks one notification read; `NotFound` when absent for `recipient`.
    fn mark_read(&self, id: NotificationId, recipient: UserId) -> RepoResult<()>;
    /// Marks every unread notification read and returns how many changed.
    fn mark_all_read(&self, recipient: UserId) -> RepoResult<usize>;
    fn unread_count(&self, recipient: UserId) -> RepoResult<u64>;
}

pub struct SqliteNotificationRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteNotificationRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_schema_ready(conn)?;
        Ok(Self { conn })
    }
}

impl NotificationRepository for SqliteNotificationRepository<'_> {
    fn insert_notification(&self, notification: &Notification) -> RepoResult<()> {
        let (target_kind, target_id) = match notification.target {
            Some(target) => (Some(target.kind.as_str()), Some(target.id.to_string())),
            None => (None, None),
        };
        self.conn.execute(
            "INSERT INTO notifications (
                id, recipient_id, actor_id, verb, target_kind, target_id, is_read, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8);",
            params![
                notification.id.to_string(),
                notification.recipient_id.to_string(),
                notification.actor_id.to_string(),
                notification.verb.as_str(),
                target_kind,
                target_id,
                bool_to_int(notification.read),
                notification.created_at,
            ],
        )?;
        Ok(())
    }

    fn get_for(&self, id: NotificationId, recipient: UserId) -> RepoResult<Option<Notification>> {
        let mut stmt = self.conn.prepare(&format!(
            "{NOTIFICATION_SELECT_SQL} WHERE id = ?1 AND recipient_id = ?2;"
        ))?;
        let mut rows = stmt.query([id.to_string(), recipient.to_string()])?;
        match rows.next()? {
            Some(row) => map_notification(row).map(Some),
            None => Ok(None),
        }
    }

    fn list_for(&self, recipient: UserId) -> RepoResult<Vec<Notification>> {
        let mut stmt = self.conn.prepare(&format!(
            "{NOTIFICATION_SELECT_SQL}
             WHERE recipient_id = ?1
             ORDER BY is_read ASC, created_at DESC, rowid DESC;"
        ))?;
        let mut rows = stmt.query([recipient.to_string()])?;
        let mut notifications = Vec::new();
        while let Some(row) = rows.next()? {
            notifications.push(map_notification(row)?);
        }
        Ok(notifications)
    }

    fn mark_read(&self, id: NotificationId, recipient: UserId) -> RepoResult<()> {
        // Matches already-read rows too, so repeats succeed.
        let matched = self.conn.execute(
            "UPDATE notifications SET is_read = 1 WHERE id = ?1 AND recipient_id = ?2;",
            params![id.to_string(), recipient.to_string()],
        )?;
        if matched == 0 {
            return Err(RepoError::NotFound {
                entity: "notification",
                id,
            });
        }
        Ok(())
    }

    fn mark_all_read(&self, recipient: UserId) -> RepoResult<usize> {
        let changed = self.conn.execute(
            "UPDATE notifications SET is_read = 1 WHERE recipient_id = ?1 AND is_read = 0;",
            [recipient.to_string()],
        )?;
        Ok(changed)
    }

    fn unread_count(&self, recipient: UserId) -> RepoResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM notifications WHERE recipient_id = ?1 AND is_read = 0;",
            [recipient.to_string()],
            |row| row.get(0),
        )?;
        Ok(u64::try_from(count).unwrap_or_default())
    }
}

fn map_notification(row: &Row<'_>) -> RepoResult<Notification> {
    let target_kind: Option<String> = row.get("target_kind")?;
    let target_id: Option<String> = row.get("target_id")?;
    let target = match (target_kind, target_id) {
        (Some(kind), Some(id)) => {
            let kind = TargetKind::parse(&kind).ok_or_else(|| {
                RepoError::InvalidData(format!("unknown notifications.target_kind `{kind}`"))
            })?;
            Some(TargetRef {
                kind,
                id: parse_uuid(&id, "notifications.target_id")?,
            })
        }
        (None, None) => None,
        _ => {
            return Err(RepoError::InvalidData(
                "notifications.target_kind and target_id must be set together".to_string(),
            ))
        }
    };
    let is_read: i64 = row.get("is_read")?;
    Ok(Notification {
        id: uuid_column(row, "id")?,
        recipient_id: uuid_column(row, "recipient_id")?,
        actor_id: uuid_column(row, "actor_id")?,
        verb: row.get("verb")?,
        target,
        read: is_read == 1,
        created_at: row.get("created_at")?,
    })
}
