use anyhow::Result;
use rusqlite::{OptionalExtension, Row};

use crate::Database;
use crate::models::NotificationRow;

const NOTIFICATION_COLUMNS: &str = "id, user_id, kind, status, content, created_at";

impl Database {
    pub fn insert_notification(&self, notification: &NotificationRow) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO notifications (id, user_id, kind, status, content, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                rusqlite::params![
                    notification.id,
                    notification.user_id,
                    notification.kind,
                    notification.status,
                    notification.content,
                    notification.created_at,
                ],
            )?;
            Ok(())
        })
    }

    pub fn get_notification(&self, id: &str) -> Result<Option<NotificationRow>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    &format!("SELECT {} FROM notifications WHERE id = ?1", NOTIFICATION_COLUMNS),
                    [id],
                    map_notification,
                )
                .optional()?;
            Ok(row)
        })
    }

    /// All notifications of a user, newest first.
    pub fn list_notifications(&self, user_id: &str) -> Result<Vec<NotificationRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM notifications WHERE user_id = ?1 ORDER BY created_at DESC, rowid DESC",
                NOTIFICATION_COLUMNS
            ))?;
            let rows = stmt
                .query_map([user_id], map_notification)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn count_notifications(&self, user_id: &str, status: &str) -> Result<u64> {
        self.with_conn(|conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM notifications WHERE user_id = ?1 AND status = ?2",
                [user_id, status],
                |row| row.get(0),
            )?;
            Ok(count as u64)
        })
    }

    pub fn set_notification_status(&self, id: &str, status: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute("UPDATE notifications SET status = ?2 WHERE id = ?1", [id, status])?;
            Ok(changed > 0)
        })
    }

    /// Moves every notification of the user from one status to another.
    pub fn update_notification_statuses(&self, user_id: &str, from: &str, to: &str) -> Result<usize> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "UPDATE notifications SET status = ?3 WHERE user_id = ?1 AND status = ?2",
                [user_id, from, to],
            )?;
            Ok(changed)
        })
    }
}

fn map_notification(row: &Row<'_>) -> rusqlite::Result<NotificationRow> {
    Ok(NotificationRow {
        id: row.get(0)?,
        user_id: row.get(1)?,
        kind: row.get(2)?,
        status: row.get(3)?,
        content: row.get(4)?,
        created_at: row.get(5)?,
    })
}
