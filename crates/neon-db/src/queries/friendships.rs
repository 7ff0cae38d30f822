use anyhow::Result;
use rusqlite::{OptionalExtension, Row};

use crate::Database;
use crate::models::FriendshipRow;

const FRIENDSHIP_COLUMNS: &str = "id, sender_id, receiver_id, status, created_at";

impl Database {
    pub fn insert_friendship(&self, friendship: &FriendshipRow) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO friendships (id, sender_id, receiver_id, status, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![
                    friendship.id,
                    friendship.sender_id,
                    friendship.receiver_id,
                    friendship.status,
                    friendship.created_at,
                ],
            )?;
            Ok(())
        })
    }

    pub fn get_friendship(&self, id: &str) -> Result<Option<FriendshipRow>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    &format!("SELECT {} FROM friendships WHERE id = ?1", FRIENDSHIP_COLUMNS),
                    [id],
                    map_friendship,
                )
                .optional()?;
            Ok(row)
        })
    }

    /// Oldest row relating `a` and `b`, whichever of them sent the request.
    pub fn find_friendship_between(&self, a: &str, b: &str) -> Result<Option<FriendshipRow>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    &format!(
                        "SELECT {} FROM friendships
                         WHERE (sender_id = ?1 AND receiver_id = ?2)
                            OR (sender_id = ?2 AND receiver_id = ?1)
                         ORDER BY created_at, rowid
                         LIMIT 1",
                        FRIENDSHIP_COLUMNS
                    ),
                    [a, b],
                    map_friendship,
                )
                .optional()?;
            Ok(row)
        })
    }

    pub fn count_friendships_between(&self, a: &str, b: &str) -> Result<u64> {
        self.with_conn(|conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM friendships
                 WHERE (sender_id = ?1 AND receiver_id = ?2)
                    OR (sender_id = ?2 AND receiver_id = ?1)",
                [a, b],
                |row| row.get(0),
            )?;
            Ok(count as u64)
        })
    }

    pub fn list_friendships(&self) -> Result<Vec<FriendshipRow>> {
        self.query_friendships("1 = 1", &[])
    }

    /// Rows with `status` where the user is on either side.
    pub fn list_friendships_for_user(&self, user_id: &str, status: &str) -> Result<Vec<FriendshipRow>> {
        self.query_friendships(
            "status = ?2 AND (sender_id = ?1 OR receiver_id = ?1)",
            &[user_id, status],
        )
    }

    pub fn list_friendships_for_receiver(&self, receiver_id: &str, status: &str) -> Result<Vec<FriendshipRow>> {
        self.query_friendships("receiver_id = ?1 AND status = ?2", &[receiver_id, status])
    }

    pub fn set_friendship_status(&self, id: &str, status: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute("UPDATE friendships SET status = ?2 WHERE id = ?1", [id, status])?;
            Ok(changed > 0)
        })
    }

    pub fn delete_friendship(&self, id: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute("DELETE FROM friendships WHERE id = ?1", [id])?;
            Ok(changed > 0)
        })
    }

    fn query_friendships(&self, filter: &str, params: &[&str]) -> Result<Vec<FriendshipRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM friendships WHERE {} ORDER BY created_at DESC, rowid DESC",
                FRIENDSHIP_COLUMNS, filter
            ))?;
            let rows = stmt
                .query_map(rusqlite::params_from_iter(params), map_friendship)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}

fn map_friendship(row: &Row<'_>) -> rusqlite::Result<FriendshipRow> {
    Ok(FriendshipRow {
        id: row.get(0)?,
        sender_id: row.get(1)?,
        receiver_id: row.get(2)?,
        status: row.get(3)?,
        created_at: row.get(4)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::fixtures::{ts, user};

    #[test]
    fn pair_lookup_ignores_orientation() {
        let db = Database::open_in_memory().unwrap();
        let a = user(&db, "A");
        let b = user(&db, "B");
        db.insert_friendship(&FriendshipRow {
            id: "f1".to_string(),
            sender_id: a.clone(),
            receiver_id: b.clone(),
            status: "PENDING".to_string(),
            created_at: ts(1),
        })
        .unwrap();

        assert_eq!(db.find_friendship_between(&b, &a).unwrap().unwrap().id, "f1");
        assert_eq!(db.count_friendships_between(&a, &b).unwrap(), 1);
        assert_eq!(db.list_friendships_for_receiver(&b, "PENDING").unwrap().len(), 1);
        assert!(db.list_friendships_for_user(&a, "ACCEPTED").unwrap().is_empty());
    }
}
