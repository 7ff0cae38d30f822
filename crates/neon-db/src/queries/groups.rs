use anyhow::Result;
use rusqlite::{OptionalExtension, Row};

use crate::Database;
use crate::models::GroupRow;

const GROUP_SELECT: &str = "
    SELECT g.id, g.name, g.description, g.visibility, g.created_by,
           (SELECT COUNT(*) FROM group_members m WHERE m.group_id = g.id),
           g.created_at
    FROM social_groups g";

impl Database {
    pub fn insert_group(&self, group: &GroupRow) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO social_groups (id, name, description, visibility, created_by, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                rusqlite::params![
                    group.id,
                    group.name,
                    group.description,
                    group.visibility,
                    group.created_by,
                    group.created_at,
                ],
            )?;
            Ok(())
        })
    }

    pub fn get_group(&self, id: &str) -> Result<Option<GroupRow>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(&format!("{} WHERE g.id = ?1", GROUP_SELECT), [id], map_group)
                .optional()?;
            Ok(row)
        })
    }

    pub fn list_groups(&self) -> Result<Vec<GroupRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!("{} ORDER BY g.created_at, g.rowid", GROUP_SELECT))?;
            let rows = stmt
                .query_map([], map_group)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Returns true if the user was not a member before.
    pub fn add_group_member(&self, group_id: &str, user_id: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "INSERT OR IGNORE INTO group_members (group_id, user_id) VALUES (?1, ?2)",
                [group_id, user_id],
            )?;
            Ok(changed > 0)
        })
    }

    pub fn get_group_member_ids(&self, group_id: &str) -> Result<Vec<String>> {
        self.query_group_links("SELECT user_id FROM group_members WHERE group_id = ?1 ORDER BY rowid", group_id)
    }

    /// Returns true if the post was not attached before.
    pub fn add_group_post(&self, group_id: &str, post_id: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "INSERT OR IGNORE INTO group_posts (group_id, post_id) VALUES (?1, ?2)",
                [group_id, post_id],
            )?;
            Ok(changed > 0)
        })
    }

    pub fn get_group_post_ids(&self, group_id: &str) -> Result<Vec<String>> {
        self.query_group_links("SELECT post_id FROM group_posts WHERE group_id = ?1 ORDER BY rowid", group_id)
    }

    fn query_group_links(&self, sql: &str, group_id: &str) -> Result<Vec<String>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(sql)?;
            let ids = stmt
                .query_map([group_id], |row| row.get(0))?
                .collect::<std::result::Result<Vec<String>, _>>()?;
            Ok(ids)
        })
    }
}

fn map_group(row: &Row<'_>) -> rusqlite::Result<GroupRow> {
    Ok(GroupRow {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        visibility: row.get(3)?,
        created_by: row.get(4)?,
        member_count: row.get(5)?,
        created_at: row.get(6)?,
    })
}
