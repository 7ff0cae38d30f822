use anyhow::Result;
use rusqlite::{OptionalExtension, Row};

use crate::Database;
use crate::models::ImageRow;

impl Database {
    pub fn insert_image(
        &self,
        id: &str,
        name: &str,
        content_type: &str,
        data: &[u8],
        created_at: &str,
    ) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO images (id, name, content_type, data, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![id, name, content_type, data, created_at],
            )?;
            Ok(())
        })
    }

    pub fn get_image(&self, id: &str) -> Result<Option<ImageRow>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    "SELECT id, name, content_type, length(data), created_at FROM images WHERE id = ?1",
                    [id],
                    map_image,
                )
                .optional()?;
            Ok(row)
        })
    }

    pub fn get_image_data(&self, id: &str) -> Result<Option<(ImageRow, Vec<u8>)>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    "SELECT id, name, content_type, length(data), created_at, data FROM images WHERE id = ?1",
                    [id],
                    |row| Ok((map_image(row)?, row.get::<_, Vec<u8>>(5)?)),
                )
                .optional()?;
            Ok(row)
        })
    }

    /// Replaces name, type and bytes in place so existing references stay valid.
    pub fn update_image(&self, id: &str, name: &str, content_type: &str, data: &[u8]) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "UPDATE images SET name = ?2, content_type = ?3, data = ?4 WHERE id = ?1",
                rusqlite::params![id, name, content_type, data],
            )?;
            Ok(changed > 0)
        })
    }

    pub fn delete_image(&self, id: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute("DELETE FROM images WHERE id = ?1", [id])?;
            Ok(changed > 0)
        })
    }
}

fn map_image(row: &Row<'_>) -> rusqlite::Result<ImageRow> {
    Ok(ImageRow {
        id: row.get(0)?,
        name: row.get(1)?,
        content_type: row.get(2)?,
        size: row.get(3)?,
        created_at: row.get(4)?,
    })
}
