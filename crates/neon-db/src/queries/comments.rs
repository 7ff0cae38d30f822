use anyhow::Result;
use rusqlite::{OptionalExtension, Row};

use crate::Database;
use crate::models::CommentRow;

const COMMENT_COLUMNS: &str = "id, post_id, author_id, parent_id, content, created_at";

impl Database {
    pub fn insert_comment(&self, comment: &CommentRow) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO comments (id, post_id, author_id, parent_id, content, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                rusqlite::params![
                    comment.id,
                    comment.post_id,
                    comment.author_id,
                    comment.parent_id,
                    comment.content,
                    comment.created_at,
                ],
            )?;
            Ok(())
        })
    }

    pub fn get_comment(&self, id: &str) -> Result<Option<CommentRow>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    &format!("SELECT {} FROM comments WHERE id = ?1", COMMENT_COLUMNS),
                    [id],
                    map_comment,
                )
                .optional()?;
            Ok(row)
        })
    }

    /// Top-level comments of a post, oldest first.
    pub fn get_root_comments(&self, post_id: &str) -> Result<Vec<CommentRow>> {
        self.query_comments("post_id = ?1 AND parent_id IS NULL", post_id)
    }

    /// Direct replies to a comment, oldest first.
    pub fn get_replies(&self, comment_id: &str) -> Result<Vec<CommentRow>> {
        self.query_comments("parent_id = ?1", comment_id)
    }

    fn query_comments(&self, filter: &str, key: &str) -> Result<Vec<CommentRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM comments WHERE {} ORDER BY created_at, rowid",
                COMMENT_COLUMNS, filter
            ))?;
            let rows = stmt
                .query_map([key], map_comment)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}

fn map_comment(row: &Row<'_>) -> rusqlite::Result<CommentRow> {
    Ok(CommentRow {
        id: row.get(0)?,
        post_id: row.get(1)?,
        author_id: row.get(2)?,
        parent_id: row.get(3)?,
        content: row.get(4)?,
        created_at: row.get(5)?,
    })
}
