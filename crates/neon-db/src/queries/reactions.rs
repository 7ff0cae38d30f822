use anyhow::Result;
use rusqlite::{OptionalExtension, Row};

use crate::Database;
use crate::models::ReactionRow;

const REACTION_COLUMNS: &str = "id, post_id, user_id, kind, created_at";

impl Database {
    pub fn get_reaction_by_user_and_post(&self, user_id: &str, post_id: &str) -> Result<Option<ReactionRow>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    &format!(
                        "SELECT {} FROM reactions WHERE user_id = ?1 AND post_id = ?2",
                        REACTION_COLUMNS
                    ),
                    [user_id, post_id],
                    map_reaction,
                )
                .optional()?;
            Ok(row)
        })
    }

    /// Stores `reaction` as the user's only reaction on the post, dropping any previous one.
    pub fn replace_reaction(&self, reaction: &ReactionRow) -> Result<()> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "DELETE FROM reactions WHERE user_id = ?1 AND post_id = ?2",
                [&reaction.user_id, &reaction.post_id],
            )?;
            tx.execute(
                "INSERT INTO reactions (id, post_id, user_id, kind, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![
                    reaction.id,
                    reaction.post_id,
                    reaction.user_id,
                    reaction.kind,
                    reaction.created_at,
                ],
            )?;
            tx.commit()?;
            Ok(())
        })
    }

    pub fn delete_reaction(&self, user_id: &str, post_id: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "DELETE FROM reactions WHERE user_id = ?1 AND post_id = ?2",
                [user_id, post_id],
            )?;
            Ok(changed > 0)
        })
    }

    pub fn get_reactions_for_post(&self, post_id: &str) -> Result<Vec<ReactionRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM reactions WHERE post_id = ?1 ORDER BY created_at, rowid",
                REACTION_COLUMNS
            ))?;
            let rows = stmt
                .query_map([post_id], map_reaction)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}

fn map_reaction(row: &Row<'_>) -> rusqlite::Result<ReactionRow> {
    Ok(ReactionRow {
        id: row.get(0)?,
        post_id: row.get(1)?,
        user_id: row.get(2)?,
        kind: row.get(3)?,
        created_at: row.get(4)?,
    })
}
