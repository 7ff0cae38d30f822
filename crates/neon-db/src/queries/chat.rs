use anyhow::Result;
use rusqlite::{OptionalExtension, Row};

use crate::Database;
use crate::models::{ChatMessageRow, ConversationRow};

const CONVERSATION_COLUMNS: &str = "id, user_a_id, user_b_id, created_at";
const MESSAGE_COLUMNS: &str = "id, conversation_id, sender_id, content, sent_at, is_read";

impl Database {
    // -- Conversations --

    /// Exact `(user_a, user_b)` lookup; callers normalize the pair first.
    pub fn find_conversation(&self, user_a_id: &str, user_b_id: &str) -> Result<Option<ConversationRow>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    &format!(
                        "SELECT {} FROM conversations WHERE user_a_id = ?1 AND user_b_id = ?2",
                        CONVERSATION_COLUMNS
                    ),
                    [user_a_id, user_b_id],
                    map_conversation,
                )
                .optional()?;
            Ok(row)
        })
    }

    pub fn get_conversation(&self, id: &str) -> Result<Option<ConversationRow>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    &format!("SELECT {} FROM conversations WHERE id = ?1", CONVERSATION_COLUMNS),
                    [id],
                    map_conversation,
                )
                .optional()?;
            Ok(row)
        })
    }

    pub fn insert_conversation(&self, conversation: &ConversationRow) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO conversations (id, user_a_id, user_b_id, created_at) VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![
                    conversation.id,
                    conversation.user_a_id,
                    conversation.user_b_id,
                    conversation.created_at,
                ],
            )?;
            Ok(())
        })
    }

    /// Conversations the user takes part in, newest first.
    pub fn list_conversations_for_user(&self, user_id: &str) -> Result<Vec<ConversationRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM conversations
                 WHERE user_a_id = ?1 OR user_b_id = ?1
                 ORDER BY created_at DESC, rowid DESC",
                CONVERSATION_COLUMNS
            ))?;
            let rows = stmt
                .query_map([user_id], map_conversation)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // -- Messages --

    pub fn insert_chat_message(&self, message: &ChatMessageRow) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO chat_messages (id, conversation_id, sender_id, content, sent_at, is_read)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                rusqlite::params![
                    message.id,
                    message.conversation_id,
                    message.sender_id,
                    message.content,
                    message.sent_at,
                    message.is_read,
                ],
            )?;
            Ok(())
        })
    }

    /// One page of a conversation, newest first.
    pub fn get_recent_messages(&self, conversation_id: &str, limit: u32, offset: u64) -> Result<Vec<ChatMessageRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM chat_messages
                 WHERE conversation_id = ?1
                 ORDER BY sent_at DESC, rowid DESC
                 LIMIT ?2 OFFSET ?3",
                MESSAGE_COLUMNS
            ))?;
            let rows = stmt
                .query_map(rusqlite::params![conversation_id, limit, offset as i64], map_message)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Flags the given messages read in one transaction. Returns how many changed.
    pub fn mark_messages_read(&self, ids: &[String]) -> Result<usize> {
        if ids.is_empty() {
            return Ok(0);
        }

        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let mut updated = 0;
            {
                let mut stmt = tx.prepare("UPDATE chat_messages SET is_read = 1 WHERE id = ?1 AND is_read = 0")?;
                for id in ids {
                    updated += stmt.execute([id])?;
                }
            }
            tx.commit()?;
            Ok(updated)
        })
    }
}

fn map_conversation(row: &Row<'_>) -> rusqlite::Result<ConversationRow> {
    Ok(ConversationRow {
        id: row.get(0)?,
        user_a_id: row.get(1)?,
        user_b_id: row.get(2)?,
        created_at: row.get(3)?,
    })
}

fn map_message(row: &Row<'_>) -> rusqlite::Result<ChatMessageRow> {
    Ok(ChatMessageRow {
        id: row.get(0)?,
        conversation_id: row.get(1)?,
        sender_id: row.get(2)?,
        content: row.get(3)?,
        sent_at: row.get(4)?,
        is_read: row.get(5)?,
    })
}
