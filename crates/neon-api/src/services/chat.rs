use chrono::{DateTime, Utc};
use tracing::debug;
use uuid::Uuid;

use neon_db::Database;
use neon_db::models::{ChatMessageRow, ConversationRow};
use neon_types::models::{ChatMessage, Conversation};

use crate::convert;
use crate::error::{ServiceError, ServiceResult};
use crate::services::{require_user, required_text};

/// Messages examined by one `mark_read` call, newest first.
pub const MARK_READ_WINDOW: u32 = 200;

pub const MAX_PAGE_SIZE: u32 = 200;

pub struct ChatService<'a> {
    db: &'a Database,
}

impl<'a> ChatService<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Returns the single conversation for the unordered pair, creating it on
    /// first use. The smaller id is always stored as `user_a`.
    pub fn get_or_create_conversation(&self, a: Uuid, b: Uuid) -> ServiceResult<Conversation> {
        if a == b {
            return Err(ServiceError::invalid("cannot start a conversation with yourself"));
        }
        let (low, high) = if a < b { (a, b) } else { (b, a) };
        require_user(self.db, low)?;
        require_user(self.db, high)?;

        if let Some(existing) = self.db.find_conversation(&low.to_string(), &high.to_string())? {
            return Ok(convert::conversation(existing)?);
        }

        let row = ConversationRow {
            id: Uuid::new_v4().to_string(),
            user_a_id: low.to_string(),
            user_b_id: high.to_string(),
            created_at: neon_db::format_timestamp(Utc::now()),
        };
        self.db.insert_conversation(&row)?;
        debug!("Conversation {} opened between {} and {}", row.id, low, high);

        Ok(convert::conversation(row)?)
    }

    pub fn list_conversations(&self, user_id: Uuid) -> ServiceResult<Vec<Conversation>> {
        let rows = self.db.list_conversations_for_user(&user_id.to_string())?;
        Ok(convert::all(rows, convert::conversation)?)
    }

    /// Stores an unread message. Publishing it is left to the caller.
    pub fn save_message(
        &self,
        conversation_id: Uuid,
        sender_id: Uuid,
        content: &str,
        sent_at: Option<DateTime<Utc>>,
    ) -> ServiceResult<ChatMessage> {
        self.require_conversation(conversation_id)?;
        require_user(self.db, sender_id)?;
        let content = required_text(content, "content")?;

        let row = ChatMessageRow {
            id: Uuid::new_v4().to_string(),
            conversation_id: conversation_id.to_string(),
            sender_id: sender_id.to_string(),
            content,
            sent_at: neon_db::format_timestamp(sent_at.unwrap_or_else(Utc::now)),
            is_read: false,
        };
        self.db.insert_chat_message(&row)?;

        Ok(convert::chat_message(row)?)
    }

    /// One page of messages, newest first. `size` is clamped to `1..=MAX_PAGE_SIZE`.
    pub fn list_recent(&self, conversation_id: Uuid, page: u32, size: u32) -> ServiceResult<Vec<ChatMessage>> {
        let size = size.clamp(1, MAX_PAGE_SIZE);
        let offset = u64::from(page) * u64::from(size);
        let rows = self
            .db
            .get_recent_messages(&conversation_id.to_string(), size, offset)?;
        Ok(convert::all(rows, convert::chat_message)?)
    }

    /// Marks the reader's incoming messages read, looking only at the latest
    /// `MARK_READ_WINDOW` messages. Returns how many flipped.
    pub fn mark_read(&self, conversation_id: Uuid, reader_id: Uuid) -> ServiceResult<usize> {
        self.require_conversation(conversation_id)?;

        let reader = reader_id.to_string();
        let unread: Vec<String> = self
            .db
            .get_recent_messages(&conversation_id.to_string(), MARK_READ_WINDOW, 0)?
            .into_iter()
            .filter(|m| !m.is_read && m.sender_id != reader)
            .map(|m| m.id)
            .collect();

        let updated = self.db.mark_messages_read(&unread)?;
        debug!("{} messages in {} marked read by {}", updated, conversation_id, reader_id);
        Ok(updated)
    }

    fn require_conversation(&self, id: Uuid) -> ServiceResult<ConversationRow> {
        self.db
            .get_conversation(&id.to_string())?
            .ok_or(ServiceError::NotFound("conversation"))
    }
}
