//! Row → API model conversion.
//!
//! Stored ids, kinds and timestamps were all written by this crate, so a
//! value that fails to parse means the store is corrupt and is reported as a
//! store error rather than patched over.

use std::str::FromStr;

use anyhow::{Context, Result, anyhow};
use chrono::{DateTime, Utc};
use uuid::Uuid;

use neon_db::models::{
    ChatMessageRow, CommentRow, ConversationRow, FriendshipRow, GroupRow, ImageRow, NotificationRow, PostRow,
    ReactionRow, UserRow,
};
use neon_types::models::{
    ChatMessage, Comment, Conversation, Friendship, Group, Image, Notification, Post, Reaction, User,
};

pub fn parse_id(raw: &str) -> Result<Uuid> {
    raw.parse().with_context(|| format!("corrupt id {:?}", raw))
}

pub fn parse_time(raw: &str) -> Result<DateTime<Utc>> {
    raw.parse::<DateTime<Utc>>()
        .with_context(|| format!("corrupt timestamp {:?}", raw))
}

fn parse_kind<T>(raw: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.parse().map_err(|e| anyhow!("corrupt stored kind: {}", e))
}

pub fn image_url(id: Uuid) -> String {
    format!("/api/images/{}", id)
}

pub fn user(row: UserRow) -> Result<User> {
    let profile_pic_url = match row.profile_pic_id.as_deref() {
        Some(pic) => Some(image_url(parse_id(pic)?)),
        None => None,
    };
    Ok(User {
        id: parse_id(&row.id)?,
        first_name: row.first_name,
        last_name: row.last_name,
        email: row.email,
        profile_pic_url,
        created_at: parse_time(&row.created_at)?,
    })
}

pub fn image(row: ImageRow) -> Result<Image> {
    let id = parse_id(&row.id)?;
    Ok(Image {
        id,
        name: row.name,
        content_type: row.content_type,
        size: row.size.max(0) as u64,
        url: image_url(id),
        created_at: parse_time(&row.created_at)?,
    })
}

pub fn post(row: PostRow, image_ids: &[String]) -> Result<Post> {
    Ok(Post {
        id: parse_id(&row.id)?,
        author_id: parse_id(&row.author_id)?,
        title: row.title,
        content: row.content,
        visibility: parse_kind(&row.visibility)?,
        image_ids: image_ids.iter().map(|id| parse_id(id)).collect::<Result<_>>()?,
        reaction_count: row.reaction_count.max(0) as u64,
        comment_count: row.comment_count.max(0) as u64,
        created_at: parse_time(&row.created_at)?,
        updated_at: parse_time(&row.updated_at)?,
    })
}

pub fn comment(row: CommentRow) -> Result<Comment> {
    Ok(Comment {
        id: parse_id(&row.id)?,
        post_id: parse_id(&row.post_id)?,
        author_id: parse_id(&row.author_id)?,
        parent_id: row.parent_id.as_deref().map(parse_id).transpose()?,
        content: row.content,
        created_at: parse_time(&row.created_at)?,
    })
}

pub fn reaction(row: ReactionRow) -> Result<Reaction> {
    Ok(Reaction {
        id: parse_id(&row.id)?,
        post_id: parse_id(&row.post_id)?,
        user_id: parse_id(&row.user_id)?,
        kind: parse_kind(&row.kind)?,
        created_at: parse_time(&row.created_at)?,
    })
}

pub fn friendship(row: FriendshipRow) -> Result<Friendship> {
    Ok(Friendship {
        id: parse_id(&row.id)?,
        sender_id: parse_id(&row.sender_id)?,
        receiver_id: parse_id(&row.receiver_id)?,
        status: parse_kind(&row.status)?,
        created_at: parse_time(&row.created_at)?,
    })
}

pub fn group(row: GroupRow) -> Result<Group> {
    Ok(Group {
        id: parse_id(&row.id)?,
        name: row.name,
        description: row.description,
        visibility: parse_kind(&row.visibility)?,
        created_by: parse_id(&row.created_by)?,
        member_count: row.member_count.max(0) as u64,
        created_at: parse_time(&row.created_at)?,
    })
}

pub fn conversation(row: ConversationRow) -> Result<Conversation> {
    Ok(Conversation {
        id: parse_id(&row.id)?,
        user_a_id: parse_id(&row.user_a_id)?,
        user_b_id: parse_id(&row.user_b_id)?,
        created_at: parse_time(&row.created_at)?,
    })
}

pub fn chat_message(row: ChatMessageRow) -> Result<ChatMessage> {
    Ok(ChatMessage {
        id: parse_id(&row.id)?,
        conversation_id: parse_id(&row.conversation_id)?,
        sender_id: parse_id(&row.sender_id)?,
        content: row.content,
        sent_at: parse_time(&row.sent_at)?,
        read: row.is_read,
        temp_id: None,
    })
}

pub fn notification(row: NotificationRow) -> Result<Notification> {
    Ok(Notification {
        id: parse_id(&row.id)?,
        user_id: parse_id(&row.user_id)?,
        kind: parse_kind(&row.kind)?,
        status: parse_kind(&row.status)?,
        content: row.content,
        created_at: parse_time(&row.created_at)?,
    })
}

/// Converts every row, failing on the first corrupt one.
pub fn all<R, T>(rows: Vec<R>, f: impl Fn(R) -> Result<T>) -> Result<Vec<T>> {
    rows.into_iter().map(f).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    #[test]
    fn parses_stored_timestamps_only() {
        let stored = parse_time("2024-05-01T10:00:03.250000Z").unwrap();
        assert_eq!(stored.second(), 3);

        assert!(parse_time("2024-05-01 10:00:03").is_err());
        assert!(parse_time("yesterday").is_err());
    }

    #[test]
    fn corrupt_kind_is_an_error() {
        let row = NotificationRow {
            id: Uuid::new_v4().to_string(),
            user_id: Uuid::new_v4().to_string(),
            kind: "SHARE".to_string(),
            status: "New".to_string(),
            content: "x".to_string(),
            created_at: "2024-05-01T10:00:00.000000Z".to_string(),
        };
        assert!(notification(row).is_err());
    }
}
