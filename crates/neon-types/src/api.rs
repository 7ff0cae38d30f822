use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::kinds::{GroupVisibility, NotificationType, PostVisibility, ReactionType};
use crate::models::User;

// -- Auth --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterRequest {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub user: User,
    pub message: String,
}

// -- Users --

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateUserRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
    pub query: Option<String>,
    pub name: Option<String>,
}

impl SearchQuery {
    /// First non-blank of `q`, `query`, `name`.
    pub fn term(&self) -> Option<&str> {
        [&self.q, &self.query, &self.name]
            .into_iter()
            .filter_map(|v| v.as_deref())
            .map(str::trim)
            .find(|v| !v.is_empty())
    }
}

// -- Posts --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreatePostRequest {
    pub author_id: Uuid,
    pub title: Option<String>,
    pub content: String,
    #[serde(default)]
    pub visibility: PostVisibility,
    #[serde(default)]
    pub image_ids: Vec<Uuid>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdatePostRequest {
    pub title: Option<String>,
    pub content: Option<String>,
    pub visibility: Option<PostVisibility>,
}

// -- Reactions --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReactRequest {
    pub user_id: Uuid,
    #[serde(rename = "type")]
    pub kind: ReactionType,
}

#[derive(Debug, Deserialize)]
pub struct UserQuery {
    pub user_id: Uuid,
}

// -- Comments --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateCommentRequest {
    pub author_id: Uuid,
    pub content: String,
}

// -- Friendships --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FriendshipPair {
    pub sender_id: Uuid,
    pub receiver_id: Uuid,
}

// -- Groups --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateGroupRequest {
    pub user_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    #[serde(default)]
    pub visibility: GroupVisibility,
}

// -- Notifications --

/// Query string of the manual test endpoint. `type` stays text so an unknown
/// kind surfaces as a 400 from the service instead of a generic rejection.
#[derive(Debug, Deserialize)]
pub struct TestNotificationQuery {
    pub user_id: Uuid,
    #[serde(rename = "type")]
    pub kind: String,
    pub content: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CountResponse {
    pub count: u64,
}

#[derive(Debug, Serialize)]
pub struct NotificationPushed {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub kind: NotificationType,
}

// -- Chat --

#[derive(Debug, Deserialize)]
pub struct ConversationQuery {
    pub user1: Uuid,
    pub user2: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    #[serde(default)]
    pub page: u32,
    #[serde(default = "default_page_size")]
    pub size: u32,
}

fn default_page_size() -> u32 {
    50
}

#[derive(Debug, Deserialize)]
pub struct ReaderQuery {
    pub reader_id: Uuid,
}

/// Body of `POST /api/chat/{id}/messages` and payload of the gateway `SendChat` command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendChatRequest {
    pub from_user_id: Uuid,
    pub content: String,
    pub sent_at: Option<DateTime<Utc>>,
    pub temp_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct MarkReadResponse {
    pub updated: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_term_prefers_first_non_blank() {
        let q = SearchQuery {
            q: Some("  ".into()),
            query: None,
            name: Some(" ada ".into()),
        };
        assert_eq!(q.term(), Some("ada"));

        let empty = SearchQuery { q: None, query: None, name: None };
        assert_eq!(empty.term(), None);
    }

    #[test]
    fn create_post_defaults_visibility() {
        let req: CreatePostRequest = serde_json::from_str(
            r#"{"author_id":"6f1c1f59-5d42-4a8e-9d3a-0f5b7e9b0c11","content":"hi"}"#,
        )
        .unwrap();
        assert_eq!(req.visibility, PostVisibility::Public);
        assert!(req.image_ids.is_empty());
    }
}
