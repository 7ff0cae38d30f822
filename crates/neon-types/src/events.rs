use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::SendChatRequest;
use crate::models::{ChatMessage, Notification};

/// A named pub/sub channel.
///
/// The textual names `user.{id}` and `chat.{id}` are what clients subscribe
/// to, so they must not change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    /// Notifications addressed to one user.
    User(Uuid),
    /// Live messages of one conversation.
    Chat(Uuid),
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Topic::User(id) => write!(f, "user.{}", id),
            Topic::Chat(id) => write!(f, "chat.{}", id),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid topic: {0:?}")]
pub struct InvalidTopic(pub String);

impl FromStr for Topic {
    type Err = InvalidTopic;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || InvalidTopic(s.to_string());
        let (prefix, id) = s.split_once('.').ok_or_else(invalid)?;
        let id: Uuid = id.parse().map_err(|_| invalid())?;
        match prefix {
            "user" => Ok(Topic::User(id)),
            "chat" => Ok(Topic::Chat(id)),
            _ => Err(invalid()),
        }
    }
}

impl Serialize for Topic {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Topic {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Events sent over the WebSocket gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum GatewayEvent {
    /// Server accepted the connection
    Ready { session_id: Uuid },

    /// Acknowledges the client's current subscription set
    Subscribed { topics: Vec<Topic> },

    /// A notification was stored for the topic's user
    NotificationCreate(Notification),

    /// A chat message was stored in the topic's conversation
    MessageCreate(ChatMessage),

    /// Sending a chat message over the gateway failed
    ChatError {
        message: String,
        temp_id: Option<String>,
    },
}

/// One published event together with the topic it was published on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Delivery {
    pub topic: Topic,
    pub event: GatewayEvent,
}

/// Commands sent FROM client TO server over WebSocket.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum GatewayCommand {
    /// Add topics to this connection's subscriptions
    Subscribe { topics: Vec<Topic> },

    /// Drop topics from this connection's subscriptions
    Unsubscribe { topics: Vec<Topic> },

    /// Persist a chat message and fan it out on `chat.{conversation_id}`
    SendChat {
        conversation_id: Uuid,
        #[serde(flatten)]
        message: SendChatRequest,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn topic_names_round_trip() {
        let id = Uuid::new_v4();
        let topic = Topic::User(id);
        assert_eq!(topic.to_string(), format!("user.{}", id));
        assert_eq!(format!("chat.{}", id).parse::<Topic>().unwrap(), Topic::Chat(id));
    }

    #[test]
    fn topic_rejects_unknown_prefix_and_bad_id() {
        assert!("group.8a6e0804-2bd0-4672-b79d-d97027f9071a".parse::<Topic>().is_err());
        assert!("user.not-a-uuid".parse::<Topic>().is_err());
        assert!("user".parse::<Topic>().is_err());
    }

    #[test]
    fn send_chat_command_parses() {
        let conv = Uuid::new_v4();
        let from = Uuid::new_v4();
        let raw = format!(
            r#"{{"type":"SendChat","data":{{"conversation_id":"{}","from_user_id":"{}","content":"hey","temp_id":"t-1"}}}}"#,
            conv, from
        );
        match serde_json::from_str::<GatewayCommand>(&raw).unwrap() {
            GatewayCommand::SendChat { conversation_id, message } => {
                assert_eq!(conversation_id, conv);
                assert_eq!(message.from_user_id, from);
                assert_eq!(message.temp_id.as_deref(), Some("t-1"));
                assert!(message.sent_at.is_none());
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
