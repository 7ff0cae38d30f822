//! Chat delivery shared by the REST endpoint and the gateway `SendChat` command.

use tracing::{debug, warn};
use uuid::Uuid;

use neon_gateway::Publish;
use neon_gateway::connection::ChatInbound;
use neon_types::api::SendChatRequest;
use neon_types::events::{GatewayEvent, Topic};
use neon_types::models::ChatMessage;

use crate::error::ServiceResult;
use crate::state::{AppState, blocking};

/// Saves the message, then publishes it to `chat.{conversation_id}` with the
/// client's `temp_id` echoed back.
pub async fn deliver_chat(state: &AppState, conversation_id: Uuid, req: SendChatRequest) -> ServiceResult<ChatMessage> {
    let temp_id = req.temp_id.clone();
    let mut message = blocking(state, move |s| {
        s.chat()
            .save_message(conversation_id, req.from_user_id, &req.content, req.sent_at)
    })
    .await?;

    message.temp_id = temp_id;
    state
        .dispatcher
        .publish(Topic::Chat(conversation_id), GatewayEvent::MessageCreate(message.clone()));
    debug!("Message {} delivered to chat.{}", message.id, conversation_id);

    Ok(message)
}

/// Gateway side of chat: every outcome, failures included, goes to the
/// conversation topic since the socket gets no direct reply.
pub struct GatewayChat {
    state: AppState,
}

impl GatewayChat {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }
}

impl ChatInbound for GatewayChat {
    fn send_chat(&self, conversation_id: Uuid, message: SendChatRequest) {
        let state = self.state.clone();
        tokio::spawn(async move {
            let temp_id = message.temp_id.clone();
            if let Err(err) = deliver_chat(&state, conversation_id, message).await {
                warn!("Chat send to {} failed: {}", conversation_id, err);
                state.dispatcher.publish(
                    Topic::Chat(conversation_id),
                    GatewayEvent::ChatError {
                        message: err.to_string(),
                        temp_id,
                    },
                );
            }
        });
    }
}
