use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

use neon_types::api::{ConversationQuery, MarkReadResponse, PageQuery, ReaderQuery, SendChatRequest};

use crate::error::ServiceResult;
use crate::realtime::deliver_chat;
use crate::state::{AppState, blocking};

pub async fn open_conversation(
    State(state): State<AppState>,
    Query(query): Query<ConversationQuery>,
) -> ServiceResult<impl IntoResponse> {
    let conversation = blocking(&state, move |s| {
        s.chat().get_or_create_conversation(query.user1, query.user2)
    })
    .await?;
    Ok(Json(conversation))
}

pub async fn list_conversations(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> ServiceResult<impl IntoResponse> {
    let conversations = blocking(&state, move |s| s.chat().list_conversations(user_id)).await?;
    Ok(Json(conversations))
}

pub async fn list_messages(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(page): Query<PageQuery>,
) -> ServiceResult<impl IntoResponse> {
    let messages = blocking(&state, move |s| s.chat().list_recent(id, page.page, page.size)).await?;
    Ok(Json(messages))
}

/// Stores the message and fans it out on `chat.{id}`; failures come back
/// as the HTTP error rather than a `ChatError` event.
pub async fn send_message(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<SendChatRequest>,
) -> ServiceResult<impl IntoResponse> {
    let message = deliver_chat(&state, id, req).await?;
    Ok((StatusCode::CREATED, Json(message)))
}

pub async fn mark_read(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<ReaderQuery>,
) -> ServiceResult<impl IntoResponse> {
    let updated = blocking(&state, move |s| s.chat().mark_read(id, query.reader_id)).await?;
    Ok(Json(MarkReadResponse { updated }))
}
