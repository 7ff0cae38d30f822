use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

use neon_types::api::{CountResponse, MarkReadResponse, NotificationPushed, TestNotificationQuery};

use crate::error::ServiceResult;
use crate::state::{AppState, blocking};

pub async fn list(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> ServiceResult<impl IntoResponse> {
    let notifications = blocking(&state, move |s| s.notifications().list(user_id)).await?;
    Ok(Json(notifications))
}

pub async fn count_unread(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> ServiceResult<impl IntoResponse> {
    let count = blocking(&state, move |s| s.notifications().count_unread(user_id)).await?;
    Ok(Json(CountResponse { count }))
}

pub async fn mark_read(
    State(state): State<AppState>,
    Path((user_id, notification_id)): Path<(Uuid, Uuid)>,
) -> ServiceResult<impl IntoResponse> {
    blocking(&state, move |s| s.notifications().mark_read(user_id, notification_id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn mark_all_read(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> ServiceResult<impl IntoResponse> {
    let updated = blocking(&state, move |s| s.notifications().mark_all_read(user_id)).await?;
    Ok(Json(MarkReadResponse { updated }))
}

/// Manual push for exercising a client's live connection.
pub async fn push_test(
    State(state): State<AppState>,
    Query(query): Query<TestNotificationQuery>,
) -> ServiceResult<impl IntoResponse> {
    let notification = blocking(&state, move |s| {
        s.notifications().create_and_push_named(
            query.user_id,
            &query.kind,
            query.content.as_deref().unwrap_or_default(),
        )
    })
    .await?;
    Ok(Json(NotificationPushed {
        id: notification.id,
        kind: notification.kind,
    }))
}
