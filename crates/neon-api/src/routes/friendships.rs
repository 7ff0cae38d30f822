use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

use neon_types::api::FriendshipPair;

use crate::error::ServiceResult;
use crate::state::{AppState, blocking};

pub async fn list_friendships(State(state): State<AppState>) -> ServiceResult<impl IntoResponse> {
    let friendships = blocking(&state, |s| s.friendships().list_all()).await?;
    Ok(Json(friendships))
}

pub async fn create_friendship(
    State(state): State<AppState>,
    Json(pair): Json<FriendshipPair>,
) -> ServiceResult<impl IntoResponse> {
    let friendship = blocking(&state, move |s| {
        s.friendships().create_friendship(pair.sender_id, pair.receiver_id)
    })
    .await?;
    Ok((StatusCode::CREATED, Json(friendship)))
}

pub async fn get_friendship(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ServiceResult<impl IntoResponse> {
    let friendship = blocking(&state, move |s| s.friendships().get(id)).await?;
    Ok(Json(friendship))
}

pub async fn delete_friendship_by_id(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ServiceResult<impl IntoResponse> {
    blocking(&state, move |s| s.friendships().delete_by_id(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn accepted_for_user(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> ServiceResult<impl IntoResponse> {
    let friendships = blocking(&state, move |s| s.friendships().accepted_for_user(user_id)).await?;
    Ok(Json(friendships))
}

pub async fn pending_for_user(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> ServiceResult<impl IntoResponse> {
    let friendships = blocking(&state, move |s| s.friendships().pending_for_receiver(user_id)).await?;
    Ok(Json(friendships))
}

pub async fn accept_friendship(
    State(state): State<AppState>,
    Query(pair): Query<FriendshipPair>,
) -> ServiceResult<impl IntoResponse> {
    let friendship = blocking(&state, move |s| {
        s.friendships().accept_friendship(pair.sender_id, pair.receiver_id)
    })
    .await?;
    Ok(Json(friendship))
}

pub async fn delete_friendship(
    State(state): State<AppState>,
    Query(pair): Query<FriendshipPair>,
) -> ServiceResult<impl IntoResponse> {
    blocking(&state, move |s| {
        s.friendships().delete_friendship(pair.sender_id, pair.receiver_id)
    })
    .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn accept_request(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ServiceResult<impl IntoResponse> {
    let friendship = blocking(&state, move |s| s.friendships().accept_by_id(id)).await?;
    Ok(Json(friendship))
}

pub async fn reject_request(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ServiceResult<impl IntoResponse> {
    blocking(&state, move |s| s.friendships().reject_by_id(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}
