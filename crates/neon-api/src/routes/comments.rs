use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

use neon_types::api::CreateCommentRequest;

use crate::error::ServiceResult;
use crate::state::{AppState, blocking};

pub async fn comment_on_post(
    State(state): State<AppState>,
    Path(post_id): Path<Uuid>,
    Json(req): Json<CreateCommentRequest>,
) -> ServiceResult<impl IntoResponse> {
    let comment = blocking(&state, move |s| s.comments().comment_on_post(post_id, &req)).await?;
    Ok((StatusCode::CREATED, Json(comment)))
}

pub async fn reply(
    State(state): State<AppState>,
    Path(comment_id): Path<Uuid>,
    Json(req): Json<CreateCommentRequest>,
) -> ServiceResult<impl IntoResponse> {
    let comment = blocking(&state, move |s| s.comments().reply(comment_id, &req)).await?;
    Ok((StatusCode::CREATED, Json(comment)))
}

pub async fn root_comments(
    State(state): State<AppState>,
    Path(post_id): Path<Uuid>,
) -> ServiceResult<impl IntoResponse> {
    let comments = blocking(&state, move |s| s.comments().root_comments(post_id)).await?;
    Ok(Json(comments))
}

pub async fn replies(
    State(state): State<AppState>,
    Path(comment_id): Path<Uuid>,
) -> ServiceResult<impl IntoResponse> {
    let comments = blocking(&state, move |s| s.comments().replies(comment_id)).await?;
    Ok(Json(comments))
}
