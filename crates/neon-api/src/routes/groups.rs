use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

use neon_types::api::CreateGroupRequest;

use crate::error::ServiceResult;
use crate::state::{AppState, blocking};

pub async fn list_groups(State(state): State<AppState>) -> ServiceResult<impl IntoResponse> {
    let groups = blocking(&state, |s| s.groups().list()).await?;
    Ok(Json(groups))
}

pub async fn create_group(
    State(state): State<AppState>,
    Json(req): Json<CreateGroupRequest>,
) -> ServiceResult<impl IntoResponse> {
    let group = blocking(&state, move |s| s.groups().create(&req)).await?;
    Ok((StatusCode::CREATED, Json(group)))
}

pub async fn get_group(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ServiceResult<impl IntoResponse> {
    let group = blocking(&state, move |s| s.groups().get(id)).await?;
    Ok(Json(group))
}

pub async fn list_members(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ServiceResult<impl IntoResponse> {
    let members = blocking(&state, move |s| s.groups().members(id)).await?;
    Ok(Json(members))
}

pub async fn add_member(
    State(state): State<AppState>,
    Path((id, user_id)): Path<(Uuid, Uuid)>,
) -> ServiceResult<impl IntoResponse> {
    let group = blocking(&state, move |s| s.groups().add_member(id, user_id)).await?;
    Ok(Json(group))
}

pub async fn list_posts(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ServiceResult<impl IntoResponse> {
    let posts = blocking(&state, move |s| s.groups().posts(id)).await?;
    Ok(Json(posts))
}

pub async fn attach_post(
    State(state): State<AppState>,
    Path((id, post_id)): Path<(Uuid, Uuid)>,
) -> ServiceResult<impl IntoResponse> {
    let group = blocking(&state, move |s| s.groups().attach_post(id, post_id)).await?;
    Ok(Json(group))
}
