use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

use neon_types::api::{CreatePostRequest, ReactRequest, UpdatePostRequest, UserQuery};

use crate::error::ServiceResult;
use crate::state::{AppState, blocking};

pub async fn list_posts(State(state): State<AppState>) -> ServiceResult<impl IntoResponse> {
    let posts = blocking(&state, |s| s.posts().list()).await?;
    Ok(Json(posts))
}

pub async fn create_post(
    State(state): State<AppState>,
    Json(req): Json<CreatePostRequest>,
) -> ServiceResult<impl IntoResponse> {
    let post = blocking(&state, move |s| s.posts().create(&req)).await?;
    Ok((StatusCode::CREATED, Json(post)))
}

pub async fn get_post(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ServiceResult<impl IntoResponse> {
    let post = blocking(&state, move |s| s.posts().get(id)).await?;
    Ok(Json(post))
}

pub async fn update_post(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdatePostRequest>,
) -> ServiceResult<impl IntoResponse> {
    let post = blocking(&state, move |s| s.posts().update(id, &req)).await?;
    Ok(Json(post))
}

pub async fn delete_post(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ServiceResult<impl IntoResponse> {
    blocking(&state, move |s| s.posts().delete(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_reactions(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ServiceResult<impl IntoResponse> {
    let reactions = blocking(&state, move |s| s.reactions().list(id)).await?;
    Ok(Json(reactions))
}

pub async fn react(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<ReactRequest>,
) -> ServiceResult<impl IntoResponse> {
    let reaction = blocking(&state, move |s| s.reactions().react(id, req.user_id, req.kind)).await?;
    Ok(Json(reaction))
}

pub async fn like(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<UserQuery>,
) -> ServiceResult<impl IntoResponse> {
    let reaction = blocking(&state, move |s| s.reactions().like(id, query.user_id)).await?;
    Ok(Json(reaction))
}

pub async fn unlike(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<UserQuery>,
) -> ServiceResult<impl IntoResponse> {
    blocking(&state, move |s| s.reactions().unlike(id, query.user_id)).await?;
    Ok(StatusCode::NO_CONTENT)
}
