use axum::{
    Json,
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

use neon_types::api::{AuthResponse, LoginRequest, RegisterRequest, SearchQuery, UpdateUserRequest};

use crate::error::ServiceResult;
use crate::routes::read_upload;
use crate::state::{AppState, blocking};

pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> ServiceResult<impl IntoResponse> {
    let user = blocking(&state, move |s| s.users().register(&req)).await?;
    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            user,
            message: "Registration successful".to_string(),
        }),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> ServiceResult<impl IntoResponse> {
    let user = blocking(&state, move |s| s.users().login(&req)).await?;
    Ok(Json(AuthResponse {
        user,
        message: "Login successful".to_string(),
    }))
}

pub async fn create_user(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> ServiceResult<impl IntoResponse> {
    let user = blocking(&state, move |s| s.users().register(&req)).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn list_users(State(state): State<AppState>) -> ServiceResult<impl IntoResponse> {
    let users = blocking(&state, |s| s.users().list()).await?;
    Ok(Json(users))
}

pub async fn search_users(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> ServiceResult<impl IntoResponse> {
    let term = query.term().map(str::to_string);
    let users = blocking(&state, move |s| s.users().search(term.as_deref())).await?;
    Ok(Json(users))
}

pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ServiceResult<impl IntoResponse> {
    let user = blocking(&state, move |s| s.users().get(id)).await?;
    Ok(Json(user))
}

pub async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateUserRequest>,
) -> ServiceResult<impl IntoResponse> {
    let user = blocking(&state, move |s| s.users().update(id, &req)).await?;
    Ok(Json(user))
}

pub async fn upload_profile_pic(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    multipart: Multipart,
) -> ServiceResult<impl IntoResponse> {
    let upload = read_upload(multipart).await?;
    let user = blocking(&state, move |s| s.users().set_profile_pic(id, &upload)).await?;
    Ok(Json(user))
}
