use axum::{
    Json,
    extract::{Multipart, Path, State},
    http::{StatusCode, header},
    response::IntoResponse,
};
use uuid::Uuid;

use crate::error::ServiceResult;
use crate::routes::read_upload;
use crate::state::{AppState, blocking};

pub async fn upload_image(
    State(state): State<AppState>,
    multipart: Multipart,
) -> ServiceResult<impl IntoResponse> {
    let upload = read_upload(multipart).await?;
    let image = blocking(&state, move |s| s.images().upload(&upload)).await?;
    Ok((StatusCode::CREATED, Json(image)))
}

/// Serves the stored bytes with their recorded content type.
pub async fn get_image(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ServiceResult<impl IntoResponse> {
    let (image, data) = blocking(&state, move |s| s.images().get_data(id)).await?;
    Ok((
        [
            (header::CONTENT_TYPE, image.content_type),
            (header::CACHE_CONTROL, "public, max-age=86400".to_string()),
        ],
        data,
    ))
}
