//! HTTP surface under `/api`. Handlers parse input, run one service call on
//! the blocking pool and shape the JSON reply.

mod chat;
mod comments;
mod friendships;
mod groups;
mod images;
mod notifications;
mod posts;
mod users;

use axum::{
    Json, Router,
    extract::Multipart,
    routing::{delete, get, post, put},
};
use serde_json::{Value, json};

use crate::error::{ServiceError, ServiceResult};
use crate::services::ImageUpload;
use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .route("/health", get(health))
        // Auth
        .route("/auth/register", post(users::register))
        .route("/auth/login", post(users::login))
        // Users
        .route("/users", get(users::list_users).post(users::create_user))
        .route("/users/search", get(users::search_users))
        .route("/users/{id}", get(users::get_user).put(users::update_user))
        .route("/users/{id}/profile-pic", post(users::upload_profile_pic))
        // Images
        .route("/images/upload", post(images::upload_image))
        .route("/images/{id}", get(images::get_image))
        // Posts
        .route("/posts", get(posts::list_posts).post(posts::create_post))
        .route(
            "/posts/{id}",
            get(posts::get_post).put(posts::update_post).delete(posts::delete_post),
        )
        .route("/posts/{id}/reactions", get(posts::list_reactions))
        .route("/posts/{id}/reaction", post(posts::react))
        .route("/posts/{id}/like", put(posts::like).delete(posts::unlike))
        // Comments
        .route("/comment/{id}/post", post(comments::comment_on_post))
        .route("/comment/{id}/comment", post(comments::reply))
        .route("/comment/{id}/replies", get(comments::replies))
        .route("/comment/post/{id}/comments", get(comments::root_comments))
        // Friendships
        .route(
            "/friendships",
            get(friendships::list_friendships).post(friendships::create_friendship),
        )
        .route("/friendships/accept", post(friendships::accept_friendship))
        .route("/friendships/delete", delete(friendships::delete_friendship))
        .route("/friendships/requests/{id}/accept", post(friendships::accept_request))
        .route("/friendships/requests/{id}", delete(friendships::reject_request))
        .route(
            "/friendships/{id}",
            get(friendships::get_friendship).delete(friendships::delete_friendship_by_id),
        )
        .route("/friendships/{id}/accepted", get(friendships::accepted_for_user))
        .route("/friendships/{id}/requests", get(friendships::pending_for_user))
        // Groups
        .route("/groups", get(groups::list_groups).post(groups::create_group))
        .route("/groups/{id}", get(groups::get_group))
        .route("/groups/{id}/members", get(groups::list_members))
        .route("/groups/{id}/members/{user_id}", post(groups::add_member))
        .route("/groups/{id}/posts", get(groups::list_posts))
        .route("/groups/{id}/posts/{post_id}", post(groups::attach_post))
        // Notifications
        .route("/notifications/test", post(notifications::push_test))
        .route("/notifications/{id}", get(notifications::list))
        .route("/notifications/{id}/count", get(notifications::count_unread))
        .route("/notifications/{id}/read-all", post(notifications::mark_all_read))
        .route("/notifications/{id}/{notification_id}/read", post(notifications::mark_read))
        // Chat
        .route("/chat/conversations", post(chat::open_conversation))
        .route("/chat/conversations/{id}", get(chat::list_conversations))
        .route("/chat/{id}/messages", get(chat::list_messages).post(chat::send_message))
        .route("/chat/{id}/read", post(chat::mark_read))
        .with_state(state);

    Router::new().nest("/api", api)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Pulls the `file` part out of a multipart form.
pub(crate) async fn read_upload(mut multipart: Multipart) -> ServiceResult<ImageUpload> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ServiceError::invalid(format!("malformed multipart body: {}", e)))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let name = field.file_name().unwrap_or_default().to_string();
        let content_type = field.content_type().unwrap_or_default().to_string();
        let data = field
            .bytes()
            .await
            .map_err(|e| ServiceError::invalid(format!("unreadable file part: {}", e)))?;

        return Ok(ImageUpload {
            name,
            content_type,
            data: data.to_vec(),
        });
    }

    Err(ServiceError::invalid("missing multipart field \"file\""))
}
