use std::sync::Arc;

use anyhow::anyhow;
use tracing::error;

use neon_db::Database;
use neon_gateway::Dispatcher;

use crate::error::{ServiceError, ServiceResult};
use crate::services::{
    ChatService, CommentService, FriendshipService, GroupService, ImageService, MAX_IMAGE_BYTES,
    NotificationService, PostService, ReactionService, UserService,
};

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub dispatcher: Dispatcher,
    /// Per-file cap for uploaded images and profile pictures.
    pub max_image_bytes: usize,
}

impl AppStateInner {
    pub fn new(db: Database, dispatcher: Dispatcher) -> AppState {
        Self::with_image_limit(db, dispatcher, MAX_IMAGE_BYTES)
    }

    pub fn with_image_limit(db: Database, dispatcher: Dispatcher, max_image_bytes: usize) -> AppState {
        Arc::new(Self {
            db,
            dispatcher,
            max_image_bytes,
        })
    }

    pub fn users(&self) -> UserService<'_> {
        UserService::new(&self.db).with_max_image_bytes(self.max_image_bytes)
    }

    pub fn images(&self) -> ImageService<'_> {
        ImageService::new(&self.db).with_max_bytes(self.max_image_bytes)
    }

    pub fn posts(&self) -> PostService<'_> {
        PostService::new(&self.db)
    }

    pub fn comments(&self) -> CommentService<'_> {
        CommentService::new(&self.db, &self.dispatcher)
    }

    pub fn reactions(&self) -> ReactionService<'_> {
        ReactionService::new(&self.db, &self.dispatcher)
    }

    pub fn friendships(&self) -> FriendshipService<'_> {
        FriendshipService::new(&self.db, &self.dispatcher)
    }

    pub fn groups(&self) -> GroupService<'_> {
        GroupService::new(&self.db, &self.dispatcher)
    }

    pub fn chat(&self) -> ChatService<'_> {
        ChatService::new(&self.db)
    }

    pub fn notifications(&self) -> NotificationService<'_> {
        NotificationService::new(&self.db, &self.dispatcher)
    }
}

/// Runs a service call on the blocking pool; SQLite access must stay off the async workers.
pub async fn blocking<F, T>(state: &AppState, f: F) -> ServiceResult<T>
where
    F: FnOnce(&AppStateInner) -> ServiceResult<T> + Send + 'static,
    T: Send + 'static,
{
    let state = state.clone();
    tokio::task::spawn_blocking(move || f(&state))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ServiceError::Store(anyhow!("worker task failed: {}", e))
        })?
}
