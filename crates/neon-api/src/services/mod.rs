//! One service per entity family. Services are cheap borrowed views over
//! the store (and the publisher, where they push notifications); build them
//! per call through [`AppStateInner`](crate::state::AppStateInner).

mod chat;
mod comments;
mod friendships;
mod groups;
mod images;
mod notifications;
mod posts;
mod reactions;
mod users;

pub use chat::{ChatService, MARK_READ_WINDOW, MAX_PAGE_SIZE};
pub use comments::CommentService;
pub use friendships::FriendshipService;
pub use groups::GroupService;
pub use images::{ImageService, ImageUpload, MAX_IMAGE_BYTES};
pub use notifications::{NotificationService, actor_message};
pub use posts::PostService;
pub use reactions::ReactionService;
pub use users::UserService;

use uuid::Uuid;

use neon_db::Database;
use neon_db::models::UserRow;

use crate::error::{ServiceError, ServiceResult};

pub(crate) fn require_user(db: &Database, id: Uuid) -> ServiceResult<UserRow> {
    db.get_user_by_id(&id.to_string())?.ok_or(ServiceError::NotFound("user"))
}

/// "First Last", trimmed; empty when the user has no name.
pub(crate) fn display_name(user: &UserRow) -> String {
    format!("{} {}", user.first_name, user.last_name).trim().to_string()
}

/// Trims and rejects blank text.
pub(crate) fn required_text(value: &str, field: &str) -> ServiceResult<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ServiceError::invalid(format!("{} is required", field)));
    }
    Ok(value.to_string())
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Mutex;

    use uuid::Uuid;

    use neon_db::Database;
    use neon_db::models::UserRow;
    use neon_gateway::Publish;
    use neon_types::events::{GatewayEvent, Topic};

    /// Keeps every published event for inspection.
    #[derive(Default)]
    pub struct RecordingPublisher {
        pub events: Mutex<Vec<(Topic, GatewayEvent)>>,
    }

    impl RecordingPublisher {
        pub fn topics(&self) -> Vec<Topic> {
            self.events.lock().unwrap().iter().map(|(t, _)| *t).collect()
        }
    }

    impl Publish for RecordingPublisher {
        fn publish(&self, topic: Topic, event: GatewayEvent) {
            self.events.lock().unwrap().push((topic, event));
        }
    }

    pub fn user(db: &Database, first: &str, last: &str) -> Uuid {
        let id = Uuid::new_v4();
        db.insert_user(&UserRow {
            id: id.to_string(),
            first_name: first.to_string(),
            last_name: last.to_string(),
            email: format!("{}@example.com", id),
            password: "not-a-hash".to_string(),
            profile_pic_id: None,
            created_at: neon_db::format_timestamp(chrono::Utc::now()),
        })
        .unwrap();
        id
    }
}
