use chrono::Utc;
use tracing::debug;
use uuid::Uuid;

use neon_db::Database;
use neon_db::models::NotificationRow;
use neon_gateway::Publish;
use neon_types::events::{GatewayEvent, Topic};
use neon_types::kinds::{NotificationStatus, NotificationType};
use neon_types::models::Notification;

use crate::convert;
use crate::error::{ServiceError, ServiceResult};
use crate::services::require_user;

/// `"{actor} {phrase}"`, or `"Someone {phrase}"` when the actor has no name.
pub fn actor_message(actor_name: &str, phrase: &str) -> String {
    let actor = actor_name.trim();
    let actor = if actor.is_empty() { "Someone" } else { actor };
    format!("{} {}", actor, phrase)
}

/// Stores notifications and pushes them to the recipient's `user.{id}` topic.
pub struct NotificationService<'a> {
    db: &'a Database,
    publisher: &'a dyn Publish,
}

impl<'a> NotificationService<'a> {
    pub fn new(db: &'a Database, publisher: &'a dyn Publish) -> Self {
        Self { db, publisher }
    }

    /// Persists a `New` notification for `user_id`, then publishes it.
    ///
    /// Blank `content` falls back to the kind's wire name. Nothing is
    /// published when the user is missing or the insert fails. The publish
    /// itself cannot fail: with no live subscriber the push is simply lost
    /// and the stored row is what the client sees on its next poll.
    pub fn create_and_push(&self, user_id: Uuid, kind: NotificationType, content: &str) -> ServiceResult<Notification> {
        let content = if content.trim().is_empty() {
            kind.as_str().to_string()
        } else {
            content.to_string()
        };

        require_user(self.db, user_id)?;

        let row = NotificationRow {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            kind: kind.as_str().to_string(),
            status: NotificationStatus::New.as_str().to_string(),
            content,
            created_at: neon_db::format_timestamp(Utc::now()),
        };
        self.db.insert_notification(&row)?;

        let notification = convert::notification(row)?;
        debug!("Notification {} ({}) stored for {}", notification.id, kind, user_id);

        self.publisher.publish(
            Topic::User(user_id),
            GatewayEvent::NotificationCreate(notification.clone()),
        );

        Ok(notification)
    }

    /// Parses `kind` from text first; unknown names are `InvalidArgument`.
    pub fn create_and_push_named(&self, user_id: Uuid, kind: &str, content: &str) -> ServiceResult<Notification> {
        let kind: NotificationType = kind.parse()?;
        self.create_and_push(user_id, kind, content)
    }

    /// Newest first.
    pub fn list(&self, user_id: Uuid) -> ServiceResult<Vec<Notification>> {
        let rows = self.db.list_notifications(&user_id.to_string())?;
        Ok(convert::all(rows, convert::notification)?)
    }

    pub fn count_unread(&self, user_id: Uuid) -> ServiceResult<u64> {
        let count = self
            .db
            .count_notifications(&user_id.to_string(), NotificationStatus::New.as_str())?;
        Ok(count)
    }

    /// Marks one notification `Seen`. Only its recipient may do so; repeating
    /// the call on a seen notification succeeds without changing anything.
    pub fn mark_read(&self, user_id: Uuid, notification_id: Uuid) -> ServiceResult<()> {
        let row = self
            .db
            .get_notification(&notification_id.to_string())?
            .ok_or(ServiceError::NotFound("notification"))?;

        if row.user_id != user_id.to_string() {
            return Err(ServiceError::Forbidden);
        }

        if row.status != NotificationStatus::Seen.as_str() {
            self.db
                .set_notification_status(&row.id, NotificationStatus::Seen.as_str())?;
        }
        Ok(())
    }

    /// Marks all of the user's `New` notifications `Seen`; returns how many changed.
    pub fn mark_all_read(&self, user_id: Uuid) -> ServiceResult<usize> {
        let changed = self.db.update_notification_statuses(
            &user_id.to_string(),
            NotificationStatus::New.as_str(),
            NotificationStatus::Seen.as_str(),
        )?;
        Ok(changed)
    }
}
