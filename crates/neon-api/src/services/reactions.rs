use chrono::Utc;
use tracing::{debug, warn};
use uuid::Uuid;

use neon_db::Database;
use neon_db::models::{PostRow, ReactionRow, UserRow};
use neon_gateway::Publish;
use neon_types::kinds::{NotificationType, ReactionType};
use neon_types::models::Reaction;

use crate::convert;
use crate::error::{ServiceError, ServiceResult};
use crate::services::{NotificationService, actor_message, display_name, require_user};

/// One reaction per (post, user); reacting again replaces the previous kind.
pub struct ReactionService<'a> {
    db: &'a Database,
    publisher: &'a dyn Publish,
}

impl<'a> ReactionService<'a> {
    pub fn new(db: &'a Database, publisher: &'a dyn Publish) -> Self {
        Self { db, publisher }
    }

    /// Sets the user's reaction and notifies the post author (never themselves).
    /// Repeating the same reaction changes nothing and sends nothing.
    pub fn react(&self, post_id: Uuid, user_id: Uuid, kind: ReactionType) -> ServiceResult<Reaction> {
        let post = self
            .db
            .get_post(&post_id.to_string())?
            .ok_or(ServiceError::NotFound("post"))?;
        let actor = require_user(self.db, user_id)?;

        if let Some(existing) = self
            .db
            .get_reaction_by_user_and_post(&actor.id, &post.id)?
        {
            if existing.kind == kind.as_str() {
                return Ok(convert::reaction(existing)?);
            }
        }

        let row = ReactionRow {
            id: Uuid::new_v4().to_string(),
            post_id: post.id.clone(),
            user_id: actor.id.clone(),
            kind: kind.as_str().to_string(),
            created_at: neon_db::format_timestamp(Utc::now()),
        };
        self.db.replace_reaction(&row)?;
        debug!("{} reacted {} to post {}", user_id, kind, post_id);

        let reaction = convert::reaction(row)?;
        self.notify_author(&post, &actor, kind);
        Ok(reaction)
    }

    pub fn like(&self, post_id: Uuid, user_id: Uuid) -> ServiceResult<Reaction> {
        self.react(post_id, user_id, ReactionType::Like)
    }

    /// Removes the user's reaction, whatever its kind.
    pub fn unlike(&self, post_id: Uuid, user_id: Uuid) -> ServiceResult<()> {
        if !self
            .db
            .delete_reaction(&user_id.to_string(), &post_id.to_string())?
        {
            return Err(ServiceError::NotFound("reaction"));
        }
        Ok(())
    }

    pub fn list(&self, post_id: Uuid) -> ServiceResult<Vec<Reaction>> {
        if self.db.get_post(&post_id.to_string())?.is_none() {
            return Err(ServiceError::NotFound("post"));
        }
        let rows = self.db.get_reactions_for_post(&post_id.to_string())?;
        Ok(convert::all(rows, convert::reaction)?)
    }

    fn notify_author(&self, post: &PostRow, actor: &UserRow, kind: ReactionType) {
        if post.author_id == actor.id {
            return;
        }
        let phrase = match kind {
            ReactionType::Like => "liked your post",
            _ => "reacted to your post",
        };
        let message = actor_message(&display_name(actor), phrase);

        let result = convert::parse_id(&post.author_id)
            .map_err(ServiceError::from)
            .and_then(|author_id| {
                NotificationService::new(self.db, self.publisher).create_and_push(
                    author_id,
                    NotificationType::Like,
                    &message,
                )
            });
        if let Err(err) = result {
            warn!("Reaction notification for post {} not sent: {}", post.id, err);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::PostService;
    use crate::services::testing::{RecordingPublisher, user};
    use neon_types::api::CreatePostRequest;
    use neon_types::events::{GatewayEvent, Topic};

    fn post_by(db: &Database, author: Uuid) -> Uuid {
        PostService::new(db)
            .create(&CreatePostRequest {
                author_id: author,
                title: Some("Hello".to_string()),
                content: "world".to_string(),
                visibility: Default::default(),
                image_ids: vec![],
            })
            .unwrap()
            .id
    }

    #[test]
    fn like_notifies_post_author_once() {
        let db = Database::open_in_memory().unwrap();
        let publisher = RecordingPublisher::default();
        let alice = user(&db, "Alice", "");
        let bob = user(&db, "Bob", "Stone");
        let post = post_by(&db, alice);
        let service = ReactionService::new(&db, &publisher);

        service.like(post, bob).unwrap();
        service.like(post, bob).unwrap();

        let events = publisher.events.lock().unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].0, Topic::User(alice));
        match &events[0].1 {
            GatewayEvent::NotificationCreate(n) => {
                assert_eq!(n.kind, NotificationType::Like);
                assert_eq!(n.content, "Bob Stone liked your post");
            }
            other => panic!("unexpected event: {:?}", other),
        }
        drop(events);

        let stored = NotificationService::new(&db, &publisher).list(alice).unwrap();
        assert_eq!(stored.len(), 1);
    }

    #[test]
    fn other_reaction_replaces_and_uses_reacted_phrase() {
        let db = Database::open_in_memory().unwrap();
        let publisher = RecordingPublisher::default();
        let alice = user(&db, "Alice", "");
        let bob = user(&db, "", "");
        let post = post_by(&db, alice);
        let service = ReactionService::new(&db, &publisher);

        service.like(post, bob).unwrap();
        let wow = service.react(post, bob, ReactionType::Wow).unwrap();

        let reactions = service.list(post).unwrap();
        assert_eq!(reactions.len(), 1);
        assert_eq!(reactions[0].id, wow.id);
        assert_eq!(reactions[0].kind, ReactionType::Wow);

        let events = publisher.events.lock().unwrap();
        match &events[1].1 {
            GatewayEvent::NotificationCreate(n) => assert_eq!(n.content, "Someone reacted to your post"),
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn self_like_is_silent_and_unlike_removes() {
        let db = Database::open_in_memory().unwrap();
        let publisher = RecordingPublisher::default();
        let alice = user(&db, "Alice", "");
        let post = post_by(&db, alice);
        let service = ReactionService::new(&db, &publisher);

        service.like(post, alice).unwrap();
        assert!(publisher.topics().is_empty());

        service.unlike(post, alice).unwrap();
        assert!(service.list(post).unwrap().is_empty());
        assert!(matches!(service.unlike(post, alice), Err(ServiceError::NotFound("reaction"))));
    }

    #[test]
    fn missing_post_or_user_is_not_found() {
        let db = Database::open_in_memory().unwrap();
        let publisher = RecordingPublisher::default();
        let alice = user(&db, "Alice", "");
        let post = post_by(&db, alice);
        let service = ReactionService::new(&db, &publisher);

        assert!(matches!(service.like(Uuid::new_v4(), alice), Err(ServiceError::NotFound("post"))));
        assert!(matches!(service.like(post, Uuid::new_v4()), Err(ServiceError::NotFound("user"))));
        assert!(publisher.topics().is_empty());
    }

    #[test]
    fn like_succeeds_when_notification_store_fails() {
        let db = Database::open_in_memory().unwrap();
        let publisher = RecordingPublisher::default();
        let alice = user(&db, "Alice", "");
        let bob = user(&db, "Bob", "");
        let post = post_by(&db, alice);
        db.with_conn(|c| Ok(c.execute_batch("DROP TABLE notifications")?)).unwrap();
        let service = ReactionService::new(&db, &publisher);

        let liked = service.like(post, bob).unwrap();

        assert_eq!(liked.kind, ReactionType::Like);
        assert_eq!(service.list(post).unwrap().len(), 1);
        assert!(publisher.topics().is_empty());
    }
}
