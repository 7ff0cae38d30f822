use chrono::Utc;
use tracing::warn;
use uuid::Uuid;

use neon_db::Database;
use neon_db::models::CommentRow;
use neon_gateway::Publish;
use neon_types::api::CreateCommentRequest;
use neon_types::kinds::NotificationType;
use neon_types::models::Comment;

use crate::convert;
use crate::error::{ServiceError, ServiceResult};
use crate::services::{NotificationService, actor_message, display_name, require_user, required_text};

pub struct CommentService<'a> {
    db: &'a Database,
    publisher: &'a dyn Publish,
}

impl<'a> CommentService<'a> {
    pub fn new(db: &'a Database, publisher: &'a dyn Publish) -> Self {
        Self { db, publisher }
    }

    /// Root comment; the post author is notified unless they wrote it.
    pub fn comment_on_post(&self, post_id: Uuid, req: &CreateCommentRequest) -> ServiceResult<Comment> {
        let post = self
            .db
            .get_post(&post_id.to_string())?
            .ok_or(ServiceError::NotFound("post"))?;

        let comment = self.insert(&post.id, None, req)?;
        self.notify(&post.author_id, req.author_id, "commented on your post");
        Ok(comment)
    }

    /// Reply on the parent's post; the parent's author is notified unless they wrote it.
    pub fn reply(&self, parent_id: Uuid, req: &CreateCommentRequest) -> ServiceResult<Comment> {
        let parent = self
            .db
            .get_comment(&parent_id.to_string())?
            .ok_or(ServiceError::NotFound("comment"))?;

        let comment = self.insert(&parent.post_id, Some(parent.id.clone()), req)?;
        self.notify(&parent.author_id, req.author_id, "replied to your comment");
        Ok(comment)
    }

    pub fn root_comments(&self, post_id: Uuid) -> ServiceResult<Vec<Comment>> {
        let rows = self.db.get_root_comments(&post_id.to_string())?;
        Ok(convert::all(rows, convert::comment)?)
    }

    pub fn replies(&self, comment_id: Uuid) -> ServiceResult<Vec<Comment>> {
        let rows = self.db.get_replies(&comment_id.to_string())?;
        Ok(convert::all(rows, convert::comment)?)
    }

    fn insert(&self, post_id: &str, parent_id: Option<String>, req: &CreateCommentRequest) -> ServiceResult<Comment> {
        require_user(self.db, req.author_id)?;
        let content = required_text(&req.content, "content")?;

        let row = CommentRow {
            id: Uuid::new_v4().to_string(),
            post_id: post_id.to_string(),
            author_id: req.author_id.to_string(),
            parent_id,
            content,
            created_at: neon_db::format_timestamp(Utc::now()),
        };
        self.db.insert_comment(&row)?;
        Ok(convert::comment(row)?)
    }

    fn notify(&self, recipient: &str, actor_id: Uuid, phrase: &str) {
        if recipient == actor_id.to_string() {
            return;
        }
        let result = convert::parse_id(recipient).map_err(ServiceError::from).and_then(|recipient_id| {
            let actor = require_user(self.db, actor_id)?;
            let message = actor_message(&display_name(&actor), phrase);
            NotificationService::new(self.db, self.publisher).create_and_push(
                recipient_id,
                NotificationType::Comment,
                &message,
            )
        });
        if let Err(err) = result {
            warn!("Comment notification for {} not sent: {}", recipient, err);
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
                title: None,
                content: "first post".to_string(),
                visibility: Default::default(),
                image_ids: vec![],
            })
            .unwrap()
            .id
    }

    fn said(author_id: Uuid, content: &str) -> CreateCommentRequest {
        CreateCommentRequest {
            author_id,
            content: content.to_string(),
        }
    }

    fn pushed(publisher: &RecordingPublisher) -> Vec<(Topic, String)> {
        publisher
            .events
            .lock()
            .unwrap()
            .iter()
            .filter_map(|(topic, event)| match event {
                GatewayEvent::NotificationCreate(n) => {
                    assert_eq!(n.kind, NotificationType::Comment);
                    Some((*topic, n.content.clone()))
                }
                _ => None,
            })
            .collect()
    }

    #[test]
    fn comment_and_reply_notify_the_right_authors() {
        let db = Database::open_in_memory().unwrap();
        let publisher = RecordingPublisher::default();
        let ada = user(&db, "Ada", "");
        let bob = user(&db, "Bob", "");
        let post = post_by(&db, ada);
        let service = CommentService::new(&db, &publisher);

        let root = service.comment_on_post(post, &said(bob, "nice")).unwrap();
        let reply = service.reply(root.id, &said(ada, "thanks")).unwrap();

        assert_eq!(reply.post_id, post);
        assert_eq!(reply.parent_id, Some(root.id));
        assert_eq!(
            pushed(&publisher),
            vec![
                (Topic::User(ada), "Bob commented on your post".to_string()),
                (Topic::User(bob), "Ada replied to your comment".to_string()),
            ]
        );

        assert_eq!(service.root_comments(post).unwrap().len(), 1);
        assert_eq!(service.replies(root.id).unwrap()[0].id, reply.id);
    }

    #[test]
    fn own_post_comment_is_silent() {
        let db = Database::open_in_memory().unwrap();
        let publisher = RecordingPublisher::default();
        let ada = user(&db, "Ada", "");
        let post = post_by(&db, ada);
        let service = CommentService::new(&db, &publisher);

        let root = service.comment_on_post(post, &said(ada, "bump")).unwrap();
        service.reply(root.id, &said(ada, "bump again")).unwrap();

        assert!(pushed(&publisher).is_empty());
    }

    #[test]
    fn missing_targets_and_blank_content() {
        let db = Database::open_in_memory().unwrap();
        let publisher = RecordingPublisher::default();
        let ada = user(&db, "Ada", "");
        let post = post_by(&db, ada);
        let service = CommentService::new(&db, &publisher);

        assert!(matches!(
            service.comment_on_post(Uuid::new_v4(), &said(ada, "x")),
            Err(ServiceError::NotFound("post"))
        ));
        assert!(matches!(
            service.reply(Uuid::new_v4(), &said(ada, "x")),
            Err(ServiceError::NotFound("comment"))
        ));
        assert!(matches!(
            service.comment_on_post(post, &said(ada, "   ")),
            Err(ServiceError::InvalidArgument(_))
        ));
        assert!(matches!(
            service.comment_on_post(post, &said(Uuid::new_v4(), "x")),
            Err(ServiceError::NotFound("user"))
        ));
    }

    #[test]
    fn comment_is_stored_when_notification_store_fails() {
        let db = Database::open_in_memory().unwrap();
        let publisher = RecordingPublisher::default();
        let ada = user(&db, "Ada", "");
        let bob = user(&db, "Bob", "");
        let post = post_by(&db, ada);
        db.with_conn(|c| Ok(c.execute_batch("DROP TABLE notifications")?)).unwrap();
        let service = CommentService::new(&db, &publisher);

        let root = service.comment_on_post(post, &said(bob, "nice")).unwrap();

        let stored = service.root_comments(post).unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].id, root.id);
        assert!(pushed(&publisher).is_empty());
    }
}
