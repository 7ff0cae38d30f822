use chrono::Utc;
use tracing::{debug, warn};
use uuid::Uuid;

use neon_db::Database;
use neon_db::models::FriendshipRow;
use neon_gateway::Publish;
use neon_types::kinds::{FriendshipStatus, NotificationType};
use neon_types::models::Friendship;

use crate::convert;
use crate::error::{ServiceError, ServiceResult};
use crate::services::{NotificationService, actor_message, display_name, require_user};

/// Friend requests: `Pending -> Accepted`, or deleted from either state.
pub struct FriendshipService<'a> {
    db: &'a Database,
    publisher: &'a dyn Publish,
}

impl<'a> FriendshipService<'a> {
    pub fn new(db: &'a Database, publisher: &'a dyn Publish) -> Self {
        Self { db, publisher }
    }

    /// Sends a request from `sender` to `receiver`.
    ///
    /// If the pair is already related in either direction the existing row is
    /// returned unchanged and nobody is notified. The check and the insert are
    /// separate statements, so two concurrent requests can both insert.
    pub fn create_friendship(&self, sender_id: Uuid, receiver_id: Uuid) -> ServiceResult<Friendship> {
        if sender_id == receiver_id {
            return Err(ServiceError::invalid("cannot befriend yourself"));
        }
        let sender = require_user(self.db, sender_id)?;
        require_user(self.db, receiver_id)?;

        if let Some(existing) = self
            .db
            .find_friendship_between(&sender_id.to_string(), &receiver_id.to_string())?
        {
            debug!("Friendship {} already links {} and {}", existing.id, sender_id, receiver_id);
            return Ok(convert::friendship(existing)?);
        }

        let row = FriendshipRow {
            id: Uuid::new_v4().to_string(),
            sender_id: sender_id.to_string(),
            receiver_id: receiver_id.to_string(),
            status: FriendshipStatus::Pending.as_str().to_string(),
            created_at: neon_db::format_timestamp(Utc::now()),
        };
        self.db.insert_friendship(&row)?;
        let friendship = convert::friendship(row)?;

        let message = actor_message(&display_name(&sender), "sent you a friend request");
        if let Err(err) = self.notifications().create_and_push(receiver_id, NotificationType::FriendRequest, &message) {
            warn!("Friend request notification for {} not sent: {}", receiver_id, err);
        }

        Ok(friendship)
    }

    /// Accepts the request between the two users, whichever of them sent it.
    pub fn accept_friendship(&self, sender_id: Uuid, receiver_id: Uuid) -> ServiceResult<Friendship> {
        let row = self
            .db
            .find_friendship_between(&sender_id.to_string(), &receiver_id.to_string())?
            .ok_or(ServiceError::NotFound("friendship"))?;
        self.accept_row(row)
    }

    pub fn accept_by_id(&self, id: Uuid) -> ServiceResult<Friendship> {
        let row = self.require(id)?;
        self.accept_row(row)
    }

    /// Rejecting a request deletes it.
    pub fn reject_by_id(&self, id: Uuid) -> ServiceResult<()> {
        self.delete_by_id(id)
    }

    /// Removes the friendship between `a` and `b` in either orientation.
    pub fn delete_friendship(&self, a: Uuid, b: Uuid) -> ServiceResult<()> {
        let row = self
            .db
            .find_friendship_between(&a.to_string(), &b.to_string())?
            .ok_or(ServiceError::NotFound("friendship"))?;
        self.db.delete_friendship(&row.id)?;
        debug!("Friendship {} between {} and {} removed", row.id, a, b);
        Ok(())
    }

    pub fn delete_by_id(&self, id: Uuid) -> ServiceResult<()> {
        if !self.db.delete_friendship(&id.to_string())? {
            return Err(ServiceError::NotFound("friendship"));
        }
        debug!("Friendship {} removed", id);
        Ok(())
    }

    pub fn get(&self, id: Uuid) -> ServiceResult<Friendship> {
        Ok(convert::friendship(self.require(id)?)?)
    }

    pub fn list_all(&self) -> ServiceResult<Vec<Friendship>> {
        Ok(convert::all(self.db.list_friendships()?, convert::friendship)?)
    }

    pub fn accepted_for_user(&self, user_id: Uuid) -> ServiceResult<Vec<Friendship>> {
        let rows = self
            .db
            .list_friendships_for_user(&user_id.to_string(), FriendshipStatus::Accepted.as_str())?;
        Ok(convert::all(rows, convert::friendship)?)
    }

    /// Requests still waiting on `user_id` to answer.
    pub fn pending_for_receiver(&self, user_id: Uuid) -> ServiceResult<Vec<Friendship>> {
        let rows = self
            .db
            .list_friendships_for_receiver(&user_id.to_string(), FriendshipStatus::Pending.as_str())?;
        Ok(convert::all(rows, convert::friendship)?)
    }

    fn require(&self, id: Uuid) -> ServiceResult<FriendshipRow> {
        self.db
            .get_friendship(&id.to_string())?
            .ok_or(ServiceError::NotFound("friendship"))
    }

    /// Sets Accepted; the stored sender hears about it only when the row was Pending.
    fn accept_row(&self, mut row: FriendshipRow) -> ServiceResult<Friendship> {
        let was_pending = row.status == FriendshipStatus::Pending.as_str();
        if was_pending {
            self.db
                .set_friendship_status(&row.id, FriendshipStatus::Accepted.as_str())?;
            row.status = FriendshipStatus::Accepted.as_str().to_string();
        }
        let friendship = convert::friendship(row)?;

        if was_pending {
            let accepter = self.db.get_user_by_id(&friendship.receiver_id.to_string())?;
            let name = accepter.as_ref().map(display_name).unwrap_or_default();
            let message = actor_message(&name, "accepted your friend request");
            if let Err(err) =
                self.notifications()
                    .create_and_push(friendship.sender_id, NotificationType::FriendAccepted, &message)
            {
                warn!("Friend accept notification for {} not sent: {}", friendship.sender_id, err);
            }
        }

        Ok(friendship)
    }

    fn notifications(&self) -> NotificationService<'a> {
        NotificationService::new(self.db, self.publisher)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::testing::{RecordingPublisher, user};
    use neon_types::events::{GatewayEvent, Topic};

    fn notification_contents(publisher: &RecordingPublisher) -> Vec<(Topic, String)> {
        publisher
            .events
            .lock()
            .unwrap()
            .iter()
            .filter_map(|(topic, event)| match event {
                GatewayEvent::NotificationCreate(n) => Some((*topic, n.content.clone())),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn create_is_idempotent_per_unordered_pair() {
        let db = Database::open_in_memory().unwrap();
        let publisher = RecordingPublisher::default();
        let a = user(&db, "Ada", "Lovelace");
        let b = user(&db, "Bob", "");
        let service = FriendshipService::new(&db, &publisher);

        let first = service.create_friendship(a, b).unwrap();
        let again = service.create_friendship(a, b).unwrap();
        let reversed = service.create_friendship(b, a).unwrap();

        assert_eq!(first.id, again.id);
        assert_eq!(first.id, reversed.id);
        assert_eq!(db.count_friendships_between(&a.to_string(), &b.to_string()).unwrap(), 1);
        assert_eq!(
            notification_contents(&publisher),
            vec![(Topic::User(b), "Ada Lovelace sent you a friend request".to_string())]
        );
    }

    #[test]
    fn create_rejects_self_and_missing_users() {
        let db = Database::open_in_memory().unwrap();
        let publisher = RecordingPublisher::default();
        let a = user(&db, "Ada", "");
        let service = FriendshipService::new(&db, &publisher);

        assert!(matches!(service.create_friendship(a, a), Err(ServiceError::InvalidArgument(_))));
        assert!(matches!(
            service.create_friendship(a, Uuid::new_v4()),
            Err(ServiceError::NotFound("user"))
        ));
        assert!(service.list_all().unwrap().is_empty());
        assert!(publisher.events.lock().unwrap().is_empty());
    }

    #[test]
    fn accept_works_in_either_orientation() {
        let db = Database::open_in_memory().unwrap();
        let publisher = RecordingPublisher::default();
        let a = user(&db, "Ada", "");
        let b = user(&db, "Bob", "Builder");
        let service = FriendshipService::new(&db, &publisher);
        service.create_friendship(a, b).unwrap();

        let accepted = service.accept_friendship(b, a).unwrap();
        assert_eq!(accepted.status, FriendshipStatus::Accepted);
        assert_eq!(accepted.sender_id, a);

        let contents = notification_contents(&publisher);
        assert_eq!(contents.len(), 2);
        assert_eq!(contents[1], (Topic::User(a), "Bob Builder accepted your friend request".to_string()));

        let notifications = NotificationService::new(&db, &publisher);
        let to_receiver = notifications.list(b).unwrap();
        assert_eq!(to_receiver.len(), 1);
        assert_eq!(to_receiver[0].kind, NotificationType::FriendRequest);
        let to_sender = notifications.list(a).unwrap();
        assert_eq!(to_sender.len(), 1);
        assert_eq!(to_sender[0].kind, NotificationType::FriendAccepted);
        assert_eq!(to_sender[0].content, "Bob Builder accepted your friend request");
    }

    #[test]
    fn accepting_twice_notifies_once() {
        let db = Database::open_in_memory().unwrap();
        let publisher = RecordingPublisher::default();
        let a = user(&db, "Ada", "");
        let b = user(&db, "", "");
        let service = FriendshipService::new(&db, &publisher);
        let request = service.create_friendship(a, b).unwrap();

        service.accept_by_id(request.id).unwrap();
        service.accept_friendship(a, b).unwrap();

        let contents = notification_contents(&publisher);
        assert_eq!(contents.len(), 2);
        assert_eq!(contents[1].1, "Someone accepted your friend request");
    }

    #[test]
    fn accept_missing_pair_is_not_found() {
        let db = Database::open_in_memory().unwrap();
        let publisher = RecordingPublisher::default();
        let a = user(&db, "Ada", "");
        let b = user(&db, "Bob", "");
        let service = FriendshipService::new(&db, &publisher);

        assert!(matches!(service.accept_friendship(a, b), Err(ServiceError::NotFound("friendship"))));
        assert!(matches!(service.accept_by_id(Uuid::new_v4()), Err(ServiceError::NotFound(_))));
    }

    #[test]
    fn request_then_reject_removes_row() {
        let db = Database::open_in_memory().unwrap();
        let publisher = RecordingPublisher::default();
        let a = user(&db, "Ada", "");
        let b = user(&db, "Bob", "");
        let service = FriendshipService::new(&db, &publisher);
        let request = service.create_friendship(a, b).unwrap();

        assert_eq!(service.pending_for_receiver(b).unwrap().len(), 1);
        let notifications = NotificationService::new(&db, &publisher);
        let requested = notifications.list(b).unwrap();
        assert_eq!(requested.len(), 1);
        assert_eq!(requested[0].kind, NotificationType::FriendRequest);

        service.reject_by_id(request.id).unwrap();

        assert_eq!(notifications.list(b).unwrap().len(), 1);
        assert!(notifications.list(a).unwrap().is_empty());
        assert_eq!(publisher.events.lock().unwrap().len(), 1);

        assert!(service.pending_for_receiver(b).unwrap().is_empty());
        assert!(matches!(service.get(request.id), Err(ServiceError::NotFound(_))));
        assert!(matches!(service.reject_by_id(request.id), Err(ServiceError::NotFound(_))));
    }

    #[test]
    fn accepted_lists_both_sides_and_delete_by_pair() {
        let db = Database::open_in_memory().unwrap();
        let publisher = RecordingPublisher::default();
        let a = user(&db, "Ada", "");
        let b = user(&db, "Bob", "");
        let c = user(&db, "Cy", "");
        let service = FriendshipService::new(&db, &publisher);
        service.create_friendship(a, b).unwrap();
        service.create_friendship(c, a).unwrap();
        service.accept_friendship(a, b).unwrap();

        assert_eq!(service.accepted_for_user(a).unwrap().len(), 1);
        assert_eq!(service.accepted_for_user(b).unwrap().len(), 1);
        assert!(service.accepted_for_user(c).unwrap().is_empty());

        service.delete_friendship(b, a).unwrap();
        assert!(service.accepted_for_user(a).unwrap().is_empty());
        assert!(matches!(service.delete_friendship(a, b), Err(ServiceError::NotFound(_))));
        assert_eq!(service.list_all().unwrap().len(), 1);
    }
}
