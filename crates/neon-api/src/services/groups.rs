use chrono::Utc;
use tracing::{debug, warn};
use uuid::Uuid;

use neon_db::Database;
use neon_db::models::GroupRow;
use neon_gateway::Publish;
use neon_types::api::CreateGroupRequest;
use neon_types::kinds::NotificationType;
use neon_types::models::{Group, Post, User};

use crate::convert;
use crate::error::{ServiceError, ServiceResult};
use crate::services::{NotificationService, PostService, actor_message, display_name, require_user, required_text};

pub struct GroupService<'a> {
    db: &'a Database,
    publisher: &'a dyn Publish,
}

impl<'a> GroupService<'a> {
    pub fn new(db: &'a Database, publisher: &'a dyn Publish) -> Self {
        Self { db, publisher }
    }

    /// The creator is recorded as `created_by` but not enrolled as a member.
    pub fn create(&self, req: &CreateGroupRequest) -> ServiceResult<Group> {
        require_user(self.db, req.user_id)?;
        let name = required_text(&req.name, "name")?;

        let row = GroupRow {
            id: Uuid::new_v4().to_string(),
            name,
            description: req
                .description
                .as_deref()
                .map(str::trim)
                .filter(|d| !d.is_empty())
                .map(str::to_string),
            visibility: req.visibility.as_str().to_string(),
            created_by: req.user_id.to_string(),
            member_count: 0,
            created_at: neon_db::format_timestamp(Utc::now()),
        };
        self.db.insert_group(&row)?;
        debug!("Group {} ({}) created", row.id, row.name);

        Ok(convert::group(row)?)
    }

    pub fn get(&self, id: Uuid) -> ServiceResult<Group> {
        Ok(convert::group(self.require(id)?)?)
    }

    pub fn list(&self) -> ServiceResult<Vec<Group>> {
        Ok(convert::all(self.db.list_groups()?, convert::group)?)
    }

    /// Adding an existing member is a no-op.
    pub fn add_member(&self, group_id: Uuid, user_id: Uuid) -> ServiceResult<Group> {
        let group = self.require(group_id)?;
        require_user(self.db, user_id)?;

        if self.db.add_group_member(&group.id, &user_id.to_string())? {
            debug!("User {} joined group {}", user_id, group_id);
        }
        self.get(group_id)
    }

    pub fn members(&self, group_id: Uuid) -> ServiceResult<Vec<User>> {
        let group = self.require(group_id)?;
        let mut members = Vec::new();
        for member_id in self.db.get_group_member_ids(&group.id)? {
            if let Some(row) = self.db.get_user_by_id(&member_id)? {
                members.push(convert::user(row)?);
            }
        }
        Ok(members)
    }

    /// Attaches the post and, the first time only, tells every member except
    /// the author.
    pub fn attach_post(&self, group_id: Uuid, post_id: Uuid) -> ServiceResult<Group> {
        let group = self.require(group_id)?;
        let post = self
            .db
            .get_post(&post_id.to_string())?
            .ok_or(ServiceError::NotFound("post"))?;

        if !self.db.add_group_post(&group.id, &post.id)? {
            debug!("Post {} already in group {}", post_id, group_id);
            return self.get(group_id);
        }

        let author_name = self
            .db
            .get_user_by_id(&post.author_id)?
            .as_ref()
            .map(display_name)
            .unwrap_or_default();
        let message = actor_message(&author_name, &format!("posted in {}", group.name));
        let notifications = NotificationService::new(self.db, self.publisher);

        for member_id in self.db.get_group_member_ids(&group.id)? {
            if member_id == post.author_id {
                continue;
            }
            let result = convert::parse_id(&member_id)
                .map_err(ServiceError::from)
                .and_then(|member| notifications.create_and_push(member, NotificationType::PostUpdate, &message));
            if let Err(err) = result {
                warn!("Group post notification for {} not sent: {}", member_id, err);
            }
        }

        self.get(group_id)
    }

    pub fn posts(&self, group_id: Uuid) -> ServiceResult<Vec<Post>> {
        let group = self.require(group_id)?;
        let ids = self.db.get_group_post_ids(&group.id)?;
        PostService::new(self.db).list_by_ids(&ids)
    }

    fn require(&self, id: Uuid) -> ServiceResult<GroupRow> {
        self.db
            .get_group(&id.to_string())?
            .ok_or(ServiceError::NotFound("group"))
    }
}
