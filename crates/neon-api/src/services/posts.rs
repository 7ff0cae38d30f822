use std::collections::HashMap;

use chrono::Utc;
use tracing::debug;
use uuid::Uuid;

use neon_db::Database;
use neon_db::models::PostRow;
use neon_types::api::{CreatePostRequest, UpdatePostRequest};
use neon_types::models::Post;

use crate::convert;
use crate::error::{ServiceError, ServiceResult};
use crate::services::{require_user, required_text};

pub struct PostService<'a> {
    db: &'a Database,
}

impl<'a> PostService<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Author and every referenced image must exist.
    pub fn create(&self, req: &CreatePostRequest) -> ServiceResult<Post> {
        require_user(self.db, req.author_id)?;
        let content = required_text(&req.content, "content")?;

        let mut image_ids = Vec::with_capacity(req.image_ids.len());
        for image_id in &req.image_ids {
            let id = image_id.to_string();
            if self.db.get_image(&id)?.is_none() {
                return Err(ServiceError::NotFound("image"));
            }
            image_ids.push(id);
        }

        let now = neon_db::format_timestamp(Utc::now());
        let row = PostRow {
            id: Uuid::new_v4().to_string(),
            author_id: req.author_id.to_string(),
            title: clean_title(req.title.as_deref()),
            content,
            visibility: req.visibility.as_str().to_string(),
            reaction_count: 0,
            comment_count: 0,
            created_at: now.clone(),
            updated_at: now,
        };
        self.db.insert_post(&row, &image_ids)?;
        debug!("Post {} created by {}", row.id, row.author_id);

        Ok(convert::post(row, &image_ids)?)
    }

    pub fn get(&self, id: Uuid) -> ServiceResult<Post> {
        let row = self
            .db
            .get_post(&id.to_string())?
            .ok_or(ServiceError::NotFound("post"))?;
        self.hydrate(vec![row])?
            .pop()
            .ok_or(ServiceError::NotFound("post"))
    }

    /// Most recently updated first.
    pub fn list(&self) -> ServiceResult<Vec<Post>> {
        self.hydrate(self.db.list_posts()?)
    }

    pub fn list_by_ids(&self, ids: &[String]) -> ServiceResult<Vec<Post>> {
        self.hydrate(self.db.list_posts_by_ids(ids)?)
    }

    /// Changes only the fields present and bumps `updated_at`.
    pub fn update(&self, id: Uuid, req: &UpdatePostRequest) -> ServiceResult<Post> {
        let current = self
            .db
            .get_post(&id.to_string())?
            .ok_or(ServiceError::NotFound("post"))?;

        let title = match req.title.as_deref() {
            Some(title) => clean_title(Some(title)),
            None => current.title.clone(),
        };
        let content = match req.content.as_deref() {
            Some(content) => required_text(content, "content")?,
            None => current.content.clone(),
        };
        let visibility = req
            .visibility
            .map(|v| v.as_str().to_string())
            .unwrap_or_else(|| current.visibility.clone());

        self.db.update_post(
            &current.id,
            title.as_deref(),
            &content,
            &visibility,
            &neon_db::format_timestamp(Utc::now()),
        )?;
        self.get(id)
    }

    pub fn delete(&self, id: Uuid) -> ServiceResult<()> {
        if !self.db.delete_post(&id.to_string())? {
            return Err(ServiceError::NotFound("post"));
        }
        debug!("Post {} deleted", id);
        Ok(())
    }

    /// Attaches image ids with one batch query for all rows.
    fn hydrate(&self, rows: Vec<PostRow>) -> ServiceResult<Vec<Post>> {
        let post_ids: Vec<String> = rows.iter().map(|r| r.id.clone()).collect();
        let mut images: HashMap<String, Vec<String>> = HashMap::new();
        for (post_id, image_id) in self.db.get_image_ids_for_posts(&post_ids)? {
            images.entry(post_id).or_default().push(image_id);
        }

        let mut posts = Vec::with_capacity(rows.len());
        for row in rows {
            let image_ids = images.remove(&row.id).unwrap_or_default();
            posts.push(convert::post(row, &image_ids)?);
        }
        Ok(posts)
    }
}

fn clean_title(title: Option<&str>) -> Option<String> {
    title.map(str::trim).filter(|t| !t.is_empty()).map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::testing::user;
    use crate::services::{ImageService, ImageUpload};
    use neon_types::kinds::PostVisibility;

    fn request(author_id: Uuid, image_ids: Vec<Uuid>) -> CreatePostRequest {
        CreatePostRequest {
            author_id,
            title: Some("  ".to_string()),
            content: "hello square".to_string(),
            visibility: PostVisibility::default(),
            image_ids,
        }
    }

    #[test]
    fn create_links_images_in_order() {
        let db = Database::open_in_memory().unwrap();
        let author = user(&db, "Ada", "");
        let images = ImageService::new(&db);
        let upload = ImageUpload {
            name: "a.png".to_string(),
            content_type: "image/png".to_string(),
            data: vec![1, 2, 3],
        };
        let first = images.upload(&upload).unwrap().id;
        let second = images.upload(&upload).unwrap().id;
        let service = PostService::new(&db);

        let post = service.create(&request(author, vec![second, first])).unwrap();
        assert_eq!(post.title, None);
        assert_eq!(post.visibility, PostVisibility::Public);

        let fetched = service.get(post.id).unwrap();
        assert_eq!(fetched.image_ids, vec![second, first]);
        assert_eq!(fetched.reaction_count, 0);
    }

    #[test]
    fn create_rejects_unknown_author_image_or_blank_content() {
        let db = Database::open_in_memory().unwrap();
        let author = user(&db, "Ada", "");
        let service = PostService::new(&db);

        assert!(matches!(
            service.create(&request(Uuid::new_v4(), vec![])),
            Err(ServiceError::NotFound("user"))
        ));
        assert!(matches!(
            service.create(&request(author, vec![Uuid::new_v4()])),
            Err(ServiceError::NotFound("image"))
        ));

        let mut blank = request(author, vec![]);
        blank.content = " ".to_string();
        assert!(matches!(service.create(&blank), Err(ServiceError::InvalidArgument(_))));
        assert!(service.list().unwrap().is_empty());
    }

    #[test]
    fn update_changes_present_fields_only() {
        let db = Database::open_in_memory().unwrap();
        let author = user(&db, "Ada", "");
        let service = PostService::new(&db);
        let post = service.create(&request(author, vec![])).unwrap();

        let updated = service
            .update(
                post.id,
                &UpdatePostRequest {
                    visibility: Some(PostVisibility::Friends),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(updated.content, "hello square");
        assert_eq!(updated.visibility, PostVisibility::Friends);
        assert!(updated.updated_at >= post.updated_at);
    }

    #[test]
    fn delete_is_not_found_the_second_time() {
        let db = Database::open_in_memory().unwrap();
        let author = user(&db, "Ada", "");
        let service = PostService::new(&db);
        let post = service.create(&request(author, vec![])).unwrap();

        service.delete(post.id).unwrap();
        assert!(matches!(service.get(post.id), Err(ServiceError::NotFound("post"))));
        assert!(matches!(service.delete(post.id), Err(ServiceError::NotFound(_))));
    }
}
