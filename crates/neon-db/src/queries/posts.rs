use anyhow::Result;
use rusqlite::{OptionalExtension, Row};

use super::{placeholders, to_sql_params};
use crate::Database;
use crate::models::PostRow;

const POST_SELECT: &str = "
    SELECT p.id, p.author_id, p.title, p.content, p.visibility,
           (SELECT COUNT(*) FROM reactions r WHERE r.post_id = p.id),
           (SELECT COUNT(*) FROM comments c WHERE c.post_id = p.id),
           p.created_at, p.updated_at
    FROM posts p";

impl Database {
    /// Inserts the post and links its images in one transaction.
    pub fn insert_post(&self, post: &PostRow, image_ids: &[String]) -> Result<()> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT INTO posts (id, author_id, title, content, visibility, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                rusqlite::params![
                    post.id,
                    post.author_id,
                    post.title,
                    post.content,
                    post.visibility,
                    post.created_at,
                    post.updated_at,
                ],
            )?;
            for (position, image_id) in image_ids.iter().enumerate() {
                tx.execute(
                    "INSERT OR IGNORE INTO post_images (post_id, image_id, position) VALUES (?1, ?2, ?3)",
                    rusqlite::params![post.id, image_id, position as i64],
                )?;
            }
            tx.commit()?;
            Ok(())
        })
    }

    pub fn get_post(&self, id: &str) -> Result<Option<PostRow>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(&format!("{} WHERE p.id = ?1", POST_SELECT), [id], map_post)
                .optional()?;
            Ok(row)
        })
    }

    /// Most recently updated first.
    pub fn list_posts(&self) -> Result<Vec<PostRow>> {
        self.with_conn(|conn| {
            let mut stmt =
                conn.prepare(&format!("{} ORDER BY p.updated_at DESC, p.rowid DESC", POST_SELECT))?;
            let rows = stmt
                .query_map([], map_post)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn list_posts_by_ids(&self, ids: &[String]) -> Result<Vec<PostRow>> {
        if ids.is_empty() {
            return Ok(vec![]);
        }

        self.with_conn(|conn| {
            let sql = format!(
                "{} WHERE p.id IN ({}) ORDER BY p.updated_at DESC, p.rowid DESC",
                POST_SELECT,
                placeholders(ids.len())
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(to_sql_params(ids).as_slice(), map_post)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn update_post(
        &self,
        id: &str,
        title: Option<&str>,
        content: &str,
        visibility: &str,
        updated_at: &str,
    ) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "UPDATE posts SET title = ?2, content = ?3, visibility = ?4, updated_at = ?5 WHERE id = ?1",
                rusqlite::params![id, title, content, visibility, updated_at],
            )?;
            Ok(changed > 0)
        })
    }

    /// Comments, reactions and image/group links go with it via cascading keys.
    pub fn delete_post(&self, id: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute("DELETE FROM posts WHERE id = ?1", [id])?;
            Ok(changed > 0)
        })
    }

    /// Batch-fetch `(post_id, image_id)` pairs in upload order.
    pub fn get_image_ids_for_posts(&self, post_ids: &[String]) -> Result<Vec<(String, String)>> {
        if post_ids.is_empty() {
            return Ok(vec![]);
        }

        self.with_conn(|conn| {
            let sql = format!(
                "SELECT post_id, image_id FROM post_images WHERE post_id IN ({}) ORDER BY post_id, position",
                placeholders(post_ids.len())
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(to_sql_params(post_ids).as_slice(), |row| Ok((row.get(0)?, row.get(1)?)))?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}

fn map_post(row: &Row<'_>) -> rusqlite::Result<PostRow> {
    Ok(PostRow {
        id: row.get(0)?,
        author_id: row.get(1)?,
        title: row.get(2)?,
        content: row.get(3)?,
        visibility: row.get(4)?,
        reaction_count: row.get(5)?,
        comment_count: row.get(6)?,
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::fixtures::{ts, user};

    fn post(db: &Database, author: &str, id: &str, updated: u32, images: &[String]) {
        db.insert_post(
            &PostRow {
                id: id.to_string(),
                author_id: author.to_string(),
                title: None,
                content: "body".to_string(),
                visibility: "PUBLIC".to_string(),
                reaction_count: 0,
                comment_count: 0,
                created_at: ts(0),
                updated_at: ts(updated),
            },
            images,
        )
        .unwrap();
    }

    #[test]
    fn list_is_newest_update_first() {
        let db = Database::open_in_memory().unwrap();
        let author = user(&db, "Ada");
        post(&db, &author, "p-old", 1, &[]);
        post(&db, &author, "p-new", 5, &[]);

        let ids: Vec<String> = db.list_posts().unwrap().into_iter().map(|p| p.id).collect();
        assert_eq!(ids, vec!["p-new", "p-old"]);
    }

    #[test]
    fn delete_cascades_image_links() {
        let db = Database::open_in_memory().unwrap();
        let author = user(&db, "Ada");
        db.insert_image("img", "a.png", "image/png", b"x", &ts(0)).unwrap();
        post(&db, &author, "p1", 1, &["img".to_string()]);

        let links = db.get_image_ids_for_posts(&["p1".to_string()]).unwrap();
        assert_eq!(links, vec![("p1".to_string(), "img".to_string())]);

        assert!(db.delete_post("p1").unwrap());
        assert!(db.get_image_ids_for_posts(&["p1".to_string()]).unwrap().is_empty());
        assert!(!db.delete_post("p1").unwrap());
    }
}
