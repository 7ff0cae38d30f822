//! Query methods on [`Database`](crate::Database), one file per table family.
//!
//! Methods take and return plain row types; parsing ids, enums and
//! timestamps is left to the callers.

mod chat;
mod comments;
mod friendships;
mod groups;
mod images;
mod notifications;
mod posts;
mod reactions;
mod users;

/// `?1, ?2, ... ?n` for an `IN (...)` clause.
fn placeholders(n: usize) -> String {
    (1..=n).map(|i| format!("?{}", i)).collect::<Vec<_>>().join(", ")
}

fn to_sql_params(values: &[String]) -> Vec<&dyn rusqlite::types::ToSql> {
    values.iter().map(|v| v as &dyn rusqlite::types::ToSql).collect()
}

#[cfg(test)]
pub(crate) mod fixtures {
    use crate::Database;
    use crate::models::UserRow;

    pub fn ts(n: u32) -> String {
        format!("2024-05-01T10:00:{:02}.000000Z", n)
    }

    pub fn user(db: &Database, first: &str) -> String {
        let id = uuid::Uuid::new_v4().to_string();
        db.insert_user(&UserRow {
            id: id.clone(),
            first_name: first.to_string(),
            last_name: String::new(),
            email: format!("{}@example.com", id),
            password: "hash".to_string(),
            profile_pic_id: None,
            created_at: ts(0),
        })
        .unwrap();
        id
    }
}
