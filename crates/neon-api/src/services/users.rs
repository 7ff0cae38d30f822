use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::{SaltString, rand_core::OsRng}};
use anyhow::anyhow;
use chrono::Utc;
use tracing::{debug, info};
use uuid::Uuid;

use neon_db::Database;
use neon_db::models::UserRow;
use neon_types::api::{LoginRequest, RegisterRequest, UpdateUserRequest};
use neon_types::models::User;

use crate::convert;
use crate::error::{ServiceError, ServiceResult};
use crate::services::{ImageService, ImageUpload, MAX_IMAGE_BYTES, require_user, required_text};

pub struct UserService<'a> {
    db: &'a Database,
    max_image_bytes: usize,
}

impl<'a> UserService<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self {
            db,
            max_image_bytes: MAX_IMAGE_BYTES,
        }
    }

    /// Cap applied to profile pictures.
    pub fn with_max_image_bytes(mut self, max_bytes: usize) -> Self {
        self.max_image_bytes = max_bytes;
        self
    }

    /// Creates an account. Emails are unique, compared case-insensitively.
    pub fn register(&self, req: &RegisterRequest) -> ServiceResult<User> {
        let email = normalize_email(&req.email)?;
        if req.password.is_empty() {
            return Err(ServiceError::invalid("password is required"));
        }

        if self.db.get_user_by_email(&email)?.is_some() {
            return Err(ServiceError::Conflict("email already exists".to_string()));
        }

        // Hash password with Argon2id
        let salt = SaltString::generate(&mut OsRng);
        let password_hash = Argon2::default()
            .hash_password(req.password.as_bytes(), &salt)
            .map_err(|e| anyhow!("password hashing failed: {}", e))?
            .to_string();

        let row = UserRow {
            id: Uuid::new_v4().to_string(),
            first_name: req.first_name.trim().to_string(),
            last_name: req.last_name.trim().to_string(),
            email,
            password: password_hash,
            profile_pic_id: None,
            created_at: neon_db::format_timestamp(Utc::now()),
        };
        self.db.insert_user(&row)?;
        info!("Registered user {}", row.id);

        Ok(convert::user(row)?)
    }

    /// Checks the password against the stored hash. Unknown email and wrong
    /// password are indistinguishable to the caller.
    pub fn login(&self, req: &LoginRequest) -> ServiceResult<User> {
        let email = req.email.trim().to_lowercase();
        let row = self.db.get_user_by_email(&email)?.ok_or(ServiceError::Unauthorized)?;

        let parsed_hash = PasswordHash::new(&row.password)
            .map_err(|e| anyhow!("stored password hash for {} is unreadable: {}", row.id, e))?;
        Argon2::default()
            .verify_password(req.password.as_bytes(), &parsed_hash)
            .map_err(|_| ServiceError::Unauthorized)?;

        debug!("User {} logged in", row.id);
        Ok(convert::user(row)?)
    }

    pub fn get(&self, id: Uuid) -> ServiceResult<User> {
        Ok(convert::user(require_user(self.db, id)?)?)
    }

    pub fn list(&self) -> ServiceResult<Vec<User>> {
        Ok(convert::all(self.db.list_users()?, convert::user)?)
    }

    /// Name search; a blank term matches nobody.
    pub fn search(&self, term: Option<&str>) -> ServiceResult<Vec<User>> {
        let Some(term) = term.map(str::trim).filter(|t| !t.is_empty()) else {
            return Ok(Vec::new());
        };
        Ok(convert::all(self.db.search_users(term)?, convert::user)?)
    }

    /// Applies the fields that are present; absent ones keep their value.
    pub fn update(&self, id: Uuid, req: &UpdateUserRequest) -> ServiceResult<User> {
        let current = require_user(self.db, id)?;

        let first_name = req.first_name.as_deref().map(str::trim).unwrap_or(&current.first_name);
        let last_name = req.last_name.as_deref().map(str::trim).unwrap_or(&current.last_name);
        let email = match req.email.as_deref() {
            Some(raw) => {
                let email = normalize_email(raw)?;
                if email != current.email {
                    let taken = self.db.get_user_by_email(&email)?;
                    if taken.is_some_and(|other| other.id != current.id) {
                        return Err(ServiceError::Conflict("email already exists".to_string()));
                    }
                }
                email
            }
            None => current.email.clone(),
        };

        self.db.update_user(&current.id, first_name, last_name, &email)?;
        self.get(id)
    }

    /// Replaces the user's picture in place if one exists, else stores a new image.
    pub fn set_profile_pic(&self, id: Uuid, upload: &ImageUpload) -> ServiceResult<User> {
        let current = require_user(self.db, id)?;
        let images = ImageService::new(self.db).with_max_bytes(self.max_image_bytes);

        let existing = match current.profile_pic_id.as_deref() {
            Some(pic) => Some(convert::parse_id(pic)?),
            None => None,
        };

        match existing {
            Some(image_id) => {
                images.replace(image_id, upload)?;
            }
            None => {
                let image = images.upload(upload)?;
                self.db.set_profile_pic(&current.id, &image.id.to_string())?;
            }
        }

        self.get(id)
    }
}

fn normalize_email(raw: &str) -> ServiceResult<String> {
    let email = required_text(raw, "email")?.to_lowercase();
    if !email.contains('@') {
        return Err(ServiceError::invalid("email is malformed"));
    }
    Ok(email)
}
