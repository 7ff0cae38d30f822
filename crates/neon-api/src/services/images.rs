use chrono::Utc;
use tracing::debug;
use uuid::Uuid;

use neon_db::Database;
use neon_types::models::Image;

use crate::convert;
use crate::error::{ServiceError, ServiceResult};

/// Default cap for upload and replace (10 MiB).
pub const MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;

/// A file as received from a multipart form.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub name: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

impl ImageUpload {
    fn validate(&self, max_bytes: usize) -> ServiceResult<()> {
        if self.data.is_empty() {
            return Err(ServiceError::invalid("file is empty"));
        }
        if self.data.len() > max_bytes {
            return Err(ServiceError::invalid(format!("file exceeds {} bytes", max_bytes)));
        }
        Ok(())
    }

    fn name_or_default(&self) -> &str {
        match self.name.trim() {
            "" => "upload",
            name => name,
        }
    }

    fn content_type_or_default(&self) -> &str {
        match self.content_type.trim() {
            "" => "application/octet-stream",
            ct => ct,
        }
    }
}

/// Image blobs stored inline in SQLite.
pub struct ImageService<'a> {
    db: &'a Database,
    max_bytes: usize,
}

impl<'a> ImageService<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self {
            db,
            max_bytes: MAX_IMAGE_BYTES,
        }
    }

    pub fn with_max_bytes(mut self, max_bytes: usize) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    pub fn upload(&self, upload: &ImageUpload) -> ServiceResult<Image> {
        upload.validate(self.max_bytes)?;

        let id = Uuid::new_v4();
        self.db.insert_image(
            &id.to_string(),
            upload.name_or_default(),
            upload.content_type_or_default(),
            &upload.data,
            &neon_db::format_timestamp(Utc::now()),
        )?;
        debug!("Stored image {} ({} bytes)", id, upload.data.len());

        self.get(id)
    }

    pub fn get(&self, id: Uuid) -> ServiceResult<Image> {
        let row = self
            .db
            .get_image(&id.to_string())?
            .ok_or(ServiceError::NotFound("image"))?;
        Ok(convert::image(row)?)
    }

    /// Metadata plus raw bytes, for serving the file.
    pub fn get_data(&self, id: Uuid) -> ServiceResult<(Image, Vec<u8>)> {
        let (row, data) = self
            .db
            .get_image_data(&id.to_string())?
            .ok_or(ServiceError::NotFound("image"))?;
        Ok((convert::image(row)?, data))
    }

    /// Swaps the bytes behind an existing id; references to it keep working.
    pub fn replace(&self, id: Uuid, upload: &ImageUpload) -> ServiceResult<Image> {
        upload.validate(self.max_bytes)?;
        let changed = self.db.update_image(
            &id.to_string(),
            upload.name_or_default(),
            upload.content_type_or_default(),
            &upload.data,
        )?;
        if !changed {
            return Err(ServiceError::NotFound("image"));
        }
        self.get(id)
    }

    pub fn delete(&self, id: Uuid) -> ServiceResult<()> {
        if !self.db.delete_image(&id.to_string())? {
            return Err(ServiceError::NotFound("image"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn png(bytes: &[u8]) -> ImageUpload {
        ImageUpload {
            name: "cat.png".to_string(),
            content_type: "image/png".to_string(),
            data: bytes.to_vec(),
        }
    }

    #[test]
    fn upload_then_fetch_bytes() {
        let db = Database::open_in_memory().unwrap();
        let service = ImageService::new(&db);

        let image = service.upload(&png(b"\x89PNG....")).unwrap();
        assert_eq!(image.size, 8);
        assert_eq!(image.url, format!("/api/images/{}", image.id));

        let (meta, data) = service.get_data(image.id).unwrap();
        assert_eq!(meta.content_type, "image/png");
        assert_eq!(data, b"\x89PNG....");
    }

    #[test]
    fn rejects_empty_and_oversized_files() {
        let db = Database::open_in_memory().unwrap();
        let service = ImageService::new(&db);

        assert!(matches!(service.upload(&png(b"")), Err(ServiceError::InvalidArgument(_))));
        let big = vec![0u8; MAX_IMAGE_BYTES + 1];
        assert!(matches!(service.upload(&png(&big)), Err(ServiceError::InvalidArgument(_))));
    }

    #[test]
    fn configured_cap_replaces_default() {
        let db = Database::open_in_memory().unwrap();
        let small = ImageService::new(&db).with_max_bytes(4);

        assert!(small.upload(&png(b"four")).is_ok());
        assert!(matches!(small.upload(&png(b"fives")), Err(ServiceError::InvalidArgument(_))));

        let big = vec![0u8; MAX_IMAGE_BYTES + 1];
        let roomy = ImageService::new(&db).with_max_bytes(MAX_IMAGE_BYTES * 2);
        assert_eq!(roomy.upload(&png(&big)).unwrap().size, (MAX_IMAGE_BYTES + 1) as u64);
    }

    #[test]
    fn replace_keeps_id_and_delete_removes() {
        let db = Database::open_in_memory().unwrap();
        let service = ImageService::new(&db);
        let image = service.upload(&png(b"one")).unwrap();

        let replaced = service
            .replace(
                image.id,
                &ImageUpload {
                    name: String::new(),
                    content_type: String::new(),
                    data: b"second".to_vec(),
                },
            )
            .unwrap();
        assert_eq!(replaced.id, image.id);
        assert_eq!(replaced.name, "upload");
        assert_eq!(replaced.content_type, "application/octet-stream");
        assert_eq!(replaced.size, 6);

        service.delete(image.id).unwrap();
        assert!(matches!(service.get(image.id), Err(ServiceError::NotFound("image"))));
        assert!(matches!(service.delete(image.id), Err(ServiceError::NotFound(_))));
    }
}
