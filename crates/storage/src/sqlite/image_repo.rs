use chrono::{DateTime, Utc};
use sqlx::Row;

use train_core::model::RewardImage;

use super::SqliteRepository;
use crate::repository::{ImageLookup, ImageRepository, StorageError};

#[async_trait::async_trait]
impl ImageRepository for SqliteRepository {
    async fn get_image(&self, prompt: &str) -> Result<ImageLookup, StorageError> {
        let row = sqlx::query("SELECT data, blocked, created_at FROM images WHERE prompt = ?1")
            .bind(prompt)
            .fetch_optional(self.pool())
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        let Some(row) = row else {
            return Ok(ImageLookup::Missing);
        };

        let blocked: i64 = row
            .try_get("blocked")
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        if blocked != 0 {
            return Ok(ImageLookup::Blocked);
        }

        let data: Option<String> = row
            .try_get("data")
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        let Some(data) = data else {
            return Ok(ImageLookup::Missing);
        };
        let created_at: DateTime<Utc> = row
            .try_get("created_at")
            .map_err(|e| StorageError::Serialization(e.to_string()))?;

        let image = RewardImage::new(prompt, data, created_at)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        Ok(ImageLookup::Found(image))
    }

    async fn put_image(&self, image: &RewardImage) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO images (prompt, data, blocked, created_at)
            VALUES (?1, ?2, 0, ?3)
            ON CONFLICT(prompt) DO UPDATE SET
                data = excluded.data,
                created_at = excluded.created_at
            WHERE images.blocked = 0
            ",
        )
        .bind(image.prompt())
        .bind(image.data())
        .bind(image.created_at())
        .execute(self.pool())
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(())
    }

    async fn block_image(&self, prompt: &str) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO images (prompt, data, blocked, created_at)
            VALUES (?1, NULL, 1, ?2)
            ON CONFLICT(prompt) DO UPDATE SET
                data = NULL,
                blocked = 1
            ",
        )
        .bind(prompt)
        .bind(Utc::now())
        .execute(self.pool())
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(())
    }
}
