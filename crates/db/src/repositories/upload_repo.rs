//! Repository for the `uploads` table.

use propdesk_core::types::DbId;
use sqlx::PgPool;

use crate::models::upload::{CreateUpload, Upload};

const COLUMNS: &str = "id, owner_id, entity_type, entity_id, file_name, content_type, \
                        size_bytes, storage_backend, storage_key, url, created_at";

pub struct UploadRepo;

impl UploadRepo {
    pub async fn create(pool: &PgPool, input: &CreateUpload) -> Result<Upload, sqlx::Error> {
        let query = format!(
            "INSERT INTO uploads (owner_id, entity_type, entity_id, file_name, content_type,
                                  size_bytes, storage_backend, storage_key, url)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Upload>(&query)
            .bind(input.owner_id)
            .bind(&input.entity_type)
            .bind(input.entity_id)
            .bind(&input.file_name)
            .bind(&input.content_type)
            .bind(input.size_bytes)
            .bind(&input.storage_backend)
            .bind(&input.storage_key)
            .bind(&input.url)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Upload>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM uploads WHERE id = $1");
        sqlx::query_as::<_, Upload>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Uploads attached to one entity, newest first.
    pub async fn list_for_entity(
        pool: &PgPool,
        entity_type: &str,
        entity_id: DbId,
    ) -> Result<Vec<Upload>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM uploads
             WHERE entity_type = $1 AND entity_id = $2
             ORDER BY created_at DESC"
        );
        sqlx::query_as::<_, Upload>(&query)
            .bind(entity_type)
            .bind(entity_id)
            .fetch_all(pool)
            .await
    }

    pub async fn list_for_owner(
        pool: &PgPool,
        owner_id: DbId,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Upload>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM uploads WHERE owner_id = $1
             ORDER BY created_at DESC LIMIT $2 OFFSET $3"
        );
        sqlx::query_as::<_, Upload>(&query)
            .bind(owner_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    /// Delete the row. Callers remove the stored object first.
    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM uploads WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
