//! Upload entity model.

use propdesk_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `uploads` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Upload {
    pub id: DbId,
    pub owner_id: DbId,
    pub entity_type: String,
    pub entity_id: DbId,
    pub file_name: String,
    pub content_type: String,
    pub size_bytes: i64,
    /// `cloud` or `local`; deletes go to the same backend.
    pub storage_backend: String,
    pub storage_key: String,
    pub url: String,
    pub created_at: Timestamp,
}

#[derive(Debug)]
pub struct CreateUpload {
    pub owner_id: DbId,
    pub entity_type: String,
    pub entity_id: DbId,
    pub file_name: String,
    pub content_type: String,
    pub size_bytes: i64,
    pub storage_backend: String,
    pub storage_key: String,
    pub url: String,
}
