//! Blog post entity model and DTOs.

use propdesk_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `blog_posts` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct BlogPost {
    pub id: DbId,
    pub author_id: Option<DbId>,
    pub title: String,
    pub slug: String,
    pub excerpt: Option<String>,
    pub content: String,
    pub tags: Vec<String>,
    pub status: String,
    pub published_at: Option<Timestamp>,
    pub view_count: i64,
    pub ai_generated: bool,
    pub reading_time_minutes: i32,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

#[derive(Debug, Deserialize)]
pub struct CreatePostRequest {
    pub title: String,
    pub slug: Option<String>,
    pub excerpt: Option<String>,
    pub content: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Insert DTO with derived fields filled in.
#[derive(Debug)]
pub struct CreatePost {
    pub author_id: Option<DbId>,
    pub title: String,
    pub slug: String,
    pub excerpt: Option<String>,
    pub content: String,
    pub tags: Vec<String>,
    pub ai_generated: bool,
    pub reading_time_minutes: i32,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdatePostRequest {
    pub title: Option<String>,
    pub slug: Option<String>,
    pub excerpt: Option<String>,
    pub content: Option<String>,
    pub tags: Option<Vec<String>>,
    pub status: Option<String>,
}

#[derive(Debug, Default)]
pub struct UpdatePost {
    pub title: Option<String>,
    pub slug: Option<String>,
    pub excerpt: Option<String>,
    pub content: Option<String>,
    pub tags: Option<Vec<String>>,
    pub status: Option<String>,
    pub reading_time_minutes: Option<i32>,
}

/// Body for `POST /blog/admin/generate`.
#[derive(Debug, Deserialize)]
pub struct GeneratePostRequest {
    pub topic: String,
    #[serde(default)]
    pub keywords: Vec<String>,
    pub tone: Option<String>,
}
