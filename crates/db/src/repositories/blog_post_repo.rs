//! Repository for the `blog_posts` table.

use propdesk_core::types::DbId;
use sqlx::PgPool;

use crate::models::blog_post::{BlogPost, CreatePost, UpdatePost};

const COLUMNS: &str = "id, author_id, title, slug, excerpt, content, tags, status, \
                        published_at, view_count, ai_generated, reading_time_minutes, \
                        created_at, updated_at";

pub struct BlogPostRepo;

impl BlogPostRepo {
    /// Insert a new draft.
    pub async fn create(pool: &PgPool, input: &CreatePost) -> Result<BlogPost, sqlx::Error> {
        let query = format!(
            "INSERT INTO blog_posts (author_id, title, slug, excerpt, content, tags,
                                     ai_generated, reading_time_minutes)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, BlogPost>(&query)
            .bind(input.author_id)
            .bind(&input.title)
            .bind(&input.slug)
            .bind(&input.excerpt)
            .bind(&input.content)
            .bind(&input.tags)
            .bind(input.ai_generated)
            .bind(input.reading_time_minutes)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<BlogPost>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM blog_posts WHERE id = $1");
        sqlx::query_as::<_, BlogPost>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Fetch a published post by slug and count the view.
    pub async fn view_published_by_slug(
        pool: &PgPool,
        slug: &str,
    ) -> Result<Option<BlogPost>, sqlx::Error> {
        let query = format!(
            "UPDATE blog_posts SET view_count = view_count + 1
             WHERE slug = $1 AND status = 'published'
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, BlogPost>(&query)
            .bind(slug)
            .fetch_optional(pool)
            .await
    }

    /// Published posts, newest first, optionally filtered by tag.
    pub async fn list_published(
        pool: &PgPool,
        tag: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<BlogPost>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM blog_posts
             WHERE status = 'published' AND ($1::TEXT IS NULL OR $1 = ANY(tags))
             ORDER BY published_at DESC
             LIMIT $2 OFFSET $3"
        );
        sqlx::query_as::<_, BlogPost>(&query)
            .bind(tag)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    pub async fn count_published(pool: &PgPool, tag: Option<&str>) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT COUNT(*) FROM blog_posts
             WHERE status = 'published' AND ($1::TEXT IS NULL OR $1 = ANY(tags))",
        )
        .bind(tag)
        .fetch_one(pool)
        .await
    }

    /// All posts for the admin view, most recently edited first.
    pub async fn list_all(
        pool: &PgPool,
        status: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<BlogPost>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM blog_posts
             WHERE ($1::TEXT IS NULL OR status = $1)
             ORDER BY updated_at DESC
             LIMIT $2 OFFSET $3"
        );
        sqlx::query_as::<_, BlogPost>(&query)
            .bind(status)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    pub async fn count_all(pool: &PgPool, status: Option<&str>) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM blog_posts WHERE ($1::TEXT IS NULL OR status = $1)")
            .bind(status)
            .fetch_one(pool)
            .await
    }

    /// Existing slugs equal to `base` or of the form `base-N`.
    pub async fn slugs_with_prefix(pool: &PgPool, base: &str) -> Result<Vec<String>, sqlx::Error> {
        sqlx::query_scalar("SELECT slug FROM blog_posts WHERE slug = $1 OR slug LIKE $1 || '-%'")
            .bind(base)
            .fetch_all(pool)
            .await
    }

    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdatePost,
    ) -> Result<Option<BlogPost>, sqlx::Error> {
        let query = format!(
            "UPDATE blog_posts SET
                title = COALESCE($2, title),
                slug = COALESCE($3, slug),
                excerpt = COALESCE($4, excerpt),
                content = COALESCE($5, content),
                tags = COALESCE($6, tags),
                status = COALESCE($7, status),
                reading_time_minutes = COALESCE($8, reading_time_minutes),
                published_at = CASE
                    WHEN $7 = 'published' THEN COALESCE(published_at, NOW())
                    ELSE published_at END
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, BlogPost>(&query)
            .bind(id)
            .bind(&input.title)
            .bind(&input.slug)
            .bind(&input.excerpt)
            .bind(&input.content)
            .bind(&input.tags)
            .bind(&input.status)
            .bind(input.reading_time_minutes)
            .fetch_optional(pool)
            .await
    }

    /// Publish a post. The first publication time is kept on re-publish.
    pub async fn publish(pool: &PgPool, id: DbId) -> Result<Option<BlogPost>, sqlx::Error> {
        let query = format!(
            "UPDATE blog_posts SET
                status = 'published',
                published_at = COALESCE(published_at, NOW())
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, BlogPost>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM blog_posts WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
