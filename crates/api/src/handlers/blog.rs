//! Handlers for the public blog and its admin surface, including
//! AI-drafted posts.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use propdesk_core::blog::{
    auto_excerpt, build_draft_prompt, normalize_tags, parse_ai_draft, reading_time_minutes,
    slugify, unique_slug, validate_post_status, EXCERPT_MAX_CHARS,
};
use propdesk_core::error::CoreError;
use propdesk_core::types::DbId;
use propdesk_db::models::blog_post::{
    BlogPost, CreatePost, CreatePostRequest, GeneratePostRequest, UpdatePost, UpdatePostRequest,
};
use propdesk_db::repositories::BlogPostRepo;
use serde::Deserialize;

use super::non_blank;
use crate::error::{AppError, AppResult};
use crate::middleware::rbac::RequireAdmin;
use crate::query::PaginationParams;
use crate::response::{DataResponse, PaginatedResponse};
use crate::state::AppState;

const DRAFT_SYSTEM_PROMPT: &str = "You are a content writer for a property management \
     software company. You write accurate, practical articles for landlords and property \
     managers.";

#[derive(Debug, Deserialize)]
pub struct PublicPostQuery {
    pub tag: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct AdminPostQuery {
    pub status: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

async fn find(state: &AppState, id: DbId) -> AppResult<BlogPost> {
    Ok(BlogPostRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(CoreError::NotFound {
            entity: "Blog post",
            id,
        })?)
}

/// Slug derived from `requested` (or the title), made unique. `current` is
/// the post's own slug on update, which does not count as taken.
async fn available_slug(
    state: &AppState,
    requested: Option<&str>,
    title: &str,
    current: Option<&str>,
) -> AppResult<String> {
    let base = slugify(requested.unwrap_or(title));
    let taken: Vec<String> = BlogPostRepo::slugs_with_prefix(&state.pool, &base)
        .await?
        .into_iter()
        .filter(|s| Some(s.as_str()) != current)
        .collect();
    Ok(unique_slug(&base, &taken))
}

fn required(field: &str, value: &str) -> Result<(), CoreError> {
    if value.trim().is_empty() {
        Err(CoreError::Validation(format!("{field} is required")))
    } else {
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Public
// ---------------------------------------------------------------------------

/// GET /api/blog/posts
pub async fn list_published(
    State(state): State<AppState>,
    Query(params): Query<PublicPostQuery>,
) -> AppResult<Json<PaginatedResponse<BlogPost>>> {
    let (limit, offset) = PaginationParams {
        limit: params.limit,
        offset: params.offset,
    }
    .window();
    let tag = non_blank(params.tag).map(|t| t.to_lowercase());

    let (data, total) = tokio::try_join!(
        BlogPostRepo::list_published(&state.pool, tag.as_deref(), limit, offset),
        BlogPostRepo::count_published(&state.pool, tag.as_deref()),
    )?;
    Ok(Json(PaginatedResponse {
        data,
        total,
        limit,
        offset,
    }))
}

/// GET /api/blog/posts/{slug}
///
/// Each successful fetch counts as a view.
pub async fn get_published(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> AppResult<Json<DataResponse<BlogPost>>> {
    let post = BlogPostRepo::view_published_by_slug(&state.pool, &slug)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Blog post '{slug}' not found")))?;
    Ok(Json(DataResponse { data: post }))
}

// ---------------------------------------------------------------------------
// Admin
// ---------------------------------------------------------------------------

/// GET /api/blog/admin/posts
pub async fn list_all(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Query(params): Query<AdminPostQuery>,
) -> AppResult<Json<PaginatedResponse<BlogPost>>> {
    let (limit, offset) = PaginationParams {
        limit: params.limit,
        offset: params.offset,
    }
    .window();
    let status = non_blank(params.status);
    if let Some(status) = status.as_deref() {
        validate_post_status(status)?;
    }

    let (data, total) = tokio::try_join!(
        BlogPostRepo::list_all(&state.pool, status.as_deref(), limit, offset),
        BlogPostRepo::count_all(&state.pool, status.as_deref()),
    )?;
    Ok(Json(PaginatedResponse {
        data,
        total,
        limit,
        offset,
    }))
}

/// POST /api/blog/admin/posts
///
/// Creates a draft. Slug, excerpt and reading time are derived when not
/// supplied.
pub async fn create_post(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Json(input): Json<CreatePostRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<BlogPost>>)> {
    required("title", &input.title)?;
    required("content", &input.content)?;

    let title = input.title.trim().to_string();
    let slug = available_slug(&state, input.slug.as_deref(), &title, None).await?;
    let excerpt =
        non_blank(input.excerpt).or_else(|| Some(auto_excerpt(&input.content, EXCERPT_MAX_CHARS)));

    let post = BlogPostRepo::create(
        &state.pool,
        &CreatePost {
            author_id: Some(admin.user_id),
            title,
            slug,
            excerpt,
            reading_time_minutes: reading_time_minutes(&input.content),
            content: input.content,
            tags: normalize_tags(&input.tags),
            ai_generated: false,
        },
    )
    .await?;

    tracing::info!(post_id = post.id, slug = %post.slug, "Blog post created");
    Ok((StatusCode::CREATED, Json(DataResponse { data: post })))
}

/// GET /api/blog/admin/posts/{id}
pub async fn get_post(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<BlogPost>>> {
    let post = find(&state, id).await?;
    Ok(Json(DataResponse { data: post }))
}

/// PUT /api/blog/admin/posts/{id}
pub async fn update_post(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<DbId>,
    Json(input): Json<UpdatePostRequest>,
) -> AppResult<Json<DataResponse<BlogPost>>> {
    let current = find(&state, id).await?;

    if let Some(title) = &input.title {
        required("title", title)?;
    }
    if let Some(content) = &input.content {
        required("content", content)?;
    }
    if let Some(status) = &input.status {
        validate_post_status(status)?;
    }
    let slug = match non_blank(input.slug) {
        Some(requested) => Some(
            available_slug(&state, Some(&requested), &current.title, Some(&current.slug)).await?,
        ),
        None => None,
    };
    let publishing = input.status.as_deref() == Some("published");

    let update = UpdatePost {
        title: input.title.map(|t| t.trim().to_string()),
        slug,
        excerpt: input.excerpt,
        reading_time_minutes: input.content.as_deref().map(reading_time_minutes),
        content: input.content,
        tags: input.tags.as_deref().map(normalize_tags),
        status: input.status,
    };
    let mut post = BlogPostRepo::update(&state.pool, id, &update)
        .await?
        .ok_or(CoreError::NotFound {
            entity: "Blog post",
            id,
        })?;
    if publishing && post.published_at.is_none() {
        // Stamp the first publication date.
        if let Some(published) = BlogPostRepo::publish(&state.pool, id).await? {
            post = published;
        }
    }

    tracing::info!(post_id = id, "Blog post updated");
    Ok(Json(DataResponse { data: post }))
}

/// DELETE /api/blog/admin/posts/{id}
pub async fn delete_post(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    if !BlogPostRepo::delete(&state.pool, id).await? {
        return Err(CoreError::NotFound {
            entity: "Blog post",
            id,
        }
        .into());
    }
    tracing::info!(post_id = id, "Blog post deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/blog/admin/posts/{id}/publish
pub async fn publish_post(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<BlogPost>>> {
    let post = BlogPostRepo::publish(&state.pool, id)
        .await?
        .ok_or(CoreError::NotFound {
            entity: "Blog post",
            id,
        })?;
    tracing::info!(post_id = id, slug = %post.slug, "Blog post published");
    Ok(Json(DataResponse { data: post }))
}

/// POST /api/blog/admin/generate
///
/// Asks the AI model for a draft and saves it unpublished. 503 when no API
/// key is configured or the model is unreachable.
pub async fn generate_post(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Json(input): Json<GeneratePostRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<BlogPost>>)> {
    let client = state
        .ai
        .clone()
        .ok_or_else(|| AppError::ServiceUnavailable("AI content generation is not configured".into()))?;
    required("topic", &input.topic)?;

    let prompt = build_draft_prompt(&input.topic, &input.keywords, input.tone.as_deref());
    let reply = client
        .complete(Some(DRAFT_SYSTEM_PROMPT), &prompt)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, model = client.model(), "AI draft request failed");
            AppError::ServiceUnavailable("AI service is unavailable, try again later".into())
        })?;
    let draft = parse_ai_draft(&reply).map_err(|e| {
        tracing::warn!(error = %e, "AI reply could not be parsed as a draft");
        AppError::ServiceUnavailable("AI service returned an unusable draft".into())
    })?;

    let slug = available_slug(&state, None, &draft.title, None).await?;
    let excerpt = non_blank(draft.excerpt)
        .or_else(|| Some(auto_excerpt(&draft.content, EXCERPT_MAX_CHARS)));
    let post = BlogPostRepo::create(
        &state.pool,
        &CreatePost {
            author_id: Some(admin.user_id),
            title: draft.title,
            slug,
            excerpt,
            reading_time_minutes: reading_time_minutes(&draft.content),
            content: draft.content,
            tags: draft.tags,
            ai_generated: true,
        },
    )
    .await?;

    tracing::info!(post_id = post.id, model = client.model(), "AI draft saved");
    Ok((StatusCode::CREATED, Json(DataResponse { data: post })))
}
