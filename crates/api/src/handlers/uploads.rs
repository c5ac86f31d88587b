//! Handlers for `/v2/uploads`: validated file uploads stored in the cloud
//! with local-disk fallback.

use axum::extract::{Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use propdesk_core::error::CoreError;
use propdesk_core::roles::Role;
use propdesk_core::types::DbId;
use propdesk_core::uploads::{
    build_storage_key, sanitize_file_name, validate_entity_type, validate_upload, UploadRejection,
};
use propdesk_db::models::upload::{CreateUpload, Upload};
use propdesk_db::repositories::{
    BlogPostRepo, InspectionRepo, JobRepo, ServiceRequestRepo, UnitRepo, UploadRepo,
};
use propdesk_storage::StorageBackend;
use serde::Deserialize;
use uuid::Uuid;

use super::visible_property;
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::query::PaginationParams;
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct UploadListQuery {
    pub entity_type: Option<String>,
    pub entity_id: Option<DbId>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl From<UploadRejection> for AppError {
    fn from(rejection: UploadRejection) -> Self {
        match rejection {
            UploadRejection::Empty => AppError::BadRequest(rejection.to_string()),
            UploadRejection::TooLarge { .. } => AppError::PayloadTooLarge(rejection.to_string()),
            UploadRejection::UnsupportedType | UploadRejection::TypeMismatch { .. } => {
                AppError::UnsupportedMediaType(rejection.to_string())
            }
        }
    }
}

/// Check the caller may attach files to (and see files of) an entity.
///
/// Property-scoped entities follow property visibility; blog posts are
/// admin-only and user files belong to the user.
async fn authorize_entity(
    state: &AppState,
    user: &AuthUser,
    entity_type: &str,
    entity_id: DbId,
) -> AppResult<()> {
    let not_found = |entity: &'static str| CoreError::NotFound {
        entity,
        id: entity_id,
    };
    let property_id = match entity_type {
        "property" => entity_id,
        "unit" => {
            UnitRepo::find_by_id(&state.pool, entity_id)
                .await?
                .ok_or_else(|| not_found("Unit"))?
                .property_id
        }
        "inspection" => {
            InspectionRepo::find_by_id(&state.pool, entity_id)
                .await?
                .ok_or_else(|| not_found("Inspection"))?
                .property_id
        }
        "job" => {
            JobRepo::find_by_id(&state.pool, entity_id)
                .await?
                .ok_or_else(|| not_found("Job"))?
                .property_id
        }
        "service_request" => {
            ServiceRequestRepo::find_by_id(&state.pool, entity_id)
                .await?
                .ok_or_else(|| not_found("Service request"))?
                .property_id
        }
        "blog_post" => {
            if user.role != Role::Admin {
                return Err(CoreError::Forbidden("Admin role required".into()).into());
            }
            BlogPostRepo::find_by_id(&state.pool, entity_id)
                .await?
                .ok_or_else(|| not_found("Blog post"))?;
            return Ok(());
        }
        "user" => {
            if user.role != Role::Admin && user.user_id != entity_id {
                return Err(CoreError::Forbidden("Not allowed to attach files to this user".into()).into());
            }
            return Ok(());
        }
        other => {
            return Err(CoreError::Validation(format!("Invalid entity_type '{other}'")).into());
        }
    };
    visible_property(state, user, property_id).await?;
    Ok(())
}

/// POST /api/v2/uploads
///
/// Multipart form with `entity_type`, `entity_id` and one `file` field.
/// The declared content type must agree with the file's magic bytes.
pub async fn upload_file(
    State(state): State<AppState>,
    user: AuthUser,
    mut multipart: Multipart,
) -> AppResult<(StatusCode, Json<DataResponse<Upload>>)> {
    let mut entity_type: Option<String> = None;
    let mut entity_id: Option<DbId> = None;
    let mut file: Option<(String, Option<String>, Vec<u8>)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?
    {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "file" => {
                let file_name = field.file_name().unwrap_or("file").to_string();
                let declared = field.content_type().map(str::to_string);
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(e.to_string()))?;
                file = Some((file_name, declared, data.to_vec()));
            }
            "entity_type" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::BadRequest(e.to_string()))?;
                entity_type = Some(text.trim().to_string());
            }
            "entity_id" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::BadRequest(e.to_string()))?;
                let id = text
                    .trim()
                    .parse()
                    .map_err(|_| AppError::BadRequest(format!("Invalid entity_id '{text}'")))?;
                entity_id = Some(id);
            }
            _ => {}
        }
    }

    let entity_type =
        entity_type.ok_or_else(|| AppError::BadRequest("Missing required 'entity_type' field".into()))?;
    let entity_id =
        entity_id.ok_or_else(|| AppError::BadRequest("Missing required 'entity_id' field".into()))?;
    let (file_name, declared, bytes) =
        file.ok_or_else(|| AppError::BadRequest("Missing required 'file' field".into()))?;

    validate_entity_type(&entity_type)?;
    let content_type = validate_upload(
        &bytes,
        declared.as_deref(),
        state.config.storage.max_upload_bytes,
    )?;
    authorize_entity(&state, &user, &entity_type, entity_id).await?;

    let key = build_storage_key(&entity_type, entity_id, &file_name, Uuid::new_v4());
    let size_bytes = bytes.len() as i64;
    let stored = state.storage.put(&key, bytes, content_type).await?;

    let create = CreateUpload {
        owner_id: user.user_id,
        entity_type,
        entity_id,
        file_name: sanitize_file_name(&file_name),
        content_type: content_type.to_string(),
        size_bytes,
        storage_backend: stored.backend.as_str().to_string(),
        storage_key: stored.key.clone(),
        url: stored.url.clone(),
    };
    let upload = match UploadRepo::create(&state.pool, &create).await {
        Ok(upload) => upload,
        Err(e) => {
            // Do not leave an object behind that no row points to.
            if let Err(cleanup) = state.storage.delete(stored.backend, &stored.key).await {
                tracing::warn!(key = %stored.key, error = %cleanup, "Failed to remove orphaned object");
            }
            return Err(e.into());
        }
    };

    tracing::info!(
        upload_id = upload.id,
        backend = %upload.storage_backend,
        size_bytes,
        content_type,
        "File uploaded"
    );
    Ok((StatusCode::CREATED, Json(DataResponse { data: upload })))
}

/// GET /api/v2/uploads
///
/// With `entity_type` and `entity_id`, the files attached to that entity;
/// otherwise the caller's own uploads.
pub async fn list_uploads(
    State(state): State<AppState>,
    user: AuthUser,
    Query(params): Query<UploadListQuery>,
) -> AppResult<Json<DataResponse<Vec<Upload>>>> {
    let uploads = match (params.entity_type, params.entity_id) {
        (Some(entity_type), Some(entity_id)) => {
            validate_entity_type(&entity_type)?;
            authorize_entity(&state, &user, &entity_type, entity_id).await?;
            UploadRepo::list_for_entity(&state.pool, &entity_type, entity_id).await?
        }
        (None, None) => {
            let (limit, offset) = PaginationParams {
                limit: params.limit,
                offset: params.offset,
            }
            .window();
            UploadRepo::list_for_owner(&state.pool, user.user_id, limit, offset).await?
        }
        _ => {
            return Err(AppError::BadRequest(
                "entity_type and entity_id must be given together".into(),
            ))
        }
    };
    Ok(Json(DataResponse { data: uploads }))
}

/// DELETE /api/v2/uploads/{id}
///
/// The stored object goes first. If that fails the row stays, so a retry
/// can finish the job and no row ever points at a missing object.
pub async fn delete_upload(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    let upload = UploadRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(CoreError::NotFound { entity: "Upload", id })?;
    if upload.owner_id != user.user_id && !user.is_admin() {
        return Err(CoreError::NotFound { entity: "Upload", id }.into());
    }

    let backend = StorageBackend::parse(&upload.storage_backend).ok_or_else(|| {
        AppError::InternalError(format!(
            "Upload {id} has unknown storage backend '{}'",
            upload.storage_backend
        ))
    })?;
    if let Err(e) = state.storage.delete(backend, &upload.storage_key).await {
        tracing::error!(upload_id = id, key = %upload.storage_key, error = %e, "Storage delete failed, keeping upload row");
        return Err(e.into());
    }

    UploadRepo::delete(&state.pool, id).await?;
    tracing::info!(upload_id = id, backend = backend.as_str(), "Upload deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;

    #[test]
    fn rejections_map_to_http_errors() {
        assert!(matches!(
            AppError::from(UploadRejection::TooLarge { max_bytes: 1 }),
            AppError::PayloadTooLarge(_)
        ));
        assert!(matches!(
            AppError::from(UploadRejection::TypeMismatch {
                sniffed: "image/png"
            }),
            AppError::UnsupportedMediaType(_)
        ));
        assert!(matches!(
            AppError::from(UploadRejection::Empty),
            AppError::BadRequest(_)
        ));
    }
}
