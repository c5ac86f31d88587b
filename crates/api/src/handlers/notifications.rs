//! Handlers for the caller's `/notifications`.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use propdesk_core::error::CoreError;
use propdesk_core::types::DbId;
use propdesk_db::models::notification::Notification;
use propdesk_db::repositories::NotificationRepo;
use serde::{Deserialize, Serialize};

use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::query::PaginationParams;
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct NotificationListQuery {
    #[serde(default)]
    pub unread_only: bool,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct UnreadCount {
    pub unread: i64,
}

#[derive(Debug, Serialize)]
pub struct MarkedRead {
    pub updated: u64,
}

/// GET /api/notifications
pub async fn list_notifications(
    State(state): State<AppState>,
    user: AuthUser,
    Query(params): Query<NotificationListQuery>,
) -> AppResult<Json<DataResponse<Vec<Notification>>>> {
    let (limit, offset) = PaginationParams {
        limit: params.limit,
        offset: params.offset,
    }
    .window();
    let notifications = NotificationRepo::list_for_user(
        &state.pool,
        user.user_id,
        params.unread_only,
        limit,
        offset,
    )
    .await?;
    Ok(Json(DataResponse {
        data: notifications,
    }))
}

/// GET /api/notifications/unread-count
pub async fn unread_count(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<DataResponse<UnreadCount>>> {
    let unread = NotificationRepo::unread_count(&state.pool, user.user_id).await?;
    Ok(Json(DataResponse {
        data: UnreadCount { unread },
    }))
}

/// POST /api/notifications/{id}/read
///
/// 404 when the notification is not the caller's or is already read.
pub async fn mark_read(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    if !NotificationRepo::mark_read(&state.pool, id, user.user_id).await? {
        return Err(CoreError::NotFound {
            entity: "Unread notification",
            id,
        }
        .into());
    }
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/notifications/read-all
pub async fn mark_all_read(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<DataResponse<MarkedRead>>> {
    let updated = NotificationRepo::mark_all_read(&state.pool, user.user_id).await?;
    tracing::debug!(user_id = user.user_id, updated, "Notifications marked read");
    Ok(Json(DataResponse {
        data: MarkedRead { updated },
    }))
}
