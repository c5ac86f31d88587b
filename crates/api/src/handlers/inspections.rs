//! Handlers for `/inspections`.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use propdesk_core::error::CoreError;
use propdesk_core::types::{DbId, Timestamp};
use propdesk_core::workflow::{validate_code, InspectionStatus, Lifecycle, INSPECTION_TYPES};
use propdesk_db::models::inspection::{
    CompleteInspection, CreateInspection, Inspection, InspectionFilter, UpdateInspection,
};
use propdesk_db::repositories::{InspectionRepo, UnitRepo};
use propdesk_events::types::{ENTITY_INSPECTION, INSPECTION_SCHEDULED};
use propdesk_events::PlatformEvent;
use serde::Deserialize;
use serde_json::json;

use super::{editable_property, non_blank, stale_status, visible_property};
use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::query::PaginationParams;
use crate::response::{DataResponse, PaginatedResponse};
use crate::state::AppState;

const DEFAULT_INSPECTION_TYPE: &str = "ROUTINE";

#[derive(Debug, Deserialize)]
pub struct InspectionListQuery {
    pub property_id: Option<DbId>,
    pub status: Option<String>,
    pub from: Option<Timestamp>,
    pub to: Option<Timestamp>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

async fn find(state: &AppState, id: DbId) -> AppResult<Inspection> {
    Ok(InspectionRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(CoreError::NotFound {
            entity: "Inspection",
            id,
        })?)
}

/// Check `unit_id`, when given, belongs to `property_id`.
pub(crate) async fn ensure_unit_in_property(
    state: &AppState,
    unit_id: Option<DbId>,
    property_id: DbId,
) -> AppResult<()> {
    let Some(unit_id) = unit_id else {
        return Ok(());
    };
    match UnitRepo::find_by_id(&state.pool, unit_id).await? {
        Some(unit) if unit.property_id == property_id => Ok(()),
        _ => Err(CoreError::Validation(format!(
            "Unit {unit_id} does not belong to property {property_id}"
        ))
        .into()),
    }
}

/// GET /api/inspections
pub async fn list_inspections(
    State(state): State<AppState>,
    user: AuthUser,
    Query(params): Query<InspectionListQuery>,
) -> AppResult<Json<PaginatedResponse<Inspection>>> {
    let (limit, offset) = PaginationParams {
        limit: params.limit,
        offset: params.offset,
    }
    .window();
    if let Some(status) = params.status.as_deref() {
        InspectionStatus::parse(status)?;
    }
    let filter = InspectionFilter {
        property_id: params.property_id,
        status: non_blank(params.status),
        from: params.from,
        to: params.to,
    };
    let scope = user.scope();

    let (data, total) = tokio::try_join!(
        InspectionRepo::list(&state.pool, &scope, &filter, limit, offset),
        InspectionRepo::count(&state.pool, &scope, &filter),
    )?;
    Ok(Json(PaginatedResponse {
        data,
        total,
        limit,
        offset,
    }))
}

/// POST /api/inspections
pub async fn create_inspection(
    State(state): State<AppState>,
    user: AuthUser,
    Json(input): Json<CreateInspection>,
) -> AppResult<(StatusCode, Json<DataResponse<Inspection>>)> {
    editable_property(&state, &user, input.property_id).await?;
    ensure_unit_in_property(&state, input.unit_id, input.property_id).await?;

    let inspection_type = input
        .inspection_type
        .clone()
        .unwrap_or_else(|| DEFAULT_INSPECTION_TYPE.to_string());
    validate_code("inspection type", &inspection_type, INSPECTION_TYPES)?;

    let inspection = InspectionRepo::create(&state.pool, &input, &inspection_type).await?;

    state.event_bus.publish(
        PlatformEvent::new(INSPECTION_SCHEDULED)
            .with_source(ENTITY_INSPECTION, inspection.id)
            .with_actor(user.user_id)
            .with_payload(json!({
                "title": format!(
                    "{} inspection on {}",
                    inspection.inspection_type,
                    inspection.scheduled_date.format("%Y-%m-%d")
                ),
                "property_id": inspection.property_id,
            })),
    );
    tracing::info!(
        inspection_id = inspection.id,
        property_id = inspection.property_id,
        "Inspection scheduled"
    );
    Ok((StatusCode::CREATED, Json(DataResponse { data: inspection })))
}

/// GET /api/inspections/{id}
pub async fn get_inspection(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Inspection>>> {
    let inspection = find(&state, id).await?;
    if inspection.inspector_id != Some(user.user_id) {
        visible_property(&state, &user, inspection.property_id).await?;
    }
    Ok(Json(DataResponse { data: inspection }))
}

/// PUT /api/inspections/{id}
///
/// Only scheduled inspections can be edited.
pub async fn update_inspection(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateInspection>,
) -> AppResult<Json<DataResponse<Inspection>>> {
    let current = find(&state, id).await?;
    editable_property(&state, &user, current.property_id).await?;
    if let Some(kind) = &input.inspection_type {
        validate_code("inspection type", kind, INSPECTION_TYPES)?;
    }

    let inspection = InspectionRepo::update(&state.pool, id, &input)
        .await?
        .ok_or_else(|| {
            CoreError::Conflict(format!(
                "Inspection is {} and can no longer be edited",
                current.status
            ))
        })?;
    tracing::info!(inspection_id = id, "Inspection updated");
    Ok(Json(DataResponse { data: inspection }))
}

/// DELETE /api/inspections/{id}
pub async fn delete_inspection(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    let current = find(&state, id).await?;
    editable_property(&state, &user, current.property_id).await?;
    if !InspectionRepo::delete(&state.pool, id).await? {
        return Err(CoreError::NotFound {
            entity: "Inspection",
            id,
        }
        .into());
    }
    tracing::info!(inspection_id = id, "Inspection deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/inspections/{id}/start
pub async fn start_inspection(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Inspection>>> {
    let inspection =
        change_status(&state, &user, id, InspectionStatus::InProgress, None).await?;
    Ok(Json(DataResponse { data: inspection }))
}

/// POST /api/inspections/{id}/complete
pub async fn complete_inspection(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<DbId>,
    body: Option<Json<CompleteInspection>>,
) -> AppResult<Json<DataResponse<Inspection>>> {
    let input = body.map(|Json(b)| b).unwrap_or_default();
    let inspection =
        change_status(&state, &user, id, InspectionStatus::Completed, Some(&input)).await?;
    Ok(Json(DataResponse { data: inspection }))
}

/// POST /api/inspections/{id}/cancel
pub async fn cancel_inspection(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Inspection>>> {
    let inspection =
        change_status(&state, &user, id, InspectionStatus::Cancelled, None).await?;
    Ok(Json(DataResponse { data: inspection }))
}

/// Apply one lifecycle step. The assigned inspector may start and complete
/// an inspection; everything else needs edit rights on the property.
async fn change_status(
    state: &AppState,
    user: &AuthUser,
    id: DbId,
    to: InspectionStatus,
    details: Option<&CompleteInspection>,
) -> AppResult<Inspection> {
    let current = find(state, id).await?;
    let is_inspector = current.inspector_id == Some(user.user_id);
    if !(is_inspector && to != InspectionStatus::Cancelled) {
        editable_property(state, user, current.property_id).await?;
    }

    let from = InspectionStatus::parse(&current.status)?;
    from.transition(to)?;

    let findings = details.and_then(|d| d.findings.as_deref());
    let notes = details.and_then(|d| d.notes.as_deref());
    let updated = InspectionRepo::transition(&state.pool, id, from, to, findings, notes)
        .await?
        .ok_or_else(|| stale_status("Inspection"))?;

    tracing::info!(
        inspection_id = id,
        from = %from,
        to = %to,
        user_id = user.user_id,
        "Inspection status changed"
    );
    Ok(updated)
}
