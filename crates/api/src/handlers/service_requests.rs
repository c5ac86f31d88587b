//! Handlers for `/service-requests`: tenant submissions, manager review and
//! conversion into maintenance jobs.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use propdesk_core::access::{can_submit_service_request, can_view_property, ensure};
use propdesk_core::error::CoreError;
use propdesk_core::roles::Role;
use propdesk_core::types::DbId;
use propdesk_core::workflow::{
    validate_code, Lifecycle, Priority, ServiceRequestStatus, SERVICE_CATEGORIES,
};
use propdesk_db::models::job::Job;
use propdesk_db::models::service_request::{
    ConvertToJob, CreateServiceRequest, ReviewServiceRequest, ServiceRequest,
    ServiceRequestFilter,
};
use propdesk_db::repositories::{PropertyRepo, ServiceRequestRepo};
use propdesk_events::types::{
    ENTITY_SERVICE_REQUEST, SERVICE_REQUEST_REVIEWED, SERVICE_REQUEST_SUBMITTED,
};
use propdesk_events::PlatformEvent;
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::inspections::ensure_unit_in_property;
use super::jobs::{ensure_technician, publish_assigned, validate_cost, DEFAULT_PRIORITY};
use super::{editable_property, non_blank, stale_status, visible_property};
use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::query::PaginationParams;
use crate::response::{DataResponse, PaginatedResponse};
use crate::state::AppState;

const DEFAULT_CATEGORY: &str = "OTHER";

#[derive(Debug, Deserialize)]
pub struct ServiceRequestListQuery {
    pub property_id: Option<DbId>,
    pub status: Option<String>,
    pub category: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Result of converting a request: the updated request and its new job.
#[derive(Debug, Serialize)]
pub struct Conversion {
    pub service_request: ServiceRequest,
    pub job: Job,
}

async fn find(state: &AppState, id: DbId) -> AppResult<ServiceRequest> {
    Ok(ServiceRequestRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(CoreError::NotFound {
            entity: "Service request",
            id,
        })?)
}

/// GET /api/service-requests
///
/// Tenants see their own requests; other roles see requests on properties
/// in their scope.
pub async fn list_service_requests(
    State(state): State<AppState>,
    user: AuthUser,
    Query(params): Query<ServiceRequestListQuery>,
) -> AppResult<Json<PaginatedResponse<ServiceRequest>>> {
    let (limit, offset) = PaginationParams {
        limit: params.limit,
        offset: params.offset,
    }
    .window();
    if let Some(status) = params.status.as_deref() {
        ServiceRequestStatus::parse(status)?;
    }
    let filter = ServiceRequestFilter {
        property_id: params.property_id,
        status: non_blank(params.status),
        category: non_blank(params.category),
    };
    let scope = user.scope();

    let (data, total) = tokio::try_join!(
        ServiceRequestRepo::list(&state.pool, &scope, &filter, limit, offset),
        ServiceRequestRepo::count(&state.pool, &scope, &filter),
    )?;
    Ok(Json(PaginatedResponse {
        data,
        total,
        limit,
        offset,
    }))
}

/// POST /api/service-requests
pub async fn create_service_request(
    State(state): State<AppState>,
    user: AuthUser,
    Json(input): Json<CreateServiceRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<ServiceRequest>>)> {
    let not_found = || CoreError::NotFound {
        entity: "Property",
        id: input.property_id,
    };
    let relation = PropertyRepo::relation(&state.pool, input.property_id, user.user_id)
        .await?
        .ok_or_else(not_found)?;
    if !can_view_property(user.role, &relation) {
        return Err(not_found().into());
    }
    ensure(
        can_submit_service_request(user.role, &relation),
        "submit service requests for this property",
    )?;
    ensure_unit_in_property(&state, input.unit_id, input.property_id).await?;

    if input.title.trim().is_empty() {
        return Err(CoreError::Validation("title is required".into()).into());
    }
    if input.description.trim().is_empty() {
        return Err(CoreError::Validation("description is required".into()).into());
    }
    let category = input
        .category
        .clone()
        .unwrap_or_else(|| DEFAULT_CATEGORY.to_string());
    validate_code("category", &category, SERVICE_CATEGORIES)?;
    let priority = match input.priority.as_deref() {
        Some(p) => Priority::parse(p)?,
        None => DEFAULT_PRIORITY,
    };

    let request = ServiceRequestRepo::create(
        &state.pool,
        &input,
        &category,
        priority.as_str(),
        user.user_id,
    )
    .await?;

    state.event_bus.publish(
        PlatformEvent::new(SERVICE_REQUEST_SUBMITTED)
            .with_source(ENTITY_SERVICE_REQUEST, request.id)
            .with_actor(user.user_id)
            .with_payload(json!({ "title": request.title, "category": request.category })),
    );
    tracing::info!(
        service_request_id = request.id,
        property_id = request.property_id,
        "Service request submitted"
    );
    Ok((StatusCode::CREATED, Json(DataResponse { data: request })))
}

/// GET /api/service-requests/{id}
pub async fn get_service_request(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<ServiceRequest>>> {
    let request = find(&state, id).await?;
    if request.requested_by != user.user_id {
        if user.role == Role::Tenant {
            return Err(CoreError::NotFound {
                entity: "Service request",
                id,
            }
            .into());
        }
        visible_property(&state, &user, request.property_id).await?;
    }
    Ok(Json(DataResponse { data: request }))
}

/// POST /api/service-requests/{id}/review
///
/// Moves the request to `UNDER_REVIEW`, `APPROVED` or `REJECTED`.
pub async fn review_service_request(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<DbId>,
    Json(input): Json<ReviewServiceRequest>,
) -> AppResult<Json<DataResponse<ServiceRequest>>> {
    let current = find(&state, id).await?;
    editable_property(&state, &user, current.property_id).await?;

    let to = ServiceRequestStatus::parse(&input.status)?;
    if !matches!(
        to,
        ServiceRequestStatus::UnderReview
            | ServiceRequestStatus::Approved
            | ServiceRequestStatus::Rejected
    ) {
        return Err(CoreError::Validation(
            "Review status must be UNDER_REVIEW, APPROVED or REJECTED".into(),
        )
        .into());
    }
    let from = ServiceRequestStatus::parse(&current.status)?;
    from.transition(to)?;

    let notes = non_blank(input.review_notes);
    let request = ServiceRequestRepo::transition(
        &state.pool,
        id,
        from,
        to,
        Some(user.user_id),
        notes.as_deref(),
    )
    .await?
    .ok_or_else(|| stale_status("Service request"))?;

    state.event_bus.publish(
        PlatformEvent::new(SERVICE_REQUEST_REVIEWED)
            .with_source(ENTITY_SERVICE_REQUEST, request.id)
            .with_actor(user.user_id)
            .with_payload(json!({ "title": request.title, "status": request.status })),
    );
    tracing::info!(service_request_id = id, from = %from, to = %to, "Service request reviewed");
    Ok(Json(DataResponse { data: request }))
}

/// POST /api/service-requests/{id}/convert
///
/// Creates a job from an approved request. Title and priority default to
/// the request's own.
pub async fn convert_service_request(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<DbId>,
    body: Option<Json<ConvertToJob>>,
) -> AppResult<(StatusCode, Json<DataResponse<Conversion>>)> {
    let input = body.map(|Json(b)| b).unwrap_or_default();
    let current = find(&state, id).await?;
    editable_property(&state, &user, current.property_id).await?;

    let from = ServiceRequestStatus::parse(&current.status)?;
    from.transition(ServiceRequestStatus::ConvertedToJob)?;

    if matches!(&input.title, Some(t) if t.trim().is_empty()) {
        return Err(CoreError::Validation("title must not be empty".into()).into());
    }
    let priority = Priority::parse(input.priority.as_deref().unwrap_or(&current.priority))?;
    validate_cost("estimated_cost_cents", input.estimated_cost_cents)?;
    if let Some(technician_id) = input.assigned_to {
        ensure_technician(&state, technician_id).await?;
    }

    let (service_request, job) = ServiceRequestRepo::convert_to_job(
        &state.pool,
        &current,
        &input,
        priority.as_str(),
        user.user_id,
    )
    .await?
    .ok_or_else(|| stale_status("Service request"))?;

    if job.assigned_to.is_some() {
        publish_assigned(&state, &job, user.user_id);
    }
    tracing::info!(service_request_id = id, job_id = job.id, "Service request converted to job");
    Ok((
        StatusCode::CREATED,
        Json(DataResponse {
            data: Conversion {
                service_request,
                job,
            },
        }),
    ))
}

/// POST /api/service-requests/{id}/cancel
///
/// Only the requester may withdraw a request, and only before review.
pub async fn cancel_service_request(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<ServiceRequest>>> {
    let current = find(&state, id).await?;
    if current.requested_by != user.user_id {
        if user.role == Role::Tenant {
            return Err(CoreError::NotFound {
                entity: "Service request",
                id,
            }
            .into());
        }
        visible_property(&state, &user, current.property_id).await?;
        return Err(
            CoreError::Forbidden("Only the requester can cancel a service request".into()).into(),
        );
    }

    let from = ServiceRequestStatus::parse(&current.status)?;
    let to = from.transition(ServiceRequestStatus::Cancelled)?;
    let request = ServiceRequestRepo::transition(&state.pool, id, from, to, None, None)
        .await?
        .ok_or_else(|| stale_status("Service request"))?;

    tracing::info!(service_request_id = id, "Service request cancelled");
    Ok(Json(DataResponse { data: request }))
}
