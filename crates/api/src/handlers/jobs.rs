//! Handlers for maintenance `/jobs`.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use propdesk_core::access::{
    can_edit_property, can_update_job_progress, can_view_property, ensure,
};
use propdesk_core::error::CoreError;
use propdesk_core::roles::ROLE_TECHNICIAN;
use propdesk_core::types::DbId;
use propdesk_core::workflow::{JobStatus, Lifecycle, Priority};
use propdesk_db::models::job::{AssignJob, CreateJob, Job, JobFilter, JobStatusChange, UpdateJob};
use propdesk_db::repositories::{JobRepo, PropertyRepo, UserRepo};
use propdesk_events::types::{ENTITY_JOB, JOB_ASSIGNED, JOB_COMPLETED};
use propdesk_events::PlatformEvent;
use serde::Deserialize;
use serde_json::json;

use super::inspections::ensure_unit_in_property;
use super::{editable_property, non_blank, stale_status, visible_property};
use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::query::PaginationParams;
use crate::response::{DataResponse, PaginatedResponse};
use crate::state::AppState;

pub(crate) const DEFAULT_PRIORITY: Priority = Priority::Medium;

#[derive(Debug, Deserialize)]
pub struct JobListQuery {
    pub property_id: Option<DbId>,
    pub status: Option<String>,
    pub priority: Option<String>,
    pub assigned_to: Option<DbId>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

async fn find(state: &AppState, id: DbId) -> AppResult<Job> {
    Ok(JobRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(CoreError::NotFound { entity: "Job", id })?)
}

pub(crate) fn validate_cost(field: &str, cents: Option<i64>) -> Result<(), CoreError> {
    match cents {
        Some(c) if c < 0 => Err(CoreError::Validation(format!(
            "{field} must not be negative"
        ))),
        _ => Ok(()),
    }
}

pub(crate) async fn ensure_technician(state: &AppState, user_id: DbId) -> AppResult<()> {
    if UserRepo::has_role(&state.pool, user_id, ROLE_TECHNICIAN).await? {
        Ok(())
    } else {
        Err(CoreError::Validation(format!("User {user_id} is not an active technician")).into())
    }
}

pub(crate) fn publish_assigned(state: &AppState, job: &Job, actor: DbId) {
    state.event_bus.publish(
        PlatformEvent::new(JOB_ASSIGNED)
            .with_source(ENTITY_JOB, job.id)
            .with_actor(actor)
            .with_payload(json!({ "title": job.title, "property_id": job.property_id })),
    );
}

/// GET /api/jobs
pub async fn list_jobs(
    State(state): State<AppState>,
    user: AuthUser,
    Query(params): Query<JobListQuery>,
) -> AppResult<Json<PaginatedResponse<Job>>> {
    let (limit, offset) = PaginationParams {
        limit: params.limit,
        offset: params.offset,
    }
    .window();
    if let Some(status) = params.status.as_deref() {
        JobStatus::parse(status)?;
    }
    if let Some(priority) = params.priority.as_deref() {
        Priority::parse(priority)?;
    }
    let filter = JobFilter {
        property_id: params.property_id,
        status: non_blank(params.status),
        priority: non_blank(params.priority),
        assigned_to: params.assigned_to,
    };
    let scope = user.scope();

    let (data, total) = tokio::try_join!(
        JobRepo::list(&state.pool, &scope, &filter, limit, offset),
        JobRepo::count(&state.pool, &scope, &filter),
    )?;
    Ok(Json(PaginatedResponse {
        data,
        total,
        limit,
        offset,
    }))
}

/// POST /api/jobs
pub async fn create_job(
    State(state): State<AppState>,
    user: AuthUser,
    Json(input): Json<CreateJob>,
) -> AppResult<(StatusCode, Json<DataResponse<Job>>)> {
    editable_property(&state, &user, input.property_id).await?;
    ensure_unit_in_property(&state, input.unit_id, input.property_id).await?;

    if input.title.trim().is_empty() {
        return Err(CoreError::Validation("title is required".into()).into());
    }
    let priority = match input.priority.as_deref() {
        Some(p) => Priority::parse(p)?,
        None => DEFAULT_PRIORITY,
    };
    validate_cost("estimated_cost_cents", input.estimated_cost_cents)?;

    let job = JobRepo::create(&state.pool, &input, priority.as_str(), user.user_id).await?;
    tracing::info!(job_id = job.id, property_id = job.property_id, "Job created");
    Ok((StatusCode::CREATED, Json(DataResponse { data: job })))
}

/// GET /api/jobs/{id}
pub async fn get_job(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Job>>> {
    let job = find(&state, id).await?;
    if job.assigned_to != Some(user.user_id) {
        visible_property(&state, &user, job.property_id).await?;
    }
    Ok(Json(DataResponse { data: job }))
}

/// PUT /api/jobs/{id}
pub async fn update_job(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateJob>,
) -> AppResult<Json<DataResponse<Job>>> {
    let current = find(&state, id).await?;
    editable_property(&state, &user, current.property_id).await?;

    if matches!(&input.title, Some(t) if t.trim().is_empty()) {
        return Err(CoreError::Validation("title must not be empty".into()).into());
    }
    if let Some(priority) = input.priority.as_deref() {
        Priority::parse(priority)?;
    }
    validate_cost("estimated_cost_cents", input.estimated_cost_cents)?;
    validate_cost("actual_cost_cents", input.actual_cost_cents)?;

    let job = JobRepo::update(&state.pool, id, &input)
        .await?
        .ok_or(CoreError::NotFound { entity: "Job", id })?;
    tracing::info!(job_id = id, "Job updated");
    Ok(Json(DataResponse { data: job }))
}

/// DELETE /api/jobs/{id}
///
/// Archives the job.
pub async fn delete_job(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    let current = find(&state, id).await?;
    editable_property(&state, &user, current.property_id).await?;
    if !JobRepo::archive(&state.pool, id).await? {
        return Err(CoreError::NotFound { entity: "Job", id }.into());
    }
    tracing::info!(job_id = id, "Job archived");
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/jobs/{id}/assign
///
/// `{"technician_id": n}` assigns or reassigns; `null` returns the job to
/// `OPEN`.
pub async fn assign_job(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<DbId>,
    Json(input): Json<AssignJob>,
) -> AppResult<Json<DataResponse<Job>>> {
    let current = find(&state, id).await?;
    editable_property(&state, &user, current.property_id).await?;
    let from = JobStatus::parse(&current.status)?;

    let to = match input.technician_id {
        Some(technician_id) => {
            ensure_technician(&state, technician_id).await?;
            // Reassigning keeps the status.
            if from == JobStatus::Assigned {
                from
            } else {
                from.transition(JobStatus::Assigned)?
            }
        }
        None => from.transition(JobStatus::Open)?,
    };

    let job = JobRepo::assign(&state.pool, id, input.technician_id, from, to)
        .await?
        .ok_or_else(|| stale_status("Job"))?;

    if job.assigned_to.is_some() {
        publish_assigned(&state, &job, user.user_id);
    }
    tracing::info!(job_id = id, technician_id = ?input.technician_id, "Job assignment changed");
    Ok(Json(DataResponse { data: job }))
}

/// POST /api/jobs/{id}/status
///
/// Progress (`IN_PROGRESS`, `COMPLETED`) may come from the assigned
/// technician; cancelling needs edit rights. Assignment states go through
/// `/assign`.
pub async fn change_job_status(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<DbId>,
    Json(input): Json<JobStatusChange>,
) -> AppResult<Json<DataResponse<Job>>> {
    let current = find(&state, id).await?;
    let to = JobStatus::parse(&input.status)?;
    if matches!(to, JobStatus::Open | JobStatus::Assigned) {
        return Err(CoreError::Validation(
            "Use the assign endpoint to assign or unassign a job".into(),
        )
        .into());
    }
    validate_cost("actual_cost_cents", input.actual_cost_cents)?;

    let relation = PropertyRepo::relation(&state.pool, current.property_id, user.user_id)
        .await?
        .ok_or(CoreError::NotFound { entity: "Job", id })?;
    let is_assignee = current.assigned_to == Some(user.user_id);
    if !is_assignee && !can_view_property(user.role, &relation) {
        return Err(CoreError::NotFound { entity: "Job", id }.into());
    }
    let allowed = if to == JobStatus::Cancelled {
        can_edit_property(user.role, &relation)
    } else {
        can_update_job_progress(user.role, &relation, is_assignee)
    };
    ensure(allowed, "change the status of this job")?;

    let from = JobStatus::parse(&current.status)?;
    from.transition(to)?;

    let job = JobRepo::transition(&state.pool, id, from, to, input.actual_cost_cents)
        .await?
        .ok_or_else(|| stale_status("Job"))?;

    if to == JobStatus::Completed {
        state.event_bus.publish(
            PlatformEvent::new(JOB_COMPLETED)
                .with_source(ENTITY_JOB, job.id)
                .with_actor(user.user_id)
                .with_payload(json!({ "title": job.title, "property_id": job.property_id })),
        );
    }
    tracing::info!(job_id = id, from = %from, to = %to, user_id = user.user_id, "Job status changed");
    Ok(Json(DataResponse { data: job }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_costs_are_rejected() {
        assert!(validate_cost("actual_cost_cents", Some(-1)).is_err());
        assert!(validate_cost("actual_cost_cents", Some(0)).is_ok());
        assert!(validate_cost("actual_cost_cents", None).is_ok());
    }
}
