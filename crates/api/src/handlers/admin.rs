//! Admin dashboard, analytics and user management.

use std::collections::BTreeMap;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{Duration, Utc};
use propdesk_core::analytics::{
    churn_rate, cohort_retention, daily_series, mrr_summary, signup_funnel, status_breakdown,
    CohortRetention, DailyCount, FunnelStage, MrrSummary, SubscriptionFact, UserFact,
};
use propdesk_core::billing::{BillingInterval, Plan, SubscriptionStatus};
use propdesk_core::error::CoreError;
use propdesk_core::roles::Role;
use propdesk_core::types::DbId;
use propdesk_db::models::analytics::{DashboardCounts, SubscriptionFactRow, UserFactRow};
use propdesk_db::models::user::{AdminUpdateUser, UserFilter, UserResponse};
use propdesk_db::repositories::{AnalyticsRepo, SessionRepo, UserRepo};
use serde::{Deserialize, Serialize};

use super::non_blank;
use crate::background::housekeeping::{self, HousekeepingReport};
use crate::error::AppResult;
use crate::middleware::rbac::RequireAdmin;
use crate::query::PaginationParams;
use crate::response::{DataResponse, PaginatedResponse};
use crate::state::AppState;

const CHURN_PERIOD_DAYS: i64 = 30;
const DEFAULT_RETENTION_WINDOW_DAYS: i64 = 30;
const DEFAULT_SIGNUP_DAYS: i64 = 30;
const MAX_SERIES_DAYS: i64 = 365;

#[derive(Debug, Serialize)]
pub struct Dashboard {
    #[serde(flatten)]
    pub counts: DashboardCounts,
    pub jobs_by_status: BTreeMap<String, i64>,
    pub service_requests_by_status: BTreeMap<String, i64>,
    pub users_by_role: BTreeMap<String, i64>,
}

#[derive(Debug, Serialize)]
pub struct RevenueReport {
    #[serde(flatten)]
    pub summary: MrrSummary,
    pub churn_rate_30d: f64,
}

#[derive(Debug, Deserialize)]
pub struct RetentionQuery {
    pub window_days: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct SignupQuery {
    pub days: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct UserListQuery {
    pub role: Option<String>,
    pub search: Option<String>,
    pub is_active: Option<bool>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

// Rows with values outside the known catalog are skipped rather than
// failing the whole report.

fn subscription_fact(row: SubscriptionFactRow) -> Option<SubscriptionFact> {
    let parsed = (|| {
        Ok::<_, CoreError>(SubscriptionFact {
            plan: Plan::parse(&row.plan)?,
            interval: BillingInterval::parse(&row.billing_interval)?,
            status: SubscriptionStatus::parse(&row.status)?,
            created_at: row.created_at,
            cancelled_at: row.cancelled_at,
        })
    })();
    parsed
        .map_err(|e| tracing::warn!(error = %e, "Skipping subscription row in analytics"))
        .ok()
}

fn user_fact(row: UserFactRow) -> Option<UserFact> {
    let role = Role::parse(&row.role)
        .map_err(|e| tracing::warn!(error = %e, "Skipping user row in analytics"))
        .ok()?;
    Some(UserFact {
        role,
        created_at: row.created_at,
        last_login_at: row.last_login_at,
        has_property: row.has_property,
        started_trial: row.started_trial,
        converted_to_paid: row.converted_to_paid,
    })
}

async fn user_facts(state: &AppState) -> AppResult<Vec<UserFact>> {
    Ok(AnalyticsRepo::user_facts(&state.pool)
        .await?
        .into_iter()
        .filter_map(user_fact)
        .collect())
}

/// GET /api/admin/dashboard
pub async fn dashboard(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
) -> AppResult<Json<DataResponse<Dashboard>>> {
    let (counts, jobs, requests, roles) = tokio::try_join!(
        AnalyticsRepo::dashboard_counts(&state.pool),
        AnalyticsRepo::job_statuses(&state.pool),
        AnalyticsRepo::service_request_statuses(&state.pool),
        AnalyticsRepo::user_roles(&state.pool),
    )?;
    Ok(Json(DataResponse {
        data: Dashboard {
            counts,
            jobs_by_status: status_breakdown(jobs),
            service_requests_by_status: status_breakdown(requests),
            users_by_role: status_breakdown(roles),
        },
    }))
}

/// GET /api/admin/analytics/revenue
pub async fn revenue(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
) -> AppResult<Json<DataResponse<RevenueReport>>> {
    let facts: Vec<SubscriptionFact> = AnalyticsRepo::subscription_facts(&state.pool)
        .await?
        .into_iter()
        .filter_map(subscription_fact)
        .collect();
    let now = Utc::now();
    Ok(Json(DataResponse {
        data: RevenueReport {
            summary: mrr_summary(&facts),
            churn_rate_30d: churn_rate(&facts, now - Duration::days(CHURN_PERIOD_DAYS), now),
        },
    }))
}

/// GET /api/admin/analytics/funnel
pub async fn funnel(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
) -> AppResult<Json<DataResponse<Vec<FunnelStage>>>> {
    let facts = user_facts(&state).await?;
    Ok(Json(DataResponse {
        data: signup_funnel(&facts),
    }))
}

/// GET /api/admin/analytics/retention?window_days=30
pub async fn retention(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Query(params): Query<RetentionQuery>,
) -> AppResult<Json<DataResponse<Vec<CohortRetention>>>> {
    let window = params
        .window_days
        .unwrap_or(DEFAULT_RETENTION_WINDOW_DAYS)
        .clamp(1, MAX_SERIES_DAYS);
    let facts = user_facts(&state).await?;
    Ok(Json(DataResponse {
        data: cohort_retention(&facts, Utc::now(), window),
    }))
}

/// GET /api/admin/analytics/signups?days=30
pub async fn signups(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Query(params): Query<SignupQuery>,
) -> AppResult<Json<DataResponse<Vec<DailyCount>>>> {
    let days = params
        .days
        .unwrap_or(DEFAULT_SIGNUP_DAYS)
        .clamp(1, MAX_SERIES_DAYS);
    let now = Utc::now();
    let since = now - Duration::days(days);
    let timestamps = AnalyticsRepo::signups_since(&state.pool, since).await?;
    Ok(Json(DataResponse {
        data: daily_series(&timestamps, days, now),
    }))
}

/// GET /api/admin/users
pub async fn list_users(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Query(params): Query<UserListQuery>,
) -> AppResult<Json<PaginatedResponse<UserResponse>>> {
    let (limit, offset) = PaginationParams {
        limit: params.limit,
        offset: params.offset,
    }
    .window();
    let role = non_blank(params.role);
    if let Some(role) = role.as_deref() {
        Role::parse(role)?;
    }
    let filter = UserFilter {
        role,
        search: non_blank(params.search),
        is_active: params.is_active,
    };

    let (users, total) = tokio::try_join!(
        UserRepo::list(&state.pool, &filter, limit, offset),
        UserRepo::count(&state.pool, &filter),
    )?;
    Ok(Json(PaginatedResponse {
        data: users.iter().map(UserResponse::from).collect(),
        total,
        limit,
        offset,
    }))
}

/// PUT /api/admin/users/{id}
///
/// Changes role or active flag. Admins cannot demote or deactivate
/// themselves. Deactivation revokes the user's sessions.
pub async fn update_user(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<DbId>,
    Json(input): Json<AdminUpdateUser>,
) -> AppResult<Json<DataResponse<UserResponse>>> {
    if let Some(role) = input.role.as_deref() {
        Role::parse(role)?;
    }
    if id == admin.user_id
        && (input.is_active == Some(false)
            || input.role.as_deref().is_some_and(|r| r != Role::Admin.as_str()))
    {
        return Err(CoreError::Validation(
            "Admins cannot demote or deactivate their own account".into(),
        )
        .into());
    }

    let user = UserRepo::admin_update(&state.pool, id, &input)
        .await?
        .ok_or(CoreError::NotFound { entity: "User", id })?;
    if input.is_active == Some(false) {
        SessionRepo::revoke_all_for_user(&state.pool, id).await?;
    }

    tracing::info!(user_id = id, admin_id = admin.user_id, role = %user.role, is_active = user.is_active, "User updated by admin");
    Ok(Json(DataResponse {
        data: UserResponse::from(&user),
    }))
}

/// DELETE /api/admin/users/{id}
///
/// Soft delete: the account is deactivated and its sessions revoked.
pub async fn deactivate_user(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    if id == admin.user_id {
        return Err(
            CoreError::Validation("Admins cannot deactivate their own account".into()).into(),
        );
    }
    if !UserRepo::deactivate(&state.pool, id).await? {
        return Err(CoreError::NotFound {
            entity: "Active user",
            id,
        }
        .into());
    }
    let revoked = SessionRepo::revoke_all_for_user(&state.pool, id).await?;
    tracing::info!(user_id = id, admin_id = admin.user_id, revoked, "User deactivated");
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/admin/housekeeping/run
///
/// Runs one housekeeping pass now and reports per-task counts. A failed
/// task shows up as `null`.
pub async fn run_housekeeping(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
) -> AppResult<Json<DataResponse<HousekeepingReport>>> {
    tracing::info!(admin_id = admin.user_id, "Manual housekeeping run");
    let report = housekeeping::run_once(&state.pool, &state.config.housekeeping).await;
    Ok(Json(DataResponse { data: report }))
}
