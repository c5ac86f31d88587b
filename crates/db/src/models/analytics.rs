//! Raw rows fetched for admin analytics.

use propdesk_core::types::Timestamp;
use serde::Serialize;
use sqlx::FromRow;

/// Subscription columns needed for revenue and churn.
#[derive(Debug, Clone, FromRow)]
pub struct SubscriptionFactRow {
    pub plan: String,
    pub billing_interval: String,
    pub status: String,
    pub created_at: Timestamp,
    pub cancelled_at: Option<Timestamp>,
}

/// User columns joined with funnel facts.
#[derive(Debug, Clone, FromRow)]
pub struct UserFactRow {
    pub role: String,
    pub created_at: Timestamp,
    pub last_login_at: Option<Timestamp>,
    pub has_property: bool,
    pub started_trial: bool,
    pub converted_to_paid: bool,
}

/// Headline counts for `GET /admin/dashboard`.
#[derive(Debug, Clone, Default, FromRow, Serialize)]
pub struct DashboardCounts {
    pub total_users: i64,
    pub active_users: i64,
    pub total_properties: i64,
    pub total_units: i64,
    pub occupied_units: i64,
    pub open_jobs: i64,
    pub pending_service_requests: i64,
    pub upcoming_inspections: i64,
}
