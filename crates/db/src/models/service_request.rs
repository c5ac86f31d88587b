//! Service request entity model and DTOs.

use propdesk_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `service_requests` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ServiceRequest {
    pub id: DbId,
    pub property_id: DbId,
    pub unit_id: Option<DbId>,
    pub requested_by: DbId,
    pub reviewed_by: Option<DbId>,
    pub title: String,
    pub description: String,
    pub category: String,
    pub priority: String,
    pub status: String,
    pub review_notes: Option<String>,
    pub job_id: Option<DbId>,
    pub reviewed_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

#[derive(Debug, Deserialize)]
pub struct CreateServiceRequest {
    pub property_id: DbId,
    pub unit_id: Option<DbId>,
    pub title: String,
    pub description: String,
    pub category: Option<String>,
    pub priority: Option<String>,
}

/// Body for `POST /service-requests/{id}/review`.
///
/// `status` is one of `UNDER_REVIEW`, `APPROVED`, `REJECTED`.
#[derive(Debug, Deserialize)]
pub struct ReviewServiceRequest {
    pub status: String,
    pub review_notes: Option<String>,
}

/// Body for `POST /service-requests/{id}/convert`.
#[derive(Debug, Default, Deserialize)]
pub struct ConvertToJob {
    pub title: Option<String>,
    pub priority: Option<String>,
    pub scheduled_date: Option<Timestamp>,
    pub estimated_cost_cents: Option<i64>,
    pub assigned_to: Option<DbId>,
}

#[derive(Debug, Default)]
pub struct ServiceRequestFilter {
    pub property_id: Option<DbId>,
    pub status: Option<String>,
    pub category: Option<String>,
}
