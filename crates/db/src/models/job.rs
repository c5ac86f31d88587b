//! Maintenance job entity model and DTOs.

use propdesk_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `jobs` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Job {
    pub id: DbId,
    pub property_id: DbId,
    pub unit_id: Option<DbId>,
    pub service_request_id: Option<DbId>,
    pub created_by: DbId,
    pub assigned_to: Option<DbId>,
    pub title: String,
    pub description: Option<String>,
    pub priority: String,
    pub status: String,
    pub scheduled_date: Option<Timestamp>,
    pub started_at: Option<Timestamp>,
    pub completed_at: Option<Timestamp>,
    pub estimated_cost_cents: Option<i64>,
    pub actual_cost_cents: Option<i64>,
    pub archived_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

#[derive(Debug, Deserialize)]
pub struct CreateJob {
    pub property_id: DbId,
    pub unit_id: Option<DbId>,
    pub title: String,
    pub description: Option<String>,
    pub priority: Option<String>,
    pub scheduled_date: Option<Timestamp>,
    pub estimated_cost_cents: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateJob {
    pub title: Option<String>,
    pub description: Option<String>,
    pub priority: Option<String>,
    pub scheduled_date: Option<Timestamp>,
    pub estimated_cost_cents: Option<i64>,
    pub actual_cost_cents: Option<i64>,
}

/// Body for `POST /jobs/{id}/assign`. `null` unassigns.
#[derive(Debug, Deserialize)]
pub struct AssignJob {
    pub technician_id: Option<DbId>,
}

/// Body for `POST /jobs/{id}/status`.
#[derive(Debug, Deserialize)]
pub struct JobStatusChange {
    pub status: String,
    pub actual_cost_cents: Option<i64>,
}

#[derive(Debug, Default)]
pub struct JobFilter {
    pub property_id: Option<DbId>,
    pub status: Option<String>,
    pub priority: Option<String>,
    pub assigned_to: Option<DbId>,
}
