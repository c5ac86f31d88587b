//! Inspection entity model and DTOs.

use propdesk_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `inspections` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Inspection {
    pub id: DbId,
    pub property_id: DbId,
    pub unit_id: Option<DbId>,
    pub inspector_id: Option<DbId>,
    pub inspection_type: String,
    pub status: String,
    pub scheduled_date: Timestamp,
    pub started_at: Option<Timestamp>,
    pub completed_at: Option<Timestamp>,
    pub cancelled_at: Option<Timestamp>,
    pub notes: Option<String>,
    pub findings: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

#[derive(Debug, Deserialize)]
pub struct CreateInspection {
    pub property_id: DbId,
    pub unit_id: Option<DbId>,
    pub inspector_id: Option<DbId>,
    pub inspection_type: Option<String>,
    pub scheduled_date: Timestamp,
    pub notes: Option<String>,
}

/// Edits allowed while an inspection is still scheduled.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateInspection {
    pub inspector_id: Option<DbId>,
    pub inspection_type: Option<String>,
    pub scheduled_date: Option<Timestamp>,
    pub notes: Option<String>,
}

/// Body for `POST /inspections/{id}/complete`.
#[derive(Debug, Default, Deserialize)]
pub struct CompleteInspection {
    pub findings: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Default)]
pub struct InspectionFilter {
    pub property_id: Option<DbId>,
    pub status: Option<String>,
    pub from: Option<Timestamp>,
    pub to: Option<Timestamp>,
}
