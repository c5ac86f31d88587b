//! Unit entity model and DTOs.

use propdesk_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `units` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Unit {
    pub id: DbId,
    pub property_id: DbId,
    pub unit_number: String,
    pub bedrooms: Option<i16>,
    pub bathrooms: Option<f64>,
    pub area: Option<i32>,
    pub rent_cents: Option<i64>,
    pub status: String,
    pub tenant_id: Option<DbId>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Request body for creating a unit. `area` is rounded by the handler.
#[derive(Debug, Deserialize)]
pub struct CreateUnitRequest {
    pub unit_number: String,
    pub bedrooms: Option<i16>,
    pub bathrooms: Option<f64>,
    pub area: Option<f64>,
    pub rent_cents: Option<i64>,
    pub status: Option<String>,
}

#[derive(Debug)]
pub struct CreateUnit {
    pub property_id: DbId,
    pub unit_number: String,
    pub bedrooms: Option<i16>,
    pub bathrooms: Option<f64>,
    pub area: Option<i32>,
    pub rent_cents: Option<i64>,
    pub status: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateUnitRequest {
    pub unit_number: Option<String>,
    pub bedrooms: Option<i16>,
    pub bathrooms: Option<f64>,
    pub area: Option<f64>,
    pub rent_cents: Option<i64>,
    pub status: Option<String>,
}

#[derive(Debug, Default)]
pub struct UpdateUnit {
    pub unit_number: Option<String>,
    pub bedrooms: Option<i16>,
    pub bathrooms: Option<f64>,
    pub area: Option<i32>,
    pub rent_cents: Option<i64>,
    pub status: Option<String>,
}

/// Request body for `PUT /units/{id}/tenant`. `null` moves the tenant out.
#[derive(Debug, Deserialize)]
pub struct AssignTenantRequest {
    pub tenant_id: Option<DbId>,
}
