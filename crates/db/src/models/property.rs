//! Property entity model and DTOs.

use propdesk_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `properties` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Property {
    pub id: DbId,
    pub manager_id: DbId,
    pub name: String,
    pub address_line1: String,
    pub address_line2: Option<String>,
    pub city: String,
    pub state: Option<String>,
    pub postcode: Option<String>,
    pub country: String,
    pub property_type: String,
    pub status: String,
    /// Whole square units; client floats are rounded before insert.
    pub total_area: Option<i32>,
    pub year_built: Option<i32>,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub archived_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Property list row with unit counts.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct PropertySummary {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub property: Property,
    pub unit_count: i64,
    pub occupied_units: i64,
}

/// Request body for `POST /properties`.
///
/// `total_area` arrives as a float and is rounded by the handler.
#[derive(Debug, Deserialize)]
pub struct CreatePropertyRequest {
    pub name: String,
    pub address_line1: String,
    pub address_line2: Option<String>,
    pub city: String,
    pub state: Option<String>,
    pub postcode: Option<String>,
    pub country: String,
    pub property_type: Option<String>,
    pub total_area: Option<f64>,
    pub year_built: Option<i32>,
    pub description: Option<String>,
    pub image_url: Option<String>,
    /// Admins create on behalf of a manager.
    pub manager_id: Option<DbId>,
}

/// Validated insert DTO.
#[derive(Debug)]
pub struct CreateProperty {
    pub manager_id: DbId,
    pub name: String,
    pub address_line1: String,
    pub address_line2: Option<String>,
    pub city: String,
    pub state: Option<String>,
    pub postcode: Option<String>,
    pub country: String,
    pub property_type: String,
    pub total_area: Option<i32>,
    pub year_built: Option<i32>,
    pub description: Option<String>,
    pub image_url: Option<String>,
}

/// Request body for `PUT /properties/{id}`. All fields are optional.
#[derive(Debug, Default, Deserialize)]
pub struct UpdatePropertyRequest {
    pub name: Option<String>,
    pub address_line1: Option<String>,
    pub address_line2: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub postcode: Option<String>,
    pub country: Option<String>,
    pub property_type: Option<String>,
    pub status: Option<String>,
    pub total_area: Option<f64>,
    pub year_built: Option<i32>,
    pub description: Option<String>,
    pub image_url: Option<String>,
}

/// Validated update DTO.
#[derive(Debug, Default)]
pub struct UpdateProperty {
    pub name: Option<String>,
    pub address_line1: Option<String>,
    pub address_line2: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub postcode: Option<String>,
    pub country: Option<String>,
    pub property_type: Option<String>,
    pub status: Option<String>,
    pub total_area: Option<i32>,
    pub year_built: Option<i32>,
    pub description: Option<String>,
    pub image_url: Option<String>,
}

/// Filters for property lists.
#[derive(Debug, Default)]
pub struct PropertyFilter {
    pub status: Option<String>,
    pub property_type: Option<String>,
    pub city: Option<String>,
    pub search: Option<String>,
}

/// A row from `property_owners` joined with the owner's name.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct PropertyOwner {
    pub property_id: DbId,
    pub owner_id: DbId,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub created_at: Timestamp,
}
