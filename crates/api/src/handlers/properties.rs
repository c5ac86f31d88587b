//! Handlers for `/properties` and property owners.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use propdesk_core::billing::property_limit_error;
use propdesk_core::error::CoreError;
use propdesk_core::property::{
    occupancy_rate, round_area, validate_address, validate_name, validate_property_status,
    validate_property_type, validate_year_built,
};
use propdesk_core::roles::{Role, ROLE_OWNER, ROLE_PROPERTY_MANAGER};
use propdesk_core::types::DbId;
use propdesk_db::models::property::{
    CreateProperty, CreatePropertyRequest, Property, PropertyFilter, PropertyOwner,
    PropertySummary, UpdateProperty, UpdatePropertyRequest,
};
use propdesk_db::models::unit::Unit;
use propdesk_db::repositories::{PropertyRepo, UnitRepo, UserRepo};
use serde::{Deserialize, Serialize};

use super::billing::current_plan;
use super::{editable_property, non_blank, visible_property};
use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::RequireManager;
use crate::query::PaginationParams;
use crate::response::{DataResponse, PaginatedResponse};
use crate::state::AppState;

const DEFAULT_PROPERTY_TYPE: &str = "residential";

#[derive(Debug, Deserialize)]
pub struct PropertyListQuery {
    pub status: Option<String>,
    pub property_type: Option<String>,
    pub city: Option<String>,
    pub search: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// A property with its units and owners.
#[derive(Debug, Serialize)]
pub struct PropertyDetail {
    #[serde(flatten)]
    pub property: Property,
    pub occupancy_rate: f64,
    pub units: Vec<Unit>,
    pub owners: Vec<PropertyOwner>,
}

#[derive(Debug, Deserialize)]
pub struct AddOwnerRequest {
    pub owner_id: DbId,
}

/// GET /api/properties
///
/// Properties visible to the caller, with unit counts.
pub async fn list_properties(
    State(state): State<AppState>,
    user: AuthUser,
    Query(params): Query<PropertyListQuery>,
) -> AppResult<Json<PaginatedResponse<PropertySummary>>> {
    let (limit, offset) = PaginationParams {
        limit: params.limit,
        offset: params.offset,
    }
    .window();
    let filter = PropertyFilter {
        status: non_blank(params.status),
        property_type: non_blank(params.property_type),
        city: non_blank(params.city),
        search: non_blank(params.search),
    };
    let scope = user.scope();

    let (data, total) = tokio::try_join!(
        PropertyRepo::list(&state.pool, &scope, &filter, limit, offset),
        PropertyRepo::count(&state.pool, &scope, &filter),
    )?;

    Ok(Json(PaginatedResponse {
        data,
        total,
        limit,
        offset,
    }))
}

/// POST /api/properties
///
/// Managers create for themselves; admins pass `manager_id`. The manager's
/// plan must allow another property.
pub async fn create_property(
    State(state): State<AppState>,
    RequireManager(user): RequireManager,
    Json(input): Json<CreatePropertyRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<Property>>)> {
    let manager_id = match (user.role, input.manager_id) {
        (Role::Admin, Some(manager_id)) => {
            if !UserRepo::has_role(&state.pool, manager_id, ROLE_PROPERTY_MANAGER).await? {
                return Err(CoreError::Validation(format!(
                    "User {manager_id} is not an active property manager"
                ))
                .into());
            }
            manager_id
        }
        (Role::Admin, None) => {
            return Err(
                CoreError::Validation("manager_id is required when creating as admin".into())
                    .into(),
            )
        }
        _ => user.user_id,
    };

    let name = validate_name(&input.name)?;
    validate_address(&input.address_line1, &input.city, &input.country)?;
    let property_type = input
        .property_type
        .unwrap_or_else(|| DEFAULT_PROPERTY_TYPE.to_string());
    validate_property_type(&property_type)?;
    validate_year_built(input.year_built)?;
    let total_area = round_area(input.total_area)?;

    let (_, plan) = current_plan(&state, manager_id).await?;
    let max = plan.max_properties();

    let property = PropertyRepo::create_within_limit(
        &state.pool,
        &CreateProperty {
            manager_id,
            name,
            address_line1: input.address_line1.trim().to_string(),
            address_line2: non_blank(input.address_line2),
            city: input.city.trim().to_string(),
            state: non_blank(input.state),
            postcode: non_blank(input.postcode),
            country: input.country.trim().to_string(),
            property_type,
            total_area,
            year_built: input.year_built,
            description: non_blank(input.description),
            image_url: non_blank(input.image_url),
        },
        max,
    )
    .await?
    .ok_or_else(|| property_limit_error(plan, max.unwrap_or_default()))?;

    tracing::info!(
        property_id = property.id,
        manager_id,
        user_id = user.user_id,
        "Property created"
    );
    Ok((StatusCode::CREATED, Json(DataResponse { data: property })))
}

/// GET /api/properties/{id}
pub async fn get_property(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<PropertyDetail>>> {
    visible_property(&state, &user, id).await?;

    let (property, units, owners) = tokio::try_join!(
        PropertyRepo::find_by_id(&state.pool, id),
        UnitRepo::list_for_property(&state.pool, id),
        PropertyRepo::list_owners(&state.pool, id),
    )?;
    let property = property.ok_or(CoreError::NotFound {
        entity: "Property",
        id,
    })?;

    // Tenants see their own unit only.
    let units: Vec<Unit> = if user.role == Role::Tenant {
        units
            .into_iter()
            .filter(|u| u.tenant_id == Some(user.user_id))
            .collect()
    } else {
        units
    };
    let occupied = units.iter().filter(|u| u.status == "OCCUPIED").count() as i64;

    Ok(Json(DataResponse {
        data: PropertyDetail {
            occupancy_rate: occupancy_rate(occupied, units.len() as i64),
            property,
            units,
            owners,
        },
    }))
}

/// PUT /api/properties/{id}
pub async fn update_property(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<DbId>,
    Json(input): Json<UpdatePropertyRequest>,
) -> AppResult<Json<DataResponse<Property>>> {
    editable_property(&state, &user, id).await?;

    let name = input.name.as_deref().map(validate_name).transpose()?;
    for (field, value) in [
        ("address_line1", &input.address_line1),
        ("city", &input.city),
        ("country", &input.country),
    ] {
        if matches!(value, Some(v) if v.trim().is_empty()) {
            return Err(CoreError::Validation(format!("{field} must not be empty")).into());
        }
    }
    if let Some(property_type) = &input.property_type {
        validate_property_type(property_type)?;
    }
    if let Some(status) = &input.status {
        validate_property_status(status)?;
    }
    validate_year_built(input.year_built)?;

    let update = UpdateProperty {
        name,
        address_line1: input.address_line1.map(|v| v.trim().to_string()),
        address_line2: input.address_line2,
        city: input.city.map(|v| v.trim().to_string()),
        state: input.state,
        postcode: input.postcode,
        country: input.country.map(|v| v.trim().to_string()),
        property_type: input.property_type,
        status: input.status,
        total_area: round_area(input.total_area)?,
        year_built: input.year_built,
        description: input.description,
        image_url: input.image_url,
    };

    let property = PropertyRepo::update(&state.pool, id, &update)
        .await?
        .ok_or(CoreError::NotFound {
            entity: "Property",
            id,
        })?;
    tracing::info!(property_id = id, user_id = user.user_id, "Property updated");
    Ok(Json(DataResponse { data: property }))
}

/// DELETE /api/properties/{id}
///
/// Archives the property; rows stay for history and reporting.
pub async fn delete_property(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    editable_property(&state, &user, id).await?;
    if !PropertyRepo::archive(&state.pool, id).await? {
        return Err(CoreError::NotFound {
            entity: "Property",
            id,
        }
        .into());
    }
    tracing::info!(property_id = id, user_id = user.user_id, "Property archived");
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/properties/{id}/owners
///
/// Links a user with the `owner` role. Returns the updated owner list.
pub async fn add_owner(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<DbId>,
    Json(input): Json<AddOwnerRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<Vec<PropertyOwner>>>)> {
    editable_property(&state, &user, id).await?;

    if !UserRepo::has_role(&state.pool, input.owner_id, ROLE_OWNER).await? {
        return Err(CoreError::Validation(format!(
            "User {} is not an active owner",
            input.owner_id
        ))
        .into());
    }
    if !PropertyRepo::add_owner(&state.pool, id, input.owner_id).await? {
        return Err(CoreError::Conflict("User is already an owner of this property".into()).into());
    }
    tracing::info!(property_id = id, owner_id = input.owner_id, "Owner added");

    let owners = PropertyRepo::list_owners(&state.pool, id).await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: owners })))
}

/// DELETE /api/properties/{id}/owners/{owner_id}
pub async fn remove_owner(
    State(state): State<AppState>,
    user: AuthUser,
    Path((id, owner_id)): Path<(DbId, DbId)>,
) -> AppResult<StatusCode> {
    editable_property(&state, &user, id).await?;
    if !PropertyRepo::remove_owner(&state.pool, id, owner_id).await? {
        return Err(CoreError::NotFound {
            entity: "Property owner",
            id: owner_id,
        }
        .into());
    }
    tracing::info!(property_id = id, owner_id, "Owner removed");
    Ok(StatusCode::NO_CONTENT)
}
