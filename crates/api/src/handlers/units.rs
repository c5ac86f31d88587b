//! Handlers for units and tenant assignment.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use propdesk_core::error::CoreError;
use propdesk_core::property::{round_area, validate_unit, validate_unit_status, UnitFigures};
use propdesk_core::roles::{Role, ROLE_TENANT};
use propdesk_core::types::DbId;
use propdesk_db::models::unit::{
    AssignTenantRequest, CreateUnit, CreateUnitRequest, Unit, UpdateUnit, UpdateUnitRequest,
};
use propdesk_db::repositories::{UnitRepo, UserRepo};

use super::{editable_property, visible_property};
use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

const DEFAULT_UNIT_STATUS: &str = "VACANT";

/// Load a unit and check the caller may see its property.
async fn load_visible(state: &AppState, user: &AuthUser, id: DbId) -> AppResult<Unit> {
    let unit = UnitRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(CoreError::NotFound { entity: "Unit", id })?;
    visible_property(state, user, unit.property_id).await?;
    // A tenant's relation covers the property, not its other units.
    if user.role == Role::Tenant && unit.tenant_id != Some(user.user_id) {
        return Err(CoreError::NotFound { entity: "Unit", id }.into());
    }
    Ok(unit)
}

async fn load_editable(state: &AppState, user: &AuthUser, id: DbId) -> AppResult<Unit> {
    let unit = UnitRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(CoreError::NotFound { entity: "Unit", id })?;
    editable_property(state, user, unit.property_id).await?;
    Ok(unit)
}

/// GET /api/properties/{id}/units
pub async fn list_units(
    State(state): State<AppState>,
    user: AuthUser,
    Path(property_id): Path<DbId>,
) -> AppResult<Json<DataResponse<Vec<Unit>>>> {
    visible_property(&state, &user, property_id).await?;
    let mut units = UnitRepo::list_for_property(&state.pool, property_id).await?;
    if user.role == Role::Tenant {
        units.retain(|u| u.tenant_id == Some(user.user_id));
    }
    Ok(Json(DataResponse { data: units }))
}

/// POST /api/properties/{id}/units
pub async fn create_unit(
    State(state): State<AppState>,
    user: AuthUser,
    Path(property_id): Path<DbId>,
    Json(input): Json<CreateUnitRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<Unit>>)> {
    editable_property(&state, &user, property_id).await?;

    let unit_number = validate_unit(
        Some(&input.unit_number),
        UnitFigures {
            bedrooms: input.bedrooms,
            bathrooms: input.bathrooms,
            rent_cents: input.rent_cents,
        },
    )?
    .unwrap_or_default();
    let status = input
        .status
        .unwrap_or_else(|| DEFAULT_UNIT_STATUS.to_string());
    validate_unit_status(&status)?;

    let unit = UnitRepo::create(
        &state.pool,
        &CreateUnit {
            property_id,
            unit_number,
            bedrooms: input.bedrooms,
            bathrooms: input.bathrooms,
            area: round_area(input.area)?,
            rent_cents: input.rent_cents,
            status,
        },
    )
    .await?;

    tracing::info!(unit_id = unit.id, property_id, "Unit created");
    Ok((StatusCode::CREATED, Json(DataResponse { data: unit })))
}

/// GET /api/units/{id}
pub async fn get_unit(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Unit>>> {
    let unit = load_visible(&state, &user, id).await?;
    Ok(Json(DataResponse { data: unit }))
}

/// PUT /api/units/{id}
pub async fn update_unit(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateUnitRequest>,
) -> AppResult<Json<DataResponse<Unit>>> {
    load_editable(&state, &user, id).await?;

    let unit_number = validate_unit(
        input.unit_number.as_deref(),
        UnitFigures {
            bedrooms: input.bedrooms,
            bathrooms: input.bathrooms,
            rent_cents: input.rent_cents,
        },
    )?;
    if let Some(status) = &input.status {
        validate_unit_status(status)?;
    }

    let update = UpdateUnit {
        unit_number,
        bedrooms: input.bedrooms,
        bathrooms: input.bathrooms,
        area: round_area(input.area)?,
        rent_cents: input.rent_cents,
        status: input.status,
    };
    let unit = UnitRepo::update(&state.pool, id, &update)
        .await?
        .ok_or(CoreError::NotFound { entity: "Unit", id })?;

    tracing::info!(unit_id = id, "Unit updated");
    Ok(Json(DataResponse { data: unit }))
}

/// DELETE /api/units/{id}
pub async fn delete_unit(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    load_editable(&state, &user, id).await?;
    if !UnitRepo::delete(&state.pool, id).await? {
        return Err(CoreError::NotFound { entity: "Unit", id }.into());
    }
    tracing::info!(unit_id = id, "Unit deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// PUT /api/units/{id}/tenant
///
/// Moves a tenant in, or out with `{"tenant_id": null}`. Status follows.
pub async fn set_tenant(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<DbId>,
    Json(input): Json<AssignTenantRequest>,
) -> AppResult<Json<DataResponse<Unit>>> {
    load_editable(&state, &user, id).await?;

    if let Some(tenant_id) = input.tenant_id {
        if !UserRepo::has_role(&state.pool, tenant_id, ROLE_TENANT).await? {
            return Err(
                CoreError::Validation(format!("User {tenant_id} is not an active tenant")).into(),
            );
        }
    }

    let unit = UnitRepo::set_tenant(&state.pool, id, input.tenant_id)
        .await?
        .ok_or(CoreError::NotFound { entity: "Unit", id })?;

    tracing::info!(unit_id = id, tenant_id = ?input.tenant_id, "Unit tenant changed");
    Ok(Json(DataResponse { data: unit }))
}
