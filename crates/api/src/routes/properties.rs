//! Route definitions for `/properties`, including units nested under a
//! property.

use axum::routing::{delete, get, post};
use axum::Router;

use crate::handlers::{properties, units};
use crate::state::AppState;

/// Routes mounted at `/properties`.
///
/// ```text
/// GET    /                          -> list_properties
/// POST   /                          -> create_property (manager)
/// GET    /{id}                      -> get_property
/// PUT    /{id}                      -> update_property
/// DELETE /{id}                      -> delete_property (archive)
/// POST   /{id}/owners               -> add_owner
/// DELETE /{id}/owners/{owner_id}    -> remove_owner
/// GET    /{id}/units                -> list_units
/// POST   /{id}/units                -> create_unit
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(properties::list_properties).post(properties::create_property),
        )
        .route(
            "/{id}",
            get(properties::get_property)
                .put(properties::update_property)
                .delete(properties::delete_property),
        )
        .route("/{id}/owners", post(properties::add_owner))
        .route("/{id}/owners/{owner_id}", delete(properties::remove_owner))
        .route("/{id}/units", get(units::list_units).post(units::create_unit))
}
