//! Route definitions for the `/units` resource.

use axum::routing::{get, put};
use axum::Router;

use crate::handlers::units;
use crate::state::AppState;

/// Routes mounted at `/units`.
///
/// ```text
/// GET    /{id}          -> get_unit
/// PUT    /{id}          -> update_unit
/// DELETE /{id}          -> delete_unit
/// PUT    /{id}/tenant   -> set_tenant
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/{id}",
            get(units::get_unit)
                .put(units::update_unit)
                .delete(units::delete_unit),
        )
        .route("/{id}/tenant", put(units::set_tenant))
}
