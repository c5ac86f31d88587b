//! Route definitions for the `/inspections` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::inspections;
use crate::state::AppState;

/// Routes mounted at `/inspections`.
///
/// ```text
/// GET    /                -> list_inspections
/// POST   /                -> create_inspection
/// GET    /{id}            -> get_inspection
/// PUT    /{id}            -> update_inspection
/// DELETE /{id}            -> delete_inspection
/// POST   /{id}/start      -> start_inspection
/// POST   /{id}/complete   -> complete_inspection
/// POST   /{id}/cancel     -> cancel_inspection
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(inspections::list_inspections).post(inspections::create_inspection),
        )
        .route(
            "/{id}",
            get(inspections::get_inspection)
                .put(inspections::update_inspection)
                .delete(inspections::delete_inspection),
        )
        .route("/{id}/start", post(inspections::start_inspection))
        .route("/{id}/complete", post(inspections::complete_inspection))
        .route("/{id}/cancel", post(inspections::cancel_inspection))
}
