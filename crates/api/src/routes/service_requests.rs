//! Route definitions for the `/service-requests` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::service_requests;
use crate::state::AppState;

/// Routes mounted at `/service-requests`.
///
/// ```text
/// GET    /               -> list_service_requests
/// POST   /               -> create_service_request
/// GET    /{id}           -> get_service_request
/// POST   /{id}/review    -> review_service_request
/// POST   /{id}/convert   -> convert_service_request
/// POST   /{id}/cancel    -> cancel_service_request
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(service_requests::list_service_requests)
                .post(service_requests::create_service_request),
        )
        .route("/{id}", get(service_requests::get_service_request))
        .route("/{id}/review", post(service_requests::review_service_request))
        .route("/{id}/convert", post(service_requests::convert_service_request))
        .route("/{id}/cancel", post(service_requests::cancel_service_request))
}
