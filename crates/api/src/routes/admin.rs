//! Route definitions for the `/admin` resource.

use axum::routing::{get, post, put};
use axum::Router;

use crate::handlers::admin;
use crate::state::AppState;

/// Routes mounted at `/admin`.
///
/// All routes require the `admin` role (enforced by handler extractors).
///
/// ```text
/// GET    /dashboard               -> dashboard
/// GET    /analytics/revenue       -> revenue
/// GET    /analytics/funnel        -> funnel
/// GET    /analytics/retention     -> retention
/// GET    /analytics/signups       -> signups
/// GET    /users                   -> list_users
/// PUT    /users/{id}              -> update_user
/// DELETE /users/{id}              -> deactivate_user
/// POST   /housekeeping/run        -> run_housekeeping
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/dashboard", get(admin::dashboard))
        .route("/analytics/revenue", get(admin::revenue))
        .route("/analytics/funnel", get(admin::funnel))
        .route("/analytics/retention", get(admin::retention))
        .route("/analytics/signups", get(admin::signups))
        .route("/users", get(admin::list_users))
        .route(
            "/users/{id}",
            put(admin::update_user).delete(admin::deactivate_user),
        )
        .route("/housekeeping/run", post(admin::run_housekeeping))
}
