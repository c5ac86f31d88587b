//! Route definitions for the `/billing` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::billing;
use crate::state::AppState;

/// Routes mounted at `/billing`.
///
/// ```text
/// GET  /plans                 -> list_plans (public)
/// GET  /subscription          -> get_subscription
/// POST /subscription          -> change_plan (manager)
/// POST /subscription/cancel   -> cancel_subscription (manager)
/// POST /webhook               -> webhook (signature-verified, no auth)
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/plans", get(billing::list_plans))
        .route(
            "/subscription",
            get(billing::get_subscription).post(billing::change_plan),
        )
        .route("/subscription/cancel", post(billing::cancel_subscription))
        .route("/webhook", post(billing::webhook))
}
