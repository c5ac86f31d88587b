//! Root-level health route.

use axum::routing::get;
use axum::Router;

use crate::handlers::health;
use crate::state::AppState;

/// Mounted at the root, not under `/api`.
pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health::health_check))
}
