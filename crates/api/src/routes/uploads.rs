//! Route definitions for `/v2/uploads`.

use axum::extract::DefaultBodyLimit;
use axum::middleware::from_fn_with_state;
use axum::routing::{delete, get};
use axum::Router;

use crate::handlers::uploads;
use crate::middleware::rate_limit::upload_limit;
use crate::state::AppState;

/// Room for multipart boundaries and the text fields around the file.
pub(crate) const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

/// Routes mounted at `/v2/uploads`.
///
/// ```text
/// POST   /       -> upload_file (upload rate limit)
/// GET    /       -> list_uploads
/// DELETE /{id}   -> delete_upload
/// ```
pub fn router(state: &AppState) -> Router<AppState> {
    let body_limit = state.config.storage.max_upload_bytes + MULTIPART_OVERHEAD_BYTES;
    let upload = Router::new()
        .route("/", axum::routing::post(uploads::upload_file))
        .route_layer(from_fn_with_state(state.clone(), upload_limit))
        .layer(DefaultBodyLimit::max(body_limit));

    Router::new()
        .route("/", get(uploads::list_uploads))
        .route("/{id}", delete(uploads::delete_upload))
        .merge(upload)
}
