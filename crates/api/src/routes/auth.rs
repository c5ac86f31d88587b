//! Route definitions for the `/auth` resource.

use axum::middleware::from_fn_with_state;
use axum::routing::{get, post};
use axum::Router;

use crate::handlers::auth;
use crate::middleware::rate_limit::auth_limit;
use crate::state::AppState;

/// Routes mounted at `/auth`.
///
/// ```text
/// POST /register         -> register        (auth rate limit)
/// POST /login            -> login           (auth rate limit)
/// POST /refresh          -> refresh         (auth rate limit)
/// POST /logout           -> logout
/// GET  /me               -> me
/// PUT  /me               -> update_me
/// POST /change-password  -> change_password (auth rate limit)
/// ```
pub fn router(state: &AppState) -> Router<AppState> {
    let limited = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/refresh", post(auth::refresh))
        .route("/change-password", post(auth::change_password))
        .route_layer(from_fn_with_state(state.clone(), auth_limit));

    Router::new()
        .route("/logout", post(auth::logout))
        .route("/me", get(auth::me).put(auth::update_me))
        .merge(limited)
}
