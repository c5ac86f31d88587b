//! Route definitions for the `/blog` resource.

use axum::middleware::from_fn_with_state;
use axum::routing::{get, post};
use axum::Router;

use crate::handlers::blog;
use crate::middleware::rate_limit::ai_limit;
use crate::state::AppState;

/// Routes mounted at `/blog`.
///
/// ```text
/// GET    /posts                      -> list_published (public)
/// GET    /posts/{slug}               -> get_published (public)
///
/// GET    /admin/posts                -> list_all
/// POST   /admin/posts                -> create_post
/// GET    /admin/posts/{id}           -> get_post
/// PUT    /admin/posts/{id}           -> update_post
/// DELETE /admin/posts/{id}           -> delete_post
/// POST   /admin/posts/{id}/publish   -> publish_post
/// POST   /admin/generate             -> generate_post (AI rate limit)
/// ```
pub fn router(state: &AppState) -> Router<AppState> {
    let generate = Router::new()
        .route("/admin/generate", post(blog::generate_post))
        .route_layer(from_fn_with_state(state.clone(), ai_limit));

    Router::new()
        .route("/posts", get(blog::list_published))
        .route("/posts/{slug}", get(blog::get_published))
        .route("/admin/posts", get(blog::list_all).post(blog::create_post))
        .route(
            "/admin/posts/{id}",
            get(blog::get_post)
                .put(blog::update_post)
                .delete(blog::delete_post),
        )
        .route("/admin/posts/{id}/publish", post(blog::publish_post))
        .merge(generate)
}
