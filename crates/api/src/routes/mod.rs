pub mod admin;
pub mod auth;
pub mod billing;
pub mod blog;
pub mod health;
pub mod inspections;
pub mod jobs;
pub mod notifications;
pub mod properties;
pub mod service_requests;
pub mod units;
pub mod uploads;

use axum::middleware::from_fn_with_state;
use axum::Router;

use crate::middleware::rate_limit::api_limit;
use crate::state::AppState;

/// Build the `/api` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /auth/*                                   register, login, refresh, logout, me
/// /properties                               list, create
/// /properties/{id}                          get, update, archive
/// /properties/{id}/owners[/{owner_id}]      add, remove owners
/// /properties/{id}/units                    list, create
/// /units/{id}                               get, update, delete
/// /units/{id}/tenant                        set tenant
/// /inspections[/{id}[/start|complete|cancel]]
/// /jobs[/{id}[/assign|status]]
/// /service-requests[/{id}[/review|convert|cancel]]
/// /notifications[/unread-count|read-all|{id}/read]
/// /billing/plans | subscription | subscription/cancel | webhook
/// /blog/posts[/{slug}]                      public blog
/// /blog/admin/*                             blog management (admin)
/// /v2/uploads[/{id}]                        file uploads
/// /admin/*                                  dashboard, analytics, users (admin)
/// ```
///
/// Every route counts against the general API limit; auth, upload and AI
/// routes also carry their own stricter limits.
pub fn api_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .nest("/auth", auth::router(state))
        .nest("/properties", properties::router())
        .nest("/units", units::router())
        .nest("/inspections", inspections::router())
        .nest("/jobs", jobs::router())
        .nest("/service-requests", service_requests::router())
        .nest("/notifications", notifications::router())
        .nest("/billing", billing::router())
        .nest("/blog", blog::router(state))
        .nest("/v2/uploads", uploads::router(state))
        .nest("/admin", admin::router())
        .layer(from_fn_with_state(state.clone(), api_limit))
}
