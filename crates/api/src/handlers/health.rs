use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// `ok` or `degraded`.
    pub status: &'static str,
    pub version: &'static str,
    pub db_healthy: bool,
    /// Whether rate-limit counters are shared through Redis.
    pub redis_rate_limiting: bool,
    pub cloud_storage: bool,
    pub ai_enabled: bool,
}

/// GET /health
///
/// 200 when the database answers, 503 otherwise.
pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let db_healthy = propdesk_db::health_check(&state.pool).await.is_ok();
    let (status_code, status) = if db_healthy {
        (StatusCode::OK, "ok")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "degraded")
    };

    (
        status_code,
        Json(HealthResponse {
            status,
            version: env!("CARGO_PKG_VERSION"),
            db_healthy,
            redis_rate_limiting: state.rate_limiter.uses_redis(),
            cloud_storage: state.storage.has_cloud(),
            ai_enabled: state.ai.is_some(),
        }),
    )
}
