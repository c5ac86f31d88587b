#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;

use axum::body::Body;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{Method, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use sqlx::PgPool;
use tower::ServiceExt;

use propdesk_api::auth::jwt::{generate_access_token, JwtConfig};
use propdesk_api::auth::password::hash_password;
use propdesk_api::config::{
    AiConfig, BillingConfig, HousekeepingConfig, RateLimitConfig, ServerConfig, StorageConfig,
    DEFAULT_AI_BASE_URL, DEFAULT_AI_MODEL,
};
use propdesk_api::middleware::rate_limit::RateLimiter;
use propdesk_api::router::{build_app_router, LOCAL_UPLOADS_PATH};
use propdesk_api::state::AppState;
use propdesk_core::uploads::MAX_UPLOAD_BYTES;
use propdesk_db::models::user::{CreateUser, User};
use propdesk_db::repositories::UserRepo;
use propdesk_events::EventBus;
use propdesk_storage::{FallbackStorage, LocalStorage};

pub const TEST_PASSWORD: &str = "correct-horse-42";
pub const TEST_WEBHOOK_SECRET: &str = "whsec_test";

pub fn test_jwt_config() -> JwtConfig {
    JwtConfig {
        secret: "test-secret-that-is-long-enough-for-hs256".to_string(),
        access_token_expiry_mins: 15,
        refresh_token_expiry_days: 7,
    }
}

/// Safe defaults: no Redis, no S3, no AI key, rate limiting off.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 5,
        jwt: test_jwt_config(),
        rate_limit: RateLimitConfig {
            enabled: false,
            ..RateLimitConfig::default()
        },
        storage: StorageConfig {
            upload_dir: std::env::temp_dir().join(format!("propdesk-test-{}", uuid::Uuid::new_v4())),
            max_upload_bytes: MAX_UPLOAD_BYTES,
            s3_bucket: None,
            s3_public_base_url: None,
            s3_endpoint: None,
        },
        ai: AiConfig {
            api_key: None,
            model: DEFAULT_AI_MODEL.to_string(),
            base_url: DEFAULT_AI_BASE_URL.to_string(),
        },
        billing: BillingConfig {
            webhook_secret: Some(TEST_WEBHOOK_SECRET.to_string()),
        },
        housekeeping: HousekeepingConfig::default(),
    }
}

/// Build the full application router, sharing the production middleware
/// stack via [`build_app_router`].
pub fn build_test_app(pool: PgPool) -> Router {
    build_test_app_with(pool, test_config())
}

pub fn build_test_app_with(pool: PgPool, config: ServerConfig) -> Router {
    build_app_router(test_state(pool, config))
}

pub fn test_state(pool: PgPool, config: ServerConfig) -> AppState {
    let upload_dir: PathBuf = config.storage.upload_dir.clone();
    let storage = FallbackStorage::local_only(LocalStorage::new(upload_dir, LOCAL_UPLOADS_PATH));
    AppState {
        pool,
        rate_limiter: Arc::new(RateLimiter::in_memory(config.rate_limit.clone())),
        config: Arc::new(config),
        event_bus: Arc::new(EventBus::new(64)),
        storage: Arc::new(storage),
        ai: None,
    }
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

/// Insert an active user with [`TEST_PASSWORD`].
pub async fn create_user(pool: &PgPool, email: &str, role: &str) -> User {
    let input = CreateUser {
        email: email.to_string(),
        password_hash: hash_password(TEST_PASSWORD).expect("hashing should succeed"),
        first_name: "Test".to_string(),
        last_name: role.to_string(),
        phone: None,
        role: role.to_string(),
    };
    UserRepo::create(pool, &input)
        .await
        .expect("user creation should succeed")
}

pub fn token_for(user: &User) -> String {
    generate_access_token(user.id, &user.role, &test_jwt_config())
        .expect("token generation should succeed")
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

pub async fn send(app: Router, request: Request<Body>) -> Response<Body> {
    app.oneshot(request).await.expect("router is infallible")
}

fn request(method: Method, uri: &str, token: Option<&str>, body: Option<serde_json::Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
    }
    match body {
        Some(json) => builder
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    send(app, request(Method::GET, uri, None, None)).await
}

pub async fn get_auth(app: Router, uri: &str, token: &str) -> Response<Body> {
    send(app, request(Method::GET, uri, Some(token), None)).await
}

pub async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> Response<Body> {
    send(app, request(Method::POST, uri, None, Some(body))).await
}

pub async fn post_json_auth(
    app: Router,
    uri: &str,
    token: &str,
    body: serde_json::Value,
) -> Response<Body> {
    send(app, request(Method::POST, uri, Some(token), Some(body))).await
}

pub async fn post_auth(app: Router, uri: &str, token: &str) -> Response<Body> {
    send(app, request(Method::POST, uri, Some(token), None)).await
}

pub async fn put_json_auth(
    app: Router,
    uri: &str,
    token: &str,
    body: serde_json::Value,
) -> Response<Body> {
    send(app, request(Method::PUT, uri, Some(token), Some(body))).await
}

pub async fn delete_auth(app: Router, uri: &str, token: &str) -> Response<Body> {
    send(app, request(Method::DELETE, uri, Some(token), None)).await
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body should be readable")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("body should be JSON")
}

/// Create a property through the API and return its id.
pub async fn create_property(app: Router, token: &str, name: &str) -> i64 {
    let response = post_json_auth(
        app,
        "/api/properties",
        token,
        serde_json::json!({
            "name": name,
            "address_line1": "1 Main Street",
            "city": "Springfield",
            "country": "US",
        }),
    )
    .await;
    assert_eq!(response.status(), axum::http::StatusCode::CREATED);
    body_json(response).await["data"]["id"]
        .as_i64()
        .expect("property id")
}
