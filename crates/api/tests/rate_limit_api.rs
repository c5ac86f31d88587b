//! Rate limiting through the full middleware stack. One router is reused
//! so the in-memory counters persist between requests.

mod common;

use axum::body::Body;
use axum::http::header::{CONTENT_TYPE, RETRY_AFTER};
use axum::http::{Method, Request, StatusCode};
use common::{create_user, TEST_PASSWORD};
use propdesk_api::config::RateLimitConfig;
use propdesk_api::middleware::rate_limit::{HEADER_LIMIT, HEADER_REMAINING};
use propdesk_core::rate_limit::RateLimitPolicy;
use serde_json::json;
use sqlx::PgPool;

fn login_request(email: &str, client_ip: &str) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri("/api/auth/login")
        .header(CONTENT_TYPE, "application/json")
        .header("x-forwarded-for", client_ip)
        .body(Body::from(
            json!({ "email": email, "password": TEST_PASSWORD }).to_string(),
        ))
        .unwrap()
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn auth_routes_are_limited_per_client(pool: PgPool) {
    create_user(&pool, "pm@example.com", "property_manager").await;
    let mut config = common::test_config();
    config.rate_limit = RateLimitConfig {
        enabled: true,
        auth: RateLimitPolicy::AUTH.with_points(2),
        ..RateLimitConfig::default()
    };
    let app = common::build_test_app_with(pool, config);

    for remaining in ["1", "0"] {
        let response = common::send(app.clone(), login_request("pm@example.com", "10.0.0.1")).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[HEADER_LIMIT], "2");
        assert_eq!(response.headers()[HEADER_REMAINING], remaining);
    }

    let response = common::send(app.clone(), login_request("pm@example.com", "10.0.0.1")).await;
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(response.headers().contains_key(RETRY_AFTER));
    assert_eq!(common::body_json(response).await["code"], "RATE_LIMITED");

    // A different client has its own window.
    let response = common::send(app, login_request("pm@example.com", "10.0.0.2")).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn health_is_not_limited(pool: PgPool) {
    let mut config = common::test_config();
    config.rate_limit = RateLimitConfig {
        enabled: true,
        api: RateLimitPolicy::API.with_points(1),
        ..RateLimitConfig::default()
    };
    let app = common::build_test_app_with(pool, config);

    for _ in 0..3 {
        let response = common::get(app.clone(), "/health").await;
        assert_eq!(response.status(), StatusCode::OK);
    }
}
