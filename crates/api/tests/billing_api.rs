//! Plan catalog, plan changes and the signed billing webhook.

mod common;

use axum::body::Body;
use axum::http::header::CONTENT_TYPE;
use axum::http::{Method, Request, StatusCode};
use chrono::Utc;
use common::{
    body_json, create_property, create_user, get, get_auth, post_json, post_json_auth, token_for,
    TEST_PASSWORD, TEST_WEBHOOK_SECRET,
};
use propdesk_api::handlers::billing::WEBHOOK_SIGNATURE_HEADER;
use propdesk_core::billing::sign_webhook;
use serde_json::json;
use sqlx::PgPool;

fn webhook_request(payload: &serde_json::Value, signature: &str) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri("/api/billing/webhook")
        .header(CONTENT_TYPE, "application/json")
        .header(WEBHOOK_SIGNATURE_HEADER, signature)
        .body(Body::from(payload.to_string()))
        .unwrap()
}

fn signed(payload: &serde_json::Value) -> String {
    sign_webhook(
        TEST_WEBHOOK_SECRET,
        Utc::now().timestamp(),
        payload.to_string().as_bytes(),
    )
}

/// Register a manager through the API so a trial subscription exists.
async fn register_manager(pool: &PgPool, email: &str) -> (i64, String) {
    let response = post_json(
        common::build_test_app(pool.clone()),
        "/api/auth/register",
        json!({
            "email": email,
            "password": TEST_PASSWORD,
            "first_name": "Pat",
            "last_name": "Manager",
        }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    (
        json["user"]["id"].as_i64().unwrap(),
        json["access_token"].as_str().unwrap().to_string(),
    )
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn plans_are_public(pool: PgPool) {
    let response = get(common::build_test_app(pool), "/api/billing/plans").await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    let plans = json["data"].as_array().unwrap();
    assert_eq!(plans.len(), 4);
    assert_eq!(plans[0]["plan"], "free");
    assert_eq!(plans[0]["max_properties"], 1);
    assert!(plans[3]["max_properties"].is_null());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn trial_counts_as_basic(pool: PgPool) {
    let (_, token) = register_manager(&pool, "trial@example.com").await;

    let response = get_auth(
        common::build_test_app(pool),
        "/api/billing/subscription",
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["subscription"]["status"], "trialing");
    assert_eq!(json["data"]["effective_plan"]["plan"], "basic");
    assert_eq!(json["data"]["property_count"], 0);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn downgrade_is_refused_when_over_the_limit(pool: PgPool) {
    let manager = create_user(&pool, "pm@example.com", "property_manager").await;
    let token = token_for(&manager);

    let response = post_json_auth(
        common::build_test_app(pool.clone()),
        "/api/billing/subscription",
        &token,
        json!({ "plan": "professional", "billing_interval": "annual" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["plan"], "professional");
    assert_eq!(json["data"]["status"], "active");

    create_property(common::build_test_app(pool.clone()), &token, "One").await;
    create_property(common::build_test_app(pool.clone()), &token, "Two").await;

    let response = post_json_auth(
        common::build_test_app(pool),
        "/api/billing/subscription",
        &token,
        json!({ "plan": "free" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(body_json(response).await["code"], "PLAN_LIMIT_REACHED");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn webhook_rejects_bad_signatures(pool: PgPool) {
    let payload = json!({ "type": "invoice.paid", "data": { "user_id": 1 } });
    let bad = sign_webhook("wrong-secret", Utc::now().timestamp(), payload.to_string().as_bytes());

    let response = common::send(
        common::build_test_app(pool.clone()),
        webhook_request(&payload, &bad),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let unsigned = Request::builder()
        .method(Method::POST)
        .uri("/api/billing/webhook")
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(payload.to_string()))
        .unwrap();
    let response = common::send(common::build_test_app(pool), unsigned).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn webhook_activates_a_subscription(pool: PgPool) {
    let (user_id, token) = register_manager(&pool, "paying@example.com").await;

    let payload = json!({
        "type": "invoice.paid",
        "data": {
            "user_id": user_id,
            "customer_id": "cus_123",
            "subscription_id": "sub_123",
            "plan": "professional",
            "interval": "monthly",
        }
    });
    let response = common::send(
        common::build_test_app(pool.clone()),
        webhook_request(&payload, &signed(&payload)),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["received"], true);
    assert_eq!(json["applied"], true);

    let response = get_auth(
        common::build_test_app(pool.clone()),
        "/api/billing/subscription",
        &token,
    )
    .await;
    let json = body_json(response).await;
    assert_eq!(json["data"]["subscription"]["status"], "active");
    assert_eq!(json["data"]["effective_plan"]["plan"], "professional");

    // Later events can find it by the provider's subscription id alone.
    let payload = json!({
        "type": "invoice.payment_failed",
        "data": { "subscription_id": "sub_123" }
    });
    let response = common::send(
        common::build_test_app(pool.clone()),
        webhook_request(&payload, &signed(&payload)),
    )
    .await;
    assert_eq!(body_json(response).await["applied"], true);

    let response = get_auth(
        common::build_test_app(pool),
        "/api/billing/subscription",
        &token,
    )
    .await;
    assert_eq!(
        body_json(response).await["data"]["subscription"]["status"],
        "past_due"
    );
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn unknown_webhook_events_are_acknowledged(pool: PgPool) {
    let payload = json!({ "type": "customer.updated", "data": {} });
    let response = common::send(
        common::build_test_app(pool),
        webhook_request(&payload, &signed(&payload)),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["received"], true);
    assert_eq!(json["applied"], false);
}
