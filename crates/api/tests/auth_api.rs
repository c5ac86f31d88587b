//! HTTP-level tests for registration, login, refresh, logout and profile.

mod common;

use axum::http::StatusCode;
use common::{
    body_json, create_user, get_auth, post_auth, post_json, post_json_auth, put_json_auth,
    TEST_PASSWORD,
};
use propdesk_db::repositories::SubscriptionRepo;
use serde_json::json;
use sqlx::PgPool;

async fn login(app: axum::Router, email: &str, password: &str) -> axum::response::Response {
    post_json(app, "/api/auth/login", json!({ "email": email, "password": password })).await
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn register_manager_starts_trial(pool: PgPool) {
    let app = common::build_test_app(pool.clone());
    let response = post_json(
        app,
        "/api/auth/register",
        json!({
            "email": "Alice@Example.com",
            "password": "s3cure-password",
            "first_name": "Alice",
            "last_name": "Manager",
        }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    assert!(json["access_token"].is_string());
    assert!(json["refresh_token"].is_string());
    assert_eq!(json["user"]["email"], "alice@example.com");
    assert_eq!(json["user"]["role"], "property_manager");
    assert!(json["user"].get("password_hash").is_none());

    let user_id = json["user"]["id"].as_i64().unwrap();
    let subscription = SubscriptionRepo::find_by_user(&pool, user_id)
        .await
        .unwrap()
        .expect("trial subscription");
    assert_eq!(subscription.status, "trialing");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn register_rejects_admin_role(pool: PgPool) {
    let app = common::build_test_app(pool);
    let response = post_json(
        app,
        "/api/auth/register",
        json!({
            "email": "mallory@example.com",
            "password": "s3cure-password",
            "first_name": "Mallory",
            "last_name": "Admin",
            "role": "admin",
        }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn register_rejects_weak_password_and_duplicate_email(pool: PgPool) {
    create_user(&pool, "taken@example.com", "tenant").await;

    let weak = post_json(
        common::build_test_app(pool.clone()),
        "/api/auth/register",
        json!({
            "email": "new@example.com",
            "password": "short",
            "first_name": "New",
            "last_name": "User",
        }),
    )
    .await;
    assert_eq!(weak.status(), StatusCode::BAD_REQUEST);

    let duplicate = post_json(
        common::build_test_app(pool),
        "/api/auth/register",
        json!({
            "email": "taken@example.com",
            "password": "s3cure-password",
            "first_name": "Dup",
            "last_name": "User",
            "role": "tenant",
        }),
    )
    .await;
    assert_eq!(duplicate.status(), StatusCode::CONFLICT);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn login_success_and_wrong_password(pool: PgPool) {
    let user = create_user(&pool, "bob@example.com", "owner").await;

    let ok = login(common::build_test_app(pool.clone()), "bob@example.com", TEST_PASSWORD).await;
    assert_eq!(ok.status(), StatusCode::OK);
    let json = body_json(ok).await;
    assert_eq!(json["user"]["id"], user.id);
    assert!(json["expires_in"].as_i64().unwrap() > 0);

    let wrong = login(common::build_test_app(pool), "bob@example.com", "nope-nope-1").await;
    assert_eq!(wrong.status(), StatusCode::UNAUTHORIZED);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn repeated_failures_lock_the_account(pool: PgPool) {
    create_user(&pool, "locked@example.com", "tenant").await;

    for _ in 0..5 {
        let response = login(
            common::build_test_app(pool.clone()),
            "locked@example.com",
            "wrong-password-1",
        )
        .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    // Even the right password is refused while locked.
    let response = login(common::build_test_app(pool), "locked@example.com", TEST_PASSWORD).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn refresh_rotates_and_old_token_stops_working(pool: PgPool) {
    create_user(&pool, "carol@example.com", "technician").await;
    let json = body_json(
        login(common::build_test_app(pool.clone()), "carol@example.com", TEST_PASSWORD).await,
    )
    .await;
    let original = json["refresh_token"].as_str().unwrap().to_string();

    let response = post_json(
        common::build_test_app(pool.clone()),
        "/api/auth/refresh",
        json!({ "refresh_token": original }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let rotated = body_json(response).await;
    assert_ne!(rotated["refresh_token"].as_str().unwrap(), original);

    let reused = post_json(
        common::build_test_app(pool),
        "/api/auth/refresh",
        json!({ "refresh_token": original }),
    )
    .await;
    assert_eq!(reused.status(), StatusCode::UNAUTHORIZED);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn logout_revokes_refresh_tokens(pool: PgPool) {
    create_user(&pool, "dave@example.com", "owner").await;
    let json = body_json(
        login(common::build_test_app(pool.clone()), "dave@example.com", TEST_PASSWORD).await,
    )
    .await;
    let access = json["access_token"].as_str().unwrap();
    let refresh = json["refresh_token"].as_str().unwrap();

    let response = post_auth(common::build_test_app(pool.clone()), "/api/auth/logout", access).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = post_json(
        common::build_test_app(pool),
        "/api/auth/refresh",
        json!({ "refresh_token": refresh }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn me_returns_and_updates_profile(pool: PgPool) {
    let user = create_user(&pool, "erin@example.com", "tenant").await;
    let token = common::token_for(&user);

    let response = get_auth(common::build_test_app(pool.clone()), "/api/auth/me", &token).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"]["email"], "erin@example.com");

    let response = put_json_auth(
        common::build_test_app(pool),
        "/api/auth/me",
        &token,
        json!({ "first_name": "  Erin  ", "phone": "555-0100" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["first_name"], "Erin");
    assert_eq!(json["data"]["phone"], "555-0100");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn change_password_requires_current_password(pool: PgPool) {
    let user = create_user(&pool, "frank@example.com", "owner").await;
    let token = common::token_for(&user);

    let response = post_json_auth(
        common::build_test_app(pool.clone()),
        "/api/auth/change-password",
        &token,
        json!({ "current_password": "not-it-123", "new_password": "brand-new-pass-9" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = post_json_auth(
        common::build_test_app(pool.clone()),
        "/api/auth/change-password",
        &token,
        json!({ "current_password": TEST_PASSWORD, "new_password": "brand-new-pass-9" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = login(common::build_test_app(pool), "frank@example.com", "brand-new-pass-9").await;
    assert_eq!(response.status(), StatusCode::OK);
}
