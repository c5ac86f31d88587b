//! Service requests from tenant submission to a completed job.

mod common;

use axum::http::StatusCode;
use common::{
    body_json, create_property, create_user, get_auth, post_auth, post_json_auth, put_json_auth,
    token_for,
};
use propdesk_db::models::user::User;
use serde_json::json;
use sqlx::PgPool;

struct Fixture {
    manager_token: String,
    tenant: User,
    property_id: i64,
    unit_id: i64,
}

/// A manager with one property and one unit occupied by a tenant.
async fn setup(pool: &PgPool) -> Fixture {
    let manager = create_user(pool, "pm@example.com", "property_manager").await;
    let tenant = create_user(pool, "tenant@example.com", "tenant").await;
    let manager_token = token_for(&manager);
    let property_id =
        create_property(common::build_test_app(pool.clone()), &manager_token, "Rowan House").await;

    let response = post_json_auth(
        common::build_test_app(pool.clone()),
        &format!("/api/properties/{property_id}/units"),
        &manager_token,
        json!({ "unit_number": "3" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let unit_id = body_json(response).await["data"]["id"].as_i64().unwrap();

    let response = put_json_auth(
        common::build_test_app(pool.clone()),
        &format!("/api/units/{unit_id}/tenant"),
        &manager_token,
        json!({ "tenant_id": tenant.id }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    Fixture {
        manager_token,
        tenant,
        property_id,
        unit_id,
    }
}

async fn submit(pool: &PgPool, fx: &Fixture) -> i64 {
    let response = post_json_auth(
        common::build_test_app(pool.clone()),
        "/api/service-requests",
        &token_for(&fx.tenant),
        json!({
            "property_id": fx.property_id,
            "unit_id": fx.unit_id,
            "title": "Leaking tap",
            "description": "Kitchen tap drips constantly",
            "category": "PLUMBING",
        }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    assert_eq!(json["data"]["status"], "SUBMITTED");
    assert_eq!(json["data"]["requested_by"], fx.tenant.id);
    json["data"]["id"].as_i64().unwrap()
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn approved_request_becomes_a_job(pool: PgPool) {
    let fx = setup(&pool).await;
    let id = submit(&pool, &fx).await;

    let response = post_json_auth(
        common::build_test_app(pool.clone()),
        &format!("/api/service-requests/{id}/review"),
        &fx.manager_token,
        json!({ "status": "APPROVED", "review_notes": "Plumber this week" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["status"], "APPROVED");
    assert_eq!(json["data"]["review_notes"], "Plumber this week");

    let response = post_auth(
        common::build_test_app(pool.clone()),
        &format!("/api/service-requests/{id}/convert"),
        &fx.manager_token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    assert_eq!(json["data"]["service_request"]["status"], "CONVERTED_TO_JOB");
    assert_eq!(json["data"]["job"]["title"], "Leaking tap");
    assert_eq!(json["data"]["job"]["service_request_id"], id);
    assert_eq!(
        json["data"]["service_request"]["job_id"],
        json["data"]["job"]["id"]
    );

    let again = post_auth(
        common::build_test_app(pool),
        &format!("/api/service-requests/{id}/convert"),
        &fx.manager_token,
    )
    .await;
    assert_eq!(again.status(), StatusCode::CONFLICT);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn completing_the_job_completes_the_request(pool: PgPool) {
    let fx = setup(&pool).await;
    let tech = create_user(&pool, "tech@example.com", "technician").await;
    let id = submit(&pool, &fx).await;

    let response = post_json_auth(
        common::build_test_app(pool.clone()),
        &format!("/api/service-requests/{id}/review"),
        &fx.manager_token,
        json!({ "status": "APPROVED" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = post_json_auth(
        common::build_test_app(pool.clone()),
        &format!("/api/service-requests/{id}/convert"),
        &fx.manager_token,
        json!({ "assigned_to": tech.id, "priority": "HIGH" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    assert_eq!(json["data"]["job"]["status"], "ASSIGNED");
    assert_eq!(json["data"]["job"]["priority"], "HIGH");
    let job_id = json["data"]["job"]["id"].as_i64().unwrap();

    let tech_token = token_for(&tech);
    for status in ["IN_PROGRESS", "COMPLETED"] {
        let response = post_json_auth(
            common::build_test_app(pool.clone()),
            &format!("/api/jobs/{job_id}/status"),
            &tech_token,
            json!({ "status": status }),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = get_auth(
        common::build_test_app(pool),
        &format!("/api/service-requests/{id}"),
        &token_for(&fx.tenant),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"]["status"], "COMPLETED");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn other_tenants_cannot_see_the_request(pool: PgPool) {
    let fx = setup(&pool).await;
    let stranger = create_user(&pool, "other@example.com", "tenant").await;
    let id = submit(&pool, &fx).await;

    let response = get_auth(
        common::build_test_app(pool.clone()),
        &format!("/api/service-requests/{id}"),
        &token_for(&stranger),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    // Nor file one against a property they do not live in.
    let response = post_json_auth(
        common::build_test_app(pool),
        "/api/service-requests",
        &token_for(&stranger),
        json!({
            "property_id": fx.property_id,
            "title": "Noise",
            "description": "Upstairs neighbours",
        }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn requester_cancels_only_before_review(pool: PgPool) {
    let fx = setup(&pool).await;
    let tenant_token = token_for(&fx.tenant);

    let first = submit(&pool, &fx).await;
    let response = post_auth(
        common::build_test_app(pool.clone()),
        &format!("/api/service-requests/{first}/cancel"),
        &tenant_token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"]["status"], "CANCELLED");

    let second = submit(&pool, &fx).await;
    // The manager may not withdraw someone else's request.
    let response = post_auth(
        common::build_test_app(pool.clone()),
        &format!("/api/service-requests/{second}/cancel"),
        &fx.manager_token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = post_json_auth(
        common::build_test_app(pool.clone()),
        &format!("/api/service-requests/{second}/review"),
        &fx.manager_token,
        json!({ "status": "APPROVED" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = post_auth(
        common::build_test_app(pool),
        &format!("/api/service-requests/{second}/cancel"),
        &tenant_token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn review_rejects_non_review_statuses(pool: PgPool) {
    let fx = setup(&pool).await;
    let id = submit(&pool, &fx).await;

    let response = post_json_auth(
        common::build_test_app(pool),
        &format!("/api/service-requests/{id}/review"),
        &fx.manager_token,
        json!({ "status": "COMPLETED" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
