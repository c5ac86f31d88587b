//! Job and inspection lifecycles over HTTP.

mod common;

use axum::http::StatusCode;
use common::{
    body_json, create_property, create_user, get_auth, post_auth, post_json_auth, token_for,
};
use serde_json::json;
use sqlx::PgPool;

async fn create_job(pool: &PgPool, token: &str, property_id: i64) -> i64 {
    let response = post_json_auth(
        common::build_test_app(pool.clone()),
        "/api/jobs",
        token,
        json!({ "property_id": property_id, "title": "Fix boiler" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    assert_eq!(json["data"]["status"], "OPEN");
    assert_eq!(json["data"]["priority"], "MEDIUM");
    json["data"]["id"].as_i64().unwrap()
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn job_runs_from_open_to_completed(pool: PgPool) {
    let manager = create_user(&pool, "pm@example.com", "property_manager").await;
    let tech = create_user(&pool, "tech@example.com", "technician").await;
    let pm_token = token_for(&manager);
    let tech_token = token_for(&tech);
    let property_id = create_property(common::build_test_app(pool.clone()), &pm_token, "Block A").await;
    let job_id = create_job(&pool, &pm_token, property_id).await;

    // Unassigned technicians cannot see the job.
    let response = get_auth(
        common::build_test_app(pool.clone()),
        &format!("/api/jobs/{job_id}"),
        &tech_token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = post_json_auth(
        common::build_test_app(pool.clone()),
        &format!("/api/jobs/{job_id}/assign"),
        &pm_token,
        json!({ "technician_id": tech.id }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["status"], "ASSIGNED");
    assert_eq!(json["data"]["assigned_to"], tech.id);

    let response = get_auth(
        common::build_test_app(pool.clone()),
        &format!("/api/jobs/{job_id}"),
        &tech_token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = post_json_auth(
        common::build_test_app(pool.clone()),
        &format!("/api/jobs/{job_id}/status"),
        &tech_token,
        json!({ "status": "IN_PROGRESS" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["status"], "IN_PROGRESS");
    assert!(json["data"]["started_at"].is_string());

    let response = post_json_auth(
        common::build_test_app(pool.clone()),
        &format!("/api/jobs/{job_id}/status"),
        &tech_token,
        json!({ "status": "COMPLETED", "actual_cost_cents": 12500 }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["status"], "COMPLETED");
    assert_eq!(json["data"]["actual_cost_cents"], 12500);
    assert!(json["data"]["completed_at"].is_string());

    // Terminal.
    let response = post_json_auth(
        common::build_test_app(pool),
        &format!("/api/jobs/{job_id}/status"),
        &pm_token,
        json!({ "status": "CANCELLED" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(body_json(response).await["code"], "INVALID_STATUS_TRANSITION");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn assignment_states_go_through_assign(pool: PgPool) {
    let manager = create_user(&pool, "pm@example.com", "property_manager").await;
    let token = token_for(&manager);
    let property_id = create_property(common::build_test_app(pool.clone()), &token, "Block B").await;
    let job_id = create_job(&pool, &token, property_id).await;

    let response = post_json_auth(
        common::build_test_app(pool.clone()),
        &format!("/api/jobs/{job_id}/status"),
        &token,
        json!({ "status": "ASSIGNED" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Skipping ASSIGNED is not a legal move.
    let response = post_json_auth(
        common::build_test_app(pool),
        &format!("/api/jobs/{job_id}/status"),
        &token,
        json!({ "status": "COMPLETED" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn assigning_requires_a_technician(pool: PgPool) {
    let manager = create_user(&pool, "pm@example.com", "property_manager").await;
    let tenant = create_user(&pool, "tenant@example.com", "tenant").await;
    let token = token_for(&manager);
    let property_id = create_property(common::build_test_app(pool.clone()), &token, "Block C").await;
    let job_id = create_job(&pool, &token, property_id).await;

    let response = post_json_auth(
        common::build_test_app(pool),
        &format!("/api/jobs/{job_id}/assign"),
        &token,
        json!({ "technician_id": tenant.id }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn other_technicians_cannot_progress_a_job(pool: PgPool) {
    let manager = create_user(&pool, "pm@example.com", "property_manager").await;
    let assigned = create_user(&pool, "tech1@example.com", "technician").await;
    let other = create_user(&pool, "tech2@example.com", "technician").await;
    let pm_token = token_for(&manager);
    let property_id = create_property(common::build_test_app(pool.clone()), &pm_token, "Block D").await;
    let job_id = create_job(&pool, &pm_token, property_id).await;

    let response = post_json_auth(
        common::build_test_app(pool.clone()),
        &format!("/api/jobs/{job_id}/assign"),
        &pm_token,
        json!({ "technician_id": assigned.id }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    // The assigned technician is related to the property now, the other one
    // is not.
    let response = post_json_auth(
        common::build_test_app(pool),
        &format!("/api/jobs/{job_id}/status"),
        &token_for(&other),
        json!({ "status": "IN_PROGRESS" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn inspection_lifecycle(pool: PgPool) {
    let manager = create_user(&pool, "pm@example.com", "property_manager").await;
    let token = token_for(&manager);
    let property_id = create_property(common::build_test_app(pool.clone()), &token, "Block E").await;

    let response = post_json_auth(
        common::build_test_app(pool.clone()),
        "/api/inspections",
        &token,
        json!({
            "property_id": property_id,
            "scheduled_date": "2030-05-01T09:00:00Z",
        }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    assert_eq!(json["data"]["status"], "SCHEDULED");
    let id = json["data"]["id"].as_i64().unwrap();

    // Cannot complete before starting.
    let response = post_auth(
        common::build_test_app(pool.clone()),
        &format!("/api/inspections/{id}/complete"),
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = post_auth(
        common::build_test_app(pool.clone()),
        &format!("/api/inspections/{id}/start"),
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"]["status"], "IN_PROGRESS");

    let response = post_json_auth(
        common::build_test_app(pool.clone()),
        &format!("/api/inspections/{id}/complete"),
        &token,
        json!({ "findings": "Damp in the north bedroom" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["status"], "COMPLETED");
    assert_eq!(json["data"]["findings"], "Damp in the north bedroom");

    let response = post_auth(
        common::build_test_app(pool),
        &format!("/api/inspections/{id}/cancel"),
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn inspection_needs_a_unit_of_the_same_property(pool: PgPool) {
    let manager = create_user(&pool, "pm@example.com", "property_manager").await;
    let token = token_for(&manager);
    let property_id = create_property(common::build_test_app(pool.clone()), &token, "Block F").await;

    let response = post_json_auth(
        common::build_test_app(pool),
        "/api/inspections",
        &token,
        json!({
            "property_id": property_id,
            "unit_id": 999_999,
            "scheduled_date": "2030-05-01T09:00:00Z",
        }),
    )
    .await;
    assert!(response.status().is_client_error());
}
