//! Multipart uploads against local storage.

mod common;

use axum::body::Body;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{Method, Request, StatusCode};
use common::{body_json, create_property, create_user, delete_auth, get, get_auth, token_for};
use sqlx::PgPool;

const BOUNDARY: &str = "propdesk-test-boundary";
const PDF_BYTES: &[u8] = b"%PDF-1.4\n1 0 obj\n<<>>\nendobj\n%%EOF\n";

fn multipart_body(entity_type: &str, entity_id: i64, file_name: &str, declared: &str, bytes: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, value) in [("entity_type", entity_type.to_string()), ("entity_id", entity_id.to_string())] {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\nContent-Type: {declared}\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
    body
}

fn upload_request(token: &str, body: Vec<u8>) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri("/api/v2/uploads")
        .header(AUTHORIZATION, format!("Bearer {token}"))
        .header(CONTENT_TYPE, format!("multipart/form-data; boundary={BOUNDARY}"))
        .body(Body::from(body))
        .unwrap()
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn upload_serve_and_delete(pool: PgPool) {
    let config = common::test_config();
    let upload_dir = config.storage.upload_dir.clone();
    let manager = create_user(&pool, "pm@example.com", "property_manager").await;
    let token = token_for(&manager);
    let property_id = create_property(common::build_test_app(pool.clone()), &token, "Docs").await;

    let body = multipart_body("property", property_id, "Floor Plan.pdf", "application/pdf", PDF_BYTES);
    let response = common::send(
        common::build_test_app_with(pool.clone(), config.clone()),
        upload_request(&token, body),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    let upload = &json["data"];
    assert_eq!(upload["content_type"], "application/pdf");
    assert_eq!(upload["storage_backend"], "local");
    assert_eq!(upload["size_bytes"], PDF_BYTES.len());
    assert_eq!(upload["owner_id"], manager.id);
    let id = upload["id"].as_i64().unwrap();
    let key = upload["storage_key"].as_str().unwrap().to_string();
    let url = upload["url"].as_str().unwrap().to_string();
    assert!(key.starts_with(&format!("property/{property_id}/")));
    assert!(upload_dir.join(&key).exists());

    // Local files are served under the public prefix.
    let response = get(common::build_test_app_with(pool.clone(), config.clone()), &url).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = get_auth(
        common::build_test_app_with(pool.clone(), config.clone()),
        &format!("/api/v2/uploads?entity_type=property&entity_id={property_id}"),
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"].as_array().unwrap().len(), 1);

    let response = delete_auth(
        common::build_test_app_with(pool.clone(), config.clone()),
        &format!("/api/v2/uploads/{id}"),
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert!(!upload_dir.join(&key).exists());

    let response = delete_auth(
        common::build_test_app_with(pool, config),
        &format!("/api/v2/uploads/{id}"),
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let _ = std::fs::remove_dir_all(&upload_dir);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn declared_type_must_match_contents(pool: PgPool) {
    let manager = create_user(&pool, "pm@example.com", "property_manager").await;
    let token = token_for(&manager);
    let property_id = create_property(common::build_test_app(pool.clone()), &token, "Docs").await;

    let body = multipart_body("property", property_id, "photo.png", "image/png", PDF_BYTES);
    let response = common::send(common::build_test_app(pool), upload_request(&token, body)).await;
    assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn unknown_formats_are_rejected(pool: PgPool) {
    let manager = create_user(&pool, "pm@example.com", "property_manager").await;
    let token = token_for(&manager);
    let property_id = create_property(common::build_test_app(pool.clone()), &token, "Docs").await;

    let body = multipart_body("property", property_id, "notes.txt", "text/plain", b"just text");
    let response = common::send(common::build_test_app(pool), upload_request(&token, body)).await;
    assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn uploads_need_access_to_the_entity(pool: PgPool) {
    let owner_pm = create_user(&pool, "pm1@example.com", "property_manager").await;
    let other_pm = create_user(&pool, "pm2@example.com", "property_manager").await;
    let property_id =
        create_property(common::build_test_app(pool.clone()), &token_for(&owner_pm), "Private").await;

    let body = multipart_body("property", property_id, "plan.pdf", "application/pdf", PDF_BYTES);
    let response = common::send(
        common::build_test_app(pool.clone()),
        upload_request(&token_for(&other_pm), body),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let body = multipart_body("invoice", property_id, "plan.pdf", "application/pdf", PDF_BYTES);
    let response = common::send(
        common::build_test_app(pool),
        upload_request(&token_for(&owner_pm), body),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn list_requires_both_entity_params(pool: PgPool) {
    let manager = create_user(&pool, "pm@example.com", "property_manager").await;
    let response = get_auth(
        common::build_test_app(pool),
        "/api/v2/uploads?entity_type=property",
        &token_for(&manager),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn failed_storage_delete_keeps_the_row(pool: PgPool) {
    let manager = create_user(&pool, "pm@example.com", "property_manager").await;
    let token = token_for(&manager);
    let property_id = create_property(common::build_test_app(pool.clone()), &token, "Vault").await;

    // Recorded as a cloud object, but this app only has local storage.
    let upload_id: i64 = sqlx::query_scalar(
        "INSERT INTO uploads (owner_id, entity_type, entity_id, file_name, content_type,
                              size_bytes, storage_backend, storage_key, url)
         VALUES ($1, 'property', $2, 'lease.pdf', 'application/pdf', 10, 'cloud',
                 'property/1/lease.pdf', 'https://cdn.example.com/lease.pdf')
         RETURNING id",
    )
    .bind(manager.id)
    .bind(property_id)
    .fetch_one(&pool)
    .await
    .unwrap();

    let response = delete_auth(
        common::build_test_app(pool.clone()),
        &format!("/api/v2/uploads/{upload_id}"),
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_json(response).await["code"], "INTERNAL_ERROR");

    let remaining: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM uploads WHERE id = $1")
        .bind(upload_id)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(remaining, 1);
}
