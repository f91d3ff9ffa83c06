//! Mobile upload flow: token issuance, document upload, status polling and completion.

mod helpers;

use axum::http::StatusCode;
use chrono::{Duration, Utc};
use fleetdesk_api::services::upload_token::TokenAccess;
use fleetdesk_core::models::{EntityKind, ProcessingStatus, UploadStatus};
use helpers::auth::bearer;
use helpers::fixtures::{
    assert_error, create_car, create_client, document_form, id_of, issue_token, minimal_pdf_bytes,
    minimal_png_bytes, mobile_complete, mobile_status, mobile_upload, png_form,
};
use helpers::{api_path, setup_test_app, TestApp};
use serde_json::Value;
use uuid::Uuid;

const INVALID_TOKEN: &str = "Invalid or expired upload token";

async fn token_id(app: &TestApp, kind: EntityKind, token: &str) -> Uuid {
    app.state
        .upload_tokens
        .verify(kind, token, TokenAccess::Read, Utc::now())
        .await
        .expect("token verifies")
        .id
}

#[tokio::test]
async fn test_car_upload_happy_path() {
    let app = setup_test_app().await;
    let server = app.client();
    let car = create_car(server, "AB-123-CD", 45.0).await;
    let car_id = id_of(&car);

    let response = server
        .post(&api_path(&format!("/cars/{}/upload-token", car_id)))
        .add_header("Authorization", bearer())
        .await;
    assert_eq!(response.status_code(), StatusCode::CREATED);
    let issued: Value = response.json();
    let token = issued["token"].as_str().unwrap().to_string();
    assert_eq!(
        issued["upload_url"],
        format!("https://desk.example.com/mobile-upload/car?token={}", token)
    );
    assert!(issued["qr_code"]
        .as_str()
        .unwrap()
        .starts_with("data:image/svg+xml;base64,"));
    assert_eq!(app.store.token_count(EntityKind::Car, car_id), 1);

    let status: Value = mobile_status(server, "car-uploads", &token).await.json();
    assert_eq!(status["status"], "pending");
    assert_eq!(status["used"], false);
    assert_eq!(
        status["missing_core"],
        serde_json::json!(["registration", "insurance", "inspection"])
    );

    let response = mobile_upload(server, "car-uploads", &token, png_form("registration")).await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(body["success"], true);
    assert_eq!(body["document_type"], "registration");
    assert_eq!(body["status"], "uploading");

    let response = mobile_upload(server, "car-uploads", &token, png_form("photo")).await;
    assert_eq!(response.json::<Value>()["status"], "uploading");

    let response = mobile_upload(
        server,
        "car-uploads",
        &token,
        document_form(
            Some("insurance"),
            minimal_pdf_bytes(),
            "insurance.pdf",
            "application/pdf",
        ),
    )
    .await;
    assert_eq!(response.json::<Value>()["status"], "uploading");

    let response = mobile_upload(server, "car-uploads", &token, png_form("inspection")).await;
    let body: Value = response.json();
    assert_eq!(body["status"], "ready_for_completion");
    let inspection_url = body["url"].as_str().unwrap().to_string();

    let status: Value = mobile_status(server, "car-uploads", &token).await.json();
    assert_eq!(status["status"], "ready_for_completion");
    assert_eq!(status["missing_core"], serde_json::json!([]));
    assert_eq!(status["documents"]["inspection"], inspection_url.as_str());
    assert_eq!(status["documents"].as_object().unwrap().len(), 4);

    let car: Value = server
        .get(&api_path(&format!("/cars/{}", car_id)))
        .add_header("Authorization", bearer())
        .await
        .json();
    assert_eq!(car["car"]["inspection_url"], inspection_url.as_str());
    assert!(car["car"]["photo_url"].is_string());

    let response = mobile_complete(server, "car-uploads", &token).await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(body["success"], true);
    assert_eq!(body["entity_id"], car_id.to_string());

    // A consumed token can still poll.
    let status = mobile_status(server, "car-uploads", &token).await;
    assert_eq!(status.status_code(), StatusCode::OK);
    let status: Value = status.json();
    assert_eq!(status["status"], "manually_completed");
    assert_eq!(status["used"], true);

    let response = mobile_upload(server, "car-uploads", &token, png_form("photo")).await;
    let body = assert_error(&response, StatusCode::UNAUTHORIZED, "UNAUTHORIZED");
    assert_eq!(body["error"], INVALID_TOKEN);

    let response = mobile_complete(server, "car-uploads", &token).await;
    let body = assert_error(&response, StatusCode::CONFLICT, "CONFLICT");
    assert_eq!(body["error"], "Upload session already completed");

    app.drain_background().await;
    assert_eq!(app.store.scan_count(EntityKind::Car, car_id), 4);
    assert_eq!(app.store.session_count(EntityKind::Car, car_id), 1);
}

#[tokio::test]
async fn test_client_upload_completion_syncs_images() {
    let app = setup_test_app().await;
    let server = app.client();
    let client = create_client(server, "amira@example.com").await;
    let client_id = id_of(&client);
    let token = issue_token(server, "clients", client_id).await;

    let body: Value = mobile_upload(server, "client-uploads", &token, png_form("id_card_front"))
        .await
        .json();
    assert_eq!(body["status"], "uploading");
    let body: Value = mobile_upload(server, "client-uploads", &token, png_form("license_front"))
        .await
        .json();
    assert_eq!(body["status"], "ready_for_completion");

    let response = mobile_complete(server, "client-uploads", &token).await;
    assert_eq!(response.status_code(), StatusCode::OK);
    app.drain_background().await;
    assert_eq!(app.state.background.failure_count(), 0);

    let client: Value = server
        .get(&api_path(&format!("/clients/{}", client_id)))
        .add_header("Authorization", bearer())
        .await
        .json();
    assert!(client["client"]["id_card_front_url"].is_string());
    assert!(client["client"]["license_front_url"].is_string());
    assert!(client["client"]["id_card_back_url"].is_null());
}

#[tokio::test]
async fn test_token_is_bound_to_its_flow() {
    let app = setup_test_app().await;
    let server = app.client();
    let car = create_car(server, "FL-001-OW", 30.0).await;
    let token = issue_token(server, "cars", id_of(&car)).await;

    let response = mobile_status(server, "client-uploads", &token).await;
    let body = assert_error(&response, StatusCode::UNAUTHORIZED, "UNAUTHORIZED");
    assert_eq!(body["error"], INVALID_TOKEN);

    let response = mobile_upload(server, "client-uploads", &token, png_form("id_card_front")).await;
    assert_error(&response, StatusCode::UNAUTHORIZED, "UNAUTHORIZED");
}

#[tokio::test]
async fn test_expired_token_row_is_rejected() {
    let app = setup_test_app().await;
    let server = app.client();
    let car = create_car(server, "EX-404-PD", 30.0).await;
    let token = issue_token(server, "cars", id_of(&car)).await;
    let id = token_id(&app, EntityKind::Car, &token).await;

    app.store
        .set_token_expiry(EntityKind::Car, id, Utc::now() - Duration::seconds(1));

    for response in [
        mobile_status(server, "car-uploads", &token).await,
        mobile_complete(server, "car-uploads", &token).await,
        mobile_upload(server, "car-uploads", &token, png_form("registration")).await,
    ] {
        let body = assert_error(&response, StatusCode::UNAUTHORIZED, "UNAUTHORIZED");
        assert_eq!(body["error"], INVALID_TOKEN);
    }
}

#[tokio::test]
async fn test_garbage_and_foreign_tokens_are_rejected() {
    let app = setup_test_app().await;
    let server = app.client();

    let response = mobile_status(server, "car-uploads", "not-a-jwt").await;
    let body = assert_error(&response, StatusCode::UNAUTHORIZED, "UNAUTHORIZED");
    assert_eq!(body["error"], INVALID_TOKEN);

    let claims = fleetdesk_api::services::upload_token::UploadClaims {
        sub: Uuid::new_v4().to_string(),
        tid: Uuid::new_v4().to_string(),
        jti: "nonce".to_string(),
        typ: "car_upload".to_string(),
        iat: Utc::now().timestamp(),
        exp: (Utc::now() + Duration::minutes(5)).timestamp(),
    };
    let unknown = app.state.upload_tokens.sign(&claims).unwrap();
    let response = mobile_status(server, "car-uploads", &unknown).await;
    let body = assert_error(&response, StatusCode::UNAUTHORIZED, "UNAUTHORIZED");
    assert_eq!(body["error"], INVALID_TOKEN);
}

#[tokio::test]
async fn test_complete_without_session_is_not_found() {
    let app = setup_test_app().await;
    let server = app.client();
    let car = create_car(server, "NO-SES-01", 30.0).await;
    let token = issue_token(server, "cars", id_of(&car)).await;

    let response = mobile_complete(server, "car-uploads", &token).await;
    let body = assert_error(&response, StatusCode::NOT_FOUND, "NOT_FOUND");
    assert_eq!(body["error"], "No upload session found");

    // Nothing was consumed, uploads still work.
    let response = mobile_upload(server, "car-uploads", &token, png_form("registration")).await;
    assert_eq!(response.status_code(), StatusCode::OK);
}

#[tokio::test]
async fn test_upload_validation() {
    let app = setup_test_app().await;
    let server = app.client();
    let car = create_car(server, "VA-123-LD", 30.0).await;
    let car_id = id_of(&car);
    let token = issue_token(server, "cars", car_id).await;

    let response = mobile_upload(server, "car-uploads", &token, png_form("license_front")).await;
    assert_error(&response, StatusCode::BAD_REQUEST, "INVALID_INPUT");

    let response = mobile_upload(
        server,
        "car-uploads",
        &token,
        document_form(None, minimal_png_bytes(), "scan.png", "image/png"),
    )
    .await;
    assert_error(&response, StatusCode::BAD_REQUEST, "INVALID_INPUT");

    let response = mobile_upload(
        server,
        "car-uploads",
        &token,
        document_form(
            Some("registration"),
            b"#!/bin/sh\necho hi\n".to_vec(),
            "run.sh",
            "application/x-sh",
        ),
    )
    .await;
    assert_error(&response, StatusCode::BAD_REQUEST, "INVALID_INPUT");

    let oversized = vec![0u8; 1024 * 1024 + 16];
    let response = mobile_upload(
        server,
        "car-uploads",
        &token,
        document_form(Some("registration"), oversized, "big.png", "image/png"),
    )
    .await;
    assert_error(&response, StatusCode::PAYLOAD_TOO_LARGE, "PAYLOAD_TOO_LARGE");

    // Rejected uploads never open a session.
    assert_eq!(app.store.session_count(EntityKind::Car, car_id), 0);
}

#[tokio::test]
async fn test_audit_failure_does_not_fail_upload() {
    let app = setup_test_app().await;
    let server = app.client();
    let car = create_car(server, "AU-D17-00", 30.0).await;
    let car_id = id_of(&car);
    let token = issue_token(server, "cars", car_id).await;

    app.store.fail_scan_inserts(true);
    let response = mobile_upload(server, "car-uploads", &token, png_form("registration")).await;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(response.json::<Value>()["status"], "uploading");

    app.drain_background().await;
    assert_eq!(app.state.background.failure_count(), 1);
    assert_eq!(app.store.scan_count(EntityKind::Car, car_id), 0);
    assert_eq!(app.store.session_count(EntityKind::Car, car_id), 1);
}

#[tokio::test]
async fn test_status_follows_processing_columns() {
    let app = setup_test_app().await;
    let server = app.client();
    let car = create_car(server, "ST-000-US", 30.0).await;
    let token = issue_token(server, "cars", id_of(&car)).await;
    let id = token_id(&app, EntityKind::Car, &token).await;

    mobile_upload(server, "car-uploads", &token, png_form("registration")).await;
    let session = app
        .state
        .db
        .upload_sessions
        .get_by_token(EntityKind::Car, id)
        .await
        .unwrap()
        .expect("session exists");

    let cases = [
        (UploadStatus::Uploading, ProcessingStatus::Processing, "processing"),
        (UploadStatus::ReadyForCompletion, ProcessingStatus::Failed, "failed"),
        (UploadStatus::Completed, ProcessingStatus::Pending, "processing"),
        (UploadStatus::Completed, ProcessingStatus::Completed, "completed"),
        (UploadStatus::ManuallyCompleted, ProcessingStatus::Failed, "manually_completed"),
    ];
    for (upload, processing, expected) in cases {
        app.store
            .set_session_statuses(EntityKind::Car, session.id, upload, processing);
        let status: Value = mobile_status(server, "car-uploads", &token).await.json();
        assert_eq!(
            status["status"], expected,
            "{:?}/{:?}",
            upload, processing
        );
    }
}

#[tokio::test]
async fn test_closed_session_rejects_documents_from_unused_token() {
    let app = setup_test_app().await;
    let server = app.client();
    let car = create_car(server, "CL-05-ED", 30.0).await;
    let car_id = id_of(&car);
    let token = issue_token(server, "cars", car_id).await;
    let id = token_id(&app, EntityKind::Car, &token).await;

    mobile_upload(server, "car-uploads", &token, png_form("registration")).await;
    let session = app
        .state
        .db
        .upload_sessions
        .get_by_token(EntityKind::Car, id)
        .await
        .unwrap()
        .expect("session exists");

    // Session closed while the token itself was never marked used.
    app.state
        .db
        .upload_sessions
        .complete(EntityKind::Car, session.id, Utc::now())
        .await
        .unwrap()
        .expect("first completion");

    let response = mobile_upload(server, "car-uploads", &token, png_form("insurance")).await;
    let body = assert_error(&response, StatusCode::CONFLICT, "CONFLICT");
    assert_eq!(body["error"], "Upload session is no longer accepting documents");

    let status: Value = mobile_status(server, "car-uploads", &token).await.json();
    assert_eq!(status["status"], "manually_completed");
    assert!(status["documents"]["insurance"].is_null());

    let car: Value = server
        .get(&api_path(&format!("/cars/{}", car_id)))
        .add_header("Authorization", bearer())
        .await
        .json();
    assert!(car["car"]["insurance_url"].is_null());

    app.drain_background().await;
    assert_eq!(app.store.scan_count(EntityKind::Car, car_id), 1);

    app.store.set_session_statuses(
        EntityKind::Car,
        session.id,
        UploadStatus::Failed,
        ProcessingStatus::Pending,
    );
    let response = mobile_upload(server, "car-uploads", &token, png_form("photo")).await;
    assert_error(&response, StatusCode::CONFLICT, "CONFLICT");
}
