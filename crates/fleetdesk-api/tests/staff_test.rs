//! Staff-only routes: authentication, clients, cars, direct uploads and OCR.

mod helpers;

use axum::http::StatusCode;
use fleetdesk_core::models::EntityKind;
use helpers::auth::{bearer, TEST_ADMIN_API_KEY};
use helpers::fixtures::{
    assert_error, create_car, create_client, id_of, issue_token, mobile_upload, png_form,
};
use helpers::{api_path, setup_test_app, setup_test_app_with, test_config_without};
use serde_json::{json, Value};
use std::sync::atomic::Ordering;
use uuid::Uuid;

#[tokio::test]
async fn test_staff_routes_require_api_key() {
    let app = setup_test_app().await;
    let server = app.client();

    let response = server.get(&api_path("/clients")).await;
    let body = assert_error(&response, StatusCode::UNAUTHORIZED, "UNAUTHORIZED");
    assert_eq!(body["error"], "Missing authorization header");

    let response = server
        .get(&api_path("/clients"))
        .add_header("Authorization", format!("Basic {}", TEST_ADMIN_API_KEY))
        .await;
    assert_error(&response, StatusCode::UNAUTHORIZED, "UNAUTHORIZED");

    let response = server
        .get(&api_path("/cars"))
        .add_header("Authorization", "Bearer not-the-key".to_string())
        .await;
    let body = assert_error(&response, StatusCode::UNAUTHORIZED, "UNAUTHORIZED");
    assert_eq!(body["error"], "Invalid API key");

    let response = server
        .get(&api_path("/cars"))
        .add_header("Authorization", bearer())
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
}

#[tokio::test]
async fn test_unconfigured_api_key_is_server_error() {
    let app = setup_test_app_with(test_config_without(&["ADMIN_API_KEY"])).await;

    let response = app
        .client()
        .get(&api_path("/clients"))
        .add_header("Authorization", bearer())
        .await;
    assert_error(
        &response,
        StatusCode::INTERNAL_SERVER_ERROR,
        "CONFIGURATION_ERROR",
    );
}

#[tokio::test]
async fn test_public_routes_skip_staff_auth() {
    let app = setup_test_app().await;

    let response = app.client().get(&api_path("/health")).await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["storage"], "healthy");

    let response = app.client().get("/api/openapi.json").await;
    assert_eq!(response.status_code(), StatusCode::OK);

    let response = app
        .client()
        .get(&api_path("/does-not-exist"))
        .await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_create_and_search_clients() {
    let app = setup_test_app().await;
    let server = app.client();

    let client = create_client(server, "  Amira@Example.com ").await;
    assert_eq!(client["email"], "amira@example.com");
    assert_eq!(client["status"], "active");
    create_client(server, "jonas@example.com").await;

    let response = server
        .post(&api_path("/clients"))
        .add_header("Authorization", bearer())
        .json(&json!({
            "first_name": "Other",
            "last_name": "Person",
            "email": "AMIRA@example.com"
        }))
        .await;
    let body = assert_error(&response, StatusCode::CONFLICT, "CONFLICT");
    assert_eq!(body["error"], "A client with this email already exists");

    let response = server
        .post(&api_path("/clients"))
        .add_header("Authorization", bearer())
        .json(&json!({
            "first_name": "No",
            "last_name": "Email",
            "email": "not-an-email"
        }))
        .await;
    assert_error(&response, StatusCode::BAD_REQUEST, "INVALID_INPUT");

    let response = server
        .post(&api_path("/clients"))
        .add_header("Authorization", bearer())
        .json(&json!({ "first_name": "Missing" }))
        .await;
    assert_error(&response, StatusCode::BAD_REQUEST, "INVALID_INPUT");

    let list: Value = server
        .get(&api_path("/clients"))
        .add_header("Authorization", bearer())
        .await
        .json();
    assert_eq!(list["success"], true);
    assert_eq!(list["count"], 2);

    let list: Value = server
        .get(&api_path("/clients?search=jonas"))
        .add_header("Authorization", bearer())
        .await
        .json();
    assert_eq!(list["count"], 1);
    assert_eq!(list["clients"][0]["email"], "jonas@example.com");

    let response = server
        .get(&api_path(&format!("/clients/{}", Uuid::new_v4())))
        .add_header("Authorization", bearer())
        .await;
    assert_error(&response, StatusCode::NOT_FOUND, "NOT_FOUND");
}

#[tokio::test]
async fn test_client_status_update_and_filter() {
    let app = setup_test_app().await;
    let server = app.client();
    let client = create_client(server, "status@example.com").await;
    create_client(server, "stays@example.com").await;

    let response = server
        .patch(&api_path(&format!("/clients/{}/status", id_of(&client))))
        .add_header("Authorization", bearer())
        .json(&json!({ "status": "inactive" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(response.json::<Value>()["client"]["status"], "inactive");

    let list: Value = server
        .get(&api_path("/clients?status=inactive"))
        .add_header("Authorization", bearer())
        .await
        .json();
    assert_eq!(list["count"], 1);
    assert_eq!(list["clients"][0]["email"], "status@example.com");

    let response = server
        .patch(&api_path(&format!("/clients/{}/status", id_of(&client))))
        .add_header("Authorization", bearer())
        .json(&json!({ "status": "banned" }))
        .await;
    assert_error(&response, StatusCode::BAD_REQUEST, "INVALID_INPUT");
}

#[tokio::test]
async fn test_car_crud() {
    let app = setup_test_app().await;
    let server = app.client();

    let car = create_car(server, "AB-123-CD", 39.9).await;
    assert_eq!(car["status"], "available");
    assert_eq!(car["daily_rate"], 39.9);

    let response = server
        .post(&api_path("/cars"))
        .add_header("Authorization", bearer())
        .json(&json!({
            "brand": "Peugeot",
            "model": "208",
            "year": 2021,
            "plate_number": "AB-123-CD",
            "daily_rate": 35
        }))
        .await;
    assert_error(&response, StatusCode::CONFLICT, "CONFLICT");

    let response = server
        .post(&api_path("/cars"))
        .add_header("Authorization", bearer())
        .json(&json!({
            "brand": "Peugeot",
            "model": "208",
            "year": 2021,
            "plate_number": "ZZ-000-ZZ",
            "daily_rate": 0
        }))
        .await;
    assert_error(&response, StatusCode::BAD_REQUEST, "INVALID_INPUT");

    let car_id = id_of(&car);
    let response = server
        .patch(&api_path(&format!("/cars/{}/documents", car_id)))
        .add_header("Authorization", bearer())
        .json(&json!({ "insurance_url": "https://files.example.com/insurance.pdf" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(
        body["car"]["insurance_url"],
        "https://files.example.com/insurance.pdf"
    );
    assert!(body["car"]["registration_url"].is_null());

    let response = server
        .patch(&api_path(&format!("/cars/{}/status", car_id)))
        .add_header("Authorization", bearer())
        .json(&json!({ "status": "maintenance" }))
        .await;
    assert_eq!(response.json::<Value>()["car"]["status"], "maintenance");

    let list: Value = server
        .get(&api_path("/cars?status=available"))
        .add_header("Authorization", bearer())
        .await
        .json();
    assert_eq!(list["count"], 0);
}

#[tokio::test]
async fn test_car_delete_cascades_upload_rows() {
    let app = setup_test_app().await;
    let server = app.client();
    let car = create_car(server, "DE-LET-ED", 30.0).await;
    let car_id = id_of(&car);

    let token = issue_token(server, "cars", car_id).await;
    issue_token(server, "cars", car_id).await;
    let response = mobile_upload(server, "car-uploads", &token, png_form("registration")).await;
    assert_eq!(response.status_code(), StatusCode::OK);
    app.drain_background().await;

    let scans = app
        .state
        .db
        .document_scans
        .list_for_entity(EntityKind::Car, car_id)
        .await
        .unwrap();
    let stored_key = scans[0].storage_key.clone();
    assert!(app.state.storage.exists(&stored_key).await.unwrap());

    let response = server
        .delete(&api_path(&format!("/cars/{}", car_id)))
        .add_header("Authorization", bearer())
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(body["id"], car_id.to_string());
    assert_eq!(body["deleted"], json!({ "scans": 1, "sessions": 1, "tokens": 2 }));
    assert_eq!(app.store.token_count(EntityKind::Car, car_id), 0);

    app.drain_background().await;
    assert!(!app.state.storage.exists(&stored_key).await.unwrap());
    assert_eq!(app.state.background.failure_count(), 0);

    let response = server
        .delete(&api_path(&format!("/cars/{}", car_id)))
        .add_header("Authorization", bearer())
        .await;
    assert_error(&response, StatusCode::NOT_FOUND, "NOT_FOUND");
}

#[tokio::test]
async fn test_car_with_bookings_is_not_deleted() {
    let app = setup_test_app().await;
    let server = app.client();
    let client = create_client(server, "renter@example.com").await;
    let car = create_car(server, "BO-OK-ED", 30.0).await;

    let response = server
        .post(&api_path("/bookings"))
        .add_header("Authorization", bearer())
        .json(&json!({
            "client_id": id_of(&client),
            "car_id": id_of(&car),
            "start_date": "2099-01-10",
            "end_date": "2099-01-12"
        }))
        .await;
    assert_eq!(response.status_code(), StatusCode::CREATED);

    let response = server
        .delete(&api_path(&format!("/cars/{}", id_of(&car))))
        .add_header("Authorization", bearer())
        .await;
    let body = assert_error(&response, StatusCode::CONFLICT, "CONFLICT");
    assert_eq!(body["error"], "Car has 1 booking(s) and cannot be deleted");
}

#[tokio::test]
async fn test_staff_direct_upload_and_document_listing() {
    let app = setup_test_app().await;
    let server = app.client();
    let client = create_client(server, "direct@example.com").await;
    let client_id = id_of(&client);

    let response = server
        .post(&api_path(&format!("/clients/{}/documents", client_id)))
        .add_header("Authorization", bearer())
        .multipart(png_form("id_card_back"))
        .await;
    assert_eq!(response.status_code(), StatusCode::CREATED);
    let body: Value = response.json();
    assert_eq!(body["document_type"], "id_card_back");
    let url = body["url"].as_str().unwrap().to_string();

    let response = server
        .post(&api_path(&format!("/clients/{}/documents", client_id)))
        .add_header("Authorization", bearer())
        .multipart(png_form("registration"))
        .await;
    assert_error(&response, StatusCode::BAD_REQUEST, "INVALID_INPUT");

    let response = server
        .post(&api_path(&format!("/clients/{}/documents", Uuid::new_v4())))
        .add_header("Authorization", bearer())
        .multipart(png_form("id_card_back"))
        .await;
    assert_error(&response, StatusCode::NOT_FOUND, "NOT_FOUND");

    let token = issue_token(server, "clients", client_id).await;
    mobile_upload(server, "client-uploads", &token, png_form("license_front")).await;
    app.drain_background().await;

    let listing: Value = server
        .get(&api_path(&format!("/clients/{}/documents", client_id)))
        .add_header("Authorization", bearer())
        .await
        .json();
    assert_eq!(listing["success"], true);
    assert_eq!(listing["documents"]["id_card_back"], url.as_str());
    assert!(listing["documents"]["license_front"].is_string());
    assert_eq!(listing["scans"].as_array().unwrap().len(), 2);
    let sessions = listing["sessions"].as_array().unwrap();
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0]["status"], "uploading");
    assert_eq!(sessions[0]["missing_core"], json!(["id_card_front"]));
}

#[tokio::test]
async fn test_token_issue_requires_configuration() {
    let app = setup_test_app_with(test_config_without(&["PUBLIC_APP_URL"])).await;
    let server = app.client();
    let car = create_car(server, "NO-URL-00", 30.0).await;
    let car_id = id_of(&car);

    let response = server
        .post(&api_path(&format!("/cars/{}/upload-token", car_id)))
        .add_header("Authorization", bearer())
        .await;
    let body = assert_error(
        &response,
        StatusCode::INTERNAL_SERVER_ERROR,
        "CONFIGURATION_ERROR",
    );
    assert_eq!(body["error"], "PUBLIC_APP_URL is not configured");
    assert_eq!(app.store.token_count(EntityKind::Car, car_id), 0);

    let response = server
        .post(&api_path(&format!("/cars/{}/upload-token", Uuid::new_v4())))
        .add_header("Authorization", bearer())
        .await;
    assert_error(&response, StatusCode::NOT_FOUND, "NOT_FOUND");
}

#[tokio::test]
async fn test_ocr_extract() {
    let app = setup_test_app().await;
    let server = app.client();

    let response = server
        .post(&api_path("/ocr/extract"))
        .add_header("Authorization", bearer())
        .multipart(png_form("id_card"))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(body["document_type"], "id_card");
    assert_eq!(body["fields"]["first_name"], "Amira");
    assert_eq!(body["fields"]["id_card_expiry"], "2031-05-30");

    let response = server
        .post(&api_path("/ocr/extract"))
        .add_header("Authorization", bearer())
        .multipart(png_form("passport"))
        .await;
    assert_error(&response, StatusCode::BAD_REQUEST, "INVALID_INPUT");

    assert_eq!(app.ocr.calls.load(Ordering::SeqCst), 1);
}
