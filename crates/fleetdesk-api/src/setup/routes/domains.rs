//! Domain route groups (clients, cars, bookings, OCR, mobile upload).
//!
//! Everything except [`mobile_upload_routes`] sits behind the staff key.

use crate::constants::API_PREFIX;
use crate::handlers;
use crate::state::AppState;
use axum::routing::{get, patch, post};
use axum::Router;
use std::sync::Arc;

pub fn client_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            &format!("{}/clients", API_PREFIX),
            post(handlers::clients::create_client).get(handlers::clients::list_clients),
        )
        .route(
            &format!("{}/clients/{{id}}", API_PREFIX),
            get(handlers::clients::get_client),
        )
        .route(
            &format!("{}/clients/{{id}}/status", API_PREFIX),
            patch(handlers::clients::update_client_status),
        )
        .route(
            &format!("{}/clients/{{id}}/sync-images", API_PREFIX),
            post(handlers::clients::sync_client_images),
        )
        .route(
            &format!("{}/clients/{{id}}/documents", API_PREFIX),
            post(handlers::documents::upload_client_document)
                .get(handlers::documents::list_client_documents),
        )
        .route(
            &format!("{}/clients/{{id}}/upload-token", API_PREFIX),
            post(handlers::upload_tokens::issue_client_upload_token),
        )
}

pub fn car_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            &format!("{}/cars", API_PREFIX),
            post(handlers::cars::create_car).get(handlers::cars::list_cars),
        )
        .route(
            &format!("{}/cars/{{id}}", API_PREFIX),
            get(handlers::cars::get_car).delete(handlers::cars::delete_car),
        )
        .route(
            &format!("{}/cars/{{id}}/status", API_PREFIX),
            patch(handlers::cars::update_car_status),
        )
        .route(
            &format!("{}/cars/{{id}}/documents", API_PREFIX),
            post(handlers::documents::upload_car_document)
                .get(handlers::documents::list_car_documents)
                .patch(handlers::cars::update_car_documents),
        )
        .route(
            &format!("{}/cars/{{id}}/upload-token", API_PREFIX),
            post(handlers::upload_tokens::issue_car_upload_token),
        )
}

pub fn booking_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            &format!("{}/bookings", API_PREFIX),
            post(handlers::bookings::create_booking).get(handlers::bookings::list_bookings),
        )
        .route(
            &format!("{}/bookings/{{id}}", API_PREFIX),
            get(handlers::bookings::get_booking),
        )
        .route(
            &format!("{}/bookings/{{id}}/status", API_PREFIX),
            patch(handlers::bookings::update_booking_status),
        )
        .route(
            &format!("{}/bookings/{{id}}/payments", API_PREFIX),
            post(handlers::bookings::create_payment).get(handlers::bookings::list_payments),
        )
}

pub fn ocr_routes() -> Router<Arc<AppState>> {
    Router::new().route(
        &format!("{}/ocr/extract", API_PREFIX),
        post(handlers::ocr::extract_document),
    )
}

/// Public routes used by the mobile upload page; the path token is the only credential.
pub fn mobile_upload_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            &format!("{}/client-uploads/{{token}}/documents", API_PREFIX),
            post(handlers::mobile_upload::upload_client_document),
        )
        .route(
            &format!("{}/client-uploads/{{token}}/status", API_PREFIX),
            get(handlers::mobile_upload::client_upload_status),
        )
        .route(
            &format!("{}/client-uploads/{{token}}/complete", API_PREFIX),
            post(handlers::mobile_upload::complete_client_upload),
        )
        .route(
            &format!("{}/car-uploads/{{token}}/documents", API_PREFIX),
            post(handlers::mobile_upload::upload_car_document),
        )
        .route(
            &format!("{}/car-uploads/{{token}}/status", API_PREFIX),
            get(handlers::mobile_upload::car_upload_status),
        )
        .route(
            &format!("{}/car-uploads/{{token}}/complete", API_PREFIX),
            post(handlers::mobile_upload::complete_car_upload),
        )
}
