//! OpenAPI documentation.
//! API version is in `crate::constants::API_VERSION`; handler annotations use `/api/v1` literally.

use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::error;
use crate::handlers;
use fleetdesk_core::models;

/// Registers the staff bearer scheme referenced by `security(("bearer_auth" = []))`.
struct StaffAuth;

impl Modify for StaffAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(HttpBuilder::new().scheme(HttpAuthScheme::Bearer).build()),
        );
    }
}

pub fn get_openapi_spec() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "FleetDesk API",
        version = "0.1.0",
        description = "Car-rental back office: clients, cars, bookings and payments, with QR-code mobile document upload and OCR pre-fill. All endpoints are versioned under /api/v1/."
    ),
    paths(
        // Clients
        handlers::clients::create_client,
        handlers::clients::list_clients,
        handlers::clients::get_client,
        handlers::clients::update_client_status,
        handlers::clients::sync_client_images,
        handlers::documents::upload_client_document,
        handlers::documents::list_client_documents,
        // Cars
        handlers::cars::create_car,
        handlers::cars::list_cars,
        handlers::cars::get_car,
        handlers::cars::update_car_status,
        handlers::cars::update_car_documents,
        handlers::cars::delete_car,
        handlers::documents::upload_car_document,
        handlers::documents::list_car_documents,
        // Upload tokens
        handlers::upload_tokens::issue_client_upload_token,
        handlers::upload_tokens::issue_car_upload_token,
        // Mobile upload
        handlers::mobile_upload::upload_client_document,
        handlers::mobile_upload::upload_car_document,
        handlers::mobile_upload::client_upload_status,
        handlers::mobile_upload::car_upload_status,
        handlers::mobile_upload::complete_client_upload,
        handlers::mobile_upload::complete_car_upload,
        // OCR
        handlers::ocr::extract_document,
        // Bookings
        handlers::bookings::create_booking,
        handlers::bookings::list_bookings,
        handlers::bookings::get_booking,
        handlers::bookings::update_booking_status,
        handlers::bookings::create_payment,
        handlers::bookings::list_payments,
        // Health
        handlers::health::health_check,
    ),
    components(
        schemas(
            models::Client,
            models::ClientStatus,
            models::CreateClientRequest,
            models::UpdateClientStatusRequest,
            models::Car,
            models::CarStatus,
            models::CreateCarRequest,
            models::UpdateCarDocumentsRequest,
            models::UpdateCarStatusRequest,
            models::Booking,
            models::BookingStatus,
            models::CreateBookingRequest,
            models::UpdateBookingStatusRequest,
            models::Payment,
            models::PaymentMethod,
            models::CreatePaymentRequest,
            models::DocumentScan,
            models::DocumentType,
            models::EntityKind,
            models::UploadStatus,
            models::ProcessingStatus,
            models::DerivedStatus,
            models::OcrDocumentType,
            handlers::clients::ClientResponse,
            handlers::clients::ClientListResponse,
            handlers::cars::CarResponse,
            handlers::cars::CarListResponse,
            handlers::cars::CarDeleteResponse,
            handlers::cars::DeletedRows,
            handlers::documents::DocumentUploadResponse,
            handlers::documents::EntityDocumentsResponse,
            handlers::documents::SessionSummary,
            handlers::upload_tokens::UploadTokenResponse,
            handlers::mobile_upload::MobileUploadResponse,
            handlers::mobile_upload::UploadStatusResponse,
            handlers::mobile_upload::CompleteUploadResponse,
            handlers::ocr::OcrExtractResponse,
            handlers::bookings::BookingResponse,
            handlers::bookings::BookingListResponse,
            handlers::bookings::PaymentResponse,
            handlers::bookings::PaymentListResponse,
            handlers::health::HealthCheckResponse,
            error::ErrorResponse,
        )
    ),
    modifiers(&StaffAuth),
    tags(
        (name = "clients", description = "Client records and their identity documents"),
        (name = "cars", description = "Fleet records and vehicle documents"),
        (name = "uploads", description = "Upload-token issuance for the QR mobile flow"),
        (name = "mobile-upload", description = "Token-authorised endpoints used by the mobile upload page"),
        (name = "ocr", description = "Form pre-fill from scanned documents"),
        (name = "bookings", description = "Rentals and payments"),
        (name = "health", description = "Service health")
    )
)]
pub struct ApiDoc;
