//! Repository trait abstractions
//!
//! Handlers depend on these traits rather than on concrete Postgres types so
//! that tests can run the full request path against in-memory backends.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fleetdesk_core::error::AppError;
use fleetdesk_core::models::{
    Booking, BookingFilter, BookingStatus, Car, CarFilter, CarStatus, Client, ClientFilter,
    ClientStatus, CreateCarRequest, CreateClientRequest, CreatePaymentRequest, DocumentScan,
    DocumentType, EntityKind, NewBooking, NewDocumentScan, Payment, UploadSession, UploadStatus,
    UploadToken,
};
use uuid::Uuid;

/// Rows removed alongside a car.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CarDeletion {
    pub scans: u64,
    pub sessions: u64,
    pub tokens: u64,
    /// Storage keys of the deleted scans, for removing the stored files.
    pub storage_keys: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CarDeleteOutcome {
    Deleted(CarDeletion),
    NotFound,
    /// The car is referenced by bookings and is kept.
    HasBookings(i64),
}

#[async_trait]
pub trait ClientRepository: Send + Sync {
    /// Fails with [`AppError::Conflict`] when the email is taken.
    async fn create(&self, request: &CreateClientRequest) -> Result<Client, AppError>;

    async fn get(&self, id: Uuid) -> Result<Option<Client>, AppError>;

    async fn list(&self, filter: &ClientFilter) -> Result<Vec<Client>, AppError>;

    async fn update_status(
        &self,
        id: Uuid,
        status: ClientStatus,
    ) -> Result<Option<Client>, AppError>;

    /// Returns false when no client row was updated.
    async fn set_document_url(
        &self,
        id: Uuid,
        document_type: DocumentType,
        url: &str,
    ) -> Result<bool, AppError>;

    /// Copy the newest non-null URL of each document type from the client's
    /// upload sessions into the client row.
    async fn sync_images(&self, id: Uuid) -> Result<Option<Client>, AppError>;
}

#[async_trait]
pub trait CarRepository: Send + Sync {
    /// Fails with [`AppError::Conflict`] when the plate number is taken.
    async fn create(&self, request: &CreateCarRequest) -> Result<Car, AppError>;

    async fn get(&self, id: Uuid) -> Result<Option<Car>, AppError>;

    async fn list(&self, filter: &CarFilter) -> Result<Vec<Car>, AppError>;

    async fn update_status(&self, id: Uuid, status: CarStatus) -> Result<Option<Car>, AppError>;

    async fn set_document_url(
        &self,
        id: Uuid,
        document_type: DocumentType,
        url: &str,
    ) -> Result<bool, AppError>;

    /// Apply several document URL updates at once.
    async fn update_documents(
        &self,
        id: Uuid,
        updates: &[(DocumentType, String)],
    ) -> Result<Option<Car>, AppError>;

    /// Remove the car together with its scans, upload sessions and upload
    /// tokens, children first, in a single transaction.
    async fn delete_with_dependents(&self, id: Uuid) -> Result<CarDeleteOutcome, AppError>;
}

#[async_trait]
pub trait UploadTokenRepository: Send + Sync {
    async fn create(
        &self,
        kind: EntityKind,
        entity_id: Uuid,
        nonce: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<UploadToken, AppError>;

    async fn get(&self, kind: EntityKind, id: Uuid) -> Result<Option<UploadToken>, AppError>;

    /// Set `used_at` only if it is still NULL. Returns whether this call consumed the token.
    async fn mark_used(
        &self,
        kind: EntityKind,
        id: Uuid,
        used_at: DateTime<Utc>,
    ) -> Result<bool, AppError>;
}

#[async_trait]
pub trait UploadSessionRepository: Send + Sync {
    async fn get_by_token(
        &self,
        kind: EntityKind,
        token_id: Uuid,
    ) -> Result<Option<UploadSession>, AppError>;

    /// Fetch the session for a token, creating a `pending` one if none exists.
    async fn get_or_create(
        &self,
        kind: EntityKind,
        token_id: Uuid,
        entity_id: Uuid,
    ) -> Result<UploadSession, AppError>;

    /// Write one document URL. A `pending` session moves to `uploading`.
    /// Returns `None` when the session is missing or already terminal.
    async fn record_document(
        &self,
        kind: EntityKind,
        session_id: Uuid,
        document_type: DocumentType,
        url: &str,
    ) -> Result<Option<UploadSession>, AppError>;

    /// Set the upload status unless the session already reached a terminal state.
    async fn set_upload_status(
        &self,
        kind: EntityKind,
        session_id: Uuid,
        status: UploadStatus,
    ) -> Result<bool, AppError>;

    /// Mark the session manually completed unless it is already completed.
    /// Returns `None` when the conditional update matched no row.
    async fn complete(
        &self,
        kind: EntityKind,
        session_id: Uuid,
        completed_at: DateTime<Utc>,
    ) -> Result<Option<UploadSession>, AppError>;

    async fn list_for_entity(
        &self,
        kind: EntityKind,
        entity_id: Uuid,
    ) -> Result<Vec<UploadSession>, AppError>;
}

#[async_trait]
pub trait DocumentScanRepository: Send + Sync {
    async fn insert(&self, scan: NewDocumentScan) -> Result<DocumentScan, AppError>;

    async fn list_for_entity(
        &self,
        kind: EntityKind,
        entity_id: Uuid,
    ) -> Result<Vec<DocumentScan>, AppError>;
}

#[async_trait]
pub trait BookingRepository: Send + Sync {
    /// Fails with [`AppError::Conflict`] when a reserved or active booking for
    /// the same car overlaps the requested dates. The check and the insert
    /// are atomic with respect to other bookings of that car.
    async fn create(&self, booking: NewBooking) -> Result<Booking, AppError>;

    async fn get(&self, id: Uuid) -> Result<Option<Booking>, AppError>;

    async fn list(&self, filter: &BookingFilter) -> Result<Vec<Booking>, AppError>;

    async fn update_status(
        &self,
        id: Uuid,
        status: BookingStatus,
    ) -> Result<Option<Booking>, AppError>;

    async fn add_payment(
        &self,
        booking_id: Uuid,
        request: &CreatePaymentRequest,
        paid_at: DateTime<Utc>,
    ) -> Result<Payment, AppError>;

    async fn list_payments(&self, booking_id: Uuid) -> Result<Vec<Payment>, AppError>;
}
