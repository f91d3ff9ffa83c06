//! FleetDesk database layer
//!
//! Repository traits live in [`repository`]; [`db`] holds their Postgres
//! implementations. In-memory implementations for tests are available under
//! the `test-helpers` feature.

pub mod db;
pub mod repository;

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers;

pub use db::{
    PgBookingRepository, PgCarRepository, PgClientRepository, PgDocumentScanRepository,
    PgUploadSessionRepository, PgUploadTokenRepository,
};
pub use repository::{
    BookingRepository, CarDeleteOutcome, CarDeletion, CarRepository, ClientRepository,
    DocumentScanRepository, UploadSessionRepository, UploadTokenRepository,
};
