//! Postgres repository implementations
//!
//! Queries are built at runtime with `sqlx::query`/`QueryBuilder` so the crate
//! compiles without a live `DATABASE_URL`. Table and column names that vary
//! per upload flow come from fixed lookup tables, never from request input.

pub mod booking;
pub mod car;
pub mod client;
pub mod document_scan;
mod tables;
pub mod upload_session;
pub mod upload_token;

pub use booking::PgBookingRepository;
pub use car::PgCarRepository;
pub use client::PgClientRepository;
pub use document_scan::PgDocumentScanRepository;
pub use upload_session::PgUploadSessionRepository;
pub use upload_token::PgUploadTokenRepository;
