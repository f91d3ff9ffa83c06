//! Application state.
//!
//! Every handle is injected at startup; nothing is reached through globals.

use fleetdesk_core::Config;
use fleetdesk_db::{
    BookingRepository, CarRepository, ClientRepository, DocumentScanRepository,
    UploadSessionRepository, UploadTokenRepository,
};
use fleetdesk_ocr::DocumentExtractor;
use fleetdesk_storage::Storage;
use sqlx::PgPool;
use std::sync::Arc;

use crate::services::background::BestEffortRunner;
use crate::services::upload_token::UploadTokenService;

/// Repository handles. Postgres in production, in-memory in tests.
#[derive(Clone)]
pub struct DbState {
    /// Present when backed by Postgres; used by health checks.
    pub pool: Option<PgPool>,
    pub clients: Arc<dyn ClientRepository>,
    pub cars: Arc<dyn CarRepository>,
    pub upload_tokens: Arc<dyn UploadTokenRepository>,
    pub upload_sessions: Arc<dyn UploadSessionRepository>,
    pub document_scans: Arc<dyn DocumentScanRepository>,
    pub bookings: Arc<dyn BookingRepository>,
}

#[derive(Clone)]
pub struct AppState {
    pub db: DbState,
    pub storage: Arc<dyn Storage>,
    pub ocr: Arc<dyn DocumentExtractor>,
    pub upload_tokens: UploadTokenService,
    pub background: BestEffortRunner,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(
        config: Arc<Config>,
        db: DbState,
        storage: Arc<dyn Storage>,
        ocr: Arc<dyn DocumentExtractor>,
    ) -> Self {
        let upload_tokens = UploadTokenService::new(config.clone(), db.upload_tokens.clone());
        Self {
            db,
            storage,
            ocr,
            upload_tokens,
            background: BestEffortRunner::new(),
            config,
        }
    }
}
