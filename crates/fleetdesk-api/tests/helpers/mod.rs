//! Test helpers: build AppState and router for integration tests.
//!
//! Repositories are the in-memory implementations from `fleetdesk-db`
//! (`test-helpers` feature); documents go to `LocalStorage` in a temp dir.
//! Run with `cargo test -p fleetdesk-api`.

#![allow(dead_code)]

pub mod auth;
pub mod fixtures;

use async_trait::async_trait;
use axum_test::TestServer;
use fleetdesk_api::constants;
use fleetdesk_api::setup::routes;
use fleetdesk_api::state::{AppState, DbState};
use fleetdesk_core::models::{OcrDocumentType, OcrExtraction};
use fleetdesk_core::{AppError, Config};
use fleetdesk_db::test_helpers::InMemoryStore;
use fleetdesk_ocr::DocumentExtractor;
use fleetdesk_storage::{LocalStorage, Storage};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;

pub const TEST_UPLOAD_SECRET: &str = "integration-test-upload-secret-0123456789";
pub const TEST_PUBLIC_APP_URL: &str = "https://desk.example.com";

/// API path prefix for tests (e.g. `/api/v1`).
pub fn api_path(path: &str) -> String {
    format!("{}{}", constants::API_PREFIX, path)
}

/// Returns canned fields and counts calls.
#[derive(Default)]
pub struct StubExtractor {
    pub calls: AtomicUsize,
}

#[async_trait]
impl DocumentExtractor for StubExtractor {
    async fn extract(
        &self,
        document_type: OcrDocumentType,
        _content: Vec<u8>,
        _mime_type: &str,
    ) -> Result<OcrExtraction, AppError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut fields = BTreeMap::new();
        let mut confidence = BTreeMap::new();
        match document_type {
            OcrDocumentType::IdCard => {
                fields.insert("first_name".to_string(), "Amira".to_string());
                fields.insert("id_card_expiry".to_string(), "2031-05-30".to_string());
                confidence.insert("first_name".to_string(), 0.97);
                confidence.insert("id_card_expiry".to_string(), 0.88);
            }
            OcrDocumentType::DriverLicense => {
                fields.insert("license_number".to_string(), "DL-554433".to_string());
                confidence.insert("license_number".to_string(), 0.91);
            }
            OcrDocumentType::CarRegistration => {
                fields.insert("plate_number".to_string(), "AB-123-CD".to_string());
                confidence.insert("plate_number".to_string(), 0.93);
            }
        }
        Ok(OcrExtraction {
            fields,
            confidence,
            raw_text: "stub".to_string(),
        })
    }
}

/// Test application: server plus handles to inspect state behind it.
pub struct TestApp {
    pub server: TestServer,
    pub store: InMemoryStore,
    pub state: Arc<AppState>,
    pub ocr: Arc<StubExtractor>,
    pub _temp_dir: TempDir,
}

impl TestApp {
    pub fn client(&self) -> &TestServer {
        &self.server
    }

    /// Wait for best-effort work spawned by earlier requests.
    pub async fn drain_background(&self) {
        self.state.background.drain().await;
    }
}

fn base_env() -> HashMap<String, String> {
    [
        ("DATABASE_URL", "postgres://localhost/fleetdesk_test"),
        ("ADMIN_API_KEY", auth::TEST_ADMIN_API_KEY),
        ("UPLOAD_TOKEN_SECRET", TEST_UPLOAD_SECRET),
        ("PUBLIC_APP_URL", TEST_PUBLIC_APP_URL),
        ("MAX_UPLOAD_SIZE_MB", "1"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

/// Test configuration with `removed` keys unset.
pub fn test_config_without(removed: &[&str]) -> Config {
    let mut env = base_env();
    for key in removed {
        env.remove(*key);
    }
    Config::from_lookup(|key| env.get(key).cloned()).expect("Failed to build test config")
}

pub fn test_config() -> Config {
    test_config_without(&[])
}

/// Setup test app with in-memory repositories and local storage.
pub async fn setup_test_app() -> TestApp {
    setup_test_app_with(test_config()).await
}

pub async fn setup_test_app_with(config: Config) -> TestApp {
    let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");
    let storage: Arc<dyn Storage> = Arc::new(
        LocalStorage::new(
            temp_dir.path().to_path_buf(),
            "http://localhost:4000/uploads".to_string(),
        )
        .await
        .expect("Failed to create local storage"),
    );

    let store = InMemoryStore::new();
    let db = DbState {
        pool: None,
        clients: Arc::new(store.clone()),
        cars: Arc::new(store.clone()),
        upload_tokens: Arc::new(store.clone()),
        upload_sessions: Arc::new(store.clone()),
        document_scans: Arc::new(store.clone()),
        bookings: Arc::new(store.clone()),
    };
    let ocr = Arc::new(StubExtractor::default());

    let config = Arc::new(config);
    let state = Arc::new(AppState::new(config.clone(), db, storage, ocr.clone()));

    let app = routes::setup_routes(&config, state.clone()).expect("Failed to setup routes");
    let server = TestServer::new(app.into_make_service()).expect("Failed to create test server");

    TestApp {
        server,
        store,
        state,
        ocr,
        _temp_dir: temp_dir,
    }
}
