//! Storage and OCR client setup

use anyhow::{Context, Result};
use fleetdesk_core::Config;
use fleetdesk_ocr::{DocumentAiClient, DocumentExtractor};
use fleetdesk_storage::{create_storage, Storage};
use std::sync::Arc;

pub async fn setup_storage(config: &Config) -> Result<Arc<dyn Storage>> {
    tracing::info!("Initializing storage...");
    let storage = create_storage(&config.storage)
        .await
        .context("Failed to initialize storage backend")?;
    tracing::info!(
        backend = ?storage.backend_type(),
        "Storage initialized successfully"
    );
    Ok(storage)
}

/// The Document AI client resolves its settings per call, so this never
/// fails on missing OCR configuration.
pub fn setup_ocr(config: &Config) -> Result<Arc<dyn DocumentExtractor>> {
    let client = DocumentAiClient::new(config.document_ai.clone())?;
    if config.document_ai.project_id.is_none() {
        tracing::warn!("DOCUMENT_AI_PROJECT_ID not set; OCR requests will fail until configured");
    }
    Ok(Arc::new(client))
}
