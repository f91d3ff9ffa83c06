//! Application setup and initialization

pub mod database;
pub mod routes;
pub mod server;
pub mod storage;
pub mod validation;

use crate::state::AppState;
use anyhow::{Context, Result};
use fleetdesk_core::Config;
use std::sync::Arc;

/// Validate configuration, connect to Postgres, build storage and the OCR
/// client, and assemble the router.
pub async fn initialize_app(config: Config) -> Result<(Arc<AppState>, axum::Router)> {
    validation::validate_config(&config).context("Configuration validation failed")?;

    let pool = database::setup_database(&config).await?;
    let db = database::postgres_repositories(pool);
    let storage = storage::setup_storage(&config).await?;
    let ocr = storage::setup_ocr(&config)?;

    let config = Arc::new(config);
    let state = Arc::new(AppState::new(config.clone(), db, storage, ocr));
    let router = routes::setup_routes(&config, state.clone())?;

    Ok((state, router))
}
