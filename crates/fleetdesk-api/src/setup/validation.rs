//! Configuration validation
//!
//! Startup checks only. Settings that are resolved at call time (admin key,
//! upload-token secret, public app URL, Document AI) are reported as warnings
//! so the service still boots without them.

use anyhow::Result;
use fleetdesk_core::Config;

pub fn validate_config(config: &Config) -> Result<()> {
    config.validate()?;

    if config.db_max_connections == 0 {
        return Err(anyhow::anyhow!("Database max connections cannot be 0"));
    }
    if config.db_timeout_seconds == 0 {
        return Err(anyhow::anyhow!("Database timeout cannot be 0"));
    }
    if config.max_upload_size_bytes == 0 {
        return Err(anyhow::anyhow!("Max upload size cannot be 0"));
    }
    if config.allowed_content_types.is_empty() {
        return Err(anyhow::anyhow!("At least one allowed content type is required"));
    }

    if let Err(e) = config.admin_api_key() {
        tracing::warn!(error = %e, "Staff routes will answer 500 until configured");
    }
    if let Err(e) = config.upload_token_secret() {
        tracing::warn!(error = %e, "Upload tokens cannot be issued or verified until configured");
    }
    if let Err(e) = config.public_app_url() {
        tracing::warn!(error = %e, "Upload QR codes cannot be generated until configured");
    }

    tracing::info!("Configuration validation passed");
    Ok(())
}
