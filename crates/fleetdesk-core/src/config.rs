//! Configuration module
//!
//! Everything is read from environment variables (a `.env` file is honoured
//! through `dotenvy`). Only the database URL and the storage backend are
//! needed to boot. The upload-token secret, public app URL, admin key and
//! Document AI settings are resolved when an endpoint needs them, so a
//! missing value surfaces as an [`AppError::Configuration`] on that endpoint.

use std::env;

use crate::error::AppError;
use crate::models::ocr::OcrDocumentType;
use crate::storage_types::StorageBackend;

const SERVER_PORT: u16 = 4000;
const MAX_CONNECTIONS: u32 = 20;
const CONNECTION_TIMEOUT_SECS: u64 = 30;
const HTTP_CONCURRENCY_LIMIT: usize = 10_000;
const MAX_UPLOAD_SIZE_MB: usize = 10;
const MIN_SECRET_LENGTH: usize = 32;
const DEFAULT_DOCUMENT_AI_LOCATION: &str = "eu";
const DEFAULT_ALLOWED_CONTENT_TYPES: &str =
    "image/jpeg,image/png,image/webp,image/heic,application/pdf";

/// Object storage settings.
#[derive(Clone, Debug)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub s3_bucket: Option<String>,
    pub s3_region: Option<String>,
    /// Custom endpoint for S3-compatible providers (MinIO, Spaces, ...)
    pub s3_endpoint: Option<String>,
    /// Base used to build public object URLs; defaults to the virtual-hosted bucket URL.
    pub s3_public_base_url: Option<String>,
    pub local_storage_path: String,
    pub local_storage_base_url: String,
}

/// Google Document AI settings. All optional until an OCR call is made.
#[derive(Clone, Debug)]
pub struct DocumentAiConfig {
    pub project_id: Option<String>,
    pub location: String,
    pub access_token: Option<String>,
    /// Overrides `https://{location}-documentai.googleapis.com`.
    pub endpoint: Option<String>,
    pub id_card_processor: Option<String>,
    pub license_processor: Option<String>,
    pub registration_processor: Option<String>,
}

impl DocumentAiConfig {
    pub fn project_id(&self) -> Result<&str, AppError> {
        require(&self.project_id, "DOCUMENT_AI_PROJECT_ID")
    }

    pub fn access_token(&self) -> Result<&str, AppError> {
        require(&self.access_token, "DOCUMENT_AI_ACCESS_TOKEN")
    }

    /// Processor id configured for the given document family.
    pub fn processor_id(&self, document_type: OcrDocumentType) -> Result<&str, AppError> {
        match document_type {
            OcrDocumentType::IdCard => {
                require(&self.id_card_processor, "DOCUMENT_AI_ID_CARD_PROCESSOR")
            }
            OcrDocumentType::DriverLicense => {
                require(&self.license_processor, "DOCUMENT_AI_LICENSE_PROCESSOR")
            }
            OcrDocumentType::CarRegistration => require(
                &self.registration_processor,
                "DOCUMENT_AI_REGISTRATION_PROCESSOR",
            ),
        }
    }

    pub fn endpoint(&self) -> String {
        self.endpoint
            .clone()
            .unwrap_or_else(|| format!("https://{}-documentai.googleapis.com", self.location))
    }
}

/// Application configuration.
#[derive(Clone, Debug)]
pub struct Config {
    pub server_port: u16,
    pub environment: String,
    pub cors_origins: Vec<String>,
    pub database_url: String,
    pub db_max_connections: u32,
    pub db_timeout_seconds: u64,
    /// Requests processed at once before new ones wait.
    pub http_concurrency_limit: usize,
    pub storage: StorageConfig,
    pub max_upload_size_bytes: usize,
    pub allowed_content_types: Vec<String>,
    pub admin_api_key: Option<String>,
    pub upload_token_secret: Option<String>,
    pub public_app_url: Option<String>,
    pub document_ai: DocumentAiConfig,
}

fn require<'a>(value: &'a Option<String>, name: &str) -> Result<&'a str, AppError> {
    value
        .as_deref()
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| AppError::Configuration(format!("{} is not configured", name)))
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

impl Config {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, anyhow::Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let environment = var("ENVIRONMENT")
            .or_else(|| var("APP_ENV"))
            .unwrap_or_else(|| "development".to_string());

        let cors_origins_str = var("CORS_ORIGINS").unwrap_or_else(|| "*".to_string());
        let is_production =
            environment.to_lowercase() == "production" || environment.to_lowercase() == "prod";
        if is_production && cors_origins_str.trim() == "*" {
            return Err(anyhow::anyhow!(
                "CORS_ORIGINS cannot be '*' in production. Please specify explicit origins."
            ));
        }
        let cors_origins = cors_origins_str
            .split(',')
            .map(|s| s.trim().to_string())
            .collect();

        let backend = match var("STORAGE_BACKEND") {
            Some(raw) => raw.parse::<StorageBackend>()?,
            None => StorageBackend::Local,
        };

        let max_upload_size_mb = var("MAX_UPLOAD_SIZE_MB")
            .and_then(|s| s.parse::<usize>().ok())
            .unwrap_or(MAX_UPLOAD_SIZE_MB);

        Ok(Config {
            server_port: var("PORT")
                .unwrap_or_else(|| SERVER_PORT.to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number"))?,
            environment,
            cors_origins,
            database_url: var("DATABASE_URL")
                .ok_or_else(|| anyhow::anyhow!("DATABASE_URL must be set"))?,
            db_max_connections: var("DB_MAX_CONNECTIONS")
                .and_then(|s| s.parse().ok())
                .unwrap_or(MAX_CONNECTIONS),
            db_timeout_seconds: var("DB_TIMEOUT_SECONDS")
                .and_then(|s| s.parse().ok())
                .unwrap_or(CONNECTION_TIMEOUT_SECS),
            http_concurrency_limit: var("HTTP_CONCURRENCY_LIMIT")
                .and_then(|s| s.parse::<usize>().ok())
                .unwrap_or(HTTP_CONCURRENCY_LIMIT)
                .max(1),
            storage: StorageConfig {
                backend,
                s3_bucket: var("S3_BUCKET"),
                s3_region: var("S3_REGION").or_else(|| var("AWS_REGION")),
                s3_endpoint: var("S3_ENDPOINT"),
                s3_public_base_url: var("S3_PUBLIC_BASE_URL"),
                local_storage_path: var("LOCAL_STORAGE_PATH")
                    .unwrap_or_else(|| "./uploads".to_string()),
                local_storage_base_url: var("LOCAL_STORAGE_BASE_URL")
                    .unwrap_or_else(|| "http://localhost:4000/uploads".to_string()),
            },
            max_upload_size_bytes: max_upload_size_mb * 1024 * 1024,
            allowed_content_types: split_list(
                &var("ALLOWED_CONTENT_TYPES")
                    .unwrap_or_else(|| DEFAULT_ALLOWED_CONTENT_TYPES.to_string()),
            ),
            admin_api_key: var("ADMIN_API_KEY"),
            upload_token_secret: var("UPLOAD_TOKEN_SECRET"),
            public_app_url: var("PUBLIC_APP_URL").map(|u| u.trim_end_matches('/').to_string()),
            document_ai: DocumentAiConfig {
                project_id: var("DOCUMENT_AI_PROJECT_ID"),
                location: var("DOCUMENT_AI_LOCATION")
                    .unwrap_or_else(|| DEFAULT_DOCUMENT_AI_LOCATION.to_string()),
                access_token: var("DOCUMENT_AI_ACCESS_TOKEN"),
                endpoint: var("DOCUMENT_AI_ENDPOINT")
                    .map(|u| u.trim_end_matches('/').to_string()),
                id_card_processor: var("DOCUMENT_AI_ID_CARD_PROCESSOR"),
                license_processor: var("DOCUMENT_AI_LICENSE_PROCESSOR"),
                registration_processor: var("DOCUMENT_AI_REGISTRATION_PROCESSOR"),
            },
        })
    }

    /// Startup checks. Call-time settings are resolved by their accessors.
    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if !self.database_url.starts_with("postgres://")
            && !self.database_url.starts_with("postgresql://")
        {
            return Err(anyhow::anyhow!(
                "DATABASE_URL must be a valid PostgreSQL connection string"
            ));
        }

        if let StorageBackend::S3 = self.storage.backend {
            if self.storage.s3_bucket.is_none() {
                return Err(anyhow::anyhow!(
                    "S3_BUCKET must be set when using S3 storage backend"
                ));
            }
            if self.storage.s3_region.is_none() {
                return Err(anyhow::anyhow!(
                    "S3_REGION or AWS_REGION must be set when using S3 storage backend"
                ));
            }
        }

        Ok(())
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        let env = self.environment.to_lowercase();
        env == "production" || env == "prod"
    }

    pub fn admin_api_key(&self) -> Result<&str, AppError> {
        require(&self.admin_api_key, "ADMIN_API_KEY")
    }

    /// Upload-token signing secret; must be at least 32 characters.
    pub fn upload_token_secret(&self) -> Result<&str, AppError> {
        let secret = require(&self.upload_token_secret, "UPLOAD_TOKEN_SECRET")?;
        if secret.len() < MIN_SECRET_LENGTH {
            return Err(AppError::Configuration(format!(
                "UPLOAD_TOKEN_SECRET must be at least {} characters long",
                MIN_SECRET_LENGTH
            )));
        }
        Ok(secret)
    }

    pub fn public_app_url(&self) -> Result<&str, AppError> {
        require(&self.public_app_url, "PUBLIC_APP_URL")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<Config, anyhow::Error> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_database_url_is_required_at_startup() {
        let err = config_from(&[]).unwrap_err();
        assert!(err.to_string().contains("DATABASE_URL"));
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[("DATABASE_URL", "postgres://localhost/fleet")]).unwrap();
        assert_eq!(config.server_port, 4000);
        assert_eq!(config.storage.backend, StorageBackend::Local);
        assert_eq!(config.max_upload_size_bytes, 10 * 1024 * 1024);
        assert_eq!(config.document_ai.location, "eu");
        assert!(config
            .allowed_content_types
            .contains(&"application/pdf".to_string()));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_call_time_settings_fail_descriptively() {
        let config = config_from(&[("DATABASE_URL", "postgres://localhost/fleet")]).unwrap();

        let err = config.upload_token_secret().unwrap_err();
        assert!(matches!(err, AppError::Configuration(ref m) if m.contains("UPLOAD_TOKEN_SECRET")));

        let err = config
            .document_ai
            .processor_id(OcrDocumentType::DriverLicense)
            .unwrap_err();
        assert!(err.to_string().contains("DOCUMENT_AI_LICENSE_PROCESSOR"));

        assert!(config.public_app_url().is_err());
        assert!(config.admin_api_key().is_err());
    }

    #[test]
    fn test_short_upload_secret_is_rejected() {
        let config = config_from(&[
            ("DATABASE_URL", "postgres://localhost/fleet"),
            ("UPLOAD_TOKEN_SECRET", "too-short"),
        ])
        .unwrap();
        assert!(config.upload_token_secret().is_err());
    }

    #[test]
    fn test_wildcard_cors_rejected_in_production() {
        let err = config_from(&[
            ("DATABASE_URL", "postgres://localhost/fleet"),
            ("ENVIRONMENT", "production"),
        ])
        .unwrap_err();
        assert!(err.to_string().contains("CORS_ORIGINS"));
    }

    #[test]
    fn test_s3_backend_requires_bucket() {
        let config = config_from(&[
            ("DATABASE_URL", "postgres://localhost/fleet"),
            ("STORAGE_BACKEND", "s3"),
        ])
        .unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_document_ai_endpoint_defaults_to_location() {
        let config = config_from(&[
            ("DATABASE_URL", "postgres://localhost/fleet"),
            ("DOCUMENT_AI_LOCATION", "us"),
        ])
        .unwrap();
        assert_eq!(
            config.document_ai.endpoint(),
            "https://us-documentai.googleapis.com"
        );
    }
}
