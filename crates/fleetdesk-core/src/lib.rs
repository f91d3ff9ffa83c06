//! FleetDesk Core Library
//!
//! Domain models, error types and configuration shared by every FleetDesk crate.

pub mod config;
pub mod constants;
pub mod error;
pub mod models;
pub mod storage_types;

pub use config::{Config, DocumentAiConfig, StorageConfig};
pub use error::{AppError, ErrorMetadata, LogLevel};
pub use storage_types::StorageBackend;
