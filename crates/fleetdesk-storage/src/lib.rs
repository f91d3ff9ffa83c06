//! FleetDesk Storage Library
//!
//! Storage abstraction for uploaded documents with S3 and local filesystem
//! backends. Key layout is centralized in [`keys`] so every backend stores
//! the same document under the same key.

pub mod factory;
pub mod keys;
#[cfg(feature = "storage-local")]
pub mod local;
#[cfg(feature = "storage-s3")]
pub mod s3;
pub mod traits;

pub use factory::create_storage;
pub use fleetdesk_core::StorageBackend;
#[cfg(feature = "storage-local")]
pub use local::LocalStorage;
#[cfg(feature = "storage-s3")]
pub use s3::S3Storage;
pub use traits::{Storage, StorageError, StorageResult};
