//! Shared key generation for storage backends.
//!
//! - Mobile uploads: `{kind}-uploads/{session_id}/{document_type}.{ext}`.
//!   Re-uploading a document in the same session replaces the object.
//! - Staff uploads: `{kind}-documents/{entity_id}/{document_type}-{uuid}.{ext}`.

use fleetdesk_core::models::{DocumentType, EntityKind};
use uuid::Uuid;

/// Key for a document received through a mobile upload session.
pub fn session_document_key(
    kind: EntityKind,
    session_id: Uuid,
    document_type: DocumentType,
    extension: &str,
) -> String {
    format!(
        "{}-uploads/{}/{}.{}",
        kind.as_str(),
        session_id,
        document_type.as_str(),
        extension
    )
}

/// Key for a document attached directly by staff.
pub fn entity_document_key(
    kind: EntityKind,
    entity_id: Uuid,
    document_type: DocumentType,
    extension: &str,
) -> String {
    format!(
        "{}-documents/{}/{}-{}.{}",
        kind.as_str(),
        entity_id,
        document_type.as_str(),
        Uuid::new_v4(),
        extension
    )
}

/// File extension for a stored document, from its content type with the
/// original filename as fallback.
pub fn extension_for(content_type: &str, filename: Option<&str>) -> String {
    let from_type = match content_type.to_lowercase().as_str() {
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/webp" => Some("webp"),
        "image/heic" => Some("heic"),
        "application/pdf" => Some("pdf"),
        _ => None,
    };
    if let Some(ext) = from_type {
        return ext.to_string();
    }

    filename
        .and_then(|f| f.rsplit_once('.'))
        .map(|(_, ext)| ext.to_lowercase())
        .filter(|ext| !ext.is_empty() && ext.len() <= 5 && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .unwrap_or_else(|| "bin".to_string())
}
