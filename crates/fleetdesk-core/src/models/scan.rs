use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::upload::{DocumentType, EntityKind};

/// Audit row written for every stored document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct DocumentScan {
    pub id: Uuid,
    pub entity_kind: EntityKind,
    pub entity_id: Uuid,
    /// Absent for staff uploads made outside a mobile session.
    pub session_id: Option<Uuid>,
    pub document_type: DocumentType,
    pub file_url: String,
    pub storage_key: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewDocumentScan {
    pub entity_kind: EntityKind,
    pub entity_id: Uuid,
    pub session_id: Option<Uuid>,
    pub document_type: DocumentType,
    pub file_url: String,
    pub storage_key: String,
}
