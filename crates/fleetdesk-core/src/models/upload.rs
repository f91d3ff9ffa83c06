//! Upload tokens, upload sessions and the document vocabulary they share.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Which record an upload flow targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Client,
    Car,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Client => "client",
            EntityKind::Car => "car",
        }
    }

    /// Discriminator signed into upload credentials.
    pub fn token_type(&self) -> &'static str {
        match self {
            EntityKind::Client => "client_upload",
            EntityKind::Car => "car_upload",
        }
    }

    /// Document types this kind of record accepts.
    pub fn document_types(&self) -> &'static [DocumentType] {
        match self {
            EntityKind::Client => &[
                DocumentType::IdCardFront,
                DocumentType::IdCardBack,
                DocumentType::LicenseFront,
                DocumentType::LicenseBack,
            ],
            EntityKind::Car => &[
                DocumentType::Registration,
                DocumentType::Insurance,
                DocumentType::Inspection,
                DocumentType::Photo,
            ],
        }
    }

    /// Minimum set required before a session may be marked ready for completion.
    pub fn core_documents(&self) -> &'static [DocumentType] {
        match self {
            EntityKind::Client => &[DocumentType::IdCardFront, DocumentType::LicenseFront],
            EntityKind::Car => &[
                DocumentType::Registration,
                DocumentType::Insurance,
                DocumentType::Inspection,
            ],
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "client" => Ok(EntityKind::Client),
            "car" => Ok(EntityKind::Car),
            other => Err(format!("Unknown entity kind: {}", other)),
        }
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    IdCardFront,
    IdCardBack,
    LicenseFront,
    LicenseBack,
    Registration,
    Insurance,
    Inspection,
    Photo,
}

impl DocumentType {
    pub const ALL: [DocumentType; 8] = [
        DocumentType::IdCardFront,
        DocumentType::IdCardBack,
        DocumentType::LicenseFront,
        DocumentType::LicenseBack,
        DocumentType::Registration,
        DocumentType::Insurance,
        DocumentType::Inspection,
        DocumentType::Photo,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentType::IdCardFront => "id_card_front",
            DocumentType::IdCardBack => "id_card_back",
            DocumentType::LicenseFront => "license_front",
            DocumentType::LicenseBack => "license_back",
            DocumentType::Registration => "registration",
            DocumentType::Insurance => "insurance",
            DocumentType::Inspection => "inspection",
            DocumentType::Photo => "photo",
        }
    }

    pub fn kind(&self) -> EntityKind {
        match self {
            DocumentType::IdCardFront
            | DocumentType::IdCardBack
            | DocumentType::LicenseFront
            | DocumentType::LicenseBack => EntityKind::Client,
            DocumentType::Registration
            | DocumentType::Insurance
            | DocumentType::Inspection
            | DocumentType::Photo => EntityKind::Car,
        }
    }

    /// Column holding this document's URL on both the entity and session tables.
    pub fn url_column(&self) -> &'static str {
        match self {
            DocumentType::IdCardFront => "id_card_front_url",
            DocumentType::IdCardBack => "id_card_back_url",
            DocumentType::LicenseFront => "license_front_url",
            DocumentType::LicenseBack => "license_back_url",
            DocumentType::Registration => "registration_url",
            DocumentType::Insurance => "insurance_url",
            DocumentType::Inspection => "inspection_url",
            DocumentType::Photo => "photo_url",
        }
    }

    /// Parse a declared type and check that it belongs to `kind`.
    pub fn parse_for(kind: EntityKind, raw: &str) -> Result<Self, String> {
        let doc = raw.trim().parse::<DocumentType>()?;
        if doc.kind() != kind {
            return Err(format!(
                "Document type '{}' is not accepted for a {}",
                doc.as_str(),
                kind
            ));
        }
        Ok(doc)
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocumentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DocumentType::ALL
            .iter()
            .copied()
            .find(|d| d.as_str() == s)
            .ok_or_else(|| format!("Unknown document type: {}", s))
    }
}

/// Raw `upload_status` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum UploadStatus {
    Pending,
    Uploading,
    ReadyForCompletion,
    Completed,
    ManuallyCompleted,
    Failed,
}

impl UploadStatus {
    pub const ALL: [UploadStatus; 6] = [
        UploadStatus::Pending,
        UploadStatus::Uploading,
        UploadStatus::ReadyForCompletion,
        UploadStatus::Completed,
        UploadStatus::ManuallyCompleted,
        UploadStatus::Failed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            UploadStatus::Pending => "pending",
            UploadStatus::Uploading => "uploading",
            UploadStatus::ReadyForCompletion => "ready_for_completion",
            UploadStatus::Completed => "completed",
            UploadStatus::ManuallyCompleted => "manually_completed",
            UploadStatus::Failed => "failed",
        }
    }

    /// Statuses that document writes no longer move.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            UploadStatus::Completed | UploadStatus::ManuallyCompleted | UploadStatus::Failed
        )
    }

    /// Statuses that reject a second completion.
    pub fn is_completed(&self) -> bool {
        matches!(
            self,
            UploadStatus::Completed | UploadStatus::ManuallyCompleted
        )
    }
}

impl FromStr for UploadStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        UploadStatus::ALL
            .iter()
            .copied()
            .find(|st| st.as_str() == s)
            .ok_or_else(|| format!("Unknown upload status: {}", s))
    }
}

/// Raw `processing_status` column, written by an asynchronous OCR pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl ProcessingStatus {
    pub const ALL: [ProcessingStatus; 4] = [
        ProcessingStatus::Pending,
        ProcessingStatus::Processing,
        ProcessingStatus::Completed,
        ProcessingStatus::Failed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessingStatus::Pending => "pending",
            ProcessingStatus::Processing => "processing",
            ProcessingStatus::Completed => "completed",
            ProcessingStatus::Failed => "failed",
        }
    }
}

impl FromStr for ProcessingStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ProcessingStatus::ALL
            .iter()
            .copied()
            .find(|st| st.as_str() == s)
            .ok_or_else(|| format!("Unknown processing status: {}", s))
    }
}

/// Persisted upload-token row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadToken {
    pub id: Uuid,
    pub kind: EntityKind,
    pub entity_id: Uuid,
    pub nonce: String,
    pub expires_at: DateTime<Utc>,
    pub used_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl UploadToken {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    pub fn is_used(&self) -> bool {
        self.used_at.is_some()
    }
}

/// Documents received for one record under one token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadSession {
    pub id: Uuid,
    pub kind: EntityKind,
    pub token_id: Uuid,
    pub entity_id: Uuid,
    pub documents: BTreeMap<DocumentType, String>,
    pub upload_status: UploadStatus,
    pub processing_status: ProcessingStatus,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UploadSession {
    /// Core documents still missing from this session.
    pub fn missing_core(&self) -> Vec<DocumentType> {
        missing_core(self.kind, self.documents.keys().copied())
    }
}

/// Core documents of `kind` absent from `present`.
pub fn missing_core<I>(kind: EntityKind, present: I) -> Vec<DocumentType>
where
    I: IntoIterator<Item = DocumentType>,
{
    let present: BTreeSet<DocumentType> = present.into_iter().collect();
    kind.core_documents()
        .iter()
        .copied()
        .filter(|d| !present.contains(d))
        .collect()
}

/// Upload status after a document write, re-evaluated from the full present set.
pub fn readiness_status<I>(kind: EntityKind, present: I) -> UploadStatus
where
    I: IntoIterator<Item = DocumentType>,
{
    if missing_core(kind, present).is_empty() {
        UploadStatus::ReadyForCompletion
    } else {
        UploadStatus::Uploading
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_type_parse_respects_kind() {
        assert_eq!(
            DocumentType::parse_for(EntityKind::Car, "insurance").unwrap(),
            DocumentType::Insurance
        );
        assert!(DocumentType::parse_for(EntityKind::Car, "license_front").is_err());
        assert!(DocumentType::parse_for(EntityKind::Client, "registration").is_err());
        assert!(DocumentType::parse_for(EntityKind::Client, "passport").is_err());
    }

    #[test]
    fn test_every_document_type_belongs_to_its_kind_list() {
        for doc in DocumentType::ALL {
            assert!(doc.kind().document_types().contains(&doc));
            assert_eq!(doc.as_str().parse::<DocumentType>().unwrap(), doc);
        }
    }

    #[test]
    fn test_car_readiness_requires_all_three_core_documents() {
        let core = [
            DocumentType::Registration,
            DocumentType::Insurance,
            DocumentType::Inspection,
        ];
        for skip in core {
            let present: Vec<_> = core
                .iter()
                .copied()
                .filter(|d| *d != skip)
                .chain([DocumentType::Photo])
                .collect();
            assert_eq!(
                readiness_status(EntityKind::Car, present),
                UploadStatus::Uploading,
                "missing {} must not be ready",
                skip
            );
        }
    }

    #[test]
    fn test_car_readiness_is_order_independent() {
        let orders = [
            [
                DocumentType::Registration,
                DocumentType::Insurance,
                DocumentType::Inspection,
            ],
            [
                DocumentType::Inspection,
                DocumentType::Registration,
                DocumentType::Insurance,
            ],
            [
                DocumentType::Insurance,
                DocumentType::Inspection,
                DocumentType::Registration,
            ],
        ];
        for order in orders {
            let mut seen = Vec::new();
            for (i, doc) in order.iter().enumerate() {
                seen.push(*doc);
                let expected = if i == 2 {
                    UploadStatus::ReadyForCompletion
                } else {
                    UploadStatus::Uploading
                };
                assert_eq!(readiness_status(EntityKind::Car, seen.clone()), expected);
            }
        }
    }

    #[test]
    fn test_client_core_documents() {
        assert_eq!(
            missing_core(EntityKind::Client, [DocumentType::IdCardBack]),
            vec![DocumentType::IdCardFront, DocumentType::LicenseFront]
        );
        assert_eq!(
            readiness_status(
                EntityKind::Client,
                [DocumentType::LicenseFront, DocumentType::IdCardFront]
            ),
            UploadStatus::ReadyForCompletion
        );
    }

    #[test]
    fn test_token_expiry_boundary() {
        let now = Utc::now();
        let token = UploadToken {
            id: Uuid::new_v4(),
            kind: EntityKind::Car,
            entity_id: Uuid::new_v4(),
            nonce: "n".to_string(),
            expires_at: now,
            used_at: None,
            created_at: now,
        };
        assert!(token.is_expired_at(now));
        assert!(!token.is_expired_at(now - chrono::Duration::seconds(1)));
    }
}
