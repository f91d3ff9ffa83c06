//! Document ingestion pipeline
//!
//! validate → store → audit (best effort) → session/entity update → readiness.
//! Mobile uploads go through an upload session; staff uploads attach the
//! document to the record directly.

use std::sync::Arc;

use fleetdesk_core::models::{
    derive_status, readiness_status, DerivedStatus, DocumentType, EntityKind, NewDocumentScan,
    UploadSession, UploadToken,
};
use fleetdesk_core::{AppError, Config};
use fleetdesk_storage::keys::{entity_document_key, extension_for, session_document_key};
use uuid::Uuid;

use crate::state::AppState;
use crate::utils::upload::{
    normalize_mime_type, validate_content_type, validate_file_size, UploadForm,
};

/// A document that passed request validation.
#[derive(Debug)]
pub struct ValidatedDocument {
    pub document_type: DocumentType,
    pub data: Vec<u8>,
    pub content_type: String,
    pub filename: Option<String>,
}

/// Check an upload form for `kind`: declared type, then size, then content type.
pub fn validate_document(
    config: &Config,
    kind: EntityKind,
    form: UploadForm,
) -> Result<ValidatedDocument, AppError> {
    let raw_type = form
        .document_type
        .ok_or_else(|| AppError::InvalidInput("document_type is required".to_string()))?;
    let document_type = DocumentType::parse_for(kind, &raw_type).map_err(AppError::InvalidInput)?;

    validate_file_size(form.data.len(), config.max_upload_size_bytes)?;
    validate_content_type(&form.content_type, &config.allowed_content_types)?;

    Ok(ValidatedDocument {
        document_type,
        data: form.data,
        content_type: normalize_mime_type(&form.content_type),
        filename: form.filename,
    })
}

/// Result of a document received through an upload session.
#[derive(Debug, Clone)]
pub struct SessionDocument {
    pub document_type: DocumentType,
    pub url: String,
    pub session: UploadSession,
    pub status: DerivedStatus,
}

pub struct DocumentIngestService {
    state: Arc<AppState>,
}

impl DocumentIngestService {
    pub fn new(state: &Arc<AppState>) -> Self {
        Self {
            state: state.clone(),
        }
    }

    /// Ingest one document under a verified upload token.
    #[tracing::instrument(
        skip(self, token, document),
        fields(kind = %token.kind, token_id = %token.id, document_type = %document.document_type)
    )]
    pub async fn ingest_for_session(
        &self,
        token: &UploadToken,
        document: ValidatedDocument,
    ) -> Result<SessionDocument, AppError> {
        let kind = token.kind;
        let sessions = &self.state.db.upload_sessions;

        let session = sessions
            .get_or_create(kind, token.id, token.entity_id)
            .await?;
        if session.upload_status.is_terminal() {
            return Err(session_closed());
        }

        let extension = extension_for(&document.content_type, document.filename.as_deref());
        let storage_key =
            session_document_key(kind, session.id, document.document_type, &extension);
        let url = self
            .state
            .storage
            .upload_with_key(&storage_key, document.data, &document.content_type)
            .await?;

        self.record_scan(NewDocumentScan {
            entity_kind: kind,
            entity_id: token.entity_id,
            session_id: Some(session.id),
            document_type: document.document_type,
            file_url: url.clone(),
            storage_key,
        });

        // Completion may land between the check above and this write.
        let Some(session) = sessions
            .record_document(kind, session.id, document.document_type, &url)
            .await?
        else {
            return Err(match sessions.get_by_token(kind, token.id).await? {
                Some(_) => session_closed(),
                None => AppError::NotFound("No upload session found".to_string()),
            });
        };
        self.set_entity_document(kind, token.entity_id, document.document_type, &url)
            .await?;

        let readiness = readiness_status(kind, session.documents.keys().copied());
        let changed = sessions
            .set_upload_status(kind, session.id, readiness)
            .await?;
        if !changed {
            tracing::debug!(
                session_id = %session.id,
                upload_status = session.upload_status.as_str(),
                "Session is terminal; readiness left unchanged"
            );
        }

        let session = sessions
            .get_by_token(kind, token.id)
            .await?
            .unwrap_or(session);
        let status = derive_status(session.upload_status, session.processing_status);

        tracing::info!(
            session_id = %session.id,
            status = status.as_str(),
            "Document received"
        );

        Ok(SessionDocument {
            document_type: document.document_type,
            url,
            session,
            status,
        })
    }

    /// Attach a document to a record without a token or session.
    #[tracing::instrument(
        skip(self, document),
        fields(document_type = %document.document_type)
    )]
    pub async fn ingest_for_entity(
        &self,
        kind: EntityKind,
        entity_id: Uuid,
        document: ValidatedDocument,
    ) -> Result<String, AppError> {
        self.ensure_entity_exists(kind, entity_id).await?;

        let extension = extension_for(&document.content_type, document.filename.as_deref());
        let storage_key =
            entity_document_key(kind, entity_id, document.document_type, &extension);
        let url = self
            .state
            .storage
            .upload_with_key(&storage_key, document.data, &document.content_type)
            .await?;

        self.record_scan(NewDocumentScan {
            entity_kind: kind,
            entity_id,
            session_id: None,
            document_type: document.document_type,
            file_url: url.clone(),
            storage_key,
        });

        self.set_entity_document(kind, entity_id, document.document_type, &url)
            .await?;

        tracing::info!(%entity_id, "Document attached by staff");
        Ok(url)
    }

    /// Queue the `document_scans` audit insert.
    ///
    /// The insert runs detached and `document_scans` has no foreign key, so a
    /// row can outlive its entity when a car is deleted while the insert is
    /// still queued. Listing scans by entity never surfaces such rows.
    fn record_scan(&self, scan: NewDocumentScan) {
        let scans = self.state.db.document_scans.clone();
        self.state
            .background
            .spawn("document_scan_insert", async move { scans.insert(scan).await });
    }

    async fn ensure_entity_exists(&self, kind: EntityKind, entity_id: Uuid) -> Result<(), AppError> {
        let exists = match kind {
            EntityKind::Client => self.state.db.clients.get(entity_id).await?.is_some(),
            EntityKind::Car => self.state.db.cars.get(entity_id).await?.is_some(),
        };
        if exists {
            Ok(())
        } else {
            Err(not_found(kind))
        }
    }

    async fn set_entity_document(
        &self,
        kind: EntityKind,
        entity_id: Uuid,
        document_type: DocumentType,
        url: &str,
    ) -> Result<(), AppError> {
        let updated = match kind {
            EntityKind::Client => {
                self.state
                    .db
                    .clients
                    .set_document_url(entity_id, document_type, url)
                    .await?
            }
            EntityKind::Car => {
                self.state
                    .db
                    .cars
                    .set_document_url(entity_id, document_type, url)
                    .await?
            }
        };
        if updated {
            Ok(())
        } else {
            Err(not_found(kind))
        }
    }
}

fn session_closed() -> AppError {
    AppError::Conflict("Upload session is no longer accepting documents".to_string())
}

fn not_found(kind: EntityKind) -> AppError {
    match kind {
        EntityKind::Client => AppError::NotFound("Client not found".to_string()),
        EntityKind::Car => AppError::NotFound("Car not found".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> Config {
        Config::from_lookup(|key| match key {
            "DATABASE_URL" => Some("postgres://localhost/fleetdesk".to_string()),
            "MAX_UPLOAD_SIZE_MB" => Some("1".to_string()),
            _ => None,
        })
        .unwrap()
    }

    fn form(document_type: Option<&str>, size: usize, content_type: &str) -> UploadForm {
        UploadForm {
            data: vec![7u8; size],
            filename: Some("scan.jpg".to_string()),
            content_type: content_type.to_string(),
            document_type: document_type.map(str::to_string),
        }
    }

    #[test]
    fn test_document_type_is_required() {
        let err = validate_document(&config(), EntityKind::Car, form(None, 10, "image/jpeg"))
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
    }

    #[test]
    fn test_document_type_must_match_kind() {
        let err = validate_document(
            &config(),
            EntityKind::Car,
            form(Some("license_front"), 10, "image/jpeg"),
        )
        .unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
    }

    #[test]
    fn test_size_is_checked_before_content_type() {
        let err = validate_document(
            &config(),
            EntityKind::Client,
            form(Some("id_card_front"), 2 * 1024 * 1024, "text/html"),
        )
        .unwrap_err();
        assert!(matches!(err, AppError::PayloadTooLarge(_)));

        let err = validate_document(
            &config(),
            EntityKind::Client,
            form(Some("id_card_front"), 10, "text/html"),
        )
        .unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
    }

    #[test]
    fn test_content_type_is_normalized() {
        let doc = validate_document(
            &config(),
            EntityKind::Client,
            form(Some("license_front"), 10, "image/PNG; q=1"),
        )
        .unwrap();
        assert_eq!(doc.document_type, DocumentType::LicenseFront);
        assert_eq!(doc.content_type, "image/png");
    }
}
