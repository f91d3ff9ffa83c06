use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fleetdesk_core::models::{DocumentScan, EntityKind, NewDocumentScan};
use fleetdesk_core::AppError;
use sqlx::PgPool;
use uuid::Uuid;

use super::tables::parse_column;
use crate::repository::DocumentScanRepository;

const SCAN_COLUMNS: &str =
    "id, entity_kind, entity_id, session_id, document_type, file_url, storage_key, created_at";

#[derive(sqlx::FromRow)]
struct DocumentScanRow {
    id: Uuid,
    entity_kind: String,
    entity_id: Uuid,
    session_id: Option<Uuid>,
    document_type: String,
    file_url: String,
    storage_key: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<DocumentScanRow> for DocumentScan {
    type Error = AppError;

    fn try_from(row: DocumentScanRow) -> Result<Self, Self::Error> {
        Ok(DocumentScan {
            id: row.id,
            entity_kind: parse_column("document_scans.entity_kind", &row.entity_kind)?,
            entity_id: row.entity_id,
            session_id: row.session_id,
            document_type: parse_column("document_scans.document_type", &row.document_type)?,
            file_url: row.file_url,
            storage_key: row.storage_key,
            created_at: row.created_at,
        })
    }
}

/// Postgres-backed scan audit repository
#[derive(Clone)]
pub struct PgDocumentScanRepository {
    pool: PgPool,
}

impl PgDocumentScanRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DocumentScanRepository for PgDocumentScanRepository {
    #[tracing::instrument(skip(self, scan), fields(entity_id = %scan.entity_id, document_type = %scan.document_type))]
    async fn insert(&self, scan: NewDocumentScan) -> Result<DocumentScan, AppError> {
        let row = sqlx::query_as::<_, DocumentScanRow>(&format!(
            r#"
            INSERT INTO document_scans (
                id, entity_kind, entity_id, session_id, document_type, file_url, storage_key
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {SCAN_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(scan.entity_kind.as_str())
        .bind(scan.entity_id)
        .bind(scan.session_id)
        .bind(scan.document_type.as_str())
        .bind(&scan.file_url)
        .bind(&scan.storage_key)
        .fetch_one(&self.pool)
        .await?;

        row.try_into()
    }

    #[tracing::instrument(skip(self))]
    async fn list_for_entity(
        &self,
        kind: EntityKind,
        entity_id: Uuid,
    ) -> Result<Vec<DocumentScan>, AppError> {
        let rows = sqlx::query_as::<_, DocumentScanRow>(&format!(
            "SELECT {SCAN_COLUMNS} FROM document_scans WHERE entity_kind = $1 AND entity_id = $2 ORDER BY created_at DESC"
        ))
        .bind(kind.as_str())
        .bind(entity_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(DocumentScan::try_from).collect()
    }
}
