use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fleetdesk_core::models::{DocumentType, EntityKind, UploadSession, UploadStatus};
use fleetdesk_core::AppError;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use super::tables::{parse_column, upload_tables};
use crate::repository::UploadSessionRepository;

/// Postgres-backed upload session repository (client and car tables)
#[derive(Clone)]
pub struct PgUploadSessionRepository {
    pool: PgPool,
}

impl PgUploadSessionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Select list for a session table; document columns differ per kind.
fn session_columns(kind: EntityKind) -> String {
    let tables = upload_tables(kind);
    let documents = kind
        .document_types()
        .iter()
        .map(|d| d.url_column())
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "id, token_id, {} AS entity_id, {}, upload_status, processing_status, completed_at, created_at, updated_at",
        tables.entity_column, documents
    )
}

fn session_from_row(kind: EntityKind, row: &PgRow) -> Result<UploadSession, AppError> {
    let mut documents = BTreeMap::new();
    for document_type in kind.document_types() {
        let url: Option<String> = row.try_get(document_type.url_column())?;
        if let Some(url) = url {
            documents.insert(*document_type, url);
        }
    }

    let upload_status: String = row.try_get("upload_status")?;
    let processing_status: String = row.try_get("processing_status")?;

    Ok(UploadSession {
        id: row.try_get("id")?,
        kind,
        token_id: row.try_get("token_id")?,
        entity_id: row.try_get("entity_id")?,
        documents,
        upload_status: parse_column("upload_status", &upload_status)?,
        processing_status: parse_column("processing_status", &processing_status)?,
        completed_at: row.try_get("completed_at")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn session_document_column(
    kind: EntityKind,
    document_type: DocumentType,
) -> Result<&'static str, AppError> {
    if document_type.kind() != kind {
        return Err(AppError::InvalidInput(format!(
            "Document type '{}' is not accepted for a {}",
            document_type, kind
        )));
    }
    Ok(document_type.url_column())
}

#[async_trait]
impl UploadSessionRepository for PgUploadSessionRepository {
    #[tracing::instrument(skip(self))]
    async fn get_by_token(
        &self,
        kind: EntityKind,
        token_id: Uuid,
    ) -> Result<Option<UploadSession>, AppError> {
        let tables = upload_tables(kind);
        let row = sqlx::query(&format!(
            "SELECT {} FROM {} WHERE token_id = $1",
            session_columns(kind),
            tables.sessions
        ))
        .bind(token_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| session_from_row(kind, &r)).transpose()
    }

    #[tracing::instrument(skip(self))]
    async fn get_or_create(
        &self,
        kind: EntityKind,
        token_id: Uuid,
        entity_id: Uuid,
    ) -> Result<UploadSession, AppError> {
        let tables = upload_tables(kind);
        // The no-op DO UPDATE makes RETURNING yield the existing row on conflict.
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO {sessions} (id, token_id, {fk}, upload_status, processing_status)
            VALUES ($1, $2, $3, 'pending', 'pending')
            ON CONFLICT (token_id) DO UPDATE SET token_id = EXCLUDED.token_id
            RETURNING {columns}
            "#,
            sessions = tables.sessions,
            fk = tables.entity_column,
            columns = session_columns(kind),
        ))
        .bind(Uuid::new_v4())
        .bind(token_id)
        .bind(entity_id)
        .fetch_one(&self.pool)
        .await?;

        session_from_row(kind, &row)
    }

    #[tracing::instrument(skip(self, url))]
    async fn record_document(
        &self,
        kind: EntityKind,
        session_id: Uuid,
        document_type: DocumentType,
        url: &str,
    ) -> Result<Option<UploadSession>, AppError> {
        let tables = upload_tables(kind);
        let column = session_document_column(kind, document_type)?;
        let row = sqlx::query(&format!(
            r#"
            UPDATE {sessions}
            SET {column} = $2,
                upload_status = CASE WHEN upload_status = 'pending' THEN 'uploading' ELSE upload_status END,
                updated_at = NOW()
            WHERE id = $1 AND upload_status NOT IN ('completed', 'manually_completed', 'failed')
            RETURNING {columns}
            "#,
            sessions = tables.sessions,
            columns = session_columns(kind),
        ))
        .bind(session_id)
        .bind(url)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| session_from_row(kind, &r)).transpose()
    }

    #[tracing::instrument(skip(self))]
    async fn set_upload_status(
        &self,
        kind: EntityKind,
        session_id: Uuid,
        status: UploadStatus,
    ) -> Result<bool, AppError> {
        let tables = upload_tables(kind);
        let result = sqlx::query(&format!(
            r#"
            UPDATE {}
            SET upload_status = $2, updated_at = NOW()
            WHERE id = $1 AND upload_status NOT IN ('completed', 'manually_completed', 'failed')
            "#,
            tables.sessions
        ))
        .bind(session_id)
        .bind(status.as_str())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    #[tracing::instrument(skip(self))]
    async fn complete(
        &self,
        kind: EntityKind,
        session_id: Uuid,
        completed_at: DateTime<Utc>,
    ) -> Result<Option<UploadSession>, AppError> {
        let tables = upload_tables(kind);
        let row = sqlx::query(&format!(
            r#"
            UPDATE {sessions}
            SET upload_status = 'manually_completed', completed_at = $2, updated_at = NOW()
            WHERE id = $1 AND upload_status NOT IN ('completed', 'manually_completed')
            RETURNING {columns}
            "#,
            sessions = tables.sessions,
            columns = session_columns(kind),
        ))
        .bind(session_id)
        .bind(completed_at)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| session_from_row(kind, &r)).transpose()
    }

    #[tracing::instrument(skip(self))]
    async fn list_for_entity(
        &self,
        kind: EntityKind,
        entity_id: Uuid,
    ) -> Result<Vec<UploadSession>, AppError> {
        let tables = upload_tables(kind);
        let rows = sqlx::query(&format!(
            "SELECT {} FROM {} WHERE {} = $1 ORDER BY created_at DESC",
            session_columns(kind),
            tables.sessions,
            tables.entity_column
        ))
        .bind(entity_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(|r| session_from_row(kind, r)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_columns_follow_kind() {
        let car = session_columns(EntityKind::Car);
        assert!(car.contains("car_id AS entity_id"));
        assert!(car.contains("inspection_url"));
        assert!(!car.contains("license_front_url"));

        let client = session_columns(EntityKind::Client);
        assert!(client.contains("client_id AS entity_id"));
        assert!(client.contains("license_back_url"));
    }

    #[test]
    fn test_document_column_rejects_other_kind() {
        assert!(session_document_column(EntityKind::Car, DocumentType::IdCardFront).is_err());
        assert_eq!(
            session_document_column(EntityKind::Client, DocumentType::IdCardFront).unwrap(),
            "id_card_front_url"
        );
    }
}
