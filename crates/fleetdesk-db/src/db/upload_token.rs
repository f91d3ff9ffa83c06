use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fleetdesk_core::models::{EntityKind, UploadToken};
use fleetdesk_core::AppError;
use sqlx::PgPool;
use uuid::Uuid;

use super::tables::upload_tables;
use crate::repository::UploadTokenRepository;

#[derive(sqlx::FromRow)]
struct UploadTokenRow {
    id: Uuid,
    entity_id: Uuid,
    nonce: String,
    expires_at: DateTime<Utc>,
    used_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl UploadTokenRow {
    fn into_token(self, kind: EntityKind) -> UploadToken {
        UploadToken {
            id: self.id,
            kind,
            entity_id: self.entity_id,
            nonce: self.nonce,
            expires_at: self.expires_at,
            used_at: self.used_at,
            created_at: self.created_at,
        }
    }
}

/// Postgres-backed upload token repository (client and car tables)
#[derive(Clone)]
pub struct PgUploadTokenRepository {
    pool: PgPool,
}

impl PgUploadTokenRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UploadTokenRepository for PgUploadTokenRepository {
    #[tracing::instrument(skip(self, nonce))]
    async fn create(
        &self,
        kind: EntityKind,
        entity_id: Uuid,
        nonce: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<UploadToken, AppError> {
        let tables = upload_tables(kind);
        let row = sqlx::query_as::<_, UploadTokenRow>(&format!(
            r#"
            INSERT INTO {tokens} (id, {fk}, nonce, expires_at)
            VALUES ($1, $2, $3, $4)
            RETURNING id, {fk} AS entity_id, nonce, expires_at, used_at, created_at
            "#,
            tokens = tables.tokens,
            fk = tables.entity_column,
        ))
        .bind(Uuid::new_v4())
        .bind(entity_id)
        .bind(nonce)
        .bind(expires_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into_token(kind))
    }

    #[tracing::instrument(skip(self))]
    async fn get(&self, kind: EntityKind, id: Uuid) -> Result<Option<UploadToken>, AppError> {
        let tables = upload_tables(kind);
        let row = sqlx::query_as::<_, UploadTokenRow>(&format!(
            "SELECT id, {fk} AS entity_id, nonce, expires_at, used_at, created_at FROM {tokens} WHERE id = $1",
            tokens = tables.tokens,
            fk = tables.entity_column,
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| r.into_token(kind)))
    }

    #[tracing::instrument(skip(self))]
    async fn mark_used(
        &self,
        kind: EntityKind,
        id: Uuid,
        used_at: DateTime<Utc>,
    ) -> Result<bool, AppError> {
        let tables = upload_tables(kind);
        let result = sqlx::query(&format!(
            "UPDATE {} SET used_at = $2 WHERE id = $1 AND used_at IS NULL",
            tables.tokens
        ))
        .bind(id)
        .bind(used_at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}
