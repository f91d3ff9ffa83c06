use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use fleetdesk_core::constants::page_size;
use fleetdesk_core::models::{
    Client, ClientFilter, ClientStatus, CreateClientRequest, DocumentType, EntityKind,
};
use fleetdesk_core::AppError;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use super::tables::{parse_column, upload_tables};
use crate::repository::ClientRepository;

const CLIENT_COLUMNS: &str = "id, first_name, last_name, email, phone, address, date_of_birth, \
     id_card_number, id_card_expiry, license_number, license_expiry, \
     id_card_front_url, id_card_back_url, license_front_url, license_back_url, \
     status, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct ClientRow {
    id: Uuid,
    first_name: String,
    last_name: String,
    email: String,
    phone: Option<String>,
    address: Option<String>,
    date_of_birth: Option<NaiveDate>,
    id_card_number: Option<String>,
    id_card_expiry: Option<NaiveDate>,
    license_number: Option<String>,
    license_expiry: Option<NaiveDate>,
    id_card_front_url: Option<String>,
    id_card_back_url: Option<String>,
    license_front_url: Option<String>,
    license_back_url: Option<String>,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ClientRow> for Client {
    type Error = AppError;

    fn try_from(row: ClientRow) -> Result<Self, Self::Error> {
        Ok(Client {
            id: row.id,
            first_name: row.first_name,
            last_name: row.last_name,
            email: row.email,
            phone: row.phone,
            address: row.address,
            date_of_birth: row.date_of_birth,
            id_card_number: row.id_card_number,
            id_card_expiry: row.id_card_expiry,
            license_number: row.license_number,
            license_expiry: row.license_expiry,
            id_card_front_url: row.id_card_front_url,
            id_card_back_url: row.id_card_back_url,
            license_front_url: row.license_front_url,
            license_back_url: row.license_back_url,
            status: parse_column("clients.status", &row.status)?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Postgres-backed client repository
#[derive(Clone)]
pub struct PgClientRepository {
    pool: PgPool,
}

impl PgClientRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn client_document_column(document_type: DocumentType) -> Result<&'static str, AppError> {
    if document_type.kind() != EntityKind::Client {
        return Err(AppError::InvalidInput(format!(
            "Document type '{}' does not belong to a client",
            document_type
        )));
    }
    Ok(document_type.url_column())
}

#[async_trait]
impl ClientRepository for PgClientRepository {
    #[tracing::instrument(skip(self, request), fields(email = %request.email))]
    async fn create(&self, request: &CreateClientRequest) -> Result<Client, AppError> {
        let result = sqlx::query_as::<_, ClientRow>(&format!(
            r#"
            INSERT INTO clients (
                id, first_name, last_name, email, phone, address, date_of_birth,
                id_card_number, id_card_expiry, license_number, license_expiry, status
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, 'active')
            RETURNING {CLIENT_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(&request.first_name)
        .bind(&request.last_name)
        .bind(&request.email)
        .bind(&request.phone)
        .bind(&request.address)
        .bind(request.date_of_birth)
        .bind(&request.id_card_number)
        .bind(request.id_card_expiry)
        .bind(&request.license_number)
        .bind(request.license_expiry)
        .fetch_one(&self.pool)
        .await;

        match result {
            Ok(row) => row.try_into(),
            Err(e) => {
                let err = AppError::from(e);
                if err.is_unique_violation() {
                    Err(AppError::Conflict(
                        "A client with this email already exists".to_string(),
                    ))
                } else {
                    Err(err)
                }
            }
        }
    }

    #[tracing::instrument(skip(self))]
    async fn get(&self, id: Uuid) -> Result<Option<Client>, AppError> {
        let row = sqlx::query_as::<_, ClientRow>(&format!(
            "SELECT {CLIENT_COLUMNS} FROM clients WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Client::try_from).transpose()
    }

    #[tracing::instrument(skip(self))]
    async fn list(&self, filter: &ClientFilter) -> Result<Vec<Client>, AppError> {
        let mut query: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {CLIENT_COLUMNS} FROM clients WHERE 1 = 1"));

        if let Some(status) = filter.status {
            query.push(" AND status = ").push_bind(status.as_str());
        }

        if let Some(search) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            let pattern = format!("%{}%", search);
            query
                .push(" AND (first_name ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR last_name ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR email ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR phone ILIKE ")
                .push_bind(pattern)
                .push(")");
        }

        query
            .push(" ORDER BY created_at DESC LIMIT ")
            .push_bind(page_size(filter.limit))
            .push(" OFFSET ")
            .push_bind(filter.offset.unwrap_or(0).max(0));

        let rows = query
            .build_query_as::<ClientRow>()
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(Client::try_from).collect()
    }

    #[tracing::instrument(skip(self))]
    async fn update_status(
        &self,
        id: Uuid,
        status: ClientStatus,
    ) -> Result<Option<Client>, AppError> {
        let row = sqlx::query_as::<_, ClientRow>(&format!(
            "UPDATE clients SET status = $2, updated_at = NOW() WHERE id = $1 RETURNING {CLIENT_COLUMNS}"
        ))
        .bind(id)
        .bind(status.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Client::try_from).transpose()
    }

    #[tracing::instrument(skip(self, url))]
    async fn set_document_url(
        &self,
        id: Uuid,
        document_type: DocumentType,
        url: &str,
    ) -> Result<bool, AppError> {
        let column = client_document_column(document_type)?;
        let result = sqlx::query(&format!(
            "UPDATE clients SET {column} = $2, updated_at = NOW() WHERE id = $1"
        ))
        .bind(id)
        .bind(url)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    #[tracing::instrument(skip(self))]
    async fn sync_images(&self, id: Uuid) -> Result<Option<Client>, AppError> {
        let tables = upload_tables(EntityKind::Client);
        let assignments = EntityKind::Client
            .document_types()
            .iter()
            .map(|doc| {
                let column = doc.url_column();
                format!(
                    "{column} = COALESCE((SELECT s.{column} FROM {sessions} s \
                     WHERE s.{fk} = c.id AND s.{column} IS NOT NULL \
                     ORDER BY s.updated_at DESC LIMIT 1), c.{column})",
                    sessions = tables.sessions,
                    fk = tables.entity_column,
                )
            })
            .collect::<Vec<_>>()
            .join(", ");

        let row = sqlx::query_as::<_, ClientRow>(&format!(
            "UPDATE clients c SET {assignments}, updated_at = NOW() WHERE c.id = $1 RETURNING {CLIENT_COLUMNS}"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Client::try_from).transpose()
    }
}
