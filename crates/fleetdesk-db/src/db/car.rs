use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fleetdesk_core::constants::page_size;
use fleetdesk_core::models::{
    Car, CarFilter, CarStatus, CreateCarRequest, DocumentType, EntityKind,
};
use fleetdesk_core::AppError;
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use super::tables::{parse_column, upload_tables};
use crate::repository::{CarDeleteOutcome, CarDeletion, CarRepository};

const CAR_COLUMNS: &str = "id, brand, model, year, plate_number, color, daily_rate, \
     registration_url, insurance_url, inspection_url, photo_url, status, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct CarRow {
    id: Uuid,
    brand: String,
    model: String,
    year: i32,
    plate_number: String,
    color: Option<String>,
    daily_rate: Decimal,
    registration_url: Option<String>,
    insurance_url: Option<String>,
    inspection_url: Option<String>,
    photo_url: Option<String>,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<CarRow> for Car {
    type Error = AppError;

    fn try_from(row: CarRow) -> Result<Self, Self::Error> {
        Ok(Car {
            id: row.id,
            brand: row.brand,
            model: row.model,
            year: row.year,
            plate_number: row.plate_number,
            color: row.color,
            daily_rate: row.daily_rate,
            registration_url: row.registration_url,
            insurance_url: row.insurance_url,
            inspection_url: row.inspection_url,
            photo_url: row.photo_url,
            status: parse_column("cars.status", &row.status)?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Postgres-backed car repository
#[derive(Clone)]
pub struct PgCarRepository {
    pool: PgPool,
}

impl PgCarRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn car_document_column(document_type: DocumentType) -> Result<&'static str, AppError> {
    if document_type.kind() != EntityKind::Car {
        return Err(AppError::InvalidInput(format!(
            "Document type '{}' does not belong to a car",
            document_type
        )));
    }
    Ok(document_type.url_column())
}

#[async_trait]
impl CarRepository for PgCarRepository {
    #[tracing::instrument(skip(self, request), fields(plate = %request.plate_number))]
    async fn create(&self, request: &CreateCarRequest) -> Result<Car, AppError> {
        let result = sqlx::query_as::<_, CarRow>(&format!(
            r#"
            INSERT INTO cars (id, brand, model, year, plate_number, color, daily_rate, status)
            VALUES ($1, $2, $3, $4, $5, $6, $7, 'available')
            RETURNING {CAR_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(&request.brand)
        .bind(&request.model)
        .bind(request.year)
        .bind(&request.plate_number)
        .bind(&request.color)
        .bind(request.daily_rate)
        .fetch_one(&self.pool)
        .await;

        match result {
            Ok(row) => row.try_into(),
            Err(e) => {
                let err = AppError::from(e);
                if err.is_unique_violation() {
                    Err(AppError::Conflict(
                        "A car with this plate number already exists".to_string(),
                    ))
                } else {
                    Err(err)
                }
            }
        }
    }

    #[tracing::instrument(skip(self))]
    async fn get(&self, id: Uuid) -> Result<Option<Car>, AppError> {
        let row = sqlx::query_as::<_, CarRow>(&format!("SELECT {CAR_COLUMNS} FROM cars WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Car::try_from).transpose()
    }

    #[tracing::instrument(skip(self))]
    async fn list(&self, filter: &CarFilter) -> Result<Vec<Car>, AppError> {
        let mut query: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {CAR_COLUMNS} FROM cars WHERE 1 = 1"));

        if let Some(status) = filter.status {
            query.push(" AND status = ").push_bind(status.as_str());
        }

        query
            .push(" ORDER BY created_at DESC LIMIT ")
            .push_bind(page_size(filter.limit))
            .push(" OFFSET ")
            .push_bind(filter.offset.unwrap_or(0).max(0));

        let rows = query.build_query_as::<CarRow>().fetch_all(&self.pool).await?;
        rows.into_iter().map(Car::try_from).collect()
    }

    #[tracing::instrument(skip(self))]
    async fn update_status(&self, id: Uuid, status: CarStatus) -> Result<Option<Car>, AppError> {
        let row = sqlx::query_as::<_, CarRow>(&format!(
            "UPDATE cars SET status = $2, updated_at = NOW() WHERE id = $1 RETURNING {CAR_COLUMNS}"
        ))
        .bind(id)
        .bind(status.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Car::try_from).transpose()
    }

    #[tracing::instrument(skip(self, url))]
    async fn set_document_url(
        &self,
        id: Uuid,
        document_type: DocumentType,
        url: &str,
    ) -> Result<bool, AppError> {
        let column = car_document_column(document_type)?;
        let result = sqlx::query(&format!(
            "UPDATE cars SET {column} = $2, updated_at = NOW() WHERE id = $1"
        ))
        .bind(id)
        .bind(url)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    #[tracing::instrument(skip(self, updates), fields(count = updates.len()))]
    async fn update_documents(
        &self,
        id: Uuid,
        updates: &[(DocumentType, String)],
    ) -> Result<Option<Car>, AppError> {
        if updates.is_empty() {
            return self.get(id).await;
        }

        let mut query: QueryBuilder<Postgres> = QueryBuilder::new("UPDATE cars SET ");
        for (document_type, url) in updates {
            let column = car_document_column(*document_type)?;
            query.push(column).push(" = ").push_bind(url.clone()).push(", ");
        }
        query
            .push("updated_at = NOW() WHERE id = ")
            .push_bind(id)
            .push(format!(" RETURNING {CAR_COLUMNS}"));

        let row = query
            .build_query_as::<CarRow>()
            .fetch_optional(&self.pool)
            .await?;

        row.map(Car::try_from).transpose()
    }

    #[tracing::instrument(skip(self))]
    async fn delete_with_dependents(&self, id: Uuid) -> Result<CarDeleteOutcome, AppError> {
        let tables = upload_tables(EntityKind::Car);
        // Dropping `tx` on an early return rolls everything back.
        let mut tx = self.pool.begin().await?;

        let exists: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM cars WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
        if exists.is_none() {
            return Ok(CarDeleteOutcome::NotFound);
        }

        let (bookings,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM bookings WHERE car_id = $1")
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;
        if bookings > 0 {
            return Ok(CarDeleteOutcome::HasBookings(bookings));
        }

        let storage_keys: Vec<String> = sqlx::query_scalar(
            "DELETE FROM document_scans WHERE entity_kind = $1 AND entity_id = $2 RETURNING storage_key",
        )
        .bind(EntityKind::Car.as_str())
        .bind(id)
        .fetch_all(&mut *tx)
        .await?;
        let scans = storage_keys.len() as u64;

        let sessions = sqlx::query(&format!(
            "DELETE FROM {} WHERE {} = $1",
            tables.sessions, tables.entity_column
        ))
        .bind(id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        let tokens = sqlx::query(&format!(
            "DELETE FROM {} WHERE {} = $1",
            tables.tokens, tables.entity_column
        ))
        .bind(id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        sqlx::query(&format!("DELETE FROM {} WHERE id = $1", tables.entity))
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!(car_id = %id, scans, sessions, tokens, "Car deleted with dependents");
        Ok(CarDeleteOutcome::Deleted(CarDeletion {
            scans,
            sessions,
            tokens,
            storage_keys,
        }))
    }
}
