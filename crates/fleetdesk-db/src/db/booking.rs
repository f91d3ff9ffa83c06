use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use fleetdesk_core::models::{
    Booking, BookingFilter, BookingStatus, CreatePaymentRequest, NewBooking, Payment,
};
use fleetdesk_core::AppError;
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use super::tables::parse_column;
use crate::repository::BookingRepository;

const BOOKING_COLUMNS: &str = "id, client_id, car_id, start_date, end_date, daily_rate, \
     total_amount, status, notes, created_at, updated_at";

const PAYMENT_COLUMNS: &str = "id, booking_id, amount, method, reference, paid_at, created_at";

#[derive(sqlx::FromRow)]
struct BookingRow {
    id: Uuid,
    client_id: Uuid,
    car_id: Uuid,
    start_date: NaiveDate,
    end_date: NaiveDate,
    daily_rate: Decimal,
    total_amount: Decimal,
    status: String,
    notes: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<BookingRow> for Booking {
    type Error = AppError;

    fn try_from(row: BookingRow) -> Result<Self, Self::Error> {
        Ok(Booking {
            id: row.id,
            client_id: row.client_id,
            car_id: row.car_id,
            start_date: row.start_date,
            end_date: row.end_date,
            daily_rate: row.daily_rate,
            total_amount: row.total_amount,
            status: parse_column("bookings.status", &row.status)?,
            notes: row.notes,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct PaymentRow {
    id: Uuid,
    booking_id: Uuid,
    amount: Decimal,
    method: String,
    reference: Option<String>,
    paid_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
}

impl TryFrom<PaymentRow> for Payment {
    type Error = AppError;

    fn try_from(row: PaymentRow) -> Result<Self, Self::Error> {
        Ok(Payment {
            id: row.id,
            booking_id: row.booking_id,
            amount: row.amount,
            method: parse_column("payments.method", &row.method)?,
            reference: row.reference,
            paid_at: row.paid_at,
            created_at: row.created_at,
        })
    }
}

pub(crate) fn overlap_conflict() -> AppError {
    AppError::Conflict("Car is already booked for these dates".to_string())
}

/// Postgres-backed booking and payment repository
#[derive(Clone)]
pub struct PgBookingRepository {
    pool: PgPool,
}

impl PgBookingRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BookingRepository for PgBookingRepository {
    #[tracing::instrument(skip(self, booking), fields(car_id = %booking.car_id, client_id = %booking.client_id))]
    async fn create(&self, booking: NewBooking) -> Result<Booking, AppError> {
        let mut tx = self.pool.begin().await?;

        // Serialises concurrent bookings of the same car until commit.
        let locked: Option<Uuid> =
            sqlx::query_scalar("SELECT id FROM cars WHERE id = $1 FOR UPDATE")
                .bind(booking.car_id)
                .fetch_optional(&mut *tx)
                .await?;
        if locked.is_none() {
            return Err(AppError::NotFound("Car not found".to_string()));
        }

        let overlapping: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM bookings
            WHERE car_id = $1
              AND status IN ('reserved', 'active')
              AND start_date <= $3
              AND end_date >= $2
            "#,
        )
        .bind(booking.car_id)
        .bind(booking.start_date)
        .bind(booking.end_date)
        .fetch_one(&mut *tx)
        .await?;
        if overlapping > 0 {
            return Err(overlap_conflict());
        }

        let row = sqlx::query_as::<_, BookingRow>(&format!(
            r#"
            INSERT INTO bookings (
                id, client_id, car_id, start_date, end_date, daily_rate, total_amount, status, notes
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {BOOKING_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(booking.client_id)
        .bind(booking.car_id)
        .bind(booking.start_date)
        .bind(booking.end_date)
        .bind(booking.daily_rate)
        .bind(booking.total_amount)
        .bind(booking.status.as_str())
        .bind(&booking.notes)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        row.try_into()
    }

    #[tracing::instrument(skip(self))]
    async fn get(&self, id: Uuid) -> Result<Option<Booking>, AppError> {
        let row = sqlx::query_as::<_, BookingRow>(&format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Booking::try_from).transpose()
    }

    #[tracing::instrument(skip(self))]
    async fn list(&self, filter: &BookingFilter) -> Result<Vec<Booking>, AppError> {
        let mut query: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE 1 = 1"));

        if let Some(status) = filter.status {
            query.push(" AND status = ").push_bind(status.as_str());
        }
        if let Some(client_id) = filter.client_id {
            query.push(" AND client_id = ").push_bind(client_id);
        }
        if let Some(car_id) = filter.car_id {
            query.push(" AND car_id = ").push_bind(car_id);
        }
        query.push(" ORDER BY start_date DESC, created_at DESC");

        let rows = query
            .build_query_as::<BookingRow>()
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(Booking::try_from).collect()
    }

    #[tracing::instrument(skip(self))]
    async fn update_status(
        &self,
        id: Uuid,
        status: BookingStatus,
    ) -> Result<Option<Booking>, AppError> {
        let row = sqlx::query_as::<_, BookingRow>(&format!(
            "UPDATE bookings SET status = $2, updated_at = NOW() WHERE id = $1 RETURNING {BOOKING_COLUMNS}"
        ))
        .bind(id)
        .bind(status.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Booking::try_from).transpose()
    }

    #[tracing::instrument(skip(self, request))]
    async fn add_payment(
        &self,
        booking_id: Uuid,
        request: &CreatePaymentRequest,
        paid_at: DateTime<Utc>,
    ) -> Result<Payment, AppError> {
        let row = sqlx::query_as::<_, PaymentRow>(&format!(
            r#"
            INSERT INTO payments (id, booking_id, amount, method, reference, paid_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {PAYMENT_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(booking_id)
        .bind(request.amount)
        .bind(request.method.as_str())
        .bind(&request.reference)
        .bind(paid_at)
        .fetch_one(&self.pool)
        .await?;

        row.try_into()
    }

    #[tracing::instrument(skip(self))]
    async fn list_payments(&self, booking_id: Uuid) -> Result<Vec<Payment>, AppError> {
        let rows = sqlx::query_as::<_, PaymentRow>(&format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments WHERE booking_id = $1 ORDER BY paid_at"
        ))
        .bind(booking_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Payment::try_from).collect()
    }
}
