//! Booking and payment handlers

use crate::error::{ErrorResponse, HttpAppError, ValidatedJson};
use crate::handlers::{cars::load_car, clients::load_client};
use crate::state::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use chrono::Utc;
use fleetdesk_core::models::{
    booking_total, check_daily_rate, Booking, BookingFilter, BookingStatus, CarStatus,
    ClientStatus, CreateBookingRequest, CreatePaymentRequest, NewBooking, Payment,
    UpdateBookingStatusRequest,
};
use fleetdesk_core::AppError;
use rust_decimal::Decimal;
use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Serialize, ToSchema)]
pub struct BookingResponse {
    pub success: bool,
    pub booking: Booking,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct BookingListResponse {
    pub success: bool,
    pub bookings: Vec<Booking>,
    pub count: usize,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PaymentResponse {
    pub success: bool,
    pub payment: Payment,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PaymentListResponse {
    pub success: bool,
    pub payments: Vec<Payment>,
    #[schema(value_type = f64)]
    pub total_paid: Decimal,
    /// Booking total minus payments; negative when overpaid.
    #[schema(value_type = f64)]
    pub balance: Decimal,
}

fn booking_not_found() -> AppError {
    AppError::NotFound("Booking not found".to_string())
}

async fn load_booking(state: &AppState, id: Uuid) -> Result<Booking, AppError> {
    state.db.bookings.get(id).await?.ok_or_else(booking_not_found)
}

async fn set_car_status(state: &AppState, car_id: Uuid, status: CarStatus) -> Result<(), AppError> {
    state
        .db
        .cars
        .update_status(car_id, status)
        .await?
        .ok_or_else(|| AppError::NotFound("Car not found".to_string()))?;
    Ok(())
}

#[utoipa::path(
    post,
    path = "/api/v1/bookings",
    tag = "bookings",
    request_body = CreateBookingRequest,
    responses(
        (status = 201, description = "Booking created", body = BookingResponse),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 404, description = "Client or car not found", body = ErrorResponse),
        (status = 409, description = "Client inactive, car unavailable or dates already booked", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
#[tracing::instrument(skip(state, request))]
pub async fn create_booking(
    State(state): State<Arc<AppState>>,
    ValidatedJson(request): ValidatedJson<CreateBookingRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    request.validate()?;
    if request.end_date < request.start_date {
        return Err(
            AppError::InvalidInput("end_date must not be before start_date".to_string()).into(),
        );
    }

    let client = load_client(&state, request.client_id).await?;
    if client.status != ClientStatus::Active {
        return Err(AppError::Conflict(format!(
            "Client is {} and cannot book",
            client.status
        ))
        .into());
    }

    let car = load_car(&state, request.car_id).await?;
    if car.status != CarStatus::Available {
        return Err(AppError::Conflict(format!(
            "Car is {} and cannot be booked",
            car.status.as_str()
        ))
        .into());
    }

    let daily_rate = request.daily_rate.unwrap_or(car.daily_rate);
    check_daily_rate(daily_rate)?;
    let total_amount = booking_total(daily_rate, request.start_date, request.end_date)?;

    let booking = state
        .db
        .bookings
        .create(NewBooking {
            client_id: client.id,
            car_id: car.id,
            start_date: request.start_date,
            end_date: request.end_date,
            daily_rate,
            total_amount,
            status: BookingStatus::Reserved,
            notes: request.notes.map(|n| n.trim().to_string()).filter(|n| !n.is_empty()),
        })
        .await?;

    if booking.start_date <= Utc::now().date_naive() {
        set_car_status(&state, car.id, CarStatus::Rented).await?;
    }

    tracing::info!(
        booking_id = %booking.id,
        client_id = %booking.client_id,
        car_id = %booking.car_id,
        total_amount = %booking.total_amount,
        "Booking created"
    );

    Ok((
        StatusCode::CREATED,
        Json(BookingResponse {
            success: true,
            booking,
        }),
    ))
}

#[utoipa::path(
    get,
    path = "/api/v1/bookings",
    tag = "bookings",
    params(
        ("status" = Option<String>, Query, description = "reserved, active, completed or cancelled"),
        ("client_id" = Option<Uuid>, Query, description = "Filter by client"),
        ("car_id" = Option<Uuid>, Query, description = "Filter by car")
    ),
    responses((status = 200, description = "Bookings, newest first", body = BookingListResponse)),
    security(("bearer_auth" = []))
)]
#[tracing::instrument(skip(state))]
pub async fn list_bookings(
    State(state): State<Arc<AppState>>,
    Query(filter): Query<BookingFilter>,
) -> Result<impl IntoResponse, HttpAppError> {
    let bookings = state.db.bookings.list(&filter).await?;
    Ok(Json(BookingListResponse {
        success: true,
        count: bookings.len(),
        bookings,
    }))
}

#[utoipa::path(
    get,
    path = "/api/v1/bookings/{id}",
    tag = "bookings",
    params(("id" = Uuid, Path, description = "Booking ID")),
    responses(
        (status = 200, description = "Booking", body = BookingResponse),
        (status = 404, description = "Booking not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
#[tracing::instrument(skip(state))]
pub async fn get_booking(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    let booking = load_booking(&state, id).await?;
    Ok(Json(BookingResponse {
        success: true,
        booking,
    }))
}

#[utoipa::path(
    patch,
    path = "/api/v1/bookings/{id}/status",
    tag = "bookings",
    params(("id" = Uuid, Path, description = "Booking ID")),
    request_body = UpdateBookingStatusRequest,
    responses(
        (status = 200, description = "Status updated", body = BookingResponse),
        (status = 404, description = "Booking not found", body = ErrorResponse),
        (status = 409, description = "Transition not allowed", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
#[tracing::instrument(skip(state, request))]
pub async fn update_booking_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    ValidatedJson(request): ValidatedJson<UpdateBookingStatusRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    let current = load_booking(&state, id).await?;
    let next = request.status;
    if !current.status.can_transition_to(next) {
        return Err(AppError::Conflict(format!(
            "Cannot change booking status from {} to {}",
            current.status, next
        ))
        .into());
    }

    let booking = state
        .db
        .bookings
        .update_status(id, next)
        .await?
        .ok_or_else(booking_not_found)?;

    if next.releases_car() {
        set_car_status(&state, booking.car_id, CarStatus::Available).await?;
    } else if next == BookingStatus::Active {
        set_car_status(&state, booking.car_id, CarStatus::Rented).await?;
    }

    tracing::info!(
        booking_id = %id,
        from = current.status.as_str(),
        to = next.as_str(),
        "Booking status updated"
    );

    Ok(Json(BookingResponse {
        success: true,
        booking,
    }))
}

#[utoipa::path(
    post,
    path = "/api/v1/bookings/{id}/payments",
    tag = "bookings",
    params(("id" = Uuid, Path, description = "Booking ID")),
    request_body = CreatePaymentRequest,
    responses(
        (status = 201, description = "Payment recorded", body = PaymentResponse),
        (status = 400, description = "Invalid amount", body = ErrorResponse),
        (status = 404, description = "Booking not found", body = ErrorResponse),
        (status = 409, description = "Booking is cancelled", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
#[tracing::instrument(skip(state, request))]
pub async fn create_payment(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    ValidatedJson(request): ValidatedJson<CreatePaymentRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    request.validate()?;
    if request.amount <= Decimal::ZERO {
        return Err(AppError::InvalidInput("amount must be greater than zero".to_string()).into());
    }

    let booking = load_booking(&state, id).await?;
    if booking.status == BookingStatus::Cancelled {
        return Err(
            AppError::Conflict("Cannot record a payment on a cancelled booking".to_string())
                .into(),
        );
    }

    let paid_at = request.paid_at.unwrap_or_else(Utc::now);
    let payment = state.db.bookings.add_payment(id, &request, paid_at).await?;

    tracing::info!(
        booking_id = %id,
        payment_id = %payment.id,
        amount = %payment.amount,
        "Payment recorded"
    );

    Ok((
        StatusCode::CREATED,
        Json(PaymentResponse {
            success: true,
            payment,
        }),
    ))
}

#[utoipa::path(
    get,
    path = "/api/v1/bookings/{id}/payments",
    tag = "bookings",
    params(("id" = Uuid, Path, description = "Booking ID")),
    responses(
        (status = 200, description = "Payments with running totals", body = PaymentListResponse),
        (status = 404, description = "Booking not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
#[tracing::instrument(skip(state))]
pub async fn list_payments(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    let booking = load_booking(&state, id).await?;
    let payments = state.db.bookings.list_payments(id).await?;
    let total_paid: Decimal = payments.iter().map(|p| p.amount).sum();

    Ok(Json(PaymentListResponse {
        success: true,
        balance: booking.total_amount - total_paid,
        total_paid,
        payments,
    }))
}
