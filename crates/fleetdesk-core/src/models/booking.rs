//! Rental bookings and the payments recorded against them.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::error::AppError;

/// Highest daily rate accepted for cars and bookings (1,000,000).
pub const MAX_DAILY_RATE: Decimal = Decimal::from_parts(1_000_000, 0, 0, false, 0);

/// Longest booking accepted, in days.
pub const MAX_RENTAL_DAYS: i64 = 3650;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Reserved,
    Active,
    Completed,
    Cancelled,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Reserved => "reserved",
            BookingStatus::Active => "active",
            BookingStatus::Completed => "completed",
            BookingStatus::Cancelled => "cancelled",
        }
    }

    pub fn can_transition_to(&self, next: BookingStatus) -> bool {
        matches!(
            (self, next),
            (BookingStatus::Reserved, BookingStatus::Active)
                | (BookingStatus::Reserved, BookingStatus::Cancelled)
                | (BookingStatus::Active, BookingStatus::Completed)
        )
    }

    /// Whether the booked car goes back to the available pool.
    pub fn releases_car(&self) -> bool {
        matches!(self, BookingStatus::Completed | BookingStatus::Cancelled)
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BookingStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "reserved" => Ok(BookingStatus::Reserved),
            "active" => Ok(BookingStatus::Active),
            "completed" => Ok(BookingStatus::Completed),
            "cancelled" => Ok(BookingStatus::Cancelled),
            other => Err(format!("Unknown booking status: {}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Booking {
    pub id: Uuid,
    pub client_id: Uuid,
    pub car_id: Uuid,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[schema(value_type = f64)]
    pub daily_rate: Decimal,
    #[schema(value_type = f64)]
    pub total_amount: Decimal,
    pub status: BookingStatus,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Inclusive day count; a same-day rental is one day.
pub fn rental_days(start: NaiveDate, end: NaiveDate) -> i64 {
    (end - start).num_days() + 1
}

/// Reject rates that are not positive or exceed [`MAX_DAILY_RATE`].
pub fn check_daily_rate(daily_rate: Decimal) -> Result<(), AppError> {
    if daily_rate <= Decimal::ZERO {
        return Err(AppError::InvalidInput(
            "daily_rate must be greater than zero".to_string(),
        ));
    }
    if daily_rate > MAX_DAILY_RATE {
        return Err(AppError::InvalidInput(format!(
            "daily_rate must not exceed {}",
            MAX_DAILY_RATE
        )));
    }
    Ok(())
}

pub fn booking_total(
    daily_rate: Decimal,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<Decimal, AppError> {
    let days = rental_days(start, end);
    if days > MAX_RENTAL_DAYS {
        return Err(AppError::InvalidInput(format!(
            "Bookings cannot exceed {} days",
            MAX_RENTAL_DAYS
        )));
    }
    daily_rate
        .checked_mul(Decimal::from(days))
        .ok_or_else(|| AppError::InvalidInput("Booking total is out of range".to_string()))
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateBookingRequest {
    pub client_id: Uuid,
    pub car_id: Uuid,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// Defaults to the car's daily rate.
    #[schema(value_type = Option<f64>)]
    pub daily_rate: Option<Decimal>,
    #[validate(length(max = 1000))]
    pub notes: Option<String>,
}

/// Booking row ready to insert, with totals already computed.
#[derive(Debug, Clone)]
pub struct NewBooking {
    pub client_id: Uuid,
    pub car_id: Uuid,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub daily_rate: Decimal,
    pub total_amount: Decimal,
    pub status: BookingStatus,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct UpdateBookingStatusRequest {
    pub status: BookingStatus,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BookingFilter {
    pub status: Option<BookingStatus>,
    pub client_id: Option<Uuid>,
    pub car_id: Option<Uuid>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Cash,
    Card,
    Transfer,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::Card => "card",
            PaymentMethod::Transfer => "transfer",
        }
    }
}

impl FromStr for PaymentMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cash" => Ok(PaymentMethod::Cash),
            "card" => Ok(PaymentMethod::Card),
            "transfer" => Ok(PaymentMethod::Transfer),
            other => Err(format!("Unknown payment method: {}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Payment {
    pub id: Uuid,
    pub booking_id: Uuid,
    #[schema(value_type = f64)]
    pub amount: Decimal,
    pub method: PaymentMethod,
    pub reference: Option<String>,
    pub paid_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreatePaymentRequest {
    #[schema(value_type = f64)]
    pub amount: Decimal,
    pub method: PaymentMethod,
    #[validate(length(max = 128))]
    pub reference: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,
}
