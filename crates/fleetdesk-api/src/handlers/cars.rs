//! Car fleet handlers

use crate::error::{ErrorResponse, HttpAppError, ValidatedJson};
use crate::state::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use fleetdesk_core::constants::page_size;
use fleetdesk_core::models::{
    check_daily_rate, Car, CarFilter, CreateCarRequest, UpdateCarDocumentsRequest,
    UpdateCarStatusRequest,
};
use fleetdesk_core::AppError;
use fleetdesk_db::{CarDeleteOutcome, CarDeletion};
use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Serialize, ToSchema)]
pub struct CarResponse {
    pub success: bool,
    pub car: Car,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CarListResponse {
    pub success: bool,
    pub cars: Vec<Car>,
    pub count: usize,
}

/// Rows removed with the car.
#[derive(Debug, Serialize, ToSchema)]
pub struct DeletedRows {
    pub scans: u64,
    pub sessions: u64,
    pub tokens: u64,
}

impl From<CarDeletion> for DeletedRows {
    fn from(d: CarDeletion) -> Self {
        Self {
            scans: d.scans,
            sessions: d.sessions,
            tokens: d.tokens,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CarDeleteResponse {
    pub success: bool,
    pub id: Uuid,
    pub deleted: DeletedRows,
}

fn car_response(car: Car) -> Json<CarResponse> {
    Json(CarResponse { success: true, car })
}

fn car_not_found() -> AppError {
    AppError::NotFound("Car not found".to_string())
}

pub(crate) async fn load_car(state: &AppState, id: Uuid) -> Result<Car, AppError> {
    state.db.cars.get(id).await?.ok_or_else(car_not_found)
}

#[utoipa::path(
    post,
    path = "/api/v1/cars",
    tag = "cars",
    request_body = CreateCarRequest,
    responses(
        (status = 201, description = "Car created", body = CarResponse),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 409, description = "Plate number already registered", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
#[tracing::instrument(skip(state, request))]
pub async fn create_car(
    State(state): State<Arc<AppState>>,
    ValidatedJson(request): ValidatedJson<CreateCarRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    let request = request.normalized();
    request.validate()?;
    check_daily_rate(request.daily_rate)?;

    let car = state.db.cars.create(&request).await?;
    tracing::info!(car_id = %car.id, plate_number = %car.plate_number, "Car created");

    Ok((StatusCode::CREATED, car_response(car)))
}

#[utoipa::path(
    get,
    path = "/api/v1/cars",
    tag = "cars",
    params(
        ("status" = Option<String>, Query, description = "available, rented, maintenance or inactive"),
        ("limit" = Option<i64>, Query, description = "Page size (default 50, max 200)"),
        ("offset" = Option<i64>, Query, description = "Rows to skip")
    ),
    responses((status = 200, description = "Cars, newest first", body = CarListResponse)),
    security(("bearer_auth" = []))
)]
#[tracing::instrument(skip(state))]
pub async fn list_cars(
    State(state): State<Arc<AppState>>,
    Query(mut filter): Query<CarFilter>,
) -> Result<impl IntoResponse, HttpAppError> {
    filter.limit = Some(page_size(filter.limit));
    filter.offset = Some(filter.offset.unwrap_or(0).max(0));

    let cars = state.db.cars.list(&filter).await?;
    Ok(Json(CarListResponse {
        success: true,
        count: cars.len(),
        cars,
    }))
}

#[utoipa::path(
    get,
    path = "/api/v1/cars/{id}",
    tag = "cars",
    params(("id" = Uuid, Path, description = "Car ID")),
    responses(
        (status = 200, description = "Car", body = CarResponse),
        (status = 404, description = "Car not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
#[tracing::instrument(skip(state))]
pub async fn get_car(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    Ok(car_response(load_car(&state, id).await?))
}

#[utoipa::path(
    patch,
    path = "/api/v1/cars/{id}/status",
    tag = "cars",
    params(("id" = Uuid, Path, description = "Car ID")),
    request_body = UpdateCarStatusRequest,
    responses(
        (status = 200, description = "Status updated", body = CarResponse),
        (status = 404, description = "Car not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
#[tracing::instrument(skip(state, request))]
pub async fn update_car_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    ValidatedJson(request): ValidatedJson<UpdateCarStatusRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    let car = state
        .db
        .cars
        .update_status(id, request.status)
        .await?
        .ok_or_else(car_not_found)?;
    tracing::info!(car_id = %id, status = car.status.as_str(), "Car status updated");
    Ok(car_response(car))
}

/// Set document URLs on a car. Fields left out of the body are unchanged.
#[utoipa::path(
    patch,
    path = "/api/v1/cars/{id}/documents",
    tag = "cars",
    params(("id" = Uuid, Path, description = "Car ID")),
    request_body = UpdateCarDocumentsRequest,
    responses(
        (status = 200, description = "Documents updated", body = CarResponse),
        (status = 400, description = "Invalid URL", body = ErrorResponse),
        (status = 404, description = "Car not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
#[tracing::instrument(skip(state, request))]
pub async fn update_car_documents(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    ValidatedJson(request): ValidatedJson<UpdateCarDocumentsRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    request.validate()?;
    let updates = request.into_updates();

    let car = if updates.is_empty() {
        load_car(&state, id).await?
    } else {
        state
            .db
            .cars
            .update_documents(id, &updates)
            .await?
            .ok_or_else(car_not_found)?
    };
    Ok(car_response(car))
}

/// Remove the files behind deleted scans once the rows are gone.
fn remove_stored_documents(state: &AppState, storage_keys: &[String]) {
    let mut keys = storage_keys.to_vec();
    keys.sort();
    keys.dedup();
    for key in keys {
        let storage = state.storage.clone();
        state
            .background
            .spawn("car_document_delete", async move { storage.delete(&key).await });
    }
}

/// Delete a car together with its scans, upload sessions and upload tokens.
#[utoipa::path(
    delete,
    path = "/api/v1/cars/{id}",
    tag = "cars",
    params(("id" = Uuid, Path, description = "Car ID")),
    responses(
        (status = 200, description = "Car deleted", body = CarDeleteResponse),
        (status = 404, description = "Car not found", body = ErrorResponse),
        (status = 409, description = "Car has bookings", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
#[tracing::instrument(skip(state))]
pub async fn delete_car(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    match state.db.cars.delete_with_dependents(id).await? {
        CarDeleteOutcome::Deleted(deletion) => {
            remove_stored_documents(&state, &deletion.storage_keys);
            tracing::info!(
                car_id = %id,
                scans = deletion.scans,
                sessions = deletion.sessions,
                tokens = deletion.tokens,
                "Car deleted"
            );
            Ok(Json(CarDeleteResponse {
                success: true,
                id,
                deleted: deletion.into(),
            }))
        }
        CarDeleteOutcome::NotFound => Err(car_not_found().into()),
        CarDeleteOutcome::HasBookings(count) => Err(AppError::Conflict(format!(
            "Car has {} booking(s) and cannot be deleted",
            count
        ))
        .into()),
    }
}
