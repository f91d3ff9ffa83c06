//! Client record handlers

use crate::error::{ErrorResponse, HttpAppError, ValidatedJson};
use crate::state::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use fleetdesk_core::constants::page_size;
use fleetdesk_core::models::{
    Client, ClientFilter, CreateClientRequest, UpdateClientStatusRequest,
};
use fleetdesk_core::AppError;
use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Serialize, ToSchema)]
pub struct ClientResponse {
    pub success: bool,
    pub client: Client,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ClientListResponse {
    pub success: bool,
    pub clients: Vec<Client>,
    pub count: usize,
}

fn client_response(client: Client) -> Json<ClientResponse> {
    Json(ClientResponse {
        success: true,
        client,
    })
}

pub(crate) async fn load_client(state: &AppState, id: Uuid) -> Result<Client, AppError> {
    state
        .db
        .clients
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Client not found".to_string()))
}

#[utoipa::path(
    post,
    path = "/api/v1/clients",
    tag = "clients",
    request_body = CreateClientRequest,
    responses(
        (status = 201, description = "Client created", body = ClientResponse),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 409, description = "Email already registered", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
#[tracing::instrument(skip(state, request))]
pub async fn create_client(
    State(state): State<Arc<AppState>>,
    ValidatedJson(request): ValidatedJson<CreateClientRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    let request = request.normalized();
    request.validate()?;

    let client = state.db.clients.create(&request).await?;
    tracing::info!(client_id = %client.id, "Client created");

    Ok((StatusCode::CREATED, client_response(client)))
}

#[utoipa::path(
    get,
    path = "/api/v1/clients",
    tag = "clients",
    params(
        ("status" = Option<String>, Query, description = "active, inactive or archived"),
        ("search" = Option<String>, Query, description = "Match on name, email or phone"),
        ("limit" = Option<i64>, Query, description = "Page size (default 50, max 200)"),
        ("offset" = Option<i64>, Query, description = "Rows to skip")
    ),
    responses(
        (status = 200, description = "Clients, newest first", body = ClientListResponse)
    ),
    security(("bearer_auth" = []))
)]
#[tracing::instrument(skip(state))]
pub async fn list_clients(
    State(state): State<Arc<AppState>>,
    Query(mut filter): Query<ClientFilter>,
) -> Result<impl IntoResponse, HttpAppError> {
    filter.limit = Some(page_size(filter.limit));
    filter.offset = Some(filter.offset.unwrap_or(0).max(0));

    let clients = state.db.clients.list(&filter).await?;
    Ok(Json(ClientListResponse {
        success: true,
        count: clients.len(),
        clients,
    }))
}

#[utoipa::path(
    get,
    path = "/api/v1/clients/{id}",
    tag = "clients",
    params(("id" = Uuid, Path, description = "Client ID")),
    responses(
        (status = 200, description = "Client", body = ClientResponse),
        (status = 404, description = "Client not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
#[tracing::instrument(skip(state))]
pub async fn get_client(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    let client = load_client(&state, id).await?;
    Ok(client_response(client))
}

#[utoipa::path(
    patch,
    path = "/api/v1/clients/{id}/status",
    tag = "clients",
    params(("id" = Uuid, Path, description = "Client ID")),
    request_body = UpdateClientStatusRequest,
    responses(
        (status = 200, description = "Status updated", body = ClientResponse),
        (status = 404, description = "Client not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
#[tracing::instrument(skip(state, request))]
pub async fn update_client_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    ValidatedJson(request): ValidatedJson<UpdateClientStatusRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    let client = state
        .db
        .clients
        .update_status(id, request.status)
        .await?
        .ok_or_else(|| AppError::NotFound("Client not found".to_string()))?;

    tracing::info!(client_id = %id, status = client.status.as_str(), "Client status updated");
    Ok(client_response(client))
}

/// Copy the newest document URLs from the client's upload sessions into the record.
#[utoipa::path(
    post,
    path = "/api/v1/clients/{id}/sync-images",
    tag = "clients",
    params(("id" = Uuid, Path, description = "Client ID")),
    responses(
        (status = 200, description = "Client with synced document URLs", body = ClientResponse),
        (status = 404, description = "Client not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
#[tracing::instrument(skip(state))]
pub async fn sync_client_images(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    let client = state
        .db
        .clients
        .sync_images(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Client not found".to_string()))?;
    Ok(client_response(client))
}
