//! Upload-token issuance for the QR mobile upload flow.

use crate::error::{ErrorResponse, HttpAppError};
use crate::handlers::{cars::load_car, clients::load_client};
use crate::state::AppState;
use crate::utils::qr::svg_data_url;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use chrono::{DateTime, Utc};
use fleetdesk_core::models::EntityKind;
use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Serialize, ToSchema)]
pub struct UploadTokenResponse {
    pub success: bool,
    /// Signed credential; valid for five minutes.
    pub token: String,
    /// Mobile page the QR code points at.
    pub upload_url: String,
    /// `data:image/svg+xml;base64,...`
    pub qr_code: String,
    pub expires_at: DateTime<Utc>,
}

fn mobile_upload_url(base: &str, kind: EntityKind, token: &str) -> String {
    format!("{}/mobile-upload/{}?token={}", base, kind.as_str(), token)
}

async fn issue_for(
    state: &AppState,
    kind: EntityKind,
    entity_id: Uuid,
) -> Result<impl IntoResponse, HttpAppError> {
    // Fail on missing configuration before a token row is written.
    let base_url = state.config.public_app_url()?;
    state.config.upload_token_secret()?;

    let issued = state
        .upload_tokens
        .issue(kind, entity_id, Utc::now())
        .await?;
    let upload_url = mobile_upload_url(base_url, kind, &issued.token);
    let qr_code = svg_data_url(&upload_url)?;

    Ok((
        StatusCode::CREATED,
        Json(UploadTokenResponse {
            success: true,
            token: issued.token,
            upload_url,
            qr_code,
            expires_at: issued.expires_at,
        }),
    ))
}

#[utoipa::path(
    post,
    path = "/api/v1/clients/{id}/upload-token",
    tag = "uploads",
    params(("id" = Uuid, Path, description = "Client ID")),
    responses(
        (status = 201, description = "Token issued", body = UploadTokenResponse),
        (status = 404, description = "Client not found", body = ErrorResponse),
        (status = 500, description = "Upload tokens not configured", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
#[tracing::instrument(skip(state))]
pub async fn issue_client_upload_token(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    load_client(&state, id).await?;
    issue_for(&state, EntityKind::Client, id).await
}

#[utoipa::path(
    post,
    path = "/api/v1/cars/{id}/upload-token",
    tag = "uploads",
    params(("id" = Uuid, Path, description = "Car ID")),
    responses(
        (status = 201, description = "Token issued", body = UploadTokenResponse),
        (status = 404, description = "Car not found", body = ErrorResponse),
        (status = 500, description = "Upload tokens not configured", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
#[tracing::instrument(skip(state))]
pub async fn issue_car_upload_token(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    load_car(&state, id).await?;
    issue_for(&state, EntityKind::Car, id).await
}
