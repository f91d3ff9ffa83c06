//! Public mobile upload endpoints, authorised only by the upload token in the path.
//!
//! Uploading requires an unused token. Status polling and completion accept a
//! token that has already been consumed, as long as it has not expired.

use crate::error::{ErrorResponse, HttpAppError};
use crate::services::document_ingest::{validate_document, DocumentIngestService};
use crate::services::upload_token::TokenAccess;
use crate::state::AppState;
use crate::utils::upload::extract_upload_form;
use axum::{
    extract::{Multipart, Path, State},
    response::{IntoResponse, Json},
};
use chrono::{DateTime, Utc};
use fleetdesk_core::models::{
    derive_status, missing_core, DerivedStatus, DocumentType, EntityKind,
};
use fleetdesk_core::AppError;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Serialize, ToSchema)]
pub struct MobileUploadResponse {
    pub success: bool,
    pub document_type: DocumentType,
    pub url: String,
    pub status: DerivedStatus,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UploadStatusResponse {
    pub success: bool,
    pub status: DerivedStatus,
    pub entity_id: Uuid,
    #[schema(value_type = Object)]
    pub documents: BTreeMap<DocumentType, String>,
    pub missing_core: Vec<DocumentType>,
    pub expires_at: DateTime<Utc>,
    pub used: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CompleteUploadResponse {
    pub success: bool,
    pub entity_id: Uuid,
    pub session_id: Uuid,
    pub completed_at: DateTime<Utc>,
}

async fn upload(
    state: Arc<AppState>,
    kind: EntityKind,
    token: &str,
    multipart: Multipart,
) -> Result<Json<MobileUploadResponse>, HttpAppError> {
    let upload_token = state
        .upload_tokens
        .verify(kind, token, TokenAccess::Write, Utc::now())
        .await?;

    let form = extract_upload_form(multipart).await?;
    let document = validate_document(&state.config, kind, form)?;

    let received = DocumentIngestService::new(&state)
        .ingest_for_session(&upload_token, document)
        .await?;

    Ok(Json(MobileUploadResponse {
        success: true,
        document_type: received.document_type,
        url: received.url,
        status: received.status,
    }))
}

async fn status(
    state: &AppState,
    kind: EntityKind,
    token: &str,
) -> Result<Json<UploadStatusResponse>, HttpAppError> {
    let upload_token = state
        .upload_tokens
        .verify(kind, token, TokenAccess::Read, Utc::now())
        .await?;

    let session = state
        .db
        .upload_sessions
        .get_by_token(kind, upload_token.id)
        .await?;

    let (status, documents) = match session {
        Some(session) => (
            derive_status(session.upload_status, session.processing_status),
            session.documents,
        ),
        None => (DerivedStatus::Pending, BTreeMap::new()),
    };

    Ok(Json(UploadStatusResponse {
        success: true,
        status,
        entity_id: upload_token.entity_id,
        missing_core: missing_core(kind, documents.keys().copied()),
        documents,
        expires_at: upload_token.expires_at,
        used: upload_token.is_used(),
    }))
}

async fn complete(
    state: &AppState,
    kind: EntityKind,
    token: &str,
) -> Result<Json<CompleteUploadResponse>, HttpAppError> {
    let now = Utc::now();
    let upload_token = state
        .upload_tokens
        .verify(kind, token, TokenAccess::Read, now)
        .await?;

    let session = state
        .db
        .upload_sessions
        .get_by_token(kind, upload_token.id)
        .await?
        .ok_or_else(|| AppError::NotFound("No upload session found".to_string()))?;

    let completed = state
        .db
        .upload_sessions
        .complete(kind, session.id, now)
        .await?
        .ok_or_else(|| AppError::Conflict("Upload session already completed".to_string()))?;

    let consumed = state
        .upload_tokens
        .mark_used(kind, upload_token.id, now)
        .await?;
    if !consumed {
        tracing::debug!(token_id = %upload_token.id, "Upload token was already consumed");
    }

    if kind == EntityKind::Client {
        let clients = state.db.clients.clone();
        let client_id = upload_token.entity_id;
        state.background.spawn("client_image_sync", async move {
            clients
                .sync_images(client_id)
                .await?
                .map(drop)
                .ok_or_else(|| AppError::NotFound(format!("Client {} not found", client_id)))
        });
    }

    tracing::info!(
        kind = %kind,
        entity_id = %upload_token.entity_id,
        session_id = %completed.id,
        "Upload session completed"
    );

    Ok(Json(CompleteUploadResponse {
        success: true,
        entity_id: upload_token.entity_id,
        session_id: completed.id,
        completed_at: completed.completed_at.unwrap_or(now),
    }))
}

#[utoipa::path(
    post,
    path = "/api/v1/client-uploads/{token}/documents",
    tag = "mobile-upload",
    params(("token" = String, Path, description = "Upload token")),
    request_body(content = inline(Object), content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Document received", body = MobileUploadResponse),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 401, description = "Invalid or expired upload token", body = ErrorResponse),
        (status = 409, description = "Upload session is no longer accepting documents", body = ErrorResponse),
        (status = 413, description = "File too large", body = ErrorResponse)
    )
)]
pub async fn upload_client_document(
    State(state): State<Arc<AppState>>,
    Path(token): Path<String>,
    multipart: Multipart,
) -> Result<impl IntoResponse, HttpAppError> {
    upload(state, EntityKind::Client, &token, multipart).await
}

#[utoipa::path(
    post,
    path = "/api/v1/car-uploads/{token}/documents",
    tag = "mobile-upload",
    params(("token" = String, Path, description = "Upload token")),
    request_body(content = inline(Object), content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Document received", body = MobileUploadResponse),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 401, description = "Invalid or expired upload token", body = ErrorResponse),
        (status = 409, description = "Upload session is no longer accepting documents", body = ErrorResponse),
        (status = 413, description = "File too large", body = ErrorResponse)
    )
)]
pub async fn upload_car_document(
    State(state): State<Arc<AppState>>,
    Path(token): Path<String>,
    multipart: Multipart,
) -> Result<impl IntoResponse, HttpAppError> {
    upload(state, EntityKind::Car, &token, multipart).await
}

#[utoipa::path(
    get,
    path = "/api/v1/client-uploads/{token}/status",
    tag = "mobile-upload",
    params(("token" = String, Path, description = "Upload token")),
    responses(
        (status = 200, description = "Session status", body = UploadStatusResponse),
        (status = 401, description = "Invalid or expired upload token", body = ErrorResponse)
    )
)]
pub async fn client_upload_status(
    State(state): State<Arc<AppState>>,
    Path(token): Path<String>,
) -> Result<impl IntoResponse, HttpAppError> {
    status(&state, EntityKind::Client, &token).await
}

#[utoipa::path(
    get,
    path = "/api/v1/car-uploads/{token}/status",
    tag = "mobile-upload",
    params(("token" = String, Path, description = "Upload token")),
    responses(
        (status = 200, description = "Session status", body = UploadStatusResponse),
        (status = 401, description = "Invalid or expired upload token", body = ErrorResponse)
    )
)]
pub async fn car_upload_status(
    State(state): State<Arc<AppState>>,
    Path(token): Path<String>,
) -> Result<impl IntoResponse, HttpAppError> {
    status(&state, EntityKind::Car, &token).await
}

#[utoipa::path(
    post,
    path = "/api/v1/client-uploads/{token}/complete",
    tag = "mobile-upload",
    params(("token" = String, Path, description = "Upload token")),
    responses(
        (status = 200, description = "Session completed", body = CompleteUploadResponse),
        (status = 401, description = "Invalid or expired upload token", body = ErrorResponse),
        (status = 404, description = "No upload session found", body = ErrorResponse),
        (status = 409, description = "Upload session already completed", body = ErrorResponse)
    )
)]
pub async fn complete_client_upload(
    State(state): State<Arc<AppState>>,
    Path(token): Path<String>,
) -> Result<impl IntoResponse, HttpAppError> {
    complete(&state, EntityKind::Client, &token).await
}

#[utoipa::path(
    post,
    path = "/api/v1/car-uploads/{token}/complete",
    tag = "mobile-upload",
    params(("token" = String, Path, description = "Upload token")),
    responses(
        (status = 200, description = "Session completed", body = CompleteUploadResponse),
        (status = 401, description = "Invalid or expired upload token", body = ErrorResponse),
        (status = 404, description = "No upload session found", body = ErrorResponse),
        (status = 409, description = "Upload session already completed", body = ErrorResponse)
    )
)]
pub async fn complete_car_upload(
    State(state): State<Arc<AppState>>,
    Path(token): Path<String>,
) -> Result<impl IntoResponse, HttpAppError> {
    complete(&state, EntityKind::Car, &token).await
}
