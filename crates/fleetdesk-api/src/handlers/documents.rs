//! Staff-side document handlers: direct uploads and per-record document history.

use crate::error::{ErrorResponse, HttpAppError};
use crate::handlers::{cars::load_car, clients::load_client};
use crate::services::document_ingest::{validate_document, DocumentIngestService};
use crate::state::AppState;
use crate::utils::upload::extract_upload_form;
use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use chrono::{DateTime, Utc};
use fleetdesk_core::models::{
    derive_status, DerivedStatus, DocumentScan, DocumentType, EntityKind, ProcessingStatus,
    UploadSession, UploadStatus,
};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Serialize, ToSchema)]
pub struct DocumentUploadResponse {
    pub success: bool,
    pub entity_id: Uuid,
    pub document_type: DocumentType,
    pub url: String,
}

/// One upload session as seen by staff.
#[derive(Debug, Serialize, ToSchema)]
pub struct SessionSummary {
    pub id: Uuid,
    pub token_id: Uuid,
    pub status: DerivedStatus,
    pub upload_status: UploadStatus,
    pub processing_status: ProcessingStatus,
    #[schema(value_type = Object)]
    pub documents: BTreeMap<DocumentType, String>,
    pub missing_core: Vec<DocumentType>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<UploadSession> for SessionSummary {
    fn from(session: UploadSession) -> Self {
        Self {
            status: derive_status(session.upload_status, session.processing_status),
            missing_core: session.missing_core(),
            id: session.id,
            token_id: session.token_id,
            upload_status: session.upload_status,
            processing_status: session.processing_status,
            documents: session.documents,
            completed_at: session.completed_at,
            created_at: session.created_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct EntityDocumentsResponse {
    pub success: bool,
    pub entity_id: Uuid,
    /// Current document URL per type on the record.
    #[schema(value_type = Object)]
    pub documents: BTreeMap<DocumentType, String>,
    pub scans: Vec<DocumentScan>,
    pub sessions: Vec<SessionSummary>,
}

async fn upload_for(
    state: Arc<AppState>,
    kind: EntityKind,
    entity_id: Uuid,
    multipart: Multipart,
) -> Result<impl IntoResponse, HttpAppError> {
    let form = extract_upload_form(multipart).await?;
    let document = validate_document(&state.config, kind, form)?;
    let document_type = document.document_type;

    let url = DocumentIngestService::new(&state)
        .ingest_for_entity(kind, entity_id, document)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(DocumentUploadResponse {
            success: true,
            entity_id,
            document_type,
            url,
        }),
    ))
}

async fn documents_for(
    state: &AppState,
    kind: EntityKind,
    entity_id: Uuid,
    current: BTreeMap<DocumentType, String>,
) -> Result<Json<EntityDocumentsResponse>, HttpAppError> {
    let scans = state
        .db
        .document_scans
        .list_for_entity(kind, entity_id)
        .await?;
    let sessions = state
        .db
        .upload_sessions
        .list_for_entity(kind, entity_id)
        .await?;

    Ok(Json(EntityDocumentsResponse {
        success: true,
        entity_id,
        documents: current,
        scans,
        sessions: sessions.into_iter().map(SessionSummary::from).collect(),
    }))
}

fn present_documents<'a>(
    kind: EntityKind,
    url_of: impl Fn(DocumentType) -> Option<&'a str>,
) -> BTreeMap<DocumentType, String> {
    kind.document_types()
        .iter()
        .filter_map(|doc| url_of(*doc).map(|url| (*doc, url.to_string())))
        .collect()
}

#[utoipa::path(
    post,
    path = "/api/v1/clients/{id}/documents",
    tag = "clients",
    params(("id" = Uuid, Path, description = "Client ID")),
    request_body(content = inline(Object), content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "Document attached", body = DocumentUploadResponse),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 404, description = "Client not found", body = ErrorResponse),
        (status = 413, description = "File too large", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn upload_client_document(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    multipart: Multipart,
) -> Result<impl IntoResponse, HttpAppError> {
    upload_for(state, EntityKind::Client, id, multipart).await
}

#[utoipa::path(
    post,
    path = "/api/v1/cars/{id}/documents",
    tag = "cars",
    params(("id" = Uuid, Path, description = "Car ID")),
    request_body(content = inline(Object), content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "Document attached", body = DocumentUploadResponse),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 404, description = "Car not found", body = ErrorResponse),
        (status = 413, description = "File too large", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn upload_car_document(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    multipart: Multipart,
) -> Result<impl IntoResponse, HttpAppError> {
    upload_for(state, EntityKind::Car, id, multipart).await
}

#[utoipa::path(
    get,
    path = "/api/v1/clients/{id}/documents",
    tag = "clients",
    params(("id" = Uuid, Path, description = "Client ID")),
    responses(
        (status = 200, description = "Documents, scans and upload sessions", body = EntityDocumentsResponse),
        (status = 404, description = "Client not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_client_documents(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    let client = load_client(&state, id).await?;
    let current = present_documents(EntityKind::Client, |doc| client.document_url(doc));
    documents_for(&state, EntityKind::Client, id, current).await
}

#[utoipa::path(
    get,
    path = "/api/v1/cars/{id}/documents",
    tag = "cars",
    params(("id" = Uuid, Path, description = "Car ID")),
    responses(
        (status = 200, description = "Documents, scans and upload sessions", body = EntityDocumentsResponse),
        (status = 404, description = "Car not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_car_documents(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    let car = load_car(&state, id).await?;
    let current = present_documents(EntityKind::Car, |doc| car.document_url(doc));
    documents_for(&state, EntityKind::Car, id, current).await
}
