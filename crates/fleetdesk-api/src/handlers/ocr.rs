//! OCR extraction for pre-filling client and car forms.

use crate::error::{ErrorResponse, HttpAppError};
use crate::state::AppState;
use crate::utils::upload::{
    extract_upload_form, normalize_mime_type, validate_content_type, validate_file_size,
};
use axum::{
    extract::{Multipart, State},
    response::{IntoResponse, Json},
};
use fleetdesk_core::models::OcrDocumentType;
use fleetdesk_core::AppError;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use utoipa::ToSchema;

#[derive(Debug, Serialize, ToSchema)]
pub struct OcrExtractResponse {
    pub success: bool,
    pub document_type: OcrDocumentType,
    #[schema(value_type = Object)]
    pub fields: BTreeMap<String, String>,
    #[schema(value_type = Object)]
    pub confidence: BTreeMap<String, f32>,
    pub raw_text: String,
}

#[utoipa::path(
    post,
    path = "/api/v1/ocr/extract",
    tag = "ocr",
    request_body(content = inline(Object), content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Extracted form fields", body = OcrExtractResponse),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 500, description = "OCR not configured", body = ErrorResponse),
        (status = 502, description = "Document AI request failed", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
#[tracing::instrument(skip(state, multipart))]
pub async fn extract_document(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<impl IntoResponse, HttpAppError> {
    let form = extract_upload_form(multipart).await?;
    let document_type = form
        .document_type
        .as_deref()
        .ok_or_else(|| AppError::InvalidInput("document_type is required".to_string()))?
        .parse::<OcrDocumentType>()
        .map_err(AppError::InvalidInput)?;

    validate_file_size(form.data.len(), state.config.max_upload_size_bytes)?;
    validate_content_type(&form.content_type, &state.config.allowed_content_types)?;
    let mime_type = normalize_mime_type(&form.content_type);

    let extraction = state
        .ocr
        .extract(document_type, form.data, &mime_type)
        .await?;

    tracing::info!(
        document_type = document_type.as_str(),
        fields = extraction.fields.len(),
        "OCR extraction finished"
    );

    Ok(Json(OcrExtractResponse {
        success: true,
        document_type,
        fields: extraction.fields,
        confidence: extraction.confidence,
        raw_text: extraction.raw_text,
    }))
}
