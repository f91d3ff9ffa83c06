//! Common utilities for document upload handlers

use axum::extract::multipart::MultipartError;
use axum::extract::Multipart;
use axum::http::StatusCode;
use fleetdesk_core::AppError;

/// Parts of a document upload form.
#[derive(Debug, Default)]
pub struct UploadForm {
    pub data: Vec<u8>,
    pub filename: Option<String>,
    pub content_type: String,
    /// Raw `document_type` field, validated by the caller against its own vocabulary.
    pub document_type: Option<String>,
}

fn multipart_error(e: MultipartError) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge(format!("Request body too large: {}", e.body_text()))
    } else {
        AppError::InvalidInput(format!("Failed to read multipart: {}", e.body_text()))
    }
}

/// Extract the `file` and `document_type` fields from a multipart form.
/// Exactly one `file` field is accepted; unknown fields are ignored.
pub async fn extract_upload_form(mut multipart: Multipart) -> Result<UploadForm, AppError> {
    let mut file: Option<(Vec<u8>, Option<String>, Option<String>)> = None;
    let mut document_type: Option<String> = None;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let field_name = field.name().map(|s| s.to_string()).unwrap_or_default();
        match field_name.as_str() {
            "file" => {
                if file.is_some() {
                    return Err(AppError::InvalidInput(
                        "Multiple file fields are not allowed; send exactly one field named 'file'"
                            .to_string(),
                    ));
                }
                let filename = field.file_name().map(str::to_string);
                let content_type = field.content_type().map(str::to_string);
                let data = field.bytes().await.map_err(multipart_error)?;
                file = Some((data.to_vec(), filename, content_type));
            }
            "document_type" => {
                let value = field.text().await.map_err(multipart_error)?;
                let value = value.trim();
                if !value.is_empty() {
                    document_type = Some(value.to_string());
                }
            }
            _ => {}
        }
    }

    let (data, filename, content_type) =
        file.ok_or_else(|| AppError::InvalidInput("No file provided".to_string()))?;
    if data.is_empty() {
        return Err(AppError::InvalidInput("File is empty".to_string()));
    }

    Ok(UploadForm {
        data,
        filename,
        content_type: content_type.unwrap_or_else(|| "application/octet-stream".to_string()),
        document_type,
    })
}

/// Validate file size
pub fn validate_file_size(file_size: usize, max_size: usize) -> Result<(), AppError> {
    if file_size > max_size {
        return Err(AppError::PayloadTooLarge(format!(
            "File size exceeds maximum allowed size of {} MB",
            max_size / 1024 / 1024
        )));
    }
    Ok(())
}

/// Normalize MIME type by stripping parameters (e.g. "image/jpeg; charset=utf-8" -> "image/jpeg").
pub fn normalize_mime_type(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .map(|s| s.trim())
        .unwrap_or(content_type)
        .to_lowercase()
}

/// Validate content type against allowlist. Compares normalized MIME type only (no parameter bypass).
pub fn validate_content_type(content_type: &str, allowed_types: &[String]) -> Result<(), AppError> {
    let normalized = normalize_mime_type(content_type);
    if !allowed_types.iter().any(|ct| normalized == ct.to_lowercase()) {
        return Err(AppError::InvalidInput(format!(
            "Invalid content type. Allowed types: {}",
            allowed_types.join(", ")
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_file_size() {
        assert!(validate_file_size(10, 10).is_ok());
        assert!(matches!(
            validate_file_size(11, 10),
            Err(AppError::PayloadTooLarge(_))
        ));
    }

    #[test]
    fn test_content_type_parameters_do_not_bypass_allowlist() {
        let allowed = vec!["image/jpeg".to_string(), "application/pdf".to_string()];
        assert!(validate_content_type("image/JPEG; charset=binary", &allowed).is_ok());
        assert!(validate_content_type("text/html; image/jpeg", &allowed).is_err());
        assert!(validate_content_type("image/gif", &allowed).is_err());
    }
}
