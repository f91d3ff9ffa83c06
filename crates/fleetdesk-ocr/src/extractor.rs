use async_trait::async_trait;
use fleetdesk_core::models::{OcrDocumentType, OcrExtraction};
use fleetdesk_core::AppError;

/// Extracts form fields from a scanned identity or vehicle document.
#[async_trait]
pub trait DocumentExtractor: Send + Sync {
    async fn extract(
        &self,
        document_type: OcrDocumentType,
        content: Vec<u8>,
        mime_type: &str,
    ) -> Result<OcrExtraction, AppError>;
}
