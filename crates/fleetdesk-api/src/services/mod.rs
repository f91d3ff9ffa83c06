pub mod background;
pub mod document_ingest;
pub mod upload_token;
