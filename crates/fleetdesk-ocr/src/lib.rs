//! Document OCR for pre-filling client and car forms.
//!
//! The API layer only sees [`DocumentExtractor`]; [`DocumentAiClient`] is the
//! production implementation on top of Google Document AI.

pub mod document_ai;
pub mod extractor;
pub mod fields;

pub use document_ai::DocumentAiClient;
pub use extractor::DocumentExtractor;
