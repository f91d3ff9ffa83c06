//! Google Document AI client.
//!
//! Settings are resolved on every call so a missing processor or token only
//! fails the OCR request, never startup.

use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use base64::Engine;
use fleetdesk_core::models::{OcrDocumentType, OcrExtraction};
use fleetdesk_core::{AppError, DocumentAiConfig};
use serde::Deserialize;
use serde_json::json;

use crate::extractor::DocumentExtractor;
use crate::fields::{map_entities, ExtractedEntity};

pub struct DocumentAiClient {
    http_client: reqwest::Client,
    config: DocumentAiConfig,
}

impl Debug for DocumentAiClient {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("DocumentAiClient")
            .field("location", &self.config.location)
            .finish()
    }
}

impl DocumentAiClient {
    pub fn new(config: DocumentAiConfig) -> anyhow::Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .context("Failed to create HTTP client for Document AI")?;

        Ok(Self {
            http_client,
            config,
        })
    }

    fn process_url(&self, document_type: OcrDocumentType) -> Result<String, AppError> {
        let project_id = self.config.project_id()?;
        let processor_id = self.config.processor_id(document_type)?;
        Ok(format!(
            "{}/v1/projects/{}/locations/{}/processors/{}:process",
            self.config.endpoint(),
            project_id,
            self.config.location,
            processor_id
        ))
    }

    async fn process(
        &self,
        document_type: OcrDocumentType,
        content: Vec<u8>,
        mime_type: &str,
    ) -> Result<ProcessResponse, AppError> {
        let url = self.process_url(document_type)?;
        let access_token = self.config.access_token()?;

        let request_body = json!({
            "rawDocument": {
                "content": base64::engine::general_purpose::STANDARD.encode(&content),
                "mimeType": mime_type,
            }
        });

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(access_token)
            .json(&request_body)
            .send()
            .await
            .map_err(|e| {
                AppError::ExternalService(format!("Failed to reach Document AI: {}", e))
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            tracing::warn!(
                status = %status,
                document_type = document_type.as_str(),
                error = %error_text,
                "Document AI request failed"
            );
            return Err(AppError::ExternalService(format!(
                "Document AI request failed with status {}",
                status
            )));
        }

        response.json::<ProcessResponse>().await.map_err(|e| {
            AppError::ExternalService(format!("Failed to parse Document AI response: {}", e))
        })
    }
}

#[async_trait]
impl DocumentExtractor for DocumentAiClient {
    #[tracing::instrument(skip(self, content), fields(size = content.len()))]
    async fn extract(
        &self,
        document_type: OcrDocumentType,
        content: Vec<u8>,
        mime_type: &str,
    ) -> Result<OcrExtraction, AppError> {
        let response = self.process(document_type, content, mime_type).await?;
        let document = response.document.unwrap_or_default();

        let mut entities = Vec::new();
        flatten_entities(&document.entities, &mut entities);
        let extraction = map_entities(document_type, &entities, document.text);

        tracing::info!(
            document_type = document_type.as_str(),
            entities = entities.len(),
            fields = extraction.fields.len(),
            "Document AI extraction completed"
        );

        Ok(extraction)
    }
}

fn flatten_entities(entities: &[Entity], out: &mut Vec<ExtractedEntity>) {
    for entity in entities {
        let value = entity
            .normalized_value
            .as_ref()
            .and_then(|v| v.text.clone())
            .filter(|v| !v.trim().is_empty())
            .or_else(|| entity.mention_text.clone())
            .unwrap_or_default();

        if let Some(entity_type) = &entity.entity_type {
            out.push(ExtractedEntity {
                entity_type: entity_type.clone(),
                value,
                confidence: entity.confidence.unwrap_or(0.0),
            });
        }
        flatten_entities(&entity.properties, out);
    }
}

#[derive(Debug, Deserialize)]
struct ProcessResponse {
    document: Option<Document>,
}

#[derive(Debug, Default, Deserialize)]
struct Document {
    #[serde(default)]
    text: String,
    #[serde(default)]
    entities: Vec<Entity>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Entity {
    #[serde(rename = "type")]
    entity_type: Option<String>,
    mention_text: Option<String>,
    confidence: Option<f32>,
    normalized_value: Option<NormalizedValue>,
    #[serde(default)]
    properties: Vec<Entity>,
}

#[derive(Debug, Deserialize)]
struct NormalizedValue {
    text: Option<String>,
}
