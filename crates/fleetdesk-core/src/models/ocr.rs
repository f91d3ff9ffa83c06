use std::collections::BTreeMap;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Document families the OCR service has a processor for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum OcrDocumentType {
    IdCard,
    DriverLicense,
    CarRegistration,
}

impl OcrDocumentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OcrDocumentType::IdCard => "id_card",
            OcrDocumentType::DriverLicense => "driver_license",
            OcrDocumentType::CarRegistration => "car_registration",
        }
    }
}

impl FromStr for OcrDocumentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "id_card" => Ok(OcrDocumentType::IdCard),
            "driver_license" | "license" => Ok(OcrDocumentType::DriverLicense),
            "car_registration" | "registration" => Ok(OcrDocumentType::CarRegistration),
            other => Err(format!("Unsupported OCR document type: {}", other)),
        }
    }
}

/// Form fields extracted from one document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct OcrExtraction {
    /// Form field name to extracted value.
    #[schema(value_type = Object)]
    pub fields: BTreeMap<String, String>,
    /// Form field name to the service's confidence in `[0, 1]`.
    #[schema(value_type = Object)]
    pub confidence: BTreeMap<String, f32>,
    pub raw_text: String,
}
