use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use super::upload::DocumentType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum CarStatus {
    Available,
    Rented,
    Maintenance,
    Inactive,
}

impl CarStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CarStatus::Available => "available",
            CarStatus::Rented => "rented",
            CarStatus::Maintenance => "maintenance",
            CarStatus::Inactive => "inactive",
        }
    }
}

impl fmt::Display for CarStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CarStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "available" => Ok(CarStatus::Available),
            "rented" => Ok(CarStatus::Rented),
            "maintenance" => Ok(CarStatus::Maintenance),
            "inactive" => Ok(CarStatus::Inactive),
            other => Err(format!("Unknown car status: {}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Car {
    pub id: Uuid,
    pub brand: String,
    pub model: String,
    pub year: i32,
    pub plate_number: String,
    pub color: Option<String>,
    #[schema(value_type = f64)]
    pub daily_rate: Decimal,
    pub registration_url: Option<String>,
    pub insurance_url: Option<String>,
    pub inspection_url: Option<String>,
    pub photo_url: Option<String>,
    pub status: CarStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Car {
    pub fn document_url(&self, document_type: DocumentType) -> Option<&str> {
        match document_type {
            DocumentType::Registration => self.registration_url.as_deref(),
            DocumentType::Insurance => self.insurance_url.as_deref(),
            DocumentType::Inspection => self.inspection_url.as_deref(),
            DocumentType::Photo => self.photo_url.as_deref(),
            _ => None,
        }
    }

    /// Returns false for client document types.
    pub fn set_document_url(&mut self, document_type: DocumentType, url: String) -> bool {
        let slot = match document_type {
            DocumentType::Registration => &mut self.registration_url,
            DocumentType::Insurance => &mut self.insurance_url,
            DocumentType::Inspection => &mut self.inspection_url,
            DocumentType::Photo => &mut self.photo_url,
            _ => return false,
        };
        *slot = Some(url);
        true
    }
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateCarRequest {
    #[validate(length(min = 1, max = 64, message = "Brand is required"))]
    pub brand: String,
    #[validate(length(min = 1, max = 64, message = "Model is required"))]
    pub model: String,
    #[validate(range(min = 1950, max = 2100))]
    pub year: i32,
    #[validate(length(min = 2, max = 20, message = "Plate number is required"))]
    pub plate_number: String,
    #[validate(length(max = 32))]
    pub color: Option<String>,
    #[schema(value_type = f64)]
    pub daily_rate: Decimal,
}

impl CreateCarRequest {
    /// Plate numbers are stored upper-case without surrounding whitespace.
    pub fn normalized(mut self) -> Self {
        self.brand = self.brand.trim().to_string();
        self.model = self.model.trim().to_string();
        self.plate_number = self.plate_number.trim().to_uppercase();
        self
    }
}

/// Partial update of a car's document URLs; absent fields stay unchanged.
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateCarDocumentsRequest {
    #[validate(url)]
    pub registration_url: Option<String>,
    #[validate(url)]
    pub insurance_url: Option<String>,
    #[validate(url)]
    pub inspection_url: Option<String>,
    #[validate(url)]
    pub photo_url: Option<String>,
}

impl UpdateCarDocumentsRequest {
    pub fn into_updates(self) -> Vec<(DocumentType, String)> {
        [
            (DocumentType::Registration, self.registration_url),
            (DocumentType::Insurance, self.insurance_url),
            (DocumentType::Inspection, self.inspection_url),
            (DocumentType::Photo, self.photo_url),
        ]
        .into_iter()
        .filter_map(|(doc, url)| url.map(|u| (doc, u)))
        .collect()
    }
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct UpdateCarStatusRequest {
    pub status: CarStatus,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CarFilter {
    pub status: Option<CarStatus>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}
