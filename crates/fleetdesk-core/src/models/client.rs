use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use super::upload::DocumentType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ClientStatus {
    Active,
    Inactive,
    Archived,
}

impl ClientStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClientStatus::Active => "active",
            ClientStatus::Inactive => "inactive",
            ClientStatus::Archived => "archived",
        }
    }
}

impl fmt::Display for ClientStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ClientStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(ClientStatus::Active),
            "inactive" => Ok(ClientStatus::Inactive),
            "archived" => Ok(ClientStatus::Archived),
            other => Err(format!("Unknown client status: {}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Client {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub id_card_number: Option<String>,
    pub id_card_expiry: Option<NaiveDate>,
    pub license_number: Option<String>,
    pub license_expiry: Option<NaiveDate>,
    pub id_card_front_url: Option<String>,
    pub id_card_back_url: Option<String>,
    pub license_front_url: Option<String>,
    pub license_back_url: Option<String>,
    pub status: ClientStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Client {
    pub fn document_url(&self, document_type: DocumentType) -> Option<&str> {
        match document_type {
            DocumentType::IdCardFront => self.id_card_front_url.as_deref(),
            DocumentType::IdCardBack => self.id_card_back_url.as_deref(),
            DocumentType::LicenseFront => self.license_front_url.as_deref(),
            DocumentType::LicenseBack => self.license_back_url.as_deref(),
            _ => None,
        }
    }

    /// Returns false for car document types.
    pub fn set_document_url(&mut self, document_type: DocumentType, url: String) -> bool {
        let slot = match document_type {
            DocumentType::IdCardFront => &mut self.id_card_front_url,
            DocumentType::IdCardBack => &mut self.id_card_back_url,
            DocumentType::LicenseFront => &mut self.license_front_url,
            DocumentType::LicenseBack => &mut self.license_back_url,
            _ => return false,
        };
        *slot = Some(url);
        true
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateClientRequest {
    #[validate(length(min = 1, max = 100, message = "First name is required"))]
    pub first_name: String,
    #[validate(length(min = 1, max = 100, message = "Last name is required"))]
    pub last_name: String,
    #[validate(email(message = "A valid email is required"))]
    pub email: String,
    #[validate(length(max = 32))]
    pub phone: Option<String>,
    #[validate(length(max = 255))]
    pub address: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    #[validate(length(max = 64))]
    pub id_card_number: Option<String>,
    pub id_card_expiry: Option<NaiveDate>,
    #[validate(length(max = 64))]
    pub license_number: Option<String>,
    pub license_expiry: Option<NaiveDate>,
}

impl CreateClientRequest {
    /// Trimmed copy with a lowercased email, ready to persist.
    pub fn normalized(mut self) -> Self {
        self.first_name = self.first_name.trim().to_string();
        self.last_name = self.last_name.trim().to_string();
        self.email = self.email.trim().to_lowercase();
        self
    }
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct UpdateClientStatusRequest {
    pub status: ClientStatus,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClientFilter {
    pub status: Option<ClientStatus>,
    /// Case-insensitive match on name, email or phone.
    pub search: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}
