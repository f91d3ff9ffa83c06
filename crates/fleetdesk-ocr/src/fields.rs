//! Mapping from Document AI entity types to FleetDesk form fields.

use chrono::NaiveDate;
use fleetdesk_core::models::{OcrDocumentType, OcrExtraction};

/// One entity detected by the OCR processor.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedEntity {
    pub entity_type: String,
    pub value: String,
    pub confidence: f32,
}

const ID_CARD_FIELDS: &[(&str, &str)] = &[
    ("given_names", "first_name"),
    ("given_name", "first_name"),
    ("family_name", "last_name"),
    ("surname", "last_name"),
    ("document_id", "id_card_number"),
    ("expiration_date", "id_card_expiry"),
    ("date_of_birth", "date_of_birth"),
    ("address", "address"),
    ("nationality", "nationality"),
];

const DRIVER_LICENSE_FIELDS: &[(&str, &str)] = &[
    ("given_names", "first_name"),
    ("given_name", "first_name"),
    ("family_name", "last_name"),
    ("surname", "last_name"),
    ("document_id", "license_number"),
    ("license_number", "license_number"),
    ("expiration_date", "license_expiry"),
    ("issue_date", "license_issue_date"),
    ("date_of_birth", "date_of_birth"),
    ("address", "address"),
];

const CAR_REGISTRATION_FIELDS: &[(&str, &str)] = &[
    ("registration_number", "plate_number"),
    ("license_plate", "plate_number"),
    ("vin", "vin"),
    ("make", "make"),
    ("brand", "make"),
    ("model", "model"),
    ("first_registration_date", "registration_date"),
    ("registration_date", "registration_date"),
    ("owner_name", "owner_name"),
];

const DATE_FIELDS: &[&str] = &[
    "id_card_expiry",
    "license_expiry",
    "license_issue_date",
    "date_of_birth",
    "registration_date",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y", "%d.%m.%Y", "%d-%m-%Y", "%Y/%m/%d"];

fn field_table(document_type: OcrDocumentType) -> &'static [(&'static str, &'static str)] {
    match document_type {
        OcrDocumentType::IdCard => ID_CARD_FIELDS,
        OcrDocumentType::DriverLicense => DRIVER_LICENSE_FIELDS,
        OcrDocumentType::CarRegistration => CAR_REGISTRATION_FIELDS,
    }
}

/// Form field an entity type feeds, if any.
pub fn form_field(document_type: OcrDocumentType, entity_type: &str) -> Option<&'static str> {
    let entity_type = entity_type.trim().to_lowercase();
    field_table(document_type)
        .iter()
        .find(|(source, _)| *source == entity_type)
        .map(|(_, target)| *target)
}

/// `YYYY-MM-DD` when the value parses as a date in a known layout; the
/// trimmed input otherwise.
pub fn normalize_date(raw: &str) -> String {
    let trimmed = raw.trim();
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(trimmed, format).ok())
        .map(|date| date.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| trimmed.to_string())
}

/// Build the form pre-fill from processor entities.
///
/// When several entities feed the same field, the most confident one wins.
pub fn map_entities(
    document_type: OcrDocumentType,
    entities: &[ExtractedEntity],
    raw_text: String,
) -> OcrExtraction {
    let mut extraction = OcrExtraction {
        raw_text,
        ..Default::default()
    };

    for entity in entities {
        let Some(field) = form_field(document_type, &entity.entity_type) else {
            continue;
        };
        let value = entity.value.trim();
        if value.is_empty() {
            continue;
        }
        if let Some(existing) = extraction.confidence.get(field) {
            if *existing >= entity.confidence {
                continue;
            }
        }

        let value = if DATE_FIELDS.contains(&field) {
            normalize_date(value)
        } else if field == "plate_number" || field == "vin" {
            value.to_uppercase()
        } else {
            value.to_string()
        };

        extraction.fields.insert(field.to_string(), value);
        extraction
            .confidence
            .insert(field.to_string(), entity.confidence.clamp(0.0, 1.0));
    }

    extraction
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entity(entity_type: &str, value: &str, confidence: f32) -> ExtractedEntity {
        ExtractedEntity {
            entity_type: entity_type.to_string(),
            value: value.to_string(),
            confidence,
        }
    }

    #[test]
    fn test_id_card_mapping() {
        let extraction = map_entities(
            OcrDocumentType::IdCard,
            &[
                entity("Given_Names", "Amina", 0.97),
                entity("family_name", "Benali", 0.95),
                entity("document_id", "AB123456", 0.9),
                entity("expiration_date", "31/12/2030", 0.88),
                entity("portrait", "", 0.99),
            ],
            "raw".to_string(),
        );

        assert_eq!(extraction.fields["first_name"], "Amina");
        assert_eq!(extraction.fields["last_name"], "Benali");
        assert_eq!(extraction.fields["id_card_number"], "AB123456");
        assert_eq!(extraction.fields["id_card_expiry"], "2030-12-31");
        assert!(!extraction.fields.contains_key("portrait"));
        assert_eq!(extraction.raw_text, "raw");
    }

    #[test]
    fn test_same_entity_type_maps_per_document() {
        assert_eq!(
            form_field(OcrDocumentType::IdCard, "document_id"),
            Some("id_card_number")
        );
        assert_eq!(
            form_field(OcrDocumentType::DriverLicense, "document_id"),
            Some("license_number")
        );
        assert_eq!(form_field(OcrDocumentType::CarRegistration, "document_id"), None);
    }

    #[test]
    fn test_most_confident_entity_wins() {
        let extraction = map_entities(
            OcrDocumentType::CarRegistration,
            &[
                entity("license_plate", "ab-123-cd", 0.6),
                entity("registration_number", "AB-123-CE", 0.9),
                entity("license_plate", "AB-128-CD", 0.7),
            ],
            String::new(),
        );
        assert_eq!(extraction.fields["plate_number"], "AB-123-CE");
        assert_eq!(extraction.confidence["plate_number"], 0.9);
    }

    #[test]
    fn test_normalize_date() {
        assert_eq!(normalize_date("2031-01-05"), "2031-01-05");
        assert_eq!(normalize_date("05.01.2031"), "2031-01-05");
        assert_eq!(normalize_date(" 05-01-2031 "), "2031-01-05");
        assert_eq!(normalize_date("January 2031"), "January 2031");
    }
}
