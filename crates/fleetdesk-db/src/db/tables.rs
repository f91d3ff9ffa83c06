use fleetdesk_core::models::EntityKind;

/// Table layout of one upload flow. Client and car flows use separate tables
/// with the same shape apart from the document columns.
#[derive(Debug, Clone, Copy)]
pub(crate) struct UploadTables {
    pub entity: &'static str,
    pub tokens: &'static str,
    pub sessions: &'static str,
    /// Foreign key column pointing at `entity`.
    pub entity_column: &'static str,
}

pub(crate) fn upload_tables(kind: EntityKind) -> UploadTables {
    match kind {
        EntityKind::Client => UploadTables {
            entity: "clients",
            tokens: "client_upload_tokens",
            sessions: "client_upload_sessions",
            entity_column: "client_id",
        },
        EntityKind::Car => UploadTables {
            entity: "cars",
            tokens: "car_upload_tokens",
            sessions: "car_upload_sessions",
            entity_column: "car_id",
        },
    }
}

pub(crate) fn parse_column<T>(column: &str, raw: &str) -> Result<T, fleetdesk_core::AppError>
where
    T: std::str::FromStr<Err = String>,
{
    raw.parse::<T>().map_err(|e| {
        fleetdesk_core::AppError::Internal(format!("Unexpected value in column {}: {}", column, e))
    })
}
