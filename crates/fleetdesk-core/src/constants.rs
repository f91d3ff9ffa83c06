use chrono::Duration;

/// Lifetime of a mobile upload token, both in the signed claims and in the stored row.
pub const UPLOAD_TOKEN_TTL_SECONDS: i64 = 5 * 60;

pub fn upload_token_ttl() -> Duration {
    Duration::seconds(UPLOAD_TOKEN_TTL_SECONDS)
}

/// Bytes of randomness behind each token row's nonce.
pub const UPLOAD_TOKEN_NONCE_BYTES: usize = 32;

pub const DEFAULT_PAGE_SIZE: i64 = 50;
pub const MAX_PAGE_SIZE: i64 = 200;

/// Clamp a requested page size into `1..=MAX_PAGE_SIZE`.
pub fn page_size(requested: Option<i64>) -> i64 {
    requested.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE)
}
