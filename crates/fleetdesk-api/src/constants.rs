//! API constants

pub const API_VERSION: &str = "v1";

/// Versioned prefix every route is mounted under.
pub const API_PREFIX: &str = "/api/v1";

/// Message returned for every rejected upload token, whatever the cause.
pub const INVALID_UPLOAD_TOKEN: &str = "Invalid or expired upload token";

/// Slack on top of the per-file limit for multipart framing and text fields.
pub const MULTIPART_OVERHEAD_BYTES: usize = 1024 * 1024;
