/// Staff API key configured by `setup_test_app`.
pub const TEST_ADMIN_API_KEY: &str = "test-admin-api-key-at-least-32-characters";

/// `Authorization` header value for staff routes.
pub fn bearer() -> String {
    format!("Bearer {}", TEST_ADMIN_API_KEY)
}
