use axum::http::HeaderValue;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

/// JSON responses never load sub-resources.
const API_CSP: &str = "default-src 'none'; frame-ancestors 'none'";

/// Security headers configuration
#[derive(Clone)]
pub struct SecurityHeadersConfig {
    pub is_production: bool,
    /// Path prefixes that serve HTML (API docs) and keep their own CSP.
    pub html_prefixes: Vec<String>,
}

impl SecurityHeadersConfig {
    pub fn new(is_production: bool) -> Self {
        Self {
            is_production,
            html_prefixes: vec!["/docs".to_string()],
        }
    }

    fn serves_html(&self, path: &str) -> bool {
        self.html_prefixes.iter().any(|p| path.starts_with(p.as_str()))
    }
}

/// Adds security headers to all HTTP responses
pub async fn security_headers_middleware(
    State(config): State<Arc<SecurityHeadersConfig>>,
    request: Request,
    next: Next,
) -> Response {
    let html = config.serves_html(request.uri().path());
    let mut response = next.run(request).await;

    let headers = response.headers_mut();

    headers.insert(
        "X-Content-Type-Options",
        HeaderValue::from_static("nosniff"),
    );
    headers.insert("X-Frame-Options", HeaderValue::from_static("DENY"));
    headers.insert(
        "Referrer-Policy",
        HeaderValue::from_static("strict-origin-when-cross-origin"),
    );

    if config.is_production {
        headers.insert(
            "Strict-Transport-Security",
            HeaderValue::from_static("max-age=31536000; includeSubDomains"),
        );
    }

    if !html {
        headers.insert("Content-Security-Policy", HeaderValue::from_static(API_CSP));
    }

    // Upload tokens travel in paths; keep responses out of shared caches.
    headers.insert(
        "Cache-Control",
        HeaderValue::from_static("no-store, private"),
    );

    response
}
