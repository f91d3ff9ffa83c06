use crate::error::HttpAppError;
use crate::state::AppState;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use fleetdesk_core::AppError;
use std::sync::Arc;
use subtle::ConstantTimeEq;

fn secure_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

/// Guard for staff routes: `Authorization: Bearer {ADMIN_API_KEY}`.
///
/// The key is resolved per request, so a missing `ADMIN_API_KEY` surfaces as
/// a 500 on the first staff call rather than at startup.
pub async fn admin_auth_middleware(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let expected = match state.config.admin_api_key() {
        Ok(key) => key,
        Err(e) => return HttpAppError(e).into_response(),
    };

    let auth_header = match request
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
    {
        Some(h) => h,
        None => {
            tracing::debug!(path = %request.uri().path(), "Missing authorization header");
            return HttpAppError(AppError::Unauthorized(
                "Missing authorization header".to_string(),
            ))
            .into_response();
        }
    };

    let Some(token) = auth_header.strip_prefix("Bearer ") else {
        return HttpAppError(AppError::Unauthorized(
            "Invalid authorization header format".to_string(),
        ))
        .into_response();
    };

    if !secure_compare(token.trim(), expected) {
        tracing::warn!(path = %request.uri().path(), "Rejected staff request with invalid API key");
        return HttpAppError(AppError::Unauthorized("Invalid API key".to_string()))
            .into_response();
    }

    next.run(request).await
}
