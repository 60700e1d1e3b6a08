//! Shared-secret API key gate
//!
//! When a key is configured every gated request must carry it in the
//! `x-api-key` header. An empty key turns the gate off for local use.

use axum::{
    extract::{Request, State},
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};

use super::http::ChatResponse;
use super::ServerState;

/// Header carrying the shared secret
pub const API_KEY_HEADER: &str = "x-api-key";

/// Does `headers` satisfy a gate configured with `expected`?
pub fn is_authorized(expected: &str, headers: &HeaderMap) -> bool {
    if expected.is_empty() {
        return true;
    }
    headers
        .get(API_KEY_HEADER)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|provided| provided == expected)
}

/// Axum middleware rejecting requests without the configured key
pub async fn api_key_middleware(
    State(state): State<ServerState>,
    request: Request,
    next: Next,
) -> Response {
    if !is_authorized(&state.api_key, request.headers()) {
        tracing::warn!("Rejected {} {}: missing or wrong API key", request.method(), request.uri().path());
        return (StatusCode::UNAUTHORIZED, Json(ChatResponse::error("Unauthorized"))).into_response();
    }
    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_empty_key_disables_gate() {
        assert!(is_authorized("", &HeaderMap::new()));
    }

    #[test]
    fn test_key_must_match() {
        let mut headers = HeaderMap::new();
        assert!(!is_authorized("s3cret", &headers));

        headers.insert(API_KEY_HEADER, HeaderValue::from_static("wrong"));
        assert!(!is_authorized("s3cret", &headers));

        headers.insert(API_KEY_HEADER, HeaderValue::from_static("s3cret"));
        assert!(is_authorized("s3cret", &headers));
    }
}
