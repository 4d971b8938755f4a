//! JSON envelopes and CORS headers for the API endpoints.
//!
//! Every webhook and plugin endpoint answers with either
//! `{"success": true, "data": ...}` or `{"success": false, "error": ...}`,
//! and carries permissive CORS headers so the CMS interface can call it
//! from the browser.

use axum::Json;
use axum::http::{HeaderName, HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use serde_json::{Value, json};

/// CORS headers attached to every API response.
pub fn cors_headers() -> [(HeaderName, HeaderValue); 3] {
    [
        (
            header::ACCESS_CONTROL_ALLOW_ORIGIN,
            HeaderValue::from_static("*"),
        ),
        (
            header::ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static("OPTIONS, POST, GET"),
        ),
        (
            header::ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static("Content-Type, Authorization"),
        ),
    ]
}

/// Serialize `body` as JSON with CORS headers.
pub fn json<T: Serialize>(status: StatusCode, body: T) -> Response {
    (status, cors_headers(), Json(body)).into_response()
}

/// `{"success": true}` with optional `data`.
pub fn success(data: Option<Value>) -> Response {
    let body = match data {
        Some(data) => json!({ "success": true, "data": data }),
        None => json!({ "success": true }),
    };
    json(StatusCode::OK, body)
}

/// `{"success": false, "error": ...}` with the given status.
pub fn failure(status: StatusCode, error: Value) -> Response {
    json(status, json!({ "success": false, "error": error }))
}

/// Answer a CORS preflight.
pub async fn preflight() -> Response {
    (StatusCode::OK, cors_headers(), "OK").into_response()
}
