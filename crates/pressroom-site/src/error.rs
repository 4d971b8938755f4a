//! Error types for the site service.
//!
//! API endpoints answer with the JSON failure envelope; a missing content
//! record on a user-facing page renders the HTML not-found page instead.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use maud::{DOCTYPE, PreEscaped, html};
use serde_json::{Value, json};

use crate::envelope;

/// Site error type.
#[derive(Debug, thiserror::Error)]
pub enum SiteError {
    /// Missing or wrong shared-secret token.
    #[error("Invalid token")]
    Unauthorized,

    /// Malformed or unsafe input (absolute redirect, missing parameter).
    #[error("{0}")]
    InvalidRequest(String),

    /// The content or management API failed.
    #[error("upstream error (status {status:?}): {message}")]
    Upstream {
        /// HTTP status returned upstream, when one was received.
        status: Option<u16>,
        /// Upstream message or transport error.
        message: String,
    },

    /// The requested content record does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// A setting this operation needs is absent.
    #[error("configuration error: {0}")]
    Config(String),

    /// Anything else.
    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl SiteError {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidRequest(message.into())
    }

    pub fn upstream(status: Option<u16>, message: impl Into<String>) -> Self {
        Self::Upstream {
            status,
            message: message.into(),
        }
    }

    /// HTTP status this error maps to.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::InvalidRequest(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Upstream { .. } | Self::Config(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Payload placed under `error` in the failure envelope.
    fn envelope_error(&self) -> Value {
        match self {
            Self::Upstream { status, message } => json!({
                "message": message,
                "status": status,
            }),
            other => Value::String(other.to_string()),
        }
    }
}

impl IntoResponse for SiteError {
    fn into_response(self) -> Response {
        match &self {
            Self::Unauthorized => tracing::debug!("rejected request with invalid token"),
            Self::InvalidRequest(msg) => tracing::debug!(reason = %msg, "invalid request"),
            Self::NotFound(what) => {
                tracing::debug!(what = %what, "content not found");
                return not_found_page();
            }
            Self::Upstream { status, message } => {
                tracing::error!(status = ?status, message = %message, "upstream error")
            }
            Self::Config(msg) => tracing::error!(reason = %msg, "configuration error"),
            Self::Internal(err) => tracing::error!(error = %err, "internal server error"),
        }

        envelope::failure(self.status(), self.envelope_error())
    }
}

/// The standard "not found" page.
pub fn not_found_page() -> Response {
    let markup = html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="utf-8";
                meta name="viewport" content="width=device-width, initial-scale=1";
                title { "Not Found" }
                meta name="robots" content="noindex";
                style { (PreEscaped(crate::render::components::ERROR_CSS)) }
            }
            body {
                main class="error-page" {
                    h1 { "Not Found" }
                    p { "Could not find the requested resource." }
                    a href="/" { "Return home" }
                }
            }
        }
    };

    (StatusCode::NOT_FOUND, markup).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    async fn body_json(response: Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn error_display() {
        assert_eq!(SiteError::Unauthorized.to_string(), "Invalid token");
        assert_eq!(
            SiteError::invalid("URL must be relative!").to_string(),
            "URL must be relative!"
        );
    }

    #[tokio::test]
    async fn unauthorized_is_401_envelope() {
        let response = SiteError::Unauthorized.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            body_json(response).await,
            json!({ "success": false, "error": "Invalid token" })
        );
    }

    #[tokio::test]
    async fn invalid_request_is_422() {
        let response = SiteError::invalid("Missing required parameters").into_response();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn upstream_surfaces_status_and_message() {
        let response = SiteError::upstream(Some(401), "invalid credentials").into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(response).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["error"]["status"], 401);
        assert_eq!(body["error"]["message"], "invalid credentials");
    }

    #[tokio::test]
    async fn not_found_is_html() {
        let response = SiteError::NotFound("page".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let content_type = response.headers()["content-type"].to_str().unwrap();
        assert!(content_type.starts_with("text/html"));
    }

    #[test]
    fn internal_from_anyhow() {
        let err: SiteError = anyhow::anyhow!("boom").into();
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.to_string(), "internal error: boom");
    }
}
