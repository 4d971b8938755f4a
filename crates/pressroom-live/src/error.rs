//! Error types for live-update subscriptions.

use serde::Serialize;
use thiserror::Error;

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while opening a subscription.
#[derive(Error, Debug)]
pub enum Error {
    /// HTTP transport error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The listen endpoint refused the subscription request.
    #[error("handshake rejected with status {status}: {body}")]
    Handshake {
        /// HTTP status returned by the listen endpoint.
        status: u16,
        /// Response body, for diagnostics.
        body: String,
    },

    /// The notification channel could not be opened.
    #[error("channel rejected with status {0}")]
    Channel(u16),

    /// The channel sent a line longer than the decoder accepts.
    #[error("event stream line exceeds {0} bytes")]
    LineTooLong(usize),

    /// JSON parsing error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A subscription failure, shown inline in place of content.
///
/// This is never propagated as an HTTP error: the live view renders its
/// `code` and `message` where the content would have been.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[error("{code}: {message}")]
pub struct ConnectionError {
    /// Short machine-readable code (e.g. `CONNECTION_CLOSED`).
    pub code: String,
    /// Human-readable description.
    pub message: String,
    /// Whether the channel is unusable after this error.
    pub fatal: bool,
}

impl ConnectionError {
    /// A fatal error with the given code.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            fatal: true,
        }
    }

    /// The upstream channel ended.
    pub fn closed() -> Self {
        Self::new("CONNECTION_CLOSED", "the live-update channel was closed")
    }
}

impl From<Error> for ConnectionError {
    fn from(err: Error) -> Self {
        let code = match &err {
            Error::Http(_) => "TRANSPORT",
            Error::Handshake { .. } => "HANDSHAKE_FAILED",
            Error::Channel(_) => "CHANNEL_FAILED",
            Error::LineTooLong(_) => "FRAME_TOO_LARGE",
            Error::Json(_) => "INVALID_PAYLOAD",
        };
        Self::new(code, err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connection_error_display() {
        let err = ConnectionError::new("INVALID_QUERY", "field 'foo' does not exist");
        assert_eq!(err.to_string(), "INVALID_QUERY: field 'foo' does not exist");
        assert!(err.fatal);
    }

    #[test]
    fn handshake_error_maps_to_code() {
        let err = Error::Handshake {
            status: 401,
            body: "bad token".to_string(),
        };
        let conn: ConnectionError = err.into();
        assert_eq!(conn.code, "HANDSHAKE_FAILED");
        assert!(conn.message.contains("401"));
        assert!(conn.message.contains("bad token"));
    }

    #[test]
    fn json_error_maps_to_code() {
        let json_err = serde_json::from_str::<serde_json::Value>("nope").unwrap_err();
        let conn: ConnectionError = Error::from(json_err).into();
        assert_eq!(conn.code, "INVALID_PAYLOAD");
    }

    #[test]
    fn closed_is_fatal() {
        let err = ConnectionError::closed();
        assert_eq!(err.code, "CONNECTION_CLOSED");
        assert!(err.fatal);
    }
}
