//! Error types for the pressroom core crate.

use thiserror::Error;

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while decoding shared domain values.
#[derive(Error, Debug)]
pub enum Error {
    /// An invisible edit-location run was found but could not be decoded.
    #[error("invalid edit-location token: {0}")]
    InvalidToken(String),

    /// The editing URL carried by a token does not point at a record.
    #[error("invalid edit URL '{url}': {reason}")]
    InvalidEditUrl {
        /// The offending URL.
        url: String,
        /// Description of what's wrong.
        reason: &'static str,
    },

    /// JSON parsing error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// URL parsing error.
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_token_display() {
        let err = Error::InvalidToken("odd run length".to_string());
        assert_eq!(err.to_string(), "invalid edit-location token: odd run length");
    }

    #[test]
    fn test_invalid_edit_url_display() {
        let err = Error::InvalidEditUrl {
            url: "https://example.com".to_string(),
            reason: "missing item id",
        };
        let msg = err.to_string();
        assert!(msg.contains("https://example.com"));
        assert!(msg.contains("missing item id"));
    }

    #[test]
    fn test_from_json_error() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: Error = json_err.into();
        assert!(matches!(err, Error::Json(_)));
    }

    #[test]
    fn test_from_url_error() {
        let url_err = url::Url::parse("not a url").unwrap_err();
        let err: Error = url_err.into();
        assert!(matches!(err, Error::Url(_)));
    }
}
