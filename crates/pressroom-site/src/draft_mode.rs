//! Draft-mode session controller.
//!
//! Both operations are pure: they validate their input and return the
//! cookie directive plus redirect target, leaving the HTTP plumbing to the
//! route handlers. A failed operation returns no directive at all, so the
//! session is never partially changed.

use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use pressroom_core::is_relative_url;

use crate::config::Config;
use crate::error::SiteError;
use crate::session::{SessionKey, SetCookie};

/// Redirect target used when the request names none.
pub const DEFAULT_TARGET: &str = "/";

/// Outcome of a successful toggle: set this cookie, then redirect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toggle {
    pub cookie: SetCookie,
    pub location: String,
}

/// Turn draft mode on.
///
/// The token is checked before the target so a caller without the secret
/// learns nothing about URL validation.
pub fn enable(
    config: &Config,
    key: &SessionKey,
    token: Option<&str>,
    target: Option<&str>,
) -> Result<Toggle, SiteError> {
    if !config.token_matches(token) {
        return Err(SiteError::Unauthorized);
    }
    let location = checked_target(target)?;
    Ok(Toggle {
        cookie: key.enable().embeddable(),
        location,
    })
}

/// Turn draft mode off. Needs no token.
pub fn disable(key: &SessionKey, target: Option<&str>) -> Result<Toggle, SiteError> {
    let location = checked_target(target)?;
    Ok(Toggle {
        cookie: key.disable().embeddable(),
        location,
    })
}

fn checked_target(target: Option<&str>) -> Result<String, SiteError> {
    let target = target.filter(|t| !t.is_empty()).unwrap_or(DEFAULT_TARGET);
    if !is_relative_url(target) {
        return Err(SiteError::invalid("URL must be relative!"));
    }
    Ok(target.to_string())
}

impl IntoResponse for Toggle {
    fn into_response(self) -> Response {
        let Ok(location) = HeaderValue::from_str(&self.location) else {
            return SiteError::invalid("URL must be relative!").into_response();
        };
        let Some(cookie) = self.cookie.header_value() else {
            return SiteError::Internal(anyhow::anyhow!("unrepresentable session cookie"))
                .into_response();
        };
        (
            StatusCode::TEMPORARY_REDIRECT,
            [(header::LOCATION, location), (header::SET_COOKIE, cookie)],
        )
            .into_response()
    }
}
