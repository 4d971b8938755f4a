//! Signed draft-mode session.
//!
//! The draft flag lives in an `HttpOnly` cookie whose value is an
//! HMAC-SHA256 over a fixed label, keyed by the shared secret. Only a
//! cookie carrying that exact MAC counts as draft mode; anything else the
//! client sends reads as published.

use axum::http::{HeaderMap, HeaderValue, header};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Cookie carrying the draft session.
pub const COOKIE_NAME: &str = "pressroom_draft";

/// Message the session MAC is computed over.
const SESSION_LABEL: &[u8] = b"pressroom:draft-mode:v1";

/// The per-request draft flag, read from a verified cookie.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DraftSession {
    draft: bool,
}

impl DraftSession {
    pub const PUBLISHED: Self = Self { draft: false };
    pub const DRAFT: Self = Self { draft: true };

    pub fn is_draft(self) -> bool {
        self.draft
    }
}

/// `SameSite` cookie attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SameSite {
    Lax,
    None,
}

/// A `Set-Cookie` directive returned by the draft-mode controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetCookie {
    pub name: &'static str,
    pub value: String,
    pub path: &'static str,
    pub http_only: bool,
    pub secure: bool,
    pub same_site: SameSite,
    pub partitioned: bool,
    pub max_age: Option<u64>,
}

impl SetCookie {
    /// Re-issue the same cookie so it survives inside a third-party iframe.
    ///
    /// Browsers drop first-party-only cookies set from an embedded frame, so
    /// the directive becomes `SameSite=None; Secure; Partitioned` with the
    /// value and lifetime left untouched.
    pub fn embeddable(self) -> Self {
        Self {
            http_only: true,
            path: "/",
            secure: true,
            same_site: SameSite::None,
            partitioned: true,
            ..self
        }
    }

    /// Render as a `Set-Cookie` header value.
    pub fn to_header_value(&self) -> String {
        let mut out = format!("{}={}; Path={}", self.name, self.value, self.path);
        if let Some(max_age) = self.max_age {
            out.push_str(&format!("; Max-Age={max_age}"));
        }
        if self.http_only {
            out.push_str("; HttpOnly");
        }
        if self.secure {
            out.push_str("; Secure");
        }
        out.push_str(match self.same_site {
            SameSite::Lax => "; SameSite=Lax",
            SameSite::None => "; SameSite=None",
        });
        if self.partitioned {
            out.push_str("; Partitioned");
        }
        out
    }

    pub fn header_value(&self) -> Option<HeaderValue> {
        HeaderValue::from_str(&self.to_header_value()).ok()
    }
}

/// Signs and verifies draft session cookies.
#[derive(Clone)]
pub struct SessionKey {
    mac: HmacSha256,
}

impl std::fmt::Debug for SessionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SessionKey(***)")
    }
}

impl SessionKey {
    pub fn new(secret: &str) -> anyhow::Result<Self> {
        let mac = HmacSha256::new_from_slice(secret.as_bytes())
            .map_err(|e| anyhow::anyhow!("invalid session key: {e}"))?;
        Ok(Self { mac })
    }

    fn token(&self) -> String {
        let mut mac = self.mac.clone();
        mac.update(SESSION_LABEL);
        URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes())
    }

    fn verify(&self, value: &str) -> bool {
        let Ok(tag) = URL_SAFE_NO_PAD.decode(value) else {
            return false;
        };
        let mut mac = self.mac.clone();
        mac.update(SESSION_LABEL);
        mac.verify_slice(&tag).is_ok()
    }

    /// The cookie the session primitive sets to turn draft mode on.
    ///
    /// First-party attributes only; the controller corrects them with
    /// [`SetCookie::embeddable`].
    pub fn enable(&self) -> SetCookie {
        SetCookie {
            name: COOKIE_NAME,
            value: self.token(),
            path: "/",
            http_only: true,
            secure: false,
            same_site: SameSite::Lax,
            partitioned: false,
            max_age: None,
        }
    }

    /// The cookie the session primitive sets to turn draft mode off.
    pub fn disable(&self) -> SetCookie {
        SetCookie {
            name: COOKIE_NAME,
            value: String::new(),
            path: "/",
            http_only: true,
            secure: false,
            same_site: SameSite::Lax,
            partitioned: false,
            max_age: Some(0),
        }
    }

    /// Read the verified draft flag from request headers.
    pub fn read(&self, headers: &HeaderMap) -> DraftSession {
        let draft = headers
            .get_all(header::COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .flat_map(|v| v.split(';'))
            .filter_map(|pair| pair.trim().split_once('='))
            .any(|(name, value)| name == COOKIE_NAME && self.verify(value));
        DraftSession { draft }
    }
}
