//! Published/draft access model.
//!
//! Every content query runs against one of two data views. The view decides
//! which credential is sent upstream, whether unpublished changes are
//! included, and whether text values come back carrying edit-location
//! tokens.

use std::fmt;

/// The single cache tag attached to every gateway response.
///
/// Invalidation is all-or-nothing: the webhook drops every entry carrying
/// this tag, regardless of which record changed.
pub const CACHE_TAG: CacheTag = CacheTag("datocms");

/// Coarse invalidation label for cached query results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheTag(&'static str);

impl CacheTag {
    /// The tag value as a string.
    pub const fn as_str(&self) -> &'static str {
        self.0
    }
}

impl fmt::Display for CacheTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// Which content view a query targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccessMode {
    /// Published content only.
    Published,
    /// Latest draft content, with edit-location tokens embedded in text.
    Draft,
}

impl AccessMode {
    /// Map the session's draft flag onto an access mode.
    pub fn from_draft(draft: bool) -> Self {
        if draft { Self::Draft } else { Self::Published }
    }

    /// Whether this mode reads draft content.
    pub fn is_draft(self) -> bool {
        matches!(self, Self::Draft)
    }

    /// Whether upstream should embed edit-location tokens in text fields.
    pub fn embeds_edit_tokens(self) -> bool {
        self.is_draft()
    }

    /// Cache tag applied to responses fetched in this mode.
    ///
    /// Both views share the same tag, so one webhook call clears them all.
    pub fn cache_tag(self) -> CacheTag {
        CACHE_TAG
    }

    /// Short label used in logs and metric labels.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Published => "published",
            Self::Draft => "draft",
        }
    }
}

impl fmt::Display for AccessMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A bearer credential. `Debug` never prints the value.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    /// Wrap a raw token.
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// The raw token, for building request headers.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}

/// The pair of content-delivery credentials, one per access mode.
#[derive(Debug, Clone)]
pub struct Credentials {
    /// Token that can only read published content.
    pub published: Credential,
    /// Token that can read draft content.
    pub draft: Credential,
}

impl Credentials {
    /// Select the credential for an access mode.
    pub fn for_mode(&self, mode: AccessMode) -> &Credential {
        match mode {
            AccessMode::Published => &self.published,
            AccessMode::Draft => &self.draft,
        }
    }
}
