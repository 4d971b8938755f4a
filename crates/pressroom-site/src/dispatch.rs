//! Route dispatch shim.
//!
//! Every CMS-backed page goes through [`render`]. With a published session
//! the gateway result is rendered straight to HTML. With a draft session on
//! a live route the same snapshot is rendered, wrapped in a live container
//! whose serialized [`LiveProps`] the browser hands back to `/live` to
//! start receiving updates.
//!
//! ```text
//!                    ┌─ SiteQuery ─┐
//! PageProps ─render─▶│             ├─▶ try_join ─▶ published: static page
//!                    └─ PageQuery ─┘              draft+live: snapshot + LiveProps
//! ```

use std::collections::HashMap;

use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use maud::{Markup, html};
use pressroom_core::{QueryDescriptor, QueryDocument};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::SiteError;
use crate::queries;
use crate::render::components::{self, LIVE_JS, Shell, page_shell, seo_tags};
use crate::render::content::RecordLinks;
use crate::render::render_fragment;
use crate::session::DraftSession;
use crate::state::AppState;

/// `<title>` used when neither the site nor the page provides one.
pub const FALLBACK_TITLE: &str = "DatoCMS + Rust Starter Kit";

/// CMS-backed pages served by the site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PageRoute {
    /// `/basic`
    Basic,
    /// `/basic/page/{slug}`
    BasicSlug,
    /// `/real-time-updates`
    RealtimeUpdates,
    /// `/real-time-updates/{slug}`
    RealtimeUpdatesSlug,
}

impl PageRoute {
    pub fn document(self) -> QueryDocument {
        match self {
            Self::Basic => queries::BASIC_PAGE,
            Self::BasicSlug => queries::BASIC_SLUG_PAGE,
            Self::RealtimeUpdates => queries::REALTIME_PAGE,
            Self::RealtimeUpdatesSlug => queries::REALTIME_SLUG_PAGE,
        }
    }

    /// Where record links inside this page's content point.
    pub fn links(self) -> RecordLinks {
        match self {
            Self::Basic | Self::RealtimeUpdates => RecordLinks::Home,
            Self::BasicSlug => RecordLinks::Prefix("/basic/page/"),
            Self::RealtimeUpdatesSlug => RecordLinks::Prefix("/real-time-updates/"),
        }
    }

    /// Whether draft visitors get live updates on this route.
    pub fn is_live(self) -> bool {
        matches!(self, Self::RealtimeUpdates | Self::RealtimeUpdatesSlug)
    }

    /// Match a site path to its route and path parameters.
    pub fn resolve(path: &str) -> Option<(Self, PageProps)> {
        let segments: Vec<&str> = path.trim_matches('/').split('/').collect();
        match segments.as_slice() {
            ["basic"] => Some((Self::Basic, PageProps::default())),
            ["basic", "page", slug] if !slug.is_empty() => {
                Some((Self::BasicSlug, PageProps::default().with_param("slug", *slug)))
            }
            ["real-time-updates"] => Some((Self::RealtimeUpdates, PageProps::default())),
            ["real-time-updates", slug] if !slug.is_empty() => Some((
                Self::RealtimeUpdatesSlug,
                PageProps::default().with_param("slug", *slug),
            )),
            _ => None,
        }
    }
}

/// Everything the router knows about a page request.
#[derive(Debug, Clone, Default)]
pub struct PageProps {
    /// Path parameters, used as query variables.
    pub params: Map<String, Value>,
    /// Raw query-string parameters. Request-only, never crosses to `/live`.
    pub search_params: HashMap<String, String>,
}

impl PageProps {
    pub fn with_param(mut self, name: &str, value: impl Into<String>) -> Self {
        self.params.insert(name.to_string(), Value::String(value.into()));
        self
    }
}

/// The serializable part of [`PageProps`] handed to the live endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiveProps {
    pub route: PageRoute,
    #[serde(default)]
    pub params: Map<String, Value>,
}

impl LiveProps {
    pub fn new(route: PageRoute, props: &PageProps) -> Self {
        Self {
            route,
            params: props.params.clone(),
        }
    }

    /// Descriptor of the page query these props select.
    pub fn descriptor(&self, draft: bool) -> QueryDescriptor {
        QueryDescriptor::new(self.route.document(), self.params.clone(), draft)
    }
}

/// Render a CMS-backed page for the given session.
pub async fn render(
    state: &AppState,
    route: PageRoute,
    props: PageProps,
    session: DraftSession,
) -> Result<Markup, SiteError> {
    let draft = session.is_draft();
    let live = LiveProps::new(route, &props);
    let site = QueryDescriptor::new(queries::SITE, Map::new(), draft);
    let page = live.descriptor(draft);

    let (site_data, page_data) =
        tokio::try_join!(state.gateway.execute(&site), state.gateway.execute(&page))?;

    let fragment = render_fragment(&page_data, route.links(), draft)?;
    let mut tags = seo_tags(site_data.pointer("/_site/faviconMetaTags"));
    tags.extend(seo_tags(page_data.pointer("/page/_seoMetaTags")));

    let streaming = draft && route.is_live();
    let body = if streaming {
        let encoded = serde_json::to_string(&live).map_err(anyhow::Error::from)?;
        html! {
            div class="live" data-live-props=(encoded) { (fragment.markup) }
        }
    } else {
        fragment.markup
    };

    tracing::debug!(route = ?route, draft, streaming, "page rendered");

    Ok(page_shell(
        Shell {
            tags: &tags,
            fallback_title: FALLBACK_TITLE,
            draft,
            regions: draft.then_some(fragment.regions.as_slice()),
            script: streaming.then_some(LIVE_JS),
        },
        body,
    ))
}

/// Build an HTTP response with HTML content and security/cache headers.
///
/// Draft pages are never stored by shared caches.
pub fn html_response(markup: Markup, draft: bool) -> Response {
    let html = markup.into_string();
    let mut headers = HeaderMap::new();

    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/html; charset=utf-8"),
    );
    headers.insert(
        header::CONTENT_SECURITY_POLICY,
        HeaderValue::from_static(components::CSP_HEADER),
    );
    headers.insert(
        header::X_CONTENT_TYPE_OPTIONS,
        HeaderValue::from_static("nosniff"),
    );
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static(if draft {
            "private, no-store"
        } else {
            "public, max-age=0, must-revalidate"
        }),
    );

    // ETag (xxHash of content)
    let hash = xxhash_rust::xxh3::xxh3_64(html.as_bytes());
    let etag = format!("\"{}\"", hex_fmt::HexFmt(&hash.to_be_bytes()));
    if let Ok(val) = HeaderValue::from_str(&etag) {
        headers.insert(header::ETAG, val);
    }

    (StatusCode::OK, headers, html).into_response()
}
