//! Previews webhook for the web-previews plugin.
//!
//! The plugin posts the record being edited; we answer with links that
//! pass through the draft-mode toggles before landing on the record's page.

use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::Response;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::envelope;
use crate::error::SiteError;
use crate::records::{ItemType, Record, RecordStatus, website_route};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct TokenQuery {
    token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PreviewRequest {
    item: Record,
    item_type: ItemType,
    locale: String,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct PreviewLink {
    pub label: &'static str,
    pub url: String,
}

#[derive(Debug, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct PreviewLinks {
    pub preview_links: Vec<PreviewLink>,
}

/// Absolute URL of one of this site's endpoints with query parameters.
fn site_url(base_url: &str, path: &str, params: &[(&str, &str)]) -> Result<String, SiteError> {
    let mut url = Url::parse(base_url)
        .and_then(|base| base.join(path))
        .map_err(|e| SiteError::Config(format!("invalid base URL {base_url}: {e}")))?;
    url.query_pairs_mut().extend_pairs(params);
    Ok(url.to_string())
}

/// Links for `record`, draft version first.
///
/// A record whose status is not `published` has a draft version; one whose
/// status is not `draft` has a published version.
pub fn build_links(
    base_url: &str,
    secret: &str,
    record: &Record,
    path: &str,
) -> Result<PreviewLinks, SiteError> {
    let status = record.status();
    let mut links = PreviewLinks::default();

    if status != Some(RecordStatus::Published) {
        links.preview_links.push(PreviewLink {
            label: "Draft version",
            url: site_url(
                base_url,
                "/draft-mode/enable",
                &[("url", path), ("token", secret)],
            )?,
        });
    }
    if status != Some(RecordStatus::Draft) {
        links.preview_links.push(PreviewLink {
            label: "Published version",
            url: site_url(base_url, "/draft-mode/disable", &[("url", path)])?,
        });
    }
    Ok(links)
}

/// `POST /preview-links?token=`
///
/// The token is checked before the body is parsed.
pub async fn preview_links(
    State(state): State<AppState>,
    Query(query): Query<TokenQuery>,
    body: Bytes,
) -> Result<Response, SiteError> {
    if !state.config.token_matches(query.token.as_deref()) {
        return Err(SiteError::Unauthorized);
    }
    let request: PreviewRequest = serde_json::from_slice(&body)
        .map_err(|e| SiteError::invalid(format!("Invalid request body: {e}")))?;
    let model = &request.item_type.attributes.api_key;

    let links = match website_route(&request.item, model, &request.locale) {
        Some(path) => build_links(
            &state.config.base_url,
            &state.config.secret_api_token,
            &request.item,
            &path,
        )?,
        None => PreviewLinks::default(),
    };

    tracing::debug!(
        item_id = %request.item.id,
        model = %model,
        links = links.preview_links.len(),
        "preview links generated"
    );
    Ok(envelope::json(StatusCode::OK, links))
}
