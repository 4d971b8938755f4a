//! Frontend metadata endpoint for the SEO/readability analysis plugin.
//!
//! Looks the record up through the management API (in the sandbox
//! environment the editor is working in), renders its page in draft mode
//! in-process, and extracts what the plugin analyses from the markup.

use std::sync::LazyLock;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::Response;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::dispatch::{self, PageRoute};
use crate::envelope;
use crate::error::SiteError;
use crate::records::{self, website_route};
use crate::session::DraftSession;
use crate::state::AppState;

static LANG_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<html\b[^>]*\blang="([^"]*)""#).expect("lang regex should compile")
});

static TITLE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<title>(.*?)</title>").expect("title regex should compile"));

static DESCRIPTION_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<meta\b[^>]*\bname="description"[^>]*\bcontent="([^"]*)""#)
        .expect("description regex should compile")
});

static BODY_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<body\b[^>]*>(.*)</body>").expect("body regex should compile")
});

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeoQuery {
    token: Option<String>,
    item_id: Option<String>,
    item_type_id: Option<String>,
    item_type_api_key: Option<String>,
    locale: Option<String>,
    sandbox_environment_id: Option<String>,
}

/// Response body expected by the plugin.
#[derive(Debug, Serialize, PartialEq)]
pub struct SeoAnalysis {
    pub locale: String,
    pub slug: String,
    pub permalink: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub content: String,
}

fn unescape(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

fn capture<'h>(regex: &Regex, html: &'h str) -> Option<&'h str> {
    regex
        .captures(html)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}

/// Pull the analysed fields out of a rendered page.
pub fn extract(html: &str, slug: Option<String>, permalink: String) -> Result<SeoAnalysis, SiteError> {
    let content = capture(&BODY_REGEX, html)
        .ok_or_else(|| SiteError::invalid("No content found"))?
        .to_string();
    Ok(SeoAnalysis {
        locale: capture(&LANG_REGEX, html)
            .filter(|l| !l.is_empty())
            .unwrap_or("en")
            .to_string(),
        slug: slug.unwrap_or_else(|| "unknown".to_string()),
        permalink,
        title: capture(&TITLE_REGEX, html).map(unescape),
        description: capture(&DESCRIPTION_REGEX, html).map(unescape),
        content,
    })
}

fn required(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

/// `GET /seo-analysis?token=&itemId=&itemTypeId=&itemTypeApiKey=&locale=&sandboxEnvironmentId=`
pub async fn seo_analysis(
    State(state): State<AppState>,
    Query(query): Query<SeoQuery>,
) -> Result<Response, SiteError> {
    if !state.config.token_matches(query.token.as_deref()) {
        return Err(SiteError::Unauthorized);
    }

    let (Some(item_id), Some(item_type_id), Some(api_key), Some(locale), Some(environment)) = (
        required(&query.item_id),
        required(&query.item_type_id),
        required(&query.item_type_api_key),
        required(&query.locale),
        required(&query.sandbox_environment_id),
    ) else {
        return Err(SiteError::invalid("Missing required parameters"));
    };

    let cma_token = state
        .config
        .cma_token
        .as_ref()
        .ok_or_else(|| SiteError::Config("DATOCMS_CMA_TOKEN is not set".to_string()))?;

    let item = state
        .management
        .find_item(cma_token, Some(environment), item_id)
        .await?;

    let unroutable = || {
        SiteError::invalid(format!(
            "Don't know which route corresponds to record #{item_id} (model: {api_key})!"
        ))
    };
    let path = website_route(&item, api_key, locale).ok_or_else(unroutable)?;
    let (route, props) = PageRoute::resolve(&path).ok_or_else(unroutable)?;
    let slug = records::slug(&item, api_key, locale);

    let html = match dispatch::render(&state, route, props, DraftSession::DRAFT).await {
        Ok(markup) => markup.into_string(),
        Err(e) => {
            return Err(SiteError::invalid(format!(
                "Invalid status for {path}: {}",
                e.status().as_u16()
            )));
        }
    };

    tracing::debug!(
        item_id,
        item_type_id,
        environment,
        path = %path,
        "rendered page for seo analysis"
    );

    let analysis = extract(&html, slug, path)?;
    Ok(envelope::json(StatusCode::OK, analysis))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::routes::router;
    use crate::testing::{
        FakeContent, FakeLive, FakeManagement, body_json, test_config, test_state_with,
    };
    use axum::body::Body;
    use axum::http::Request;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    const QUERY: &str = "token=s3cret&itemId=A1&itemTypeId=JdG7&itemTypeApiKey=page&locale=en&sandboxEnvironmentId=sandbox";

    fn content() -> FakeContent {
        FakeContent::new()
            .with("SiteQuery", json!({ "_site": { "faviconMetaTags": [] } }))
            .with(
                "RealtimeUpdatesSlugPageQuery",
                json!({ "page": {
                    "title": "Hello & welcome",
                    "_seoMetaTags": [
                        { "tag": "title", "content": "Hello | Site" },
                        { "tag": "meta", "attributes": { "name": "description", "content": "A \"quoted\" page" } }
                    ]
                }}),
            )
    }

    fn management() -> FakeManagement {
        FakeManagement::default().with_item(json!({
            "id": "A1",
            "attributes": { "slug": "hello" },
            "meta": { "status": "updated" }
        }))
    }

    async fn get(config: Config, content: &FakeContent, management: &FakeManagement, query: &str) -> (StatusCode, Value) {
        let state = test_state_with(config, content, &FakeLive::default(), management);
        let response = router(state)
            .oneshot(
                Request::get(format!("/seo-analysis?{query}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        (response.status(), body_json(response).await)
    }

    #[tokio::test]
    async fn renders_draft_page_and_extracts_metadata() {
        let content = content();
        let management = management();
        let (status, body) = get(test_config(), &content, &management, QUERY).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["locale"], "en");
        assert_eq!(body["slug"], "hello");
        assert_eq!(body["permalink"], "/real-time-updates/hello");
        assert_eq!(body["title"], "Hello | Site");
        assert_eq!(body["description"], "A \"quoted\" page");
        assert!(body["content"].as_str().unwrap().contains("Hello &amp; welcome"));
        assert!(content.modes().iter().all(|m| *m == "draft"));
        assert_eq!(management.calls(), vec!["find_item A1 env=Some(\"sandbox\")"]);
    }

    #[tokio::test]
    async fn token_is_checked_before_parameters() {
        let (status, _) = get(test_config(), &content(), &management(), "token=nope").await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn missing_parameters_are_422() {
        let (status, body) = get(
            test_config(),
            &content(),
            &management(),
            "token=s3cret&itemId=A1&locale=en",
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"], "Missing required parameters");
    }

    #[tokio::test]
    async fn missing_cma_token_is_config_error() {
        let mut config = test_config();
        config.cma_token = None;
        let (status, body) = get(config, &content(), &management(), QUERY).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body["error"].as_str().unwrap().contains("DATOCMS_CMA_TOKEN"));
    }

    #[tokio::test]
    async fn unroutable_model_is_422() {
        let query = QUERY.replace("itemTypeApiKey=page", "itemTypeApiKey=author");
        let (status, body) = get(test_config(), &content(), &management(), &query).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(
            body["error"],
            "Don't know which route corresponds to record #A1 (model: author)!"
        );
    }

    #[tokio::test]
    async fn missing_page_is_invalid_status() {
        let content = content().with("RealtimeUpdatesSlugPageQuery", json!({ "page": null }));
        let (status, body) = get(test_config(), &content, &management(), QUERY).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"], "Invalid status for /real-time-updates/hello: 404");
    }

    #[test]
    fn extract_defaults() {
        let analysis = extract("<html><body><p>x</p></body></html>", None, "/p".to_string()).unwrap();
        assert_eq!(analysis.locale, "en");
        assert_eq!(analysis.slug, "unknown");
        assert_eq!(analysis.title, None);
        assert_eq!(analysis.content, "<p>x</p>");

        assert!(extract("<html></html>", None, "/p".to_string()).is_err());
    }
}
