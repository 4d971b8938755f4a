//! CMS-backed page handlers.
//!
//! Each handler reads the verified draft session, collects its path and
//! query parameters into [`PageProps`] and hands off to the dispatch shim.

use std::collections::HashMap;

use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::response::Response;

use crate::dispatch::{self, PageProps, PageRoute, html_response};
use crate::error::SiteError;
use crate::state::AppState;

async fn serve(
    state: &AppState,
    headers: &HeaderMap,
    route: PageRoute,
    props: PageProps,
) -> Result<Response, SiteError> {
    let session = state.session_key.read(headers);
    let markup = dispatch::render(state, route, props, session).await?;
    Ok(html_response(markup, session.is_draft()))
}

fn props(search_params: HashMap<String, String>) -> PageProps {
    PageProps {
        search_params,
        ..PageProps::default()
    }
}

pub async fn basic(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(search): Query<HashMap<String, String>>,
) -> Result<Response, SiteError> {
    serve(&state, &headers, PageRoute::Basic, props(search)).await
}

pub async fn basic_slug(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(slug): Path<String>,
    Query(search): Query<HashMap<String, String>>,
) -> Result<Response, SiteError> {
    let props = props(search).with_param("slug", slug);
    serve(&state, &headers, PageRoute::BasicSlug, props).await
}

pub async fn realtime_updates(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(search): Query<HashMap<String, String>>,
) -> Result<Response, SiteError> {
    serve(&state, &headers, PageRoute::RealtimeUpdates, props(search)).await
}

pub async fn realtime_updates_slug(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(slug): Path<String>,
    Query(search): Query<HashMap<String, String>>,
) -> Result<Response, SiteError> {
    let props = props(search).with_param("slug", slug);
    serve(&state, &headers, PageRoute::RealtimeUpdatesSlug, props).await
}

#[cfg(test)]
mod tests {
    use crate::routes::router;
    use crate::testing::{FakeContent, body_text, draft_cookie, test_state};
    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};
    use serde_json::json;
    use tower::ServiceExt;

    fn content() -> FakeContent {
        FakeContent::new()
            .with("SiteQuery", json!({ "_site": { "faviconMetaTags": [] } }))
            .with("BasicSlugPageQuery", json!({ "page": null }))
            .with(
                "RealtimeUpdatesSlugPageQuery",
                json!({ "page": { "title": "Hello", "_seoMetaTags": [] } }),
            )
    }

    #[tokio::test]
    async fn published_page_is_static_and_cacheable() {
        let content = content();
        let app = router(test_state(&content));
        let response = app
            .oneshot(
                Request::get("/real-time-updates/hello?preview=1")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CACHE_CONTROL],
            "public, max-age=0, must-revalidate"
        );
        let html = body_text(response).await;
        assert!(html.contains("<h1>Hello</h1>"));
        assert!(!html.contains("data-live-props"));
    }

    #[tokio::test]
    async fn draft_cookie_selects_live_render() {
        let content = content();
        let state = test_state(&content);
        let cookie = draft_cookie(&state);
        let response = router(state)
            .oneshot(
                Request::get("/real-time-updates/hello")
                    .header(header::COOKIE, cookie)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.headers()[header::CACHE_CONTROL], "private, no-store");
        let html = body_text(response).await;
        assert!(html.contains("data-live-props"));
        assert!(content.modes().iter().all(|m| *m == "draft"));
    }

    #[tokio::test]
    async fn forged_cookie_reads_as_published() {
        let content = content();
        let response = router(test_state(&content))
            .oneshot(
                Request::get("/real-time-updates/hello")
                    .header(header::COOKIE, "pressroom_draft=1")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(content.modes().iter().all(|m| *m == "published"));
    }

    #[tokio::test]
    async fn missing_record_renders_not_found_page() {
        let response = router(test_state(&content()))
            .oneshot(Request::get("/basic/page/nope").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(body_text(response).await.contains("Not Found"));
    }

    #[tokio::test]
    async fn upstream_failure_is_envelope() {
        let response = router(test_state(&FakeContent::new()))
            .oneshot(Request::get("/basic").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body_text(response).await.contains("\"success\":false"));
    }
}
