//! Query execution gateway.
//!
//! Every content query goes through [`Gateway::execute`]: the descriptor's
//! access mode picks the credential and delivery headers, and the result is
//! stored in the tagged cache so the invalidation webhook can drop it.
//! Failures surface as [`SiteError::Upstream`] and are never retried here.

use std::sync::Arc;

use async_trait::async_trait;
use pressroom_core::metrics::increment;
use pressroom_core::{CACHE_TAG, Credentials, QueryDescriptor};
use reqwest::header::AUTHORIZATION;
use serde::Deserialize;
use serde_json::Value;

use crate::cache::TaggedCache;
use crate::config::Config;
use crate::error::SiteError;

/// The content delivery API, as the gateway sees it.
#[async_trait]
pub trait ContentApi: Send + Sync {
    /// Run the query and return the response's `data` member.
    async fn fetch(&self, descriptor: &QueryDescriptor) -> Result<Value, SiteError>;
}

/// GraphQL delivery API over HTTP.
#[derive(Debug, Clone)]
pub struct HttpContentApi {
    http: reqwest::Client,
    endpoint: String,
    credentials: Credentials,
    base_editing_url: String,
    environment: Option<String>,
}

#[derive(Deserialize)]
struct GraphQlResponse {
    #[serde(default)]
    data: Option<Value>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

#[derive(Deserialize)]
struct GraphQlError {
    message: String,
}

impl HttpContentApi {
    pub fn new(http: reqwest::Client, config: &Config) -> Self {
        Self {
            http,
            endpoint: config.cda_url.clone(),
            credentials: config.credentials.clone(),
            base_editing_url: config.base_editing_url.clone(),
            environment: config.environment.clone(),
        }
    }
}

#[async_trait]
impl ContentApi for HttpContentApi {
    async fn fetch(&self, descriptor: &QueryDescriptor) -> Result<Value, SiteError> {
        let credential = self.credentials.for_mode(descriptor.mode());
        let mut request = self
            .http
            .post(&self.endpoint)
            .header(AUTHORIZATION, format!("Bearer {}", credential.expose()))
            .json(&descriptor.request_body());
        for (name, value) in
            descriptor.delivery_headers(&self.base_editing_url, self.environment.as_deref())
        {
            request = request.header(name, value);
        }

        let response = request
            .send()
            .await
            .map_err(|e| SiteError::upstream(None, e.to_string()))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| SiteError::upstream(Some(status.as_u16()), e.to_string()))?;

        if !status.is_success() {
            return Err(SiteError::upstream(Some(status.as_u16()), body));
        }

        let parsed: GraphQlResponse = serde_json::from_str(&body)
            .map_err(|e| SiteError::upstream(Some(status.as_u16()), e.to_string()))?;

        if !parsed.errors.is_empty() {
            let message = parsed
                .errors
                .iter()
                .map(|e| e.message.as_str())
                .collect::<Vec<_>>()
                .join("; ");
            return Err(SiteError::upstream(Some(status.as_u16()), message));
        }

        Ok(parsed.data.unwrap_or(Value::Null))
    }
}

/// Cached, mode-aware query execution.
#[derive(Clone)]
pub struct Gateway {
    api: Arc<dyn ContentApi>,
    cache: TaggedCache,
}

impl Gateway {
    pub fn new(api: Arc<dyn ContentApi>, cache: TaggedCache) -> Self {
        Self { api, cache }
    }

    /// Execute a query, answering from the cache when possible.
    pub async fn execute(&self, descriptor: &QueryDescriptor) -> Result<Arc<Value>, SiteError> {
        let mode = descriptor.mode();
        metrics::counter!("gateway_requests_total", "mode" => mode.as_str()).increment(1);

        let key = descriptor.fingerprint();
        if let Some(entry) = self.cache.get(key).await {
            tracing::debug!(
                query = descriptor.document().name,
                mode = %mode,
                cached_at = %entry.cached_at,
                "cache hit"
            );
            increment("gateway_cache_hits_total", 1);
            return Ok(entry.data);
        }

        tracing::debug!(query = descriptor.document().name, mode = %mode, "cache miss, querying");
        let generation = self.cache.generation();
        let data = match self.api.fetch(descriptor).await {
            Ok(data) => Arc::new(data),
            Err(e) => {
                increment("gateway_upstream_errors_total", 1);
                return Err(e);
            }
        };

        if !self
            .cache
            .insert(key, mode.cache_tag(), data.clone(), generation)
            .await
        {
            tracing::debug!(
                query = descriptor.document().name,
                "cache invalidated during fetch, result not stored"
            );
        }
        Ok(data)
    }

    /// Drop every cached response.
    pub fn invalidate(&self) -> Result<(), SiteError> {
        self.cache.invalidate_tag(CACHE_TAG)?;
        increment("cache_invalidations_total", 1);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeContent, test_config};
    use axum::{
        Json, Router,
        http::{HeaderMap, StatusCode},
        response::IntoResponse,
        routing::post,
    };
    use pressroom_core::QueryDocument;
    use serde_json::{Map, json};
    use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};
    use tokio::sync::Notify;

    const DOC: QueryDocument = QueryDocument {
        name: "PageQuery",
        source: "query PageQuery { page { title } }",
    };

    fn gateway(content: &FakeContent) -> Gateway {
        Gateway::new(Arc::new(content.clone()), TaggedCache::default())
    }

    #[tokio::test]
    async fn second_execution_is_cached() {
        let content = FakeContent::new().with("PageQuery", json!({"page": {"title": "Hi"}}));
        let gateway = gateway(&content);
        let descriptor = QueryDescriptor::new(DOC, Map::new(), false);

        let first = gateway.execute(&descriptor).await.unwrap();
        let second = gateway.execute(&descriptor).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(content.calls(), 1);
    }

    #[tokio::test]
    async fn modes_are_cached_separately() {
        let content = FakeContent::new().with("PageQuery", json!({"page": null}));
        let gateway = gateway(&content);
        let published = QueryDescriptor::new(DOC, Map::new(), false);
        let draft = QueryDescriptor::new(DOC, Map::new(), true);

        gateway.execute(&published).await.unwrap();
        gateway.execute(&draft).await.unwrap();
        assert_eq!(content.calls(), 2);
        assert_eq!(content.modes(), vec!["published", "draft"]);
    }

    #[tokio::test]
    async fn invalidation_forces_refetch() {
        let content = FakeContent::new().with("PageQuery", json!({"page": null}));
        let gateway = gateway(&content);
        let descriptor = QueryDescriptor::new(DOC, Map::new(), false);

        gateway.execute(&descriptor).await.unwrap();
        gateway.invalidate().unwrap();
        gateway.execute(&descriptor).await.unwrap();
        assert_eq!(content.calls(), 2);
    }

    /// Content API whose first fetch blocks until released.
    struct GatedContent {
        title: std::sync::Mutex<&'static str>,
        calls: AtomicUsize,
        entered: Notify,
        release: Notify,
    }

    #[async_trait]
    impl ContentApi for GatedContent {
        async fn fetch(&self, _: &QueryDescriptor) -> Result<Value, SiteError> {
            let title = *self.title.lock().unwrap();
            if self.calls.fetch_add(1, AtomicOrdering::SeqCst) == 0 {
                self.entered.notify_one();
                self.release.notified().await;
            }
            Ok(json!({ "page": { "title": title } }))
        }
    }

    #[tokio::test]
    async fn fetch_in_flight_during_invalidation_is_not_cached() {
        let content = Arc::new(GatedContent {
            title: std::sync::Mutex::new("old"),
            calls: AtomicUsize::new(0),
            entered: Notify::new(),
            release: Notify::new(),
        });
        let gateway = Gateway::new(content.clone(), TaggedCache::default());
        let descriptor = QueryDescriptor::new(DOC, Map::new(), false);

        let first = tokio::spawn({
            let gateway = gateway.clone();
            let descriptor = descriptor.clone();
            async move { gateway.execute(&descriptor).await }
        });
        content.entered.notified().await;

        *content.title.lock().unwrap() = "new";
        gateway.invalidate().unwrap();
        content.release.notify_one();
        let stale = first.await.unwrap().unwrap();
        assert_eq!(stale["page"]["title"], "old");

        let fresh = gateway.execute(&descriptor).await.unwrap();
        assert_eq!(fresh["page"]["title"], "new");
        assert_eq!(content.calls.load(AtomicOrdering::SeqCst), 2);
    }

    #[tokio::test]
    async fn upstream_errors_are_not_cached() {
        let content = FakeContent::new();
        let gateway = gateway(&content);
        let descriptor = QueryDescriptor::new(DOC, Map::new(), false);

        assert!(matches!(
            gateway.execute(&descriptor).await,
            Err(SiteError::Upstream { .. })
        ));
        assert!(gateway.execute(&descriptor).await.is_err());
        assert_eq!(content.calls(), 2);
    }

    async fn graphql_handler(headers: HeaderMap, Json(body): Json<Value>) -> impl IntoResponse {
        let auth = headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        let drafts = headers.contains_key("x-include-drafts");
        let editing = headers
            .get("x-base-editing-url")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        if body["query"] == "query Broken { nope }" {
            return Json(json!({"errors": [{"message": "Field 'nope' doesn't exist"}]}))
                .into_response();
        }
        if auth == "Bearer nobody" {
            return (StatusCode::UNAUTHORIZED, "bad token").into_response();
        }
        Json(json!({"data": {"auth": auth, "drafts": drafts, "editing": editing}})).into_response()
    }

    async fn spawn_cda() -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}/", listener.local_addr().unwrap());
        let app = Router::new().route("/", post(graphql_handler));
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        url
    }

    #[tokio::test]
    async fn http_api_selects_credential_by_mode() {
        let mut config = test_config();
        config.cda_url = spawn_cda().await;
        let api = HttpContentApi::new(reqwest::Client::new(), &config);

        let published = api
            .fetch(&QueryDescriptor::new(DOC, Map::new(), false))
            .await
            .unwrap();
        assert_eq!(published["auth"], "Bearer pub");
        assert_eq!(published["drafts"], false);
        assert_eq!(published["editing"], Value::Null);

        let draft = api
            .fetch(&QueryDescriptor::new(DOC, Map::new(), true))
            .await
            .unwrap();
        assert_eq!(draft["auth"], "Bearer draft");
        assert_eq!(draft["drafts"], true);
        assert_eq!(draft["editing"], config.base_editing_url.as_str());
    }

    #[tokio::test]
    async fn http_api_surfaces_graphql_errors() {
        let mut config = test_config();
        config.cda_url = spawn_cda().await;
        let api = HttpContentApi::new(reqwest::Client::new(), &config);
        const BROKEN: QueryDocument = QueryDocument {
            name: "Broken",
            source: "query Broken { nope }",
        };

        let err = api
            .fetch(&QueryDescriptor::new(BROKEN, Map::new(), false))
            .await
            .unwrap_err();
        match err {
            SiteError::Upstream { status, message } => {
                assert_eq!(status, Some(200));
                assert!(message.contains("nope"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn http_api_surfaces_status() {
        let mut config = test_config();
        config.cda_url = spawn_cda().await;
        config.credentials.published = pressroom_core::Credential::new("nobody");
        let api = HttpContentApi::new(reqwest::Client::new(), &config);

        let err = api
            .fetch(&QueryDescriptor::new(DOC, Map::new(), false))
            .await
            .unwrap_err();
        assert!(matches!(err, SiteError::Upstream { status: Some(401), .. }));
    }
}
