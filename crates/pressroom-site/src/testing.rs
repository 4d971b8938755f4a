//! In-memory upstreams and fixtures shared by the handler tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::response::Response;
use http_body_util::BodyExt;
use pressroom_core::{Credential, Credentials, QueryDescriptor};
use pressroom_live::{Error as LiveError, Feed, LiveSource, Subscription};
use serde_json::Value;

use crate::config::Config;
use crate::error::SiteError;
use crate::gateway::ContentApi;
use crate::management::ManagementApi;
use crate::records::Record;
use crate::session::COOKIE_NAME;
use crate::state::AppState;

pub fn test_config() -> Config {
    Config {
        bind_addr: "127.0.0.1:0".to_string(),
        base_url: "http://localhost:3000".to_string(),
        secret_api_token: "s3cret".to_string(),
        credentials: Credentials {
            published: Credential::new("pub"),
            draft: Credential::new("draft"),
        },
        base_editing_url: "https://acme.admin.datocms.com".to_string(),
        cma_token: Some(Credential::new("cma")),
        cda_url: "http://127.0.0.1:9/".to_string(),
        listen_url: "http://127.0.0.1:9/listen".to_string(),
        cma_url: "http://127.0.0.1:9".to_string(),
        environment: None,
        metrics_port: None,
    }
}

pub fn test_state(content: &FakeContent) -> AppState {
    test_state_with(
        test_config(),
        content,
        &FakeLive::default(),
        &FakeManagement::default(),
    )
}

pub fn test_state_with(
    config: Config,
    content: &FakeContent,
    live: &FakeLive,
    management: &FakeManagement,
) -> AppState {
    AppState::with_services(
        config,
        Arc::new(content.clone()),
        Arc::new(live.clone()),
        Arc::new(management.clone()),
    )
    .unwrap()
}

/// `Cookie` header value carrying a valid draft session.
pub fn draft_cookie(state: &AppState) -> String {
    format!("{COOKIE_NAME}={}", state.session_key.enable().value)
}

pub async fn body_bytes(response: Response) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .unwrap()
        .to_bytes()
        .to_vec()
}

pub async fn body_json(response: Response) -> Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

pub async fn body_text(response: Response) -> String {
    String::from_utf8(body_bytes(response).await).unwrap()
}

/// Delivery API answering from fixtures keyed by query name.
#[derive(Clone, Default)]
pub struct FakeContent {
    fixtures: Arc<Mutex<HashMap<String, Value>>>,
    modes: Arc<Mutex<Vec<&'static str>>>,
}

impl FakeContent {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(self, query_name: &str, data: Value) -> Self {
        self.fixtures
            .lock()
            .unwrap()
            .insert(query_name.to_string(), data);
        self
    }

    pub fn calls(&self) -> usize {
        self.modes.lock().unwrap().len()
    }

    /// Access mode of every fetch, in call order.
    pub fn modes(&self) -> Vec<&'static str> {
        self.modes.lock().unwrap().clone()
    }
}

#[async_trait]
impl ContentApi for FakeContent {
    async fn fetch(&self, descriptor: &QueryDescriptor) -> Result<Value, SiteError> {
        self.modes.lock().unwrap().push(descriptor.mode().as_str());
        let name = descriptor.document().name;
        self.fixtures
            .lock()
            .unwrap()
            .get(name)
            .cloned()
            .ok_or_else(|| SiteError::upstream(Some(400), format!("no fixture for {name}")))
    }
}

/// Live source whose feeds the test drives by hand.
#[derive(Clone, Default)]
pub struct FakeLive {
    feeds: Arc<Mutex<Vec<Feed>>>,
    subscribed: Arc<Mutex<Vec<(&'static str, bool)>>>,
    refuse: bool,
}

impl FakeLive {
    /// A source whose channel can never be opened.
    pub fn refusing() -> Self {
        Self {
            refuse: true,
            ..Self::default()
        }
    }

    /// Take the producer half of the oldest open subscription.
    pub fn take_feed(&self) -> Option<Feed> {
        let mut feeds = self.feeds.lock().unwrap();
        (!feeds.is_empty()).then(|| feeds.remove(0))
    }

    /// Query name and draft flag of every subscription request.
    pub fn subscribed(&self) -> Vec<(&'static str, bool)> {
        self.subscribed.lock().unwrap().clone()
    }
}

#[async_trait]
impl LiveSource for FakeLive {
    async fn subscribe(&self, descriptor: &QueryDescriptor) -> pressroom_live::Result<Subscription> {
        self.subscribed
            .lock()
            .unwrap()
            .push((descriptor.document().name, descriptor.is_draft()));
        if self.refuse {
            return Err(LiveError::Channel(503));
        }
        let (feed, subscription) = Subscription::channel(8);
        self.feeds.lock().unwrap().push(feed);
        Ok(subscription)
    }
}

/// Management API recording every call.
#[derive(Clone, Default)]
pub struct FakeManagement {
    items: Arc<Mutex<HashMap<String, Value>>>,
    calls: Arc<Mutex<Vec<String>>>,
    parameters: Arc<Mutex<HashMap<String, Value>>>,
    webhooks: Arc<Mutex<Vec<Value>>>,
    fail: bool,
}

impl FakeManagement {
    /// Every call fails with an upstream error.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// Serve `record` (JSON:API form) from `find_item`.
    pub fn with_item(self, record: Value) -> Self {
        let id = record["id"].as_str().unwrap_or_default().to_string();
        self.items.lock().unwrap().insert(id, record);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn parameters(&self, plugin_id: &str) -> Option<Value> {
        self.parameters.lock().unwrap().get(plugin_id).cloned()
    }

    pub fn webhooks(&self) -> Vec<Value> {
        self.webhooks.lock().unwrap().clone()
    }

    fn record(&self, call: String) -> Result<(), SiteError> {
        self.calls.lock().unwrap().push(call);
        if self.fail {
            return Err(SiteError::upstream(Some(401), "invalid API token"));
        }
        Ok(())
    }
}

#[async_trait]
impl ManagementApi for FakeManagement {
    async fn find_item(
        &self,
        _token: &Credential,
        environment: Option<&str>,
        item_id: &str,
    ) -> Result<Record, SiteError> {
        self.record(format!("find_item {item_id} env={environment:?}"))?;
        let item = self.items.lock().unwrap().get(item_id).cloned();
        match item {
            Some(item) => Ok(serde_json::from_value(item).map_err(anyhow::Error::from)?),
            None => Err(SiteError::upstream(Some(404), "item not found")),
        }
    }

    async fn create_plugin(
        &self,
        _token: &Credential,
        package_name: &str,
    ) -> Result<String, SiteError> {
        self.record(format!("create_plugin {package_name}"))?;
        Ok(format!("plugin-{package_name}"))
    }

    async fn update_plugin_parameters(
        &self,
        _token: &Credential,
        plugin_id: &str,
        parameters: Value,
    ) -> Result<(), SiteError> {
        self.record(format!("update_plugin_parameters {plugin_id}"))?;
        self.parameters
            .lock()
            .unwrap()
            .insert(plugin_id.to_string(), parameters);
        Ok(())
    }

    async fn create_webhook(&self, _token: &Credential, attributes: Value) -> Result<(), SiteError> {
        self.record("create_webhook".to_string())?;
        self.webhooks.lock().unwrap().push(attributes);
        Ok(())
    }
}
