//! Application state shared across all request handlers.

use std::sync::Arc;
use std::time::Duration;

use pressroom_live::{ListenClient, ListenConfig, LiveSource};

use crate::cache::{DEFAULT_CACHE_CAPACITY, TaggedCache};
use crate::config::Config;
use crate::gateway::{ContentApi, Gateway, HttpContentApi};
use crate::management::{HttpManagementApi, ManagementApi};
use crate::session::SessionKey;

/// Timeout for one-shot upstream requests (delivery and management APIs).
///
/// Live channels are long-lived and use their own client without one.
const UPSTREAM_TIMEOUT: Duration = Duration::from_secs(30);

/// Shared application state available to all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Arc<Config>,

    /// Cached query execution against the delivery API.
    pub gateway: Gateway,

    /// Opens live-update subscriptions for draft pages.
    pub live: Arc<dyn LiveSource>,

    /// Management API, for SEO analysis and post-deploy setup.
    pub management: Arc<dyn ManagementApi>,

    /// Signs and verifies the draft session cookie.
    pub session_key: Arc<SessionKey>,
}

impl AppState {
    /// Create a new application state from configuration.
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(UPSTREAM_TIMEOUT)
            .user_agent(concat!("pressroom-site/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let content = HttpContentApi::new(http.clone(), &config);
        let management = HttpManagementApi::new(http, config.cma_url.clone());

        let mut listen = ListenConfig::new(
            config.credentials.clone(),
            config.base_editing_url.clone(),
        );
        listen.listen_url = config.listen_url.clone();
        listen.environment = config.environment.clone();
        let live = ListenClient::new(listen);

        tracing::info!(
            cache_capacity = DEFAULT_CACHE_CAPACITY,
            upstream_timeout_secs = UPSTREAM_TIMEOUT.as_secs(),
            "application state initialized"
        );

        Self::with_services(
            config,
            Arc::new(content),
            Arc::new(live),
            Arc::new(management),
        )
    }

    /// Assemble state around explicit upstream implementations.
    pub fn with_services(
        config: Config,
        content: Arc<dyn ContentApi>,
        live: Arc<dyn LiveSource>,
        management: Arc<dyn ManagementApi>,
    ) -> anyhow::Result<Self> {
        let session_key = SessionKey::new(&config.secret_api_token)?;
        Ok(Self {
            config: Arc::new(config),
            gateway: Gateway::new(content, TaggedCache::new(DEFAULT_CACHE_CAPACITY)),
            live,
            management,
            session_key: Arc::new(session_key),
        })
    }
}
