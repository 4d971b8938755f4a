//! Application configuration loaded from environment variables.

use anyhow::{Context, bail};
use hmac::{Hmac, Mac};
use pressroom_core::{Credential, Credentials};
use sha2::Sha256;

/// Key for the digests shared-secret checks compare.
const TOKEN_CHECK_KEY: &[u8] = b"pressroom:token-check";

/// Default delivery (GraphQL) endpoint.
pub const DEFAULT_CDA_URL: &str = "https://graphql.datocms.com/";

/// Default management API endpoint.
pub const DEFAULT_CMA_URL: &str = "https://site-api.datocms.com";

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server bind address (e.g., "0.0.0.0:3000").
    pub bind_addr: String,

    /// Public base URL of this site, used for absolute preview links and
    /// plugin callback URLs. No trailing slash.
    pub base_url: String,

    /// Shared secret gating draft mode and every webhook endpoint.
    pub secret_api_token: String,

    /// Published/draft delivery credentials.
    pub credentials: Credentials,

    /// Base editing URL sent upstream so draft text carries edit links.
    pub base_editing_url: String,

    /// Management API token, needed by SEO analysis.
    pub cma_token: Option<Credential>,

    /// Delivery API endpoint.
    pub cda_url: String,

    /// Real-time API handshake endpoint.
    pub listen_url: String,

    /// Management API endpoint.
    pub cma_url: String,

    /// Optional environment override sent with every delivery request.
    pub environment: Option<String>,

    /// Port for the Prometheus `/metrics` server, when enabled.
    pub metrics_port: Option<u16>,
}

/// Read a variable that must be present and non-empty.
fn required(name: &str) -> anyhow::Result<String> {
    match std::env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value.trim().to_string()),
        _ => bail!("missing required environment variable {name}"),
    }
}

fn optional(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Required:
    /// - `SECRET_API_TOKEN`: Shared secret for draft mode and webhooks
    /// - `DATOCMS_PUBLISHED_CONTENT_CDA_TOKEN`: Published-content credential
    /// - `DATOCMS_DRAFT_CONTENT_CDA_TOKEN`: Draft-content credential
    /// - `DATOCMS_BASE_EDITING_URL`: Base editing URL for edit-location tokens
    ///
    /// Optional:
    /// - `DATOCMS_CMA_TOKEN`: Management API token (SEO analysis)
    /// - `PRESSROOM_BIND_ADDR`: Server bind address (default: "0.0.0.0:3000")
    /// - `PRESSROOM_BASE_URL`: Public base URL (default: "http://localhost:3000")
    /// - `DATOCMS_CDA_URL`, `DATOCMS_LISTEN_URL`, `DATOCMS_CMA_URL`: API endpoints
    /// - `DATOCMS_ENVIRONMENT`: Environment override
    /// - `PRESSROOM_METRICS_PORT`: Enables the Prometheus metrics server
    pub fn from_env() -> anyhow::Result<Self> {
        let secret_api_token = required("SECRET_API_TOKEN")?;
        let credentials = Credentials {
            published: Credential::new(required("DATOCMS_PUBLISHED_CONTENT_CDA_TOKEN")?),
            draft: Credential::new(required("DATOCMS_DRAFT_CONTENT_CDA_TOKEN")?),
        };
        let base_editing_url = required("DATOCMS_BASE_EDITING_URL")?
            .trim_end_matches('/')
            .to_string();

        let cma_token = optional("DATOCMS_CMA_TOKEN").map(Credential::new);

        let bind_addr =
            optional("PRESSROOM_BIND_ADDR").unwrap_or_else(|| "0.0.0.0:3000".to_string());

        let base_url = optional("PRESSROOM_BASE_URL")
            .unwrap_or_else(|| "http://localhost:3000".to_string())
            .trim_end_matches('/')
            .to_string();

        let cda_url = optional("DATOCMS_CDA_URL").unwrap_or_else(|| DEFAULT_CDA_URL.to_string());
        let listen_url = optional("DATOCMS_LISTEN_URL")
            .unwrap_or_else(|| pressroom_live::client::DEFAULT_LISTEN_URL.to_string());
        let cma_url = optional("DATOCMS_CMA_URL")
            .unwrap_or_else(|| DEFAULT_CMA_URL.to_string())
            .trim_end_matches('/')
            .to_string();
        let environment = optional("DATOCMS_ENVIRONMENT");

        let metrics_port = optional("PRESSROOM_METRICS_PORT")
            .map(|p| p.parse::<u16>())
            .transpose()
            .context("PRESSROOM_METRICS_PORT must be a port number")?;

        if cma_token.is_none() {
            tracing::warn!("DATOCMS_CMA_TOKEN not set, /seo-analysis will fail");
        }

        tracing::info!(
            bind_addr = %bind_addr,
            base_url = %base_url,
            base_editing_url = %base_editing_url,
            cda_url = %cda_url,
            listen_url = %listen_url,
            environment = environment.as_deref().unwrap_or("primary"),
            cma_token = cma_token.is_some(),
            metrics_port = ?metrics_port,
            "site configuration loaded"
        );

        Ok(Self {
            bind_addr,
            base_url,
            secret_api_token,
            credentials,
            base_editing_url,
            cma_token,
            cda_url,
            listen_url,
            cma_url,
            environment,
            metrics_port,
        })
    }

    /// Check a caller-supplied token against the shared secret.
    ///
    /// Both sides are reduced to HMAC digests and compared in constant time.
    pub fn token_matches(&self, token: Option<&str>) -> bool {
        let Some(token) = token else {
            return false;
        };
        let (Ok(mut candidate), Ok(mut expected)) = (
            Hmac::<Sha256>::new_from_slice(TOKEN_CHECK_KEY),
            Hmac::<Sha256>::new_from_slice(TOKEN_CHECK_KEY),
        ) else {
            return false;
        };
        candidate.update(token.as_bytes());
        expected.update(self.secret_api_token.as_bytes());
        candidate
            .verify_slice(&expected.finalize().into_bytes())
            .is_ok()
    }
}
