//! Management API client.
//!
//! Only the handful of calls the site makes: reading a record for SEO
//! analysis, and installing plugins and webhooks after a deploy. Requests
//! and responses use the JSON:API envelope `{"data": {...}}`.

use async_trait::async_trait;
use pressroom_core::Credential;
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use serde_json::{Value, json};

use crate::error::SiteError;
use crate::records::Record;

const JSON_API: &str = "application/vnd.api+json";

/// Management API operations used by the site.
#[async_trait]
pub trait ManagementApi: Send + Sync {
    /// Fetch one record, including unpublished changes.
    async fn find_item(
        &self,
        token: &Credential,
        environment: Option<&str>,
        item_id: &str,
    ) -> Result<Record, SiteError>;

    /// Install a plugin from the marketplace; returns its ID.
    async fn create_plugin(&self, token: &Credential, package_name: &str)
    -> Result<String, SiteError>;

    /// Replace a plugin's parameters.
    async fn update_plugin_parameters(
        &self,
        token: &Credential,
        plugin_id: &str,
        parameters: Value,
    ) -> Result<(), SiteError>;

    /// Create a webhook from its attributes.
    async fn create_webhook(&self, token: &Credential, attributes: Value) -> Result<(), SiteError>;
}

/// Management API over HTTP.
#[derive(Debug, Clone)]
pub struct HttpManagementApi {
    http: reqwest::Client,
    base_url: String,
}

impl HttpManagementApi {
    pub fn new(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn request(
        &self,
        method: reqwest::Method,
        path: &str,
        token: &Credential,
        environment: Option<&str>,
    ) -> reqwest::RequestBuilder {
        let mut request = self
            .http
            .request(method, format!("{}{path}", self.base_url))
            .header(AUTHORIZATION, format!("Bearer {}", token.expose()))
            .header(ACCEPT, JSON_API)
            .header(CONTENT_TYPE, JSON_API)
            .header("X-Api-Version", "3");
        if let Some(environment) = environment {
            request = request.header("X-Environment", environment);
        }
        request
    }

    /// Send a request and return the `data` member of the response.
    async fn send(&self, request: reqwest::RequestBuilder) -> Result<Value, SiteError> {
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
        if body.trim().is_empty() {
            return Ok(Value::Null);
        }

        let mut parsed: Value = serde_json::from_str(&body)
            .map_err(|e| SiteError::upstream(Some(status.as_u16()), e.to_string()))?;
        Ok(parsed.get_mut("data").map(Value::take).unwrap_or(Value::Null))
    }
}

#[async_trait]
impl ManagementApi for HttpManagementApi {
    async fn find_item(
        &self,
        token: &Credential,
        environment: Option<&str>,
        item_id: &str,
    ) -> Result<Record, SiteError> {
        let request = self
            .request(
                reqwest::Method::GET,
                &format!("/items/{item_id}"),
                token,
                environment,
            )
            .query(&[("version", "current")]);
        let data = self.send(request).await?;
        serde_json::from_value(data)
            .map_err(|e| SiteError::upstream(None, format!("unexpected item payload: {e}")))
    }

    async fn create_plugin(
        &self,
        token: &Credential,
        package_name: &str,
    ) -> Result<String, SiteError> {
        let request = self
            .request(reqwest::Method::POST, "/plugins", token, None)
            .json(&json!({
                "data": {
                    "type": "plugin",
                    "attributes": { "package_name": package_name },
                }
            }));
        let data = self.send(request).await?;
        data.get("id")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| SiteError::upstream(None, "plugin created without an id"))
    }

    async fn update_plugin_parameters(
        &self,
        token: &Credential,
        plugin_id: &str,
        parameters: Value,
    ) -> Result<(), SiteError> {
        let request = self
            .request(
                reqwest::Method::PUT,
                &format!("/plugins/{plugin_id}"),
                token,
                None,
            )
            .json(&json!({
                "data": {
                    "type": "plugin",
                    "id": plugin_id,
                    "attributes": { "parameters": parameters },
                }
            }));
        self.send(request).await.map(|_| ())
    }

    async fn create_webhook(&self, token: &Credential, attributes: Value) -> Result<(), SiteError> {
        let request = self
            .request(reqwest::Method::POST, "/webhooks", token, None)
            .json(&json!({
                "data": { "type": "webhook", "attributes": attributes }
            }));
        self.send(request).await.map(|_| ())
    }
}
