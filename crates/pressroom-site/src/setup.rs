//! Post-deploy project setup.
//!
//! Wires a freshly deployed site into the CMS project: the web-previews
//! plugin learns where to ask for preview links, the SEO analysis plugin
//! where to fetch rendered pages, and a webhook starts invalidating the
//! cache on content changes. The three steps run concurrently and the
//! first failure wins.

use pressroom_core::Credential;
use serde_json::{Value, json};
use url::Url;

use crate::error::SiteError;
use crate::management::ManagementApi;

pub const WEB_PREVIEWS_PLUGIN: &str = "datocms-plugin-web-previews";
pub const SEO_ANALYSIS_PLUGIN: &str = "datocms-plugin-seo-readability-analysis";
pub const INVALIDATION_WEBHOOK_NAME: &str = "🔄 Invalidate Cache";

/// Field API key the SEO plugin attaches itself to.
const SEO_FIELD_API_KEY: &str = "seo_analysis";

/// Everything the installers need.
pub struct Setup<'a> {
    api: &'a dyn ManagementApi,
    token: Credential,
    frontend: Url,
    secret: &'a str,
}

impl<'a> Setup<'a> {
    pub fn new(
        api: &'a dyn ManagementApi,
        token: Credential,
        frontend_url: &str,
        secret: &'a str,
    ) -> Result<Self, SiteError> {
        let frontend = Url::parse(frontend_url)
            .map_err(|e| SiteError::invalid(format!("Invalid frontendUrl: {e}")))?;
        Ok(Self {
            api,
            token,
            frontend,
            secret,
        })
    }

    /// Absolute, token-carrying URL of one of this site's endpoints.
    pub fn callback_url(&self, path: &str) -> Result<String, SiteError> {
        let mut url = self
            .frontend
            .join(path)
            .map_err(|e| SiteError::invalid(format!("Invalid frontendUrl: {e}")))?;
        url.query_pairs_mut().append_pair("token", self.secret);
        Ok(url.to_string())
    }

    pub async fn run(&self) -> Result<(), SiteError> {
        tokio::try_join!(
            self.install_web_previews(),
            self.create_invalidation_webhook(),
            self.install_seo_analysis(),
        )?;
        tracing::info!(frontend = %self.frontend, "post-deploy setup complete");
        Ok(())
    }

    async fn install_web_previews(&self) -> Result<(), SiteError> {
        let plugin = self
            .api
            .create_plugin(&self.token, WEB_PREVIEWS_PLUGIN)
            .await?;
        let parameters = json!({
            "frontends": [{
                "name": "Production",
                "previewWebhook": self.callback_url("/preview-links")?,
            }],
            "startOpen": true,
        });
        self.api
            .update_plugin_parameters(&self.token, &plugin, parameters)
            .await
    }

    async fn install_seo_analysis(&self) -> Result<(), SiteError> {
        let plugin = self
            .api
            .create_plugin(&self.token, SEO_ANALYSIS_PLUGIN)
            .await?;
        let parameters = json!({
            "htmlGeneratorUrl": self.callback_url("/seo-analysis")?,
            "autoApplyToFieldsWithApiKey": SEO_FIELD_API_KEY,
            "setSeoReadabilityAnalysisFieldExtensionId": true,
        });
        self.api
            .update_plugin_parameters(&self.token, &plugin, parameters)
            .await
    }

    async fn create_invalidation_webhook(&self) -> Result<(), SiteError> {
        self.api
            .create_webhook(&self.token, self.webhook_attributes()?)
            .await
    }

    fn webhook_attributes(&self) -> Result<Value, SiteError> {
        Ok(json!({
            "name": INVALIDATION_WEBHOOK_NAME,
            "url": self.callback_url("/invalidate-cache")?,
            "custom_payload": null,
            "headers": {},
            "events": [{
                "filters": [],
                "entity_type": "cda_cache_tags",
                "event_types": ["invalidate"],
            }],
            "http_basic_user": null,
            "http_basic_password": null,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeManagement;

    #[tokio::test]
    async fn installs_everything() {
        let api = FakeManagement::default();
        let setup = Setup::new(&api, Credential::new("cma"), "https://site.example", "s3cret")
            .unwrap();
        setup.run().await.unwrap();

        let calls = api.calls();
        let plugins: Vec<_> = calls.iter().filter(|c| c.starts_with("create_plugin")).collect();
        assert_eq!(plugins.len(), 2);

        let previews = api.parameters(&format!("plugin-{WEB_PREVIEWS_PLUGIN}")).unwrap();
        assert_eq!(
            previews["frontends"][0]["previewWebhook"],
            "https://site.example/preview-links?token=s3cret"
        );
        assert_eq!(previews["startOpen"], true);

        let seo = api.parameters(&format!("plugin-{SEO_ANALYSIS_PLUGIN}")).unwrap();
        assert_eq!(
            seo["htmlGeneratorUrl"],
            "https://site.example/seo-analysis?token=s3cret"
        );

        let webhooks = api.webhooks();
        assert_eq!(webhooks.len(), 1);
        assert_eq!(
            webhooks[0]["url"],
            "https://site.example/invalidate-cache?token=s3cret"
        );
        assert_eq!(webhooks[0]["events"][0]["entity_type"], "cda_cache_tags");
    }

    #[tokio::test]
    async fn failure_is_reported() {
        let api = FakeManagement::failing();
        let setup = Setup::new(&api, Credential::new("cma"), "https://site.example", "s3cret")
            .unwrap();
        assert!(matches!(setup.run().await, Err(SiteError::Upstream { .. })));
    }

    #[test]
    fn bad_frontend_url_is_invalid() {
        let api = FakeManagement::default();
        let err = Setup::new(&api, Credential::new("cma"), "not a url", "s3cret")
            .err()
            .unwrap();
        assert!(matches!(err, SiteError::InvalidRequest(_)));
    }

    #[test]
    fn secret_is_url_encoded() {
        let api = FakeManagement::default();
        let setup =
            Setup::new(&api, Credential::new("cma"), "https://site.example/", "a&b").unwrap();
        assert_eq!(
            setup.callback_url("/invalidate-cache").unwrap(),
            "https://site.example/invalidate-cache?token=a%26b"
        );
    }
}
