//! Catalog fetcher for the Skinport marketplace.
//!
//! One call returns the full tradable listing for an app, which the engine
//! caches and searches locally. Failures are classified for the cache's
//! retry policy: server-side trouble is worth retrying, client errors and
//! unusable payloads are not.

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use crate::catalog::{CatalogEntry, CatalogFetchError, CatalogFetcher};
use crate::config::EngineConfig;

pub const SKINPORT_MARKETPLACE_ID: &str = "skinport";

#[derive(Clone)]
pub struct SkinportClient {
    client: Client,
    base_url: String,
    app_id: u32,
    currency: String,
}

impl std::fmt::Debug for SkinportClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SkinportClient")
            .field("base_url", &self.base_url)
            .field("app_id", &self.app_id)
            .field("currency", &self.currency)
            .finish()
    }
}

impl SkinportClient {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            client: Client::builder()
                .timeout(config.request_timeout)
                .user_agent(&config.user_agent)
                .build()
                .unwrap_or_else(|_| Client::new()),
            base_url: config.skinport_api_base.clone(),
            app_id: config.steam_app_id,
            currency: config.catalog_currency.clone(),
        }
    }

    /// Point the client at a different endpoint (integration testing).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[async_trait]
impl CatalogFetcher for SkinportClient {
    fn marketplace_id(&self) -> &str {
        SKINPORT_MARKETPLACE_ID
    }

    async fn fetch_catalog(&self) -> Result<Vec<CatalogEntry>, CatalogFetchError> {
        let url = format!("{}/items", self.base_url.trim_end_matches('/'));
        debug!("fetching skinport catalog from {url}");

        let response = self
            .client
            .get(&url)
            .query(&[
                ("app_id", self.app_id.to_string()),
                ("currency", self.currency.clone()),
                ("tradable", "1".to_string()),
            ])
            .send()
            .await
            .map_err(|e| CatalogFetchError::Transient(e.to_string()))?;

        let status = response.status();
        if status.is_server_error() {
            return Err(CatalogFetchError::Transient(format!("HTTP {status}")));
        }
        if !status.is_success() {
            return Err(CatalogFetchError::Permanent(format!("HTTP {status}")));
        }

        response
            .json::<Vec<CatalogEntry>>()
            .await
            .map_err(|e| CatalogFetchError::Permanent(format!("unexpected payload: {e}")))
    }
}
