//! Direct-quote client for the Steam community market.
//!
//! The price overview endpoint does exact-name, single-item lookups, so the
//! raw (non-normalized) name goes on the wire. Responses carry display
//! strings, not numbers; a median price when the item trades enough, a
//! lowest listing otherwise.

use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use crate::config::EngineConfig;
use crate::utils::parse_price_str;

const PRICE_OVERVIEW_URL: &str = "https://steamcommunity.com/market/priceoverview/";

/// An upstream offering exact-name, single-item price lookups.
///
/// `Ok(None)` means the upstream answered but has no quote for the item;
/// `Err` means the call itself failed. The resolver treats both as a soft
/// "no quote".
#[async_trait]
pub trait DirectQuoteClient: Send + Sync {
    /// Source name for logging and debugging.
    fn source_name(&self) -> &str;

    async fn quote(&self, item_name: &str) -> Result<Option<f64>>;
}

#[derive(Debug, Deserialize)]
struct PriceOverviewResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    median_price: Option<String>,
    #[serde(default)]
    lowest_price: Option<String>,
}

impl PriceOverviewResponse {
    /// Prefer the median (typical) value, fall back to the lowest listing.
    /// An empty median field does not shadow a usable lowest price.
    fn representative_price(&self) -> Option<f64> {
        self.median_price
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .or(self.lowest_price.as_deref())
            .and_then(parse_price_str)
    }
}

#[derive(Clone)]
pub struct SteamMarketClient {
    client: Client,
    base_url: String,
    app_id: u32,
    currency_code: u32,
}

impl std::fmt::Debug for SteamMarketClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SteamMarketClient")
            .field("app_id", &self.app_id)
            .field("currency_code", &self.currency_code)
            .finish()
    }
}

impl SteamMarketClient {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            client: Client::builder()
                .timeout(config.request_timeout)
                .user_agent(&config.user_agent)
                .build()
                .unwrap_or_else(|_| Client::new()),
            base_url: PRICE_OVERVIEW_URL.to_string(),
            app_id: config.steam_app_id,
            currency_code: config.steam_currency_code,
        }
    }

    /// Point the client at a different endpoint (integration testing).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[async_trait]
impl DirectQuoteClient for SteamMarketClient {
    fn source_name(&self) -> &str {
        "steam"
    }

    async fn quote(&self, item_name: &str) -> Result<Option<f64>> {
        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("appid", self.app_id.to_string()),
                ("market_hash_name", item_name.to_string()),
                ("currency", self.currency_code.to_string()),
                ("format", "json".to_string()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            debug!(
                "steam price overview for {:?} returned {}",
                item_name,
                response.status()
            );
            return Ok(None);
        }

        let body: PriceOverviewResponse = response.json().await?;
        if !body.success {
            debug!("steam price overview for {:?} unsuccessful", item_name);
            return Ok(None);
        }

        Ok(body.representative_price())
    }
}
