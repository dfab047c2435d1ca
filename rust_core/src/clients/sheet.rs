//! Inventory collaborator: a public Google Sheets CSV export.
//!
//! The engine does not own the inventory; it reads whatever the sheet says.
//! Rows are re-fetched at most once per minute so a burst of pricing calls
//! doesn't hammer the export endpoint.

use parking_lot::RwLock;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, info};

use crate::cache::CacheRecord;
use crate::config::EngineConfig;
use crate::errors::InventoryError;
use crate::inventory::parse_inventory_csv;
use crate::types::InventoryItem;

const ROWS_CACHE_TTL: Duration = Duration::from_secs(60);

pub struct SheetCsvClient {
    client: Client,
    export_url: String,
    rows_cache: RwLock<Option<CacheRecord<Vec<InventoryItem>>>>,
}

impl std::fmt::Debug for SheetCsvClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SheetCsvClient")
            .field("export_url", &self.export_url)
            .finish()
    }
}

impl SheetCsvClient {
    /// Build a client for the public CSV export of a sheet tab. Works for
    /// sheets shared as "anyone with the link can view".
    pub fn new(config: &EngineConfig, sheet_id: &str, sheet_name: &str) -> Self {
        let export_url = format!(
            "https://docs.google.com/spreadsheets/d/{sheet_id}/export?format=csv&sheet={sheet_name}"
        );
        Self::from_export_url(config, export_url)
    }

    /// Point the client at an arbitrary CSV URL (integration testing).
    pub fn from_export_url(config: &EngineConfig, export_url: impl Into<String>) -> Self {
        Self {
            client: Client::builder()
                .timeout(config.request_timeout)
                .user_agent(&config.user_agent)
                .redirect(reqwest::redirect::Policy::limited(5))
                .build()
                .unwrap_or_else(|_| Client::new()),
            export_url: export_url.into(),
            rows_cache: RwLock::new(None),
        }
    }

    /// Fetch and parse the inventory. Fails only for the batch-fatal
    /// conditions: export unreachable, unreadable, or zero usable rows.
    pub async fn fetch_items(&self) -> Result<Vec<InventoryItem>, InventoryError> {
        if let Some(rows) = self.cached_rows() {
            debug!("serving cached inventory rows");
            return usable(rows);
        }

        let response = self
            .client
            .get(&self.export_url)
            .send()
            .await
            .map_err(|e| InventoryError::Fetch(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(InventoryError::Fetch(format!("HTTP {status}")));
        }

        let text = response
            .text()
            .await
            .map_err(|e| InventoryError::Fetch(e.to_string()))?;

        let items = parse_inventory_csv(&text)?;
        info!("inventory export yielded {} usable rows", items.len());
        // A zero-row outcome is cached like any other so a rowless sheet is
        // not re-fetched on every request within the TTL.
        *self.rows_cache.write() = Some(CacheRecord::new(items.clone(), ROWS_CACHE_TTL));
        usable(items)
    }

    fn cached_rows(&self) -> Option<Vec<InventoryItem>> {
        self.rows_cache
            .read()
            .as_ref()
            .filter(|record| record.is_fresh())
            .map(|record| record.value.clone())
    }
}

fn usable(items: Vec<InventoryItem>) -> Result<Vec<InventoryItem>, InventoryError> {
    if items.is_empty() {
        Err(InventoryError::Empty)
    } else {
        Ok(items)
    }
}
