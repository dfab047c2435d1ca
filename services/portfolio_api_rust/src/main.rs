//! Portfolio API Service
//!
//! HTTP surface over the pricing engine.
//!
//! This service:
//! - Reads the user's inventory from a Google Sheets CSV export
//! - Resolves a current price per item (Steam direct quotes, Skinport catalog)
//! - Derives profit metrics against the recorded purchase price
//! - Serves the valued portfolio as JSON
//!
//! Endpoints: `GET /health`, `GET /prices`.

use std::env;
use std::sync::Arc;

use actix_web::{get, web, App, HttpResponse, HttpServer, Responder};
use anyhow::{Context, Result};
use chrono::Utc;
use dotenv::dotenv;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use skinfolio_rust_core::catalog::CatalogCache;
use skinfolio_rust_core::clients::skinport::SKINPORT_MARKETPLACE_ID;
use skinfolio_rust_core::clients::{SheetCsvClient, SkinportClient, SteamMarketClient};
use skinfolio_rust_core::config::EngineConfig;
use skinfolio_rust_core::errors::InventoryError;
use skinfolio_rust_core::pipeline::FetchPipeline;
use skinfolio_rust_core::resolver::PriceResolver;

struct AppState {
    sheet: SheetCsvClient,
    pipeline: FetchPipeline,
}

#[get("/health")]
async fn health() -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "ok",
        "timestamp_utc": Utc::now().to_rfc3339(),
    }))
}

#[get("/prices")]
async fn prices(state: web::Data<AppState>) -> impl Responder {
    let items = match state.sheet.fetch_items().await {
        Ok(items) => items,
        Err(InventoryError::Empty) => {
            return HttpResponse::BadRequest().json(serde_json::json!({
                "detail": "inventory sheet has no usable rows",
            }));
        }
        Err(e) => {
            error!("inventory fetch failed: {e}");
            return HttpResponse::BadGateway().json(serde_json::json!({
                "detail": format!("failed to read inventory: {e}"),
            }));
        }
    };

    let priced = state.pipeline.resolve_all(&items).await;
    HttpResponse::Ok().json(priced)
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    info!("Starting Portfolio API Service...");

    let config = EngineConfig::from_env();

    let sheet_id =
        env::var("GOOGLE_SHEET_ID").context("GOOGLE_SHEET_ID must be set to the inventory sheet id")?;
    let sheet_name = env::var("SHEET_NAME").unwrap_or_else(|_| "items".to_string());
    let sheet = SheetCsvClient::new(&config, &sheet_id, &sheet_name);

    let steam = Arc::new(SteamMarketClient::new(&config));
    let skinport = Arc::new(SkinportClient::new(&config));

    let mut catalogs = CatalogCache::new(
        config.catalog_cache_ttl,
        config.catalog_fetch_retries,
        config.catalog_retry_base,
    );
    catalogs.register(skinport);

    let resolver = Arc::new(PriceResolver::new(
        steam,
        Arc::new(catalogs),
        SKINPORT_MARKETPLACE_ID,
        config.quote_cache_ttl,
    ));
    let pipeline = FetchPipeline::new(resolver, config.request_concurrency, config.request_delay);

    let state = web::Data::new(AppState { sheet, pipeline });

    let host = env::var("API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port: u16 = env::var("API_PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(8000);

    info!("Portfolio API listening on {host}:{port}");
    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .service(health)
            .service(prices)
    })
    .bind((host.as_str(), port))?
    .run()
    .await?;

    Ok(())
}
