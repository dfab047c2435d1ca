//! Engine configuration from environment variables.
//!
//! Every tunable has a default so the engine runs with an empty environment;
//! the service binary loads `.env` before calling `from_env`.

use std::env;
use std::str::FromStr;
use std::time::Duration;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Application/catalog id shared by both upstreams (730 = CS2).
    pub steam_app_id: u32,
    /// Numeric currency code for the direct-quote upstream (20 = CAD).
    pub steam_currency_code: u32,
    /// Base URL of the catalog upstream.
    pub skinport_api_base: String,
    /// ISO alphabetic currency code for the catalog upstream.
    pub catalog_currency: String,
    /// TTL for per-item quote cache entries.
    pub quote_cache_ttl: Duration,
    /// TTL for full catalog snapshots.
    pub catalog_cache_ttl: Duration,
    /// Maximum concurrent in-flight resolutions.
    pub request_concurrency: usize,
    /// Pacing delay applied after a concurrency slot is acquired, before the
    /// first upstream call.
    pub request_delay: Duration,
    /// Maximum catalog fetch attempts for retriable failures.
    pub catalog_fetch_retries: u32,
    /// Base backoff between catalog fetch attempts (multiplied by the
    /// attempt number).
    pub catalog_retry_base: Duration,
    /// Per-request timeout toward either upstream.
    pub request_timeout: Duration,
    pub user_agent: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            steam_app_id: 730,
            steam_currency_code: 20,
            skinport_api_base: "https://api.skinport.com/v1".to_string(),
            catalog_currency: "CAD".to_string(),
            quote_cache_ttl: Duration::from_secs(6 * 3600),
            catalog_cache_ttl: Duration::from_secs(3600),
            request_concurrency: 4,
            request_delay: Duration::from_millis(500),
            catalog_fetch_retries: 3,
            catalog_retry_base: Duration::from_millis(250),
            request_timeout: Duration::from_secs(15),
            user_agent: "skinfolio-backend/1.0".to_string(),
        }
    }
}

impl EngineConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            steam_app_id: env_parse("STEAM_APPID", defaults.steam_app_id),
            steam_currency_code: env_parse("STEAM_CURRENCY_CODE", defaults.steam_currency_code),
            skinport_api_base: env::var("SKINPORT_API_BASE")
                .unwrap_or(defaults.skinport_api_base),
            catalog_currency: env::var("CATALOG_CURRENCY").unwrap_or(defaults.catalog_currency),
            quote_cache_ttl: Duration::from_secs(env_parse(
                "CACHE_TTL_SECONDS",
                defaults.quote_cache_ttl.as_secs(),
            )),
            catalog_cache_ttl: Duration::from_secs(env_parse(
                "CATALOG_TTL_SECONDS",
                defaults.catalog_cache_ttl.as_secs(),
            )),
            request_concurrency: env_parse("REQUEST_CONCURRENCY", defaults.request_concurrency)
                .max(1),
            request_delay: Duration::from_secs_f64(env_parse(
                "REQUEST_DELAY",
                defaults.request_delay.as_secs_f64(),
            )),
            catalog_fetch_retries: env_parse(
                "CATALOG_FETCH_RETRIES",
                defaults.catalog_fetch_retries,
            )
            .max(1),
            catalog_retry_base: Duration::from_millis(env_parse(
                "CATALOG_RETRY_BASE_MS",
                defaults.catalog_retry_base.as_millis() as u64,
            )),
            request_timeout: Duration::from_secs(env_parse(
                "REQUEST_TIMEOUT_SECONDS",
                defaults.request_timeout.as_secs(),
            )),
            user_agent: env::var("USER_AGENT").unwrap_or(defaults.user_agent),
        }
    }
}

/// Parse an env var, falling back to the default on absence or parse failure.
fn env_parse<T: FromStr + Copy>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("ignoring unparseable {}={:?}", key, raw);
            default
        }),
        Err(_) => default,
    }
}
