//! Configuration management for PoolPrice
//!
//! Loads from optional config files + environment variables via .env

use anyhow::{bail, Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;
use std::time::Duration;

use crate::types::TokenMeta;

pub use crate::health::HealthConfig;
pub use crate::pricing::PricingConfig;

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub anchor: AnchorConfig,
    pub oracle: OracleConfig,
    pub graph: GraphConfig,
    pub pricing: PricingConfig,
    pub health: HealthConfig,
    pub inventory: InventoryConfig,
    pub logging: LoggingConfig,
}

/// The Bitcoin-pegged token every price is denominated through
#[derive(Debug, Clone, Deserialize)]
pub struct AnchorConfig {
    pub token_id: String,
    pub symbol: String,
    pub decimals: u8,
}

impl AnchorConfig {
    pub fn meta(&self) -> TokenMeta {
        TokenMeta::new(self.token_id.clone(), self.symbol.clone(), self.decimals)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct OracleConfig {
    /// Source names in priority order
    pub sources: Vec<String>,
    /// Per-source request timeout in milliseconds
    pub source_timeout_ms: u64,
    /// Oracle refresh interval in seconds
    pub refresh_interval_secs: u64,
    /// Readings older than this are treated as unavailable
    pub max_reading_age_secs: u64,
}

impl OracleConfig {
    pub fn source_timeout(&self) -> Duration {
        Duration::from_millis(self.source_timeout_ms)
    }

    pub fn max_reading_age(&self) -> Duration {
        Duration::from_secs(self.max_reading_age_secs)
    }
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            sources: vec![
                "binance".to_string(),
                "coinbase".to_string(),
                "bybit".to_string(),
                "coingecko".to_string(),
            ],
            source_timeout_ms: 4_000,
            refresh_interval_secs: 30,
            max_reading_age_secs: 300,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct GraphConfig {
    /// Longest path considered, in pools
    pub max_hops: usize,
    /// Candidate paths kept per token
    pub max_paths: usize,
    /// Partial paths kept per search level
    pub max_frontier: usize,
    /// Graph rebuild interval in seconds
    pub refresh_interval_secs: u64,
    /// Graph age after which it is reported stale
    pub staleness_threshold_secs: u64,
}

impl GraphConfig {
    pub fn staleness_threshold_ms(&self) -> i64 {
        (self.staleness_threshold_secs * 1000) as i64
    }
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            max_hops: 4,
            max_paths: 24,
            max_frontier: 20_000,
            refresh_interval_secs: 60,
            staleness_threshold_secs: 600,
        }
    }
}

/// Where pools and token metadata come from: HTTP endpoints or JSON files
#[derive(Debug, Clone, Deserialize)]
pub struct InventoryConfig {
    pub pools_url: Option<String>,
    pub tokens_url: Option<String>,
    pub pools_file: Option<String>,
    pub tokens_file: Option<String>,
    /// HTTP timeout in milliseconds
    pub timeout_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive when RUST_LOG is unset
    pub level: String,
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

impl AppConfig {
    /// Load configuration from file and environment
    pub fn load() -> Result<Self> {
        // Load .env file first
        dotenvy::dotenv().ok();

        let config = Config::builder()
            // Anchor defaults
            .set_default("anchor.token_id", "WBTC")?
            .set_default("anchor.symbol", "WBTC")?
            .set_default("anchor.decimals", 8)?
            // Oracle defaults
            .set_default("oracle.sources", vec!["binance", "coinbase", "bybit", "coingecko"])?
            .set_default("oracle.source_timeout_ms", 4000)?
            .set_default("oracle.refresh_interval_secs", 30)?
            .set_default("oracle.max_reading_age_secs", 300)?
            // Graph defaults
            .set_default("graph.max_hops", 4)?
            .set_default("graph.max_paths", 24)?
            .set_default("graph.max_frontier", 20000)?
            .set_default("graph.refresh_interval_secs", 60)?
            .set_default("graph.staleness_threshold_secs", 600)?
            // Pricing defaults
            .set_default("pricing.hop_penalty", 0.8)?
            .set_default("pricing.liquidity_boost_cap", 2.0)?
            .set_default("pricing.deep_liquidity_usd", 100000.0)?
            .set_default("pricing.outlier_threshold", 0.5)?
            .set_default("pricing.min_path_liquidity_usd", 100.0)?
            .set_default("pricing.recency_half_life_secs", 300)?
            .set_default("pricing.reference_liquidity_usd", 1000000.0)?
            .set_default("pricing.max_nesting_depth", 3)?
            .set_default("pricing.stale_graph_penalty", 0.5)?
            .set_default("pricing.cache_ttl_secs", 15)?
            // Health defaults
            .set_default("health.min_pools", 10)?
            .set_default("health.oracle_weight", 0.4)?
            .set_default("health.graph_weight", 0.35)?
            .set_default("health.coverage_weight", 0.25)?
            // Inventory defaults
            .set_default("inventory.timeout_ms", 10000)?
            // Logging defaults
            .set_default("logging.level", "info")?
            .set_default("logging.json", false)?
            // Load config file if exists
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            // Override with environment variables (POOLPRICE__*)
            .add_source(
                Environment::with_prefix("POOLPRICE")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("oracle.sources")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to build configuration")?;

        let app_config: AppConfig = config
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        app_config.validate()?;
        Ok(app_config)
    }

    /// Reject values the engine cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.anchor.token_id.trim().is_empty() {
            bail!("anchor.token_id must not be empty");
        }
        if self.oracle.sources.is_empty() {
            bail!("oracle.sources must name at least one source");
        }
        if self.graph.max_hops == 0 || self.graph.max_paths == 0 {
            bail!("graph.max_hops and graph.max_paths must be positive");
        }
        if !(0.0..=1.0).contains(&self.pricing.hop_penalty) || self.pricing.hop_penalty == 0.0 {
            bail!("pricing.hop_penalty must be in (0, 1]");
        }
        if self.pricing.liquidity_boost_cap < 1.0 {
            bail!("pricing.liquidity_boost_cap must be at least 1.0");
        }
        if self.pricing.outlier_threshold <= 0.0 {
            bail!("pricing.outlier_threshold must be positive");
        }
        let has_pools = self.inventory.pools_url.is_some() || self.inventory.pools_file.is_some();
        let has_tokens = self.inventory.tokens_url.is_some() || self.inventory.tokens_file.is_some();
        if !has_pools || !has_tokens {
            bail!("inventory must configure a pools and a tokens source (url or file)");
        }
        Ok(())
    }

    /// One-line summary for logging
    pub fn digest(&self) -> String {
        format!(
            "anchor={} sources={:?} max_hops={} max_paths={} outlier={:.2} stale_after={}s",
            self.anchor.token_id,
            self.oracle.sources,
            self.graph.max_hops,
            self.graph.max_paths,
            self.pricing.outlier_threshold,
            self.graph.staleness_threshold_secs
        )
    }
}

impl std::fmt::Display for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.digest())
    }
}
