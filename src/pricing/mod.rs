//! Price Calculator
//!
//! Prices any token in the liquidity graph against the anchor:
//! - bounded path search to the anchor
//! - per-path implied price and weight (hops, recency, depth)
//! - median outlier filter, weighted aggregate, confidence score
//! - nested valuation for pool-share tokens
//!
//! [`Valuator`] is the pure core; [`PriceCalculator`] binds it to the live
//! graph store and oracle and caches results.

mod cache;
mod confidence;
mod outliers;
mod paths;
mod pool_share;
mod valuation;

pub use cache::PriceCache;
pub use outliers::{lower_median, remove_outliers};
pub use paths::{evaluate_path, PathQuote};
pub use valuation::Valuator;

use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::config::GraphConfig;
use crate::error::PricingError;
use crate::graph::{GraphStore, LiquidityGraph, PriceBook};
use crate::oracle::ReferenceOracle;
use crate::types::{OracleReading, PriceResult, TokenId};

#[derive(Debug, Clone, Deserialize)]
pub struct PricingConfig {
    /// Weight multiplier per hop beyond the first
    pub hop_penalty: f64,
    /// Maximum liquidity boost applied to a path weight
    pub liquidity_boost_cap: f64,
    /// Path liquidity (USD) at which the boost reaches its cap
    pub deep_liquidity_usd: f64,
    /// Maximum relative deviation from the median before a path is dropped
    pub outlier_threshold: f64,
    /// Paths with known liquidity below this are discarded
    pub min_path_liquidity_usd: f64,
    /// Reserve age at which a path's recency factor halves
    pub recency_half_life_secs: u64,
    /// Total path liquidity that earns full depth confidence
    pub reference_liquidity_usd: f64,
    /// Pool-share nesting limit
    pub max_nesting_depth: usize,
    /// Confidence multiplier applied when the graph is stale
    pub stale_graph_penalty: f64,
    /// Price cache TTL (0 disables the cache)
    pub cache_ttl_secs: u64,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            hop_penalty: 0.8,
            liquidity_boost_cap: 2.0,
            deep_liquidity_usd: 100_000.0,
            outlier_threshold: 0.5,
            min_path_liquidity_usd: 100.0,
            recency_half_life_secs: 300,
            reference_liquidity_usd: 1_000_000.0,
            max_nesting_depth: 3,
            stale_graph_penalty: 0.5,
            cache_ttl_secs: 15,
        }
    }
}

/// Prices tokens against the currently published graph and anchor reading
pub struct PriceCalculator {
    graphs: Arc<GraphStore>,
    oracle: Arc<ReferenceOracle>,
    pricing: PricingConfig,
    search: GraphConfig,
    cache: PriceCache,
}

impl PriceCalculator {
    pub fn new(
        graphs: Arc<GraphStore>,
        oracle: Arc<ReferenceOracle>,
        pricing: PricingConfig,
        search: GraphConfig,
    ) -> Self {
        let cache = PriceCache::new(pricing.cache_ttl_secs);
        Self {
            graphs,
            oracle,
            pricing,
            search,
            cache,
        }
    }

    pub fn calculate_price(&self, token: &TokenId) -> Result<PriceResult, PricingError> {
        self.calculate_price_at(token, chrono::Utc::now().timestamp_millis())
    }

    pub fn calculate_price_at(&self, token: &TokenId, now: i64) -> Result<PriceResult, PricingError> {
        // Stamp before snapshot: a swap in between only costs a cache miss later
        let stamp = (self.graphs.generation(), self.oracle.generation());
        if let Some(hit) = self.cache.get(token, stamp, now) {
            debug!(token = %token, "Price cache hit");
            return Ok(hit);
        }

        let graph = self.graphs.snapshot();
        let anchor = self.oracle.anchor_at(now);
        let result = Valuator::new(&graph, anchor.reading.as_ref(), &self.pricing, &self.search, now)
            .with_oracle_failures(anchor.consecutive_failures)
            .price(token)?;

        self.cache.insert(result.clone(), stamp, now);
        Ok(result)
    }

    /// Price several tokens. Identifiers unknown to the graph are skipped.
    pub fn calculate_multiple(&self, tokens: &[TokenId]) -> HashMap<TokenId, PriceResult> {
        let now = chrono::Utc::now().timestamp_millis();
        let mut results = HashMap::with_capacity(tokens.len());
        for token in tokens {
            if results.contains_key(token) {
                continue;
            }
            match self.calculate_price_at(token, now) {
                Ok(result) => {
                    results.insert(token.clone(), result);
                }
                Err(e) => warn!(token = %token, error = %e, "Skipping token in batch"),
            }
        }
        results
    }

    /// Price every token of `graph` without touching the cache.
    /// Used to seed the liquidity estimates of the next build.
    pub fn price_graph(&self, graph: &LiquidityGraph, anchor: Option<&OracleReading>, now: i64) -> PriceBook {
        let valuator = Valuator::new(graph, anchor, &self.pricing, &self.search, now);
        graph
            .get_all_tokens()
            .into_iter()
            .filter_map(|token| valuator.price(token).ok().map(|r| (token.clone(), r)))
            .collect()
    }

    pub fn invalidate(&self) {
        self.cache.clear();
    }

    pub fn cached_entries(&self) -> usize {
        self.cache.len()
    }
}
