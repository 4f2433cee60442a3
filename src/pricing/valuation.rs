//! Single-token valuation over one graph snapshot and one anchor reading

use tracing::debug;

use super::confidence;
use super::outliers::remove_outliers;
use super::paths::{evaluate_path, PathQuote};
use super::PricingConfig;
use crate::config::GraphConfig;
use crate::error::PricingError;
use crate::graph::LiquidityGraph;
use crate::types::{CalculationDetail, OracleReading, PriceResult, PriceWarning, PricingMethod, TokenId};

/// Pure valuation context. Holds borrowed inputs only, so one instance can
/// price any number of tokens against a consistent snapshot.
pub struct Valuator<'a> {
    pub(super) graph: &'a LiquidityGraph,
    pub(super) anchor: Option<&'a OracleReading>,
    pub(super) pricing: &'a PricingConfig,
    search: &'a GraphConfig,
    oracle_failures: u32,
    pub(super) now: i64,
}

impl<'a> Valuator<'a> {
    pub fn new(
        graph: &'a LiquidityGraph,
        anchor: Option<&'a OracleReading>,
        pricing: &'a PricingConfig,
        search: &'a GraphConfig,
        now: i64,
    ) -> Self {
        Self {
            graph,
            anchor,
            pricing,
            search,
            oracle_failures: 0,
            now,
        }
    }

    /// Failed oracle cycles since the reading was taken. Any failure
    /// degrades every result to zero confidence.
    pub fn with_oracle_failures(mut self, failures: u32) -> Self {
        self.oracle_failures = failures;
        self
    }

    /// Price one token. Only an identifier unknown to the graph is an error;
    /// every other failure comes back as a degraded result.
    pub fn price(&self, token: &TokenId) -> Result<PriceResult, PricingError> {
        let mut visiting = Vec::new();
        let mut result = self.price_nested(token, 0, &mut visiting)?;
        if self.oracle_failures > 0 {
            result.confidence = 0.0;
            if !result.detail.has_warning(|w| *w == PriceWarning::OracleUnavailable) {
                result.detail.warnings.push(PriceWarning::OracleUnavailable);
            }
        }
        Ok(result)
    }

    pub(super) fn price_nested(
        &self,
        token: &TokenId,
        depth: usize,
        visiting: &mut Vec<TokenId>,
    ) -> Result<PriceResult, PricingError> {
        if token == self.graph.anchor() {
            return Ok(self.price_anchor(token));
        }
        if !self.graph.contains(token) {
            return Err(PricingError::InvalidToken(token.to_string()));
        }
        if let Some(pool) = self.graph.share_pool(token) {
            return Ok(self.value_share(token, pool, depth, visiting));
        }
        Ok(self.price_via_paths(token))
    }

    /// Identity law: the anchor is worth exactly the oracle reading
    fn price_anchor(&self, token: &TokenId) -> PriceResult {
        match self.anchor {
            Some(reading) => PriceResult {
                token: token.clone(),
                usd_price: reading.price,
                confidence: reading.confidence,
                timestamp: self.now,
                detail: CalculationDetail::new(PricingMethod::Anchor, Some(reading)),
            },
            None => PriceResult::unresolved(
                token.clone(),
                self.now,
                None,
                vec![PriceWarning::OracleUnavailable],
            ),
        }
    }

    pub(super) fn stale_warning(&self) -> Option<PriceWarning> {
        let age_ms = self.graph.age_ms(self.now);
        (age_ms > self.search.staleness_threshold_ms()).then_some(PriceWarning::GraphStale { age_ms })
    }

    fn unresolved(&self, token: &TokenId, mut warnings: Vec<PriceWarning>, paths_found: usize) -> PriceResult {
        if let Some(stale) = self.stale_warning() {
            warnings.push(stale);
        }
        let mut result = PriceResult::unresolved(token.clone(), self.now, self.anchor, warnings);
        result.detail.paths_found = paths_found;
        result
    }

    fn price_via_paths(&self, token: &TokenId) -> PriceResult {
        let Some(reading) = self.anchor else {
            return self.unresolved(token, vec![PriceWarning::OracleUnavailable], 0);
        };

        let paths = self.graph.find_paths_bounded(
            token,
            self.search.max_hops,
            self.search.max_paths,
            self.search.max_frontier,
        );
        let paths_found = paths.len();

        let quotes: Vec<PathQuote> = paths
            .iter()
            .filter_map(|p| evaluate_path(p, reading.price, self.now, self.pricing))
            .collect();
        if quotes.is_empty() {
            return self.unresolved(token, vec![PriceWarning::NoPathFound], paths_found);
        }

        let floor = self.pricing.min_path_liquidity_usd;
        let best_liquidity_usd = quotes
            .iter()
            .filter(|q| q.liquidity_known)
            .map(|q| q.liquidity_usd)
            .fold(0.0, f64::max);
        let liquid: Vec<PathQuote> = quotes
            .into_iter()
            .filter(|q| !q.liquidity_known || q.liquidity_usd >= floor)
            .collect();
        if liquid.is_empty() {
            return self.unresolved(
                token,
                vec![PriceWarning::InsufficientLiquidity { best_liquidity_usd }],
                paths_found,
            );
        }

        let (kept, removed) = remove_outliers(liquid, self.pricing.outlier_threshold);
        let Some(usd_price) = confidence::weighted_price(&kept) else {
            return self.unresolved(token, vec![PriceWarning::NoPathFound], paths_found);
        };

        let mut detail = CalculationDetail::new(PricingMethod::Paths, Some(reading));
        detail.paths_found = paths_found;
        detail.paths_used = kept.len();
        detail.outliers_removed = removed;
        detail.total_liquidity_usd = confidence::total_liquidity(&kept);
        if removed > 0 {
            detail.warnings.push(PriceWarning::OutliersRemoved { count: removed });
        }
        if kept.iter().any(|q| !q.liquidity_known) {
            detail.warnings.push(PriceWarning::UnpricedLiquidity);
        }

        let mut score = confidence::score(&kept, self.pricing) * reading.confidence;
        if let Some(stale) = self.stale_warning() {
            detail.warnings.push(stale);
            score *= self.pricing.stale_graph_penalty;
        }

        debug!(
            token = %token,
            usd = usd_price,
            paths = kept.len(),
            removed,
            "Priced token via paths"
        );

        PriceResult {
            token: token.clone(),
            usd_price,
            confidence: score.clamp(0.0, 1.0),
            timestamp: self.now,
            detail,
        }
    }
}
