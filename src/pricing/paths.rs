//! Per-path price estimates and weights

use crate::graph::Path;
use crate::pricing::PricingConfig;

/// Price implied by one path to the anchor
#[derive(Debug, Clone, PartialEq)]
pub struct PathQuote {
    /// USD price implied by this path
    pub implied_price: f64,
    /// Weakest-link liquidity (USD)
    pub liquidity_usd: f64,
    pub liquidity_known: bool,
    pub hops: usize,
    /// Aggregation weight: hop score x recency x liquidity boost
    pub weight: f64,
    pub pools: Vec<String>,
}

/// Evaluate a path against the current anchor price.
///
/// `None` when the path has no defined rate.
pub fn evaluate_path(path: &Path, anchor_usd: f64, now: i64, config: &PricingConfig) -> Option<PathQuote> {
    let rate = path.rate()?;
    let implied_price = rate * anchor_usd;
    if !(implied_price.is_finite() && implied_price > 0.0) {
        return None;
    }

    let liquidity_usd = path.min_liquidity_usd();
    let age_ms = (now - path.oldest_update()).max(0);

    Some(PathQuote {
        implied_price,
        liquidity_usd,
        liquidity_known: path.liquidity_known(),
        hops: path.hops(),
        weight: path_weight(path.hops(), age_ms, liquidity_usd, config),
        pools: path.pool_ids().into_iter().map(str::to_string).collect(),
    })
}

pub fn path_weight(hops: usize, age_ms: i64, liquidity_usd: f64, config: &PricingConfig) -> f64 {
    hop_score(hops, config.hop_penalty)
        * recency_factor(age_ms, config.recency_half_life_secs)
        * liquidity_boost(liquidity_usd, config.deep_liquidity_usd, config.liquidity_boost_cap)
}

/// 1.0 for a direct pool, one `penalty` factor per extra hop
fn hop_score(hops: usize, penalty: f64) -> f64 {
    penalty.powi(hops.saturating_sub(1) as i32)
}

/// Halves at `half_life_secs`, approaches zero for very old data
fn recency_factor(age_ms: i64, half_life_secs: u64) -> f64 {
    if half_life_secs == 0 {
        return 1.0;
    }
    let age_secs = age_ms as f64 / 1000.0;
    1.0 / (1.0 + age_secs / half_life_secs as f64)
}

/// Between 1.0 and `cap`, reaching the cap at `deep_usd`
fn liquidity_boost(liquidity_usd: f64, deep_usd: f64, cap: f64) -> f64 {
    if deep_usd <= 0.0 || liquidity_usd <= 0.0 {
        return 1.0;
    }
    (1.0 + (cap - 1.0) * (liquidity_usd / deep_usd)).clamp(1.0, cap.max(1.0))
}
