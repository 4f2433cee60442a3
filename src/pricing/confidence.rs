//! Aggregation and confidence scoring over surviving path quotes

use super::paths::PathQuote;
use super::PricingConfig;

/// Weighted coefficient of variation at which agreement reaches zero
const SPREAD_TOLERANCE: f64 = 0.25;

const REDUNDANCY_WEIGHT: f64 = 0.3;
const AGREEMENT_WEIGHT: f64 = 0.3;
const DEPTH_WEIGHT: f64 = 0.4;

/// Weighted average of implied prices
pub fn weighted_price(quotes: &[PathQuote]) -> Option<f64> {
    if quotes.is_empty() {
        return None;
    }
    let total_weight: f64 = quotes.iter().map(|q| q.weight).sum();
    if total_weight > 0.0 && total_weight.is_finite() {
        Some(quotes.iter().map(|q| q.implied_price * q.weight).sum::<f64>() / total_weight)
    } else {
        Some(quotes.iter().map(|q| q.implied_price).sum::<f64>() / quotes.len() as f64)
    }
}

/// USD liquidity backing the quotes; unknown-depth paths add nothing
pub fn total_liquidity(quotes: &[PathQuote]) -> f64 {
    quotes
        .iter()
        .filter(|q| q.liquidity_known)
        .map(|q| q.liquidity_usd)
        .sum()
}

/// Confidence in [0, 1] from path count, price agreement and depth
pub fn score(quotes: &[PathQuote], config: &PricingConfig) -> f64 {
    let Some(mean) = weighted_price(quotes) else {
        return 0.0;
    };

    let confidence = REDUNDANCY_WEIGHT * redundancy(quotes.len())
        + AGREEMENT_WEIGHT * agreement(quotes, mean)
        + DEPTH_WEIGHT * depth(total_liquidity(quotes), config.reference_liquidity_usd);

    if confidence.is_finite() {
        confidence.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// 0.6 for a single path, full marks from three independent paths
fn redundancy(paths: usize) -> f64 {
    match paths {
        0 => 0.0,
        n => (0.6 + 0.2 * (n - 1) as f64).min(1.0),
    }
}

/// 1.0 when all paths agree, falling to 0 at `SPREAD_TOLERANCE` dispersion
fn agreement(quotes: &[PathQuote], mean: f64) -> f64 {
    if quotes.len() < 2 || mean <= 0.0 {
        return 1.0;
    }
    let total_weight: f64 = quotes.iter().map(|q| q.weight).sum();
    let variance = if total_weight > 0.0 {
        quotes
            .iter()
            .map(|q| q.weight * (q.implied_price - mean).powi(2))
            .sum::<f64>()
            / total_weight
    } else {
        quotes.iter().map(|q| (q.implied_price - mean).powi(2)).sum::<f64>() / quotes.len() as f64
    };
    let cv = variance.sqrt() / mean;
    1.0 - (cv / SPREAD_TOLERANCE).min(1.0)
}

/// Log-scaled depth, 1.0 at `reference_usd`
fn depth(total_liquidity: f64, reference_usd: f64) -> f64 {
    if total_liquidity <= 0.0 || reference_usd <= 0.0 {
        return 0.0;
    }
    (total_liquidity.ln_1p() / reference_usd.ln_1p()).min(1.0)
}
