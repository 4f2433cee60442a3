//! Nested valuation of pool-share tokens
//!
//! A share token is worth its pro-rata claim on both reserves of the pool
//! that issued it. Underlyings are priced through the same valuator, so an
//! underlying may itself be a share token. Recursion stops at
//! `max_nesting_depth` and on any token already being valued further up.

use super::valuation::Valuator;
use crate::graph::{scale, PoolEdge};
use crate::types::{CalculationDetail, PriceResult, PriceWarning, PricingMethod, TokenId};

impl Valuator<'_> {
    pub(super) fn value_share(
        &self,
        token: &TokenId,
        pool: &PoolEdge,
        depth: usize,
        visiting: &mut Vec<TokenId>,
    ) -> PriceResult {
        if depth >= self.pricing.max_nesting_depth {
            return self.share_unresolved(token, PriceWarning::NestingDepthExceeded { depth });
        }
        if visiting.contains(token) {
            return self.share_unresolved(token, PriceWarning::CycleDetected);
        }
        let supply = match pool.lp_supply {
            Some(supply) if supply > 0 => supply,
            _ => return self.share_unresolved(token, PriceWarning::ShareSupplyUnknown),
        };
        let share_decimals = self
            .graph
            .get_node(token)
            .map(|node| node.meta.decimals)
            .unwrap_or(18);

        visiting.push(token.clone());
        let sides = [
            (&pool.token_a, pool.amount_a()),
            (&pool.token_b, pool.amount_b()),
        ];
        let mut reserve_value = 0.0;
        let mut confidence: f64 = 1.0;
        let mut warnings: Vec<PriceWarning> = Vec::new();

        for (underlying, amount) in sides {
            let priced = self
                .price_nested(underlying, depth + 1, visiting)
                .ok()
                .filter(PriceResult::is_priced);
            match priced {
                Some(result) => {
                    reserve_value += amount * result.usd_price;
                    confidence = confidence.min(result.confidence);
                    for warning in result.detail.warnings {
                        if !warnings.contains(&warning) {
                            warnings.push(warning);
                        }
                    }
                }
                None => {
                    visiting.pop();
                    return self.share_unresolved(
                        token,
                        PriceWarning::UnderlyingUnpriced {
                            token: underlying.clone(),
                        },
                    );
                }
            }
        }
        visiting.pop();

        let usd_price = reserve_value / scale(supply, share_decimals);
        if !(usd_price.is_finite() && usd_price > 0.0) {
            return self.share_unresolved(token, PriceWarning::ShareSupplyUnknown);
        }

        let mut detail = CalculationDetail::new(PricingMethod::PoolShare, self.anchor);
        detail.total_liquidity_usd = reserve_value;
        detail.warnings = warnings;

        PriceResult {
            token: token.clone(),
            usd_price,
            confidence: confidence.clamp(0.0, 1.0),
            timestamp: self.now,
            detail,
        }
    }

    fn share_unresolved(&self, token: &TokenId, reason: PriceWarning) -> PriceResult {
        let mut warnings = vec![reason];
        if let Some(stale) = self.stale_warning() {
            warnings.push(stale);
        }
        PriceResult::unresolved(token.clone(), self.now, self.anchor, warnings)
    }
}
