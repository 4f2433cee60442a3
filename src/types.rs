//! Core types used throughout PoolPrice
//!
//! Defines token identifiers, pool records, oracle readings and the
//! price results handed to collaborators.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::PricingError;

/// Opaque token identifier (mint / contract address / registry key)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TokenId(String);

impl TokenId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Validate an identifier coming from a caller.
    ///
    /// Rejects empty identifiers and identifiers containing whitespace or
    /// control characters; surrounding whitespace is trimmed first.
    pub fn parse(raw: &str) -> Result<Self, PricingError> {
        let trimmed = raw.trim();
        if trimmed.is_empty()
            || trimmed
                .chars()
                .any(|c| c.is_whitespace() || c.is_control())
        {
            return Err(PricingError::InvalidToken(raw.to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TokenId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Token metadata from the token directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenMeta {
    pub id: TokenId,
    pub symbol: String,
    pub decimals: u8,
}

impl TokenMeta {
    pub fn new(id: impl Into<String>, symbol: impl Into<String>, decimals: u8) -> Self {
        Self {
            id: TokenId::new(id),
            symbol: symbol.into(),
            decimals,
        }
    }
}

/// Validated pool record from the pool inventory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolRecord {
    pub pool_id: String,
    pub token_a: TokenId,
    pub token_b: TokenId,
    /// Atomic reserve amounts (not decimal-adjusted)
    pub reserves_a: u128,
    pub reserves_b: u128,
    /// Pool-share token minted by this pool, if the registry reports one
    pub lp_token: Option<TokenId>,
    /// Atomic outstanding supply of `lp_token`
    pub lp_supply: Option<u128>,
    /// Last reserve update (ms); the fetch time is used when absent
    pub updated_at: Option<i64>,
}

impl PoolRecord {
    pub fn new(
        pool_id: impl Into<String>,
        token_a: impl Into<String>,
        token_b: impl Into<String>,
        reserves_a: u128,
        reserves_b: u128,
    ) -> Self {
        Self {
            pool_id: pool_id.into(),
            token_a: TokenId::new(token_a),
            token_b: TokenId::new(token_b),
            reserves_a,
            reserves_b,
            lp_token: None,
            lp_supply: None,
            updated_at: None,
        }
    }

    pub fn with_share_token(mut self, lp_token: impl Into<String>, lp_supply: u128) -> Self {
        self.lp_token = Some(TokenId::new(lp_token));
        self.lp_supply = Some(lp_supply);
        self
    }

    pub fn updated(mut self, ts: i64) -> Self {
        self.updated_at = Some(ts);
        self
    }
}

/// Anchor-asset USD reading from one oracle source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OracleReading {
    /// USD price of one anchor unit
    pub price: f64,
    /// Identifier of the source that produced it
    pub source: String,
    /// Source confidence weight (0.0 - 1.0)
    pub confidence: f64,
    /// Timestamp in milliseconds
    pub timestamp: i64,
}

/// How a price was derived
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PricingMethod {
    /// The anchor itself, straight from the oracle
    Anchor,
    /// Weighted aggregate over graph paths
    Paths,
    /// Nested valuation of a pool-share token
    PoolShare,
    /// No price could be derived
    Unresolved,
}

impl fmt::Display for PricingMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PricingMethod::Anchor => write!(f, "anchor"),
            PricingMethod::Paths => write!(f, "paths"),
            PricingMethod::PoolShare => write!(f, "pool_share"),
            PricingMethod::Unresolved => write!(f, "unresolved"),
        }
    }
}

/// Degraded-result markers attached to a price calculation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PriceWarning {
    /// No anchor reading this cycle
    OracleUnavailable,
    /// Graph older than the staleness threshold
    GraphStale { age_ms: i64 },
    /// Token unreachable from the anchor within the search bounds
    NoPathFound,
    /// Every candidate path was below the liquidity floor
    InsufficientLiquidity { best_liquidity_usd: f64 },
    /// Paths dropped by the median filter
    OutliersRemoved { count: usize },
    /// Some surviving paths cross pools whose USD depth is unknown
    UnpricedLiquidity,
    /// Pool-share nesting went past the configured depth
    NestingDepthExceeded { depth: usize },
    /// Pool-share token references itself through its underlyings
    CycleDetected,
    /// An underlying reserve of a pool-share token has no price
    UnderlyingUnpriced { token: TokenId },
    /// Pool-share supply is unknown or zero
    ShareSupplyUnknown,
}

impl fmt::Display for PriceWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PriceWarning::OracleUnavailable => write!(f, "anchor price unavailable"),
            PriceWarning::GraphStale { age_ms } => {
                write!(f, "liquidity graph is stale ({}s old)", age_ms / 1000)
            }
            PriceWarning::NoPathFound => write!(f, "no path to anchor"),
            PriceWarning::InsufficientLiquidity { best_liquidity_usd } => write!(
                f,
                "insufficient liquidity (best path ${:.2})",
                best_liquidity_usd
            ),
            PriceWarning::OutliersRemoved { count } => write!(f, "{} outlier path(s) removed", count),
            PriceWarning::UnpricedLiquidity => write!(f, "some pools have unknown USD depth"),
            PriceWarning::NestingDepthExceeded { depth } => {
                write!(f, "pool-share nesting exceeded depth {}", depth)
            }
            PriceWarning::CycleDetected => write!(f, "pool-share cycle detected"),
            PriceWarning::UnderlyingUnpriced { token } => {
                write!(f, "underlying token {} has no price", token)
            }
            PriceWarning::ShareSupplyUnknown => write!(f, "pool-share supply unknown"),
        }
    }
}

/// Breakdown of a calculation for API consumers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalculationDetail {
    pub method: PricingMethod,
    /// Candidate paths returned by the graph search
    pub paths_found: usize,
    /// Paths that survived filtering and fed the aggregate
    pub paths_used: usize,
    pub outliers_removed: usize,
    /// Liquidity backing the surviving paths (USD)
    pub total_liquidity_usd: f64,
    pub anchor_price_usd: Option<f64>,
    pub anchor_source: Option<String>,
    pub warnings: Vec<PriceWarning>,
}

impl CalculationDetail {
    pub fn new(method: PricingMethod, anchor: Option<&OracleReading>) -> Self {
        Self {
            method,
            paths_found: 0,
            paths_used: 0,
            outliers_removed: 0,
            total_liquidity_usd: 0.0,
            anchor_price_usd: anchor.map(|r| r.price),
            anchor_source: anchor.map(|r| r.source.clone()),
            warnings: Vec::new(),
        }
    }

    pub fn has_warning(&self, pred: impl Fn(&PriceWarning) -> bool) -> bool {
        self.warnings.iter().any(pred)
    }
}

/// Computed USD price for one token
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceResult {
    pub token: TokenId,
    pub usd_price: f64,
    /// Reliability of `usd_price` (0.0 - 1.0)
    pub confidence: f64,
    /// Timestamp in milliseconds
    pub timestamp: i64,
    pub detail: CalculationDetail,
}

impl PriceResult {
    /// Zero price, zero confidence, with the reasons attached
    pub fn unresolved(
        token: TokenId,
        timestamp: i64,
        anchor: Option<&OracleReading>,
        warnings: Vec<PriceWarning>,
    ) -> Self {
        let mut detail = CalculationDetail::new(PricingMethod::Unresolved, anchor);
        detail.warnings = warnings;
        Self {
            token,
            usd_price: 0.0,
            confidence: 0.0,
            timestamp,
            detail,
        }
    }

    /// True when the result carries a usable price
    pub fn is_priced(&self) -> bool {
        self.usd_price > 0.0 && self.usd_price.is_finite() && self.confidence > 0.0
    }
}
