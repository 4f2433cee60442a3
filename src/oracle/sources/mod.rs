//! Anchor price source adapters (Binance, Coinbase, Bybit, CoinGecko)
//!
//! Each adapter performs one REST request and runs the body through a pure
//! `decode` function, so payload handling is testable without a network.

mod binance;
mod bybit;
mod coingecko;
mod coinbase;

pub use binance::BinanceSource;
pub use bybit::BybitSource;
pub use coingecko::CoinGeckoSource;
pub use coinbase::CoinbaseSource;

use anyhow::{bail, Result};
use async_trait::async_trait;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::str::FromStr;
use std::sync::Arc;

use crate::error::{DecodeError, SourceError};

/// A price quote as returned by one source
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SourceQuote {
    /// USD per anchor unit
    pub price: f64,
    /// Source-reported timestamp in milliseconds, if any
    pub timestamp: Option<i64>,
}

/// Trait for anchor price sources
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OracleSource: Send + Sync {
    /// Stable source identifier used in readings and health reports
    fn id(&self) -> &'static str;

    /// Confidence weight attached to readings from this source
    fn confidence(&self) -> f64;

    /// Fetch the current anchor price
    async fn fetch_price(&self) -> Result<SourceQuote, SourceError>;
}

/// Build sources in the configured priority order
pub fn build_sources(names: &[String], client: &reqwest::Client) -> Result<Vec<Arc<dyn OracleSource>>> {
    let mut sources: Vec<Arc<dyn OracleSource>> = Vec::with_capacity(names.len());
    for name in names {
        let source: Arc<dyn OracleSource> = match name.to_lowercase().as_str() {
            "binance" => Arc::new(BinanceSource::new(client.clone())),
            "coinbase" => Arc::new(CoinbaseSource::new(client.clone())),
            "bybit" => Arc::new(BybitSource::new(client.clone())),
            "coingecko" => Arc::new(CoinGeckoSource::new(client.clone())),
            other => bail!("Unknown oracle source: {}", other),
        };
        sources.push(source);
    }
    if sources.is_empty() {
        bail!("At least one oracle source must be configured");
    }
    Ok(sources)
}

/// GET `url` and return the body, mapping non-2xx to `SourceError::Status`
pub(crate) async fn get_body(client: &reqwest::Client, url: &str) -> Result<String, SourceError> {
    let response = client.get(url).send().await?;
    let status = response.status();
    let body = response.text().await?;
    if !status.is_success() {
        tracing::debug!(url = %url, status = %status, body = %body, "Oracle source returned error status");
        return Err(SourceError::Status(status.as_u16()));
    }
    Ok(body)
}

/// Parse a decimal price string exactly, then validate it is a positive finite value
pub(crate) fn parse_price(field: &'static str, raw: &str) -> Result<f64, DecodeError> {
    let value = Decimal::from_str(raw.trim()).map_err(|_| DecodeError::InvalidValue {
        field,
        value: raw.to_string(),
    })?;
    validate_price(field, value)
}

pub(crate) fn validate_price(field: &'static str, value: Decimal) -> Result<f64, DecodeError> {
    if value <= Decimal::ZERO {
        return Err(DecodeError::InvalidValue {
            field,
            value: value.to_string(),
        });
    }
    value
        .to_f64()
        .filter(|p| p.is_finite())
        .ok_or(DecodeError::InvalidValue {
            field,
            value: value.to_string(),
        })
}
