//! CoinGecko simple price
//!
//! `GET /api/v3/simple/price?ids=bitcoin&vs_currencies=usd&include_last_updated_at=true`

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::HashMap;

use super::{get_body, validate_price, OracleSource, SourceQuote};
use crate::error::{DecodeError, SourceError};

const COINGECKO_PRICE_URL: &str =
    "https://api.coingecko.com/api/v3/simple/price?ids=bitcoin&vs_currencies=usd&include_last_updated_at=true";

#[derive(Debug, Deserialize)]
struct CoinPrice {
    usd: Option<serde_json::Number>,
    /// Seconds since epoch
    last_updated_at: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct CoinGeckoSource {
    client: reqwest::Client,
    url: String,
}

impl CoinGeckoSource {
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            url: COINGECKO_PRICE_URL.to_string(),
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    pub fn decode(body: &str) -> Result<SourceQuote, DecodeError> {
        let mut prices: HashMap<String, CoinPrice> = serde_json::from_str(body)?;
        let bitcoin = prices
            .remove("bitcoin")
            .ok_or(DecodeError::MissingField("bitcoin"))?;
        let usd = bitcoin.usd.ok_or(DecodeError::MissingField("bitcoin.usd"))?;

        // Go through the number's text so no float rounding happens before validation
        let value: Decimal = usd
            .to_string()
            .parse()
            .or_else(|_| Decimal::from_scientific(&usd.to_string()))
            .map_err(|_| DecodeError::InvalidValue {
                field: "bitcoin.usd",
                value: usd.to_string(),
            })?;

        Ok(SourceQuote {
            price: validate_price("bitcoin.usd", value)?,
            timestamp: bitcoin.last_updated_at.map(|s| s * 1000),
        })
    }
}

#[async_trait]
impl OracleSource for CoinGeckoSource {
    fn id(&self) -> &'static str {
        "coingecko"
    }

    fn confidence(&self) -> f64 {
        0.85
    }

    async fn fetch_price(&self) -> Result<SourceQuote, SourceError> {
        let body = get_body(&self.client, &self.url).await?;
        Ok(Self::decode(&body)?)
    }
}
