//! Binance spot ticker
//!
//! `GET /api/v3/ticker/price?symbol=BTCUSDT`

use async_trait::async_trait;
use serde::Deserialize;

use super::{get_body, parse_price, OracleSource, SourceQuote};
use crate::error::{DecodeError, SourceError};

const BINANCE_TICKER_URL: &str = "https://api.binance.com/api/v3/ticker/price?symbol=BTCUSDT";

#[derive(Debug, Deserialize)]
struct TickerResponse {
    symbol: Option<String>,
    price: Option<String>,
    // Error envelope
    code: Option<i64>,
    msg: Option<String>,
}

#[derive(Debug, Clone)]
pub struct BinanceSource {
    client: reqwest::Client,
    url: String,
}

impl BinanceSource {
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            url: BINANCE_TICKER_URL.to_string(),
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// Decode a ticker body into a quote
    pub fn decode(body: &str) -> Result<SourceQuote, DecodeError> {
        let ticker: TickerResponse = serde_json::from_str(body)?;

        if let Some(code) = ticker.code {
            return Err(DecodeError::Upstream(format!(
                "code {}: {}",
                code,
                ticker.msg.unwrap_or_default()
            )));
        }

        let symbol = ticker.symbol.ok_or(DecodeError::MissingField("symbol"))?;
        if symbol != "BTCUSDT" {
            return Err(DecodeError::InvalidValue {
                field: "symbol",
                value: symbol,
            });
        }

        let raw = ticker.price.ok_or(DecodeError::MissingField("price"))?;
        Ok(SourceQuote {
            price: parse_price("price", &raw)?,
            timestamp: None,
        })
    }
}

#[async_trait]
impl OracleSource for BinanceSource {
    fn id(&self) -> &'static str {
        "binance"
    }

    fn confidence(&self) -> f64 {
        0.95
    }

    async fn fetch_price(&self) -> Result<SourceQuote, SourceError> {
        let body = get_body(&self.client, &self.url).await?;
        Ok(Self::decode(&body)?)
    }
}
