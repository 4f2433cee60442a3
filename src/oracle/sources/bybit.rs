//! Bybit v5 spot ticker
//!
//! `GET /v5/market/tickers?category=spot&symbol=BTCUSDT`

use async_trait::async_trait;
use serde::Deserialize;

use super::{get_body, parse_price, OracleSource, SourceQuote};
use crate::error::{DecodeError, SourceError};

const BYBIT_TICKER_URL: &str = "https://api.bybit.com/v5/market/tickers?category=spot&symbol=BTCUSDT";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TickersResponse {
    ret_code: Option<i64>,
    ret_msg: Option<String>,
    result: Option<TickersResult>,
    time: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct TickersResult {
    list: Option<Vec<Ticker>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Ticker {
    symbol: Option<String>,
    last_price: Option<String>,
}

#[derive(Debug, Clone)]
pub struct BybitSource {
    client: reqwest::Client,
    url: String,
}

impl BybitSource {
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            url: BYBIT_TICKER_URL.to_string(),
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    pub fn decode(body: &str) -> Result<SourceQuote, DecodeError> {
        let response: TickersResponse = serde_json::from_str(body)?;

        match response.ret_code {
            Some(0) => {}
            Some(code) => {
                return Err(DecodeError::Upstream(format!(
                    "retCode {}: {}",
                    code,
                    response.ret_msg.unwrap_or_default()
                )))
            }
            None => return Err(DecodeError::MissingField("retCode")),
        }

        let ticker = response
            .result
            .and_then(|r| r.list)
            .and_then(|list| list.into_iter().find(|t| t.symbol.as_deref() == Some("BTCUSDT")))
            .ok_or(DecodeError::MissingField("result.list[BTCUSDT]"))?;

        let raw = ticker.last_price.ok_or(DecodeError::MissingField("lastPrice"))?;
        Ok(SourceQuote {
            price: parse_price("lastPrice", &raw)?,
            timestamp: response.time,
        })
    }
}

#[async_trait]
impl OracleSource for BybitSource {
    fn id(&self) -> &'static str {
        "bybit"
    }

    fn confidence(&self) -> f64 {
        0.9
    }

    async fn fetch_price(&self) -> Result<SourceQuote, SourceError> {
        let body = get_body(&self.client, &self.url).await?;
        Ok(Self::decode(&body)?)
    }
}
