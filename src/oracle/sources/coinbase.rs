//! Coinbase spot price
//!
//! `GET /v2/prices/BTC-USD/spot`

use async_trait::async_trait;
use serde::Deserialize;

use super::{get_body, parse_price, OracleSource, SourceQuote};
use crate::error::{DecodeError, SourceError};

const COINBASE_SPOT_URL: &str = "https://api.coinbase.com/v2/prices/BTC-USD/spot";

#[derive(Debug, Deserialize)]
struct SpotResponse {
    data: Option<SpotData>,
    errors: Option<Vec<CoinbaseError>>,
}

#[derive(Debug, Deserialize)]
struct SpotData {
    amount: Option<String>,
    base: Option<String>,
    currency: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CoinbaseError {
    id: Option<String>,
    message: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CoinbaseSource {
    client: reqwest::Client,
    url: String,
}

impl CoinbaseSource {
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            url: COINBASE_SPOT_URL.to_string(),
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    pub fn decode(body: &str) -> Result<SourceQuote, DecodeError> {
        let response: SpotResponse = serde_json::from_str(body)?;

        if let Some(err) = response.errors.and_then(|errs| errs.into_iter().next()) {
            return Err(DecodeError::Upstream(format!(
                "{}: {}",
                err.id.unwrap_or_default(),
                err.message.unwrap_or_default()
            )));
        }

        let data = response.data.ok_or(DecodeError::MissingField("data"))?;

        match (data.base.as_deref(), data.currency.as_deref()) {
            (Some("BTC"), Some("USD")) => {}
            (base, currency) => {
                return Err(DecodeError::InvalidValue {
                    field: "base/currency",
                    value: format!("{}/{}", base.unwrap_or("?"), currency.unwrap_or("?")),
                })
            }
        }

        let raw = data.amount.ok_or(DecodeError::MissingField("amount"))?;
        Ok(SourceQuote {
            price: parse_price("amount", &raw)?,
            timestamp: None,
        })
    }
}

#[async_trait]
impl OracleSource for CoinbaseSource {
    fn id(&self) -> &'static str {
        "coinbase"
    }

    fn confidence(&self) -> f64 {
        0.95
    }

    async fn fetch_price(&self) -> Result<SourceQuote, SourceError> {
        let body = get_body(&self.client, &self.url).await?;
        Ok(Self::decode(&body)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_spot() {
        let body = r#"{"data":{"amount":"64990.5","base":"BTC","currency":"USD"}}"#;
        assert_eq!(CoinbaseSource::decode(body).unwrap().price, 64990.5);
    }

    #[test]
    fn test_decode_errors_array() {
        let body = r#"{"errors":[{"id":"not_found","message":"Invalid currency"}]}"#;
        assert!(matches!(
            CoinbaseSource::decode(body),
            Err(DecodeError::Upstream(_))
        ));
    }

    #[test]
    fn test_decode_rejects_other_pair() {
        let body = r#"{"data":{"amount":"3000","base":"ETH","currency":"USD"}}"#;
        assert!(CoinbaseSource::decode(body).is_err());
    }
}
