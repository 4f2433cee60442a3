//! Decoding of pool inventory and token directory payloads
//!
//! Accepts either a bare JSON array or an object wrapping the array under
//! `pools` / `tokens`. Each record is validated on its own: a bad record is
//! rejected and counted, never filled in with defaults.

use serde_json::{Map, Value};
use tracing::warn;

use crate::error::DecodeError;
use crate::types::{PoolRecord, TokenId, TokenMeta};

/// Largest accepted token precision
const MAX_DECIMALS: u64 = 36;

/// Records that decoded, plus a count of those that did not
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedBatch<T> {
    pub items: Vec<T>,
    pub rejected: usize,
}

pub fn decode_pools(body: &str) -> Result<DecodedBatch<PoolRecord>, DecodeError> {
    decode_batch(body, "pools", decode_pool)
}

pub fn decode_tokens(body: &str) -> Result<DecodedBatch<TokenMeta>, DecodeError> {
    decode_batch(body, "tokens", decode_token)
}

fn decode_batch<T>(
    body: &str,
    key: &'static str,
    decode: fn(&Map<String, Value>) -> Result<T, DecodeError>,
) -> Result<DecodedBatch<T>, DecodeError> {
    let value: Value = serde_json::from_str(body)?;
    let records = match value {
        Value::Array(records) => records,
        Value::Object(mut obj) => match obj.remove(key) {
            Some(Value::Array(records)) => records,
            Some(_) => return Err(DecodeError::Malformed(format!("`{}` is not an array", key))),
            None => return Err(DecodeError::MissingField(key)),
        },
        _ => return Err(DecodeError::Malformed(format!("expected an array of {}", key))),
    };

    let mut items = Vec::with_capacity(records.len());
    let mut rejected = 0;
    for (index, record) in records.iter().enumerate() {
        let decoded = record
            .as_object()
            .ok_or_else(|| DecodeError::Malformed("record is not an object".to_string()))
            .and_then(decode);
        match decoded {
            Ok(item) => items.push(item),
            Err(e) => {
                warn!(kind = key, index, error = %e, "Rejected inventory record");
                rejected += 1;
            }
        }
    }

    Ok(DecodedBatch { items, rejected })
}

fn decode_pool(obj: &Map<String, Value>) -> Result<PoolRecord, DecodeError> {
    let mut record = PoolRecord {
        pool_id: required_str(obj, "poolId")?,
        token_a: token(obj, "tokenA")?,
        token_b: token(obj, "tokenB")?,
        reserves_a: amount(obj, "reservesA")?,
        reserves_b: amount(obj, "reservesB")?,
        lp_token: None,
        lp_supply: None,
        updated_at: None,
    };

    match (optional(obj, "lpToken"), optional(obj, "lpSupply")) {
        (Some(_), _) => {
            record.lp_token = Some(token(obj, "lpToken")?);
            record.lp_supply = optional(obj, "lpSupply").map(|_| amount(obj, "lpSupply")).transpose()?;
        }
        (None, Some(_)) => return Err(DecodeError::MissingField("lpToken")),
        (None, None) => {}
    }

    if let Some(raw) = optional(obj, "updatedAt") {
        let ts = raw.as_i64().filter(|ts| *ts >= 0).ok_or_else(|| DecodeError::InvalidValue {
            field: "updatedAt",
            value: raw.to_string(),
        })?;
        record.updated_at = Some(ts);
    }

    Ok(record)
}

fn decode_token(obj: &Map<String, Value>) -> Result<TokenMeta, DecodeError> {
    let id = token(obj, "tokenId")?;
    let symbol = required_str(obj, "symbol")?;
    let raw = optional(obj, "decimals").ok_or(DecodeError::MissingField("decimals"))?;
    let decimals = raw
        .as_u64()
        .filter(|d| *d <= MAX_DECIMALS)
        .ok_or_else(|| DecodeError::InvalidValue {
            field: "decimals",
            value: raw.to_string(),
        })?;

    Ok(TokenMeta {
        id,
        symbol,
        decimals: decimals as u8,
    })
}

/// Present and not null
fn optional<'a>(obj: &'a Map<String, Value>, field: &'static str) -> Option<&'a Value> {
    obj.get(field).filter(|v| !v.is_null())
}

fn required_str(obj: &Map<String, Value>, field: &'static str) -> Result<String, DecodeError> {
    let raw = optional(obj, field).ok_or(DecodeError::MissingField(field))?;
    match raw.as_str().map(str::trim) {
        Some(s) if !s.is_empty() => Ok(s.to_string()),
        _ => Err(DecodeError::InvalidValue {
            field,
            value: raw.to_string(),
        }),
    }
}

fn token(obj: &Map<String, Value>, field: &'static str) -> Result<TokenId, DecodeError> {
    let raw = required_str(obj, field)?;
    TokenId::parse(&raw).map_err(|_| DecodeError::InvalidValue { field, value: raw })
}

/// Atomic amount as a decimal digit string or a non-negative integer
fn amount(obj: &Map<String, Value>, field: &'static str) -> Result<u128, DecodeError> {
    let raw = optional(obj, field).ok_or(DecodeError::MissingField(field))?;
    let invalid = || DecodeError::InvalidValue {
        field,
        value: raw.to_string(),
    };
    match raw {
        Value::String(s) => {
            let s = s.trim();
            if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
                return Err(invalid());
            }
            s.parse::<u128>().map_err(|_| invalid())
        }
        Value::Number(n) => n.as_u64().map(u128::from).ok_or_else(invalid),
        _ => Err(invalid()),
    }
}
