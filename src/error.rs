//! Error types
//!
//! Only structurally invalid requests surface as `PricingError`; everything
//! else in pricing degrades into warnings on a well-formed `PriceResult`.

use thiserror::Error;

/// Hard pricing errors returned to callers
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PricingError {
    #[error("Invalid token identifier: {0:?}")]
    InvalidToken(String),
}

/// Failure to turn an external payload into a validated value
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("Malformed payload: {0}")]
    Malformed(String),

    #[error("Missing field `{0}`")]
    MissingField(&'static str),

    #[error("Invalid value for `{field}`: {value}")]
    InvalidValue { field: &'static str, value: String },

    #[error("Upstream error: {0}")]
    Upstream(String),
}

impl From<serde_json::Error> for DecodeError {
    fn from(err: serde_json::Error) -> Self {
        DecodeError::Malformed(err.to_string())
    }
}

/// Oracle source errors
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("Request timed out after {0} ms")]
    Timeout(u64),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Unexpected HTTP status {0}")]
    Status(u16),

    #[error(transparent)]
    Decode(#[from] DecodeError),
}

/// Pool inventory and token directory errors
#[derive(Error, Debug)]
pub enum InventoryError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Unexpected HTTP status {0}")]
    Status(u16),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error("Inventory not configured: {0}")]
    NotConfigured(String),
}
