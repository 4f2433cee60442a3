//! Pool inventory and token directory collaborators
//!
//! The registry that tracks pools and the directory that knows token
//! metadata live outside this crate. They are reached through two small
//! traits with HTTP, file and in-memory implementations.

mod decode;
mod file;
mod http;

pub use decode::{decode_pools, decode_tokens, DecodedBatch};
pub use file::FileInventory;
pub use http::HttpInventory;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use crate::config::InventoryConfig;
use crate::error::InventoryError;
use crate::types::{PoolRecord, TokenMeta};

/// Source of pool records
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PoolInventory: Send + Sync {
    fn name(&self) -> &'static str;
    async fn fetch_pools(&self) -> Result<Vec<PoolRecord>, InventoryError>;
}

/// Source of token metadata
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TokenDirectory: Send + Sync {
    fn name(&self) -> &'static str;
    async fn fetch_tokens(&self) -> Result<Vec<TokenMeta>, InventoryError>;
}

/// In-memory inventory, replaceable at runtime
#[derive(Default)]
pub struct StaticInventory {
    pools: RwLock<Vec<PoolRecord>>,
    tokens: RwLock<Vec<TokenMeta>>,
}

impl StaticInventory {
    pub fn new(pools: Vec<PoolRecord>, tokens: Vec<TokenMeta>) -> Self {
        Self {
            pools: RwLock::new(pools),
            tokens: RwLock::new(tokens),
        }
    }

    pub fn set_pools(&self, pools: Vec<PoolRecord>) {
        *self.pools.write().unwrap_or_else(PoisonError::into_inner) = pools;
    }

    pub fn set_tokens(&self, tokens: Vec<TokenMeta>) {
        *self.tokens.write().unwrap_or_else(PoisonError::into_inner) = tokens;
    }
}

#[async_trait]
impl PoolInventory for StaticInventory {
    fn name(&self) -> &'static str {
        "static"
    }

    async fn fetch_pools(&self) -> Result<Vec<PoolRecord>, InventoryError> {
        Ok(self.pools.read().unwrap_or_else(PoisonError::into_inner).clone())
    }
}

#[async_trait]
impl TokenDirectory for StaticInventory {
    fn name(&self) -> &'static str {
        "static"
    }

    async fn fetch_tokens(&self) -> Result<Vec<TokenMeta>, InventoryError> {
        Ok(self.tokens.read().unwrap_or_else(PoisonError::into_inner).clone())
    }
}

/// Build the configured pool inventory and token directory.
/// A URL takes precedence over a file for each side.
pub fn from_config(config: &InventoryConfig) -> Result<(Arc<dyn PoolInventory>, Arc<dyn TokenDirectory>)> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_millis(config.timeout_ms))
        .build()
        .context("Failed to build inventory HTTP client")?;

    let pools: Arc<dyn PoolInventory> = match (&config.pools_url, &config.pools_file) {
        (Some(url), _) => Arc::new(HttpInventory::new(client.clone(), url.clone())),
        (None, Some(path)) => Arc::new(FileInventory::new(path)),
        (None, None) => bail!(InventoryError::NotConfigured("pools".to_string())),
    };
    let tokens: Arc<dyn TokenDirectory> = match (&config.tokens_url, &config.tokens_file) {
        (Some(url), _) => Arc::new(HttpInventory::new(client, url.clone())),
        (None, Some(path)) => Arc::new(FileInventory::new(path)),
        (None, None) => bail!(InventoryError::NotConfigured("tokens".to_string())),
    };

    Ok((pools, tokens))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> InventoryConfig {
        InventoryConfig {
            pools_url: None,
            tokens_url: None,
            pools_file: None,
            tokens_file: None,
            timeout_ms: 1_000,
        }
    }

    #[test]
    fn test_from_config_prefers_url() {
        let cfg = InventoryConfig {
            pools_url: Some("http://localhost:1/pools".to_string()),
            pools_file: Some("pools.json".to_string()),
            tokens_file: Some("tokens.json".to_string()),
            ..config()
        };
        let (pools, tokens) = from_config(&cfg).unwrap();
        assert_eq!(pools.name(), "http");
        assert_eq!(tokens.name(), "file");
    }

    #[test]
    fn test_from_config_requires_both_sides() {
        let cfg = InventoryConfig {
            pools_file: Some("pools.json".to_string()),
            ..config()
        };
        let err = from_config(&cfg).err().unwrap();
        assert!(err.to_string().contains("tokens"));
    }

    #[tokio::test]
    async fn test_static_inventory_is_replaceable() {
        let inventory = StaticInventory::default();
        assert!(inventory.fetch_pools().await.unwrap().is_empty());
        inventory.set_pools(vec![PoolRecord::new("p", "A", "B", 1, 1)]);
        assert_eq!(inventory.fetch_pools().await.unwrap().len(), 1);

        assert!(inventory.fetch_tokens().await.unwrap().is_empty());
        inventory.set_tokens(vec![TokenMeta::new("A", "A", 6)]);
        assert_eq!(inventory.fetch_tokens().await.unwrap(), vec![TokenMeta::new("A", "A", 6)]);
    }
}
