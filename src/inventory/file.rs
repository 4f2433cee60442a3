//! Inventory read from a JSON snapshot on disk

use async_trait::async_trait;
use std::path::PathBuf;
use tracing::info;

use super::decode::{decode_pools, decode_tokens};
use super::{PoolInventory, TokenDirectory};
use crate::error::InventoryError;
use crate::types::{PoolRecord, TokenMeta};

pub struct FileInventory {
    path: PathBuf,
}

impl FileInventory {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl PoolInventory for FileInventory {
    fn name(&self) -> &'static str {
        "file"
    }

    async fn fetch_pools(&self) -> Result<Vec<PoolRecord>, InventoryError> {
        let body = tokio::fs::read_to_string(&self.path).await?;
        let batch = decode_pools(&body)?;
        info!(path = %self.path.display(), pools = batch.items.len(), rejected = batch.rejected, "Loaded pool inventory");
        Ok(batch.items)
    }
}

#[async_trait]
impl TokenDirectory for FileInventory {
    fn name(&self) -> &'static str {
        "file"
    }

    async fn fetch_tokens(&self) -> Result<Vec<TokenMeta>, InventoryError> {
        let body = tokio::fs::read_to_string(&self.path).await?;
        let batch = decode_tokens(&body)?;
        info!(path = %self.path.display(), tokens = batch.items.len(), rejected = batch.rejected, "Loaded token directory");
        Ok(batch.items)
    }
}
