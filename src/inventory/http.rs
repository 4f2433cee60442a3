//! Inventory fetched from an HTTP registry

use async_trait::async_trait;
use tracing::{debug, info};

use super::decode::{decode_pools, decode_tokens};
use super::{PoolInventory, TokenDirectory};
use crate::error::InventoryError;
use crate::types::{PoolRecord, TokenMeta};

/// One endpoint; serves pools or tokens depending on which trait is used
pub struct HttpInventory {
    client: reqwest::Client,
    url: String,
}

impl HttpInventory {
    pub fn new(client: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }

    async fn get_body(&self) -> Result<String, InventoryError> {
        let response = self.client.get(&self.url).send().await?;
        let status = response.status();
        if !status.is_success() {
            debug!(url = %self.url, status = %status, "Inventory endpoint returned error status");
            return Err(InventoryError::Status(status.as_u16()));
        }
        Ok(response.text().await?)
    }
}

#[async_trait]
impl PoolInventory for HttpInventory {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn fetch_pools(&self) -> Result<Vec<PoolRecord>, InventoryError> {
        let body = self.get_body().await?;
        let batch = decode_pools(&body)?;
        info!(url = %self.url, pools = batch.items.len(), rejected = batch.rejected, "Fetched pool inventory");
        Ok(batch.items)
    }
}

#[async_trait]
impl TokenDirectory for HttpInventory {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn fetch_tokens(&self) -> Result<Vec<TokenMeta>, InventoryError> {
        let body = self.get_body().await?;
        let batch = decode_tokens(&body)?;
        info!(url = %self.url, tokens = batch.items.len(), rejected = batch.rejected, "Fetched token directory");
        Ok(batch.items)
    }
}
