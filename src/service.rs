//! Price service
//!
//! Owns one oracle, one graph store and one calculator, constructed once at
//! startup with their collaborators injected. Request handlers share it by
//! reference (usually an `Arc<PriceService>`).

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::config::AppConfig;
use crate::error::{InventoryError, PricingError};
use crate::graph::{GraphStats, GraphStore, LiquidityGraph};
use crate::health::{HealthReporter, HealthSnapshot};
use crate::inventory::{self, PoolInventory, TokenDirectory};
use crate::oracle::{build_sources, OracleHealth, OracleSource, ReferenceOracle};
use crate::pricing::PriceCalculator;
use crate::types::{OracleReading, PriceResult, TokenId, TokenMeta};

pub struct PriceService {
    anchor: TokenMeta,
    oracle: Arc<ReferenceOracle>,
    graphs: Arc<GraphStore>,
    calculator: Arc<PriceCalculator>,
    health: HealthReporter,
    pools: Arc<dyn PoolInventory>,
    tokens: Arc<dyn TokenDirectory>,
    oracle_interval: Duration,
    graph_interval: Duration,
}

impl PriceService {
    pub fn new(
        config: &AppConfig,
        sources: Vec<Arc<dyn OracleSource>>,
        pools: Arc<dyn PoolInventory>,
        tokens: Arc<dyn TokenDirectory>,
    ) -> Self {
        let anchor = config.anchor.meta();
        let oracle = Arc::new(ReferenceOracle::new(
            sources,
            config.oracle.source_timeout(),
            config.oracle.max_reading_age(),
        ));
        let graphs = Arc::new(GraphStore::new(LiquidityGraph::empty(&anchor)));
        let calculator = Arc::new(PriceCalculator::new(
            graphs.clone(),
            oracle.clone(),
            config.pricing.clone(),
            config.graph.clone(),
        ));
        let health = HealthReporter::new(
            graphs.clone(),
            oracle.clone(),
            config.health.clone(),
            config.graph.staleness_threshold_ms(),
        );

        Self {
            anchor,
            oracle,
            graphs,
            calculator,
            health,
            pools,
            tokens,
            oracle_interval: Duration::from_secs(config.oracle.refresh_interval_secs.max(1)),
            graph_interval: Duration::from_secs(config.graph.refresh_interval_secs.max(1)),
        }
    }

    /// Wire the configured oracle sources and inventory
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.oracle.source_timeout())
            .build()
            .context("Failed to build oracle HTTP client")?;
        let sources = build_sources(&config.oracle.sources, &client)?;
        let (pools, tokens) = inventory::from_config(&config.inventory)?;

        info!(
            sources = sources.len(),
            pools = pools.name(),
            tokens = tokens.name(),
            "Price service configured"
        );
        Ok(Self::new(config, sources, pools, tokens))
    }

    /// Query the oracle sources for a new anchor reading
    pub async fn refresh_oracle(&self) -> Option<OracleReading> {
        let reading = self.oracle.get_price().await;
        self.calculator.invalidate();
        reading
    }

    /// Rebuild the graph from a fresh inventory and publish it.
    ///
    /// Two passes: a draft is priced using the previous graph's prices for
    /// edge liquidity, then rebuilt with the draft's prices. Readers only
    /// ever see the final graph.
    pub async fn refresh_graph(&self) -> Result<GraphStats, InventoryError> {
        let (pools, tokens) = tokio::try_join!(self.pools.fetch_pools(), self.tokens.fetch_tokens())?;

        let now = chrono::Utc::now().timestamp_millis();
        let reading = self.oracle.current_at(now);
        let previous = self.graphs.snapshot().price_book();

        let draft = LiquidityGraph::build(&self.anchor, &pools, &tokens, &previous, now);
        let book = self.calculator.price_graph(&draft, reading.as_ref(), now);
        debug!(priced = book.len(), "Priced draft graph");

        let graph = LiquidityGraph::build(&self.anchor, &pools, &tokens, &book, now);
        let stats = graph.stats_at(now);
        self.graphs.publish(graph);
        self.calculator.invalidate();

        Ok(stats)
    }

    /// Oracle first, so the graph rebuild can price against the new reading
    pub async fn refresh_all(&self) -> Result<GraphStats, InventoryError> {
        if self.refresh_oracle().await.is_none() {
            warn!("No anchor price after refresh; graph prices will be unresolved");
        }
        self.refresh_graph().await
    }

    pub fn get_token_price(&self, token_id: &str) -> Result<PriceResult, PricingError> {
        let token = TokenId::parse(token_id)?;
        self.calculator.calculate_price(&token)
    }

    /// Price several tokens; malformed or unknown identifiers are skipped
    pub fn calculate_multiple(&self, token_ids: &[&str]) -> HashMap<TokenId, PriceResult> {
        let tokens: Vec<TokenId> = token_ids
            .iter()
            .filter_map(|raw| match TokenId::parse(raw) {
                Ok(id) => Some(id),
                Err(e) => {
                    warn!(error = %e, "Skipping malformed token id");
                    None
                }
            })
            .collect();
        self.calculator.calculate_multiple(&tokens)
    }

    pub fn get_oracle_health(&self) -> OracleHealth {
        self.oracle.get_health()
    }

    pub fn get_graph_stats(&self) -> GraphStats {
        self.graphs.snapshot().get_stats()
    }

    pub fn get_health_snapshot(&self) -> HealthSnapshot {
        self.health.get_health_snapshot()
    }

    pub fn anchor(&self) -> &TokenMeta {
        &self.anchor
    }

    /// Run oracle and graph refresh on independent timers until `shutdown`
    /// fires or its sender is dropped.
    pub fn spawn_refresh(self: Arc<Self>, mut shutdown: mpsc::Receiver<()>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut oracle_tick = interval_at(Instant::now() + self.oracle_interval, self.oracle_interval);
            let mut graph_tick = interval_at(Instant::now() + self.graph_interval, self.graph_interval);
            oracle_tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
            graph_tick.set_missed_tick_behavior(MissedTickBehavior::Skip);

            info!(
                oracle_secs = self.oracle_interval.as_secs(),
                graph_secs = self.graph_interval.as_secs(),
                "Refresh task started"
            );

            loop {
                tokio::select! {
                    _ = oracle_tick.tick() => {
                        if self.refresh_oracle().await.is_none() {
                            warn!("Anchor price unavailable this cycle");
                        }
                    }

                    _ = graph_tick.tick() => {
                        match self.refresh_graph().await {
                            Ok(stats) => debug!(pools = stats.pool_count, tokens = stats.token_count, "Graph refreshed"),
                            Err(e) => warn!(error = %e, "Graph refresh failed; keeping previous graph"),
                        }
                        self.log_health();
                    }

                    _ = shutdown.recv() => {
                        info!("Refresh task shutting down");
                        break;
                    }
                }
            }
        })
    }

    pub fn log_health(&self) {
        let snapshot = self.get_health_snapshot();
        info!(
            score = snapshot.overall_score,
            status = ?snapshot.status,
            oracle = ?snapshot.oracle.status,
            graph = ?snapshot.graph.status,
            coverage = snapshot.coverage.score,
            "Health snapshot"
        );
        for warning in &snapshot.warnings {
            warn!(warning = %warning, "Health warning");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AnchorConfig, GraphConfig, InventoryConfig, LoggingConfig, OracleConfig};
    use crate::health::HealthConfig;
    use crate::inventory::{MockPoolInventory, MockTokenDirectory};
    use crate::oracle::sources::MockOracleSource;
    use crate::oracle::SourceQuote;
    use crate::pricing::PricingConfig;
    use crate::types::PoolRecord;

    fn config() -> AppConfig {
        AppConfig {
            anchor: AnchorConfig {
                token_id: "WBTC".to_string(),
                symbol: "WBTC".to_string(),
                decimals: 8,
            },
            oracle: OracleConfig::default(),
            graph: GraphConfig::default(),
            pricing: PricingConfig::default(),
            health: HealthConfig::default(),
            inventory: InventoryConfig {
                pools_url: None,
                tokens_url: None,
                pools_file: None,
                tokens_file: None,
                timeout_ms: 1_000,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                json: false,
            },
        }
    }

    fn source() -> Arc<dyn OracleSource> {
        let mut source = MockOracleSource::new();
        source.expect_id().return_const("binance");
        source.expect_confidence().return_const(0.95);
        source.expect_fetch_price().returning(|| {
            Ok(SourceQuote {
                price: 65_000.0,
                timestamp: None,
            })
        });
        Arc::new(source)
    }

    fn pools() -> Vec<PoolRecord> {
        vec![PoolRecord::new("eth-wbtc", "ETH", "WBTC", 20 * 10u128.pow(18), 100_000_000)]
    }

    #[tokio::test]
    async fn test_refresh_graph_fetches_both_inventories_once() {
        let mut pool_inv = MockPoolInventory::new();
        pool_inv.expect_name().return_const("mock");
        pool_inv.expect_fetch_pools().times(1).returning(|| Ok(pools()));
        let mut token_dir = MockTokenDirectory::new();
        token_dir.expect_name().return_const("mock");
        token_dir
            .expect_fetch_tokens()
            .times(1)
            .returning(|| Ok(vec![TokenMeta::new("ETH", "ETH", 18)]));

        let svc = PriceService::new(&config(), vec![source()], Arc::new(pool_inv), Arc::new(token_dir));
        let stats = svc.refresh_all().await.unwrap();
        assert_eq!(stats.pool_count, 1);
        assert_eq!(stats.anchor_pool_count, 1);

        let eth = svc.get_token_price("ETH").unwrap();
        assert!((eth.usd_price - 3_250.0).abs() < 1.0, "got {}", eth.usd_price);
    }

    #[tokio::test]
    async fn test_token_directory_failure_publishes_nothing() {
        let mut pool_inv = MockPoolInventory::new();
        pool_inv.expect_name().return_const("mock");
        pool_inv.expect_fetch_pools().returning(|| Ok(pools()));
        let mut token_dir = MockTokenDirectory::new();
        token_dir.expect_name().return_const("mock");
        token_dir
            .expect_fetch_tokens()
            .returning(|| Err(InventoryError::Status(502)));

        let svc = PriceService::new(&config(), vec![source()], Arc::new(pool_inv), Arc::new(token_dir));
        assert!(matches!(svc.refresh_all().await, Err(InventoryError::Status(502))));
        assert_eq!(svc.get_graph_stats().pool_count, 0);
        assert!(svc.get_oracle_health().available_sources.contains(&"binance".to_string()));
    }
}
