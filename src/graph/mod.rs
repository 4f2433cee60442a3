//! Liquidity graph - tokens as nodes, pools as edges
//!
//! A graph is built in one pass from a pool inventory and never mutated
//! afterwards; refreshes build a new graph and publish it through
//! [`GraphStore`].

mod pathfinding;
mod store;

pub use pathfinding::Path;
pub use store::GraphStore;

use petgraph::graph::{EdgeIndex, NodeIndex, UnGraph};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::types::{PoolRecord, PriceResult, TokenId, TokenMeta};

/// Last computed prices, keyed by token
pub type PriceBook = HashMap<TokenId, PriceResult>;

/// Token node
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TokenNode {
    pub meta: TokenMeta,
    /// Price known for this token when the graph was built
    pub price: Option<PriceResult>,
}

/// Pool edge. Token order is preserved for rate and share calculations.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PoolEdge {
    pub pool_id: String,
    pub token_a: TokenId,
    pub token_b: TokenId,
    pub reserves_a: u128,
    pub reserves_b: u128,
    pub decimals_a: u8,
    pub decimals_b: u8,
    /// USD value of both reserves; zero when either side is unpriced
    pub liquidity_usd: f64,
    /// False when `liquidity_usd` could not be estimated
    pub liquidity_known: bool,
    pub lp_token: Option<TokenId>,
    pub lp_supply: Option<u128>,
    /// Last reserve update (ms)
    pub updated_at: i64,
}

impl PoolEdge {
    /// Decimal-adjusted reserve of side A
    pub fn amount_a(&self) -> f64 {
        scale(self.reserves_a, self.decimals_a)
    }

    pub fn amount_b(&self) -> f64 {
        scale(self.reserves_b, self.decimals_b)
    }

    pub fn contains(&self, token: &TokenId) -> bool {
        &self.token_a == token || &self.token_b == token
    }

    /// The token on the other side of this pool
    pub fn other(&self, token: &TokenId) -> Option<&TokenId> {
        if &self.token_a == token {
            Some(&self.token_b)
        } else if &self.token_b == token {
            Some(&self.token_a)
        } else {
            None
        }
    }

    /// Units of the other token received per unit of `from`, at spot
    pub fn rate_from(&self, from: &TokenId) -> Option<f64> {
        if !self.is_tradable() {
            return None;
        }
        let rate = if &self.token_a == from {
            self.amount_b() / self.amount_a()
        } else if &self.token_b == from {
            self.amount_a() / self.amount_b()
        } else {
            return None;
        };
        (rate.is_finite() && rate > 0.0).then_some(rate)
    }

    /// Both sides hold reserves, so a spot rate exists
    pub fn is_tradable(&self) -> bool {
        self.reserves_a > 0 && self.reserves_b > 0
    }
}

pub(crate) fn scale(amount: u128, decimals: u8) -> f64 {
    amount as f64 / 10f64.powi(decimals as i32)
}

/// Summary of a graph build
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphStats {
    pub token_count: usize,
    pub pool_count: usize,
    /// Pools with the anchor on one side
    pub anchor_pool_count: usize,
    pub avg_pools_per_token: f64,
    /// Build timestamp (ms)
    pub built_at: i64,
    pub age_ms: i64,
    /// Inventory records left out (missing metadata, self-pairs)
    pub skipped_pools: usize,
}

/// Immutable token/pool graph
#[derive(Debug, Clone)]
pub struct LiquidityGraph {
    anchor: TokenId,
    graph: UnGraph<TokenNode, Arc<PoolEdge>>,
    token_to_node: HashMap<TokenId, NodeIndex>,
    /// Pool-share token -> the pool that issues it
    share_tokens: HashMap<TokenId, EdgeIndex>,
    built_at: i64,
    skipped_pools: usize,
}

impl LiquidityGraph {
    /// Graph with only the anchor node, used before the first build
    pub fn empty(anchor: &TokenMeta) -> Self {
        Self::build(anchor, &[], &[], &PriceBook::new(), 0)
    }

    /// Build a new graph from a pool inventory.
    ///
    /// Pools are deduplicated by id (the most recently updated record wins),
    /// joined with token metadata, and given a USD liquidity estimate from
    /// `prices` where both sides are priced.
    pub fn build(
        anchor: &TokenMeta,
        pools: &[PoolRecord],
        tokens: &[TokenMeta],
        prices: &PriceBook,
        built_at: i64,
    ) -> Self {
        let mut metadata: HashMap<&TokenId, &TokenMeta> =
            tokens.iter().map(|t| (&t.id, t)).collect();
        metadata.entry(&anchor.id).or_insert(anchor);

        let mut latest: HashMap<&str, &PoolRecord> = HashMap::with_capacity(pools.len());
        for record in pools {
            match latest.get(record.pool_id.as_str()) {
                Some(existing) if existing.updated_at > record.updated_at => {}
                _ => {
                    latest.insert(record.pool_id.as_str(), record);
                }
            }
        }

        let mut built = Self {
            anchor: anchor.id.clone(),
            graph: UnGraph::with_capacity(latest.len() + 1, latest.len()),
            token_to_node: HashMap::new(),
            share_tokens: HashMap::new(),
            built_at,
            skipped_pools: pools.len() - latest.len(),
        };
        built.node_for(anchor, prices);

        // Stable edge order regardless of HashMap iteration
        let mut records: Vec<&PoolRecord> = latest.into_values().collect();
        records.sort_by(|a, b| a.pool_id.cmp(&b.pool_id));

        for record in records {
            if record.token_a == record.token_b {
                warn!(pool = %record.pool_id, "Skipping pool with identical sides");
                built.skipped_pools += 1;
                continue;
            }
            let (Some(meta_a), Some(meta_b)) =
                (metadata.get(&record.token_a), metadata.get(&record.token_b))
            else {
                debug!(pool = %record.pool_id, "Skipping pool with unknown token metadata");
                built.skipped_pools += 1;
                continue;
            };

            let mut edge = PoolEdge {
                pool_id: record.pool_id.clone(),
                token_a: record.token_a.clone(),
                token_b: record.token_b.clone(),
                reserves_a: record.reserves_a,
                reserves_b: record.reserves_b,
                decimals_a: meta_a.decimals,
                decimals_b: meta_b.decimals,
                liquidity_usd: 0.0,
                liquidity_known: false,
                lp_token: record.lp_token.clone(),
                lp_supply: record.lp_supply,
                updated_at: record.updated_at.unwrap_or(built_at),
            };
            let (liquidity, known) = estimate_liquidity(&edge, prices);
            edge.liquidity_usd = liquidity;
            edge.liquidity_known = known;

            let node_a = built.node_for(meta_a, prices);
            let node_b = built.node_for(meta_b, prices);
            let share_meta = edge.lp_token.as_ref().and_then(|lp| metadata.get(lp).copied());
            let index = built.graph.add_edge(node_a, node_b, Arc::new(edge));

            if let Some(meta) = share_meta {
                built.node_for(meta, prices);
                built.share_tokens.insert(meta.id.clone(), index);
            }
        }

        built
    }

    fn node_for(&mut self, meta: &TokenMeta, prices: &PriceBook) -> NodeIndex {
        if let Some(&index) = self.token_to_node.get(&meta.id) {
            return index;
        }
        let index = self.graph.add_node(TokenNode {
            meta: meta.clone(),
            price: prices.get(&meta.id).cloned(),
        });
        self.token_to_node.insert(meta.id.clone(), index);
        index
    }

    pub fn anchor(&self) -> &TokenId {
        &self.anchor
    }

    pub fn built_at(&self) -> i64 {
        self.built_at
    }

    pub fn get_node(&self, token: &TokenId) -> Option<&TokenNode> {
        self.token_to_node
            .get(token)
            .and_then(|&index| self.graph.node_weight(index))
    }

    pub fn contains(&self, token: &TokenId) -> bool {
        self.token_to_node.contains_key(token)
    }

    pub(crate) fn node_index(&self, token: &TokenId) -> Option<NodeIndex> {
        self.token_to_node.get(token).copied()
    }

    pub(crate) fn inner(&self) -> &UnGraph<TokenNode, Arc<PoolEdge>> {
        &self.graph
    }

    /// Every pool, in pool id order
    pub fn get_all_pools(&self) -> Vec<&Arc<PoolEdge>> {
        self.graph.edge_weights().collect()
    }

    pub fn get_all_tokens(&self) -> Vec<&TokenId> {
        let mut tokens: Vec<&TokenId> = self.token_to_node.keys().collect();
        tokens.sort();
        tokens
    }

    /// The pool whose share token is `token`, if any
    pub fn share_pool(&self, token: &TokenId) -> Option<&Arc<PoolEdge>> {
        self.share_tokens
            .get(token)
            .and_then(|&index| self.graph.edge_weight(index))
    }

    /// Priced nodes, for seeding the next build's liquidity estimates
    pub fn price_book(&self) -> PriceBook {
        self.graph
            .node_weights()
            .filter_map(|node| {
                node.price
                    .as_ref()
                    .filter(|p| p.is_priced())
                    .map(|p| (node.meta.id.clone(), p.clone()))
            })
            .collect()
    }

    /// Tokens that carried a usable price when the graph was built
    pub fn priced_token_count(&self) -> usize {
        self.graph
            .node_weights()
            .filter(|node| node.price.as_ref().is_some_and(|p| p.confidence > 0.0))
            .count()
    }

    pub fn age_ms(&self, now: i64) -> i64 {
        (now - self.built_at).max(0)
    }

    pub fn get_stats(&self) -> GraphStats {
        self.stats_at(chrono::Utc::now().timestamp_millis())
    }

    pub fn stats_at(&self, now: i64) -> GraphStats {
        let token_count = self.graph.node_count();
        let pool_count = self.graph.edge_count();
        let anchor_pool_count = self
            .node_index(&self.anchor)
            .map(|anchor| self.graph.edges(anchor).count())
            .unwrap_or(0);

        GraphStats {
            token_count,
            pool_count,
            anchor_pool_count,
            avg_pools_per_token: if token_count == 0 {
                0.0
            } else {
                (2 * pool_count) as f64 / token_count as f64
            },
            built_at: self.built_at,
            age_ms: self.age_ms(now),
            skipped_pools: self.skipped_pools,
        }
    }
}

/// USD value of both reserves, or `(0.0, false)` when either side is unpriced
fn estimate_liquidity(edge: &PoolEdge, prices: &PriceBook) -> (f64, bool) {
    let price_of = |token: &TokenId| {
        prices
            .get(token)
            .filter(|p| p.is_priced())
            .map(|p| p.usd_price)
    };
    match (price_of(&edge.token_a), price_of(&edge.token_b)) {
        (Some(pa), Some(pb)) => {
            let value = edge.amount_a() * pa + edge.amount_b() * pb;
            if value.is_finite() && value >= 0.0 {
                (value, true)
            } else {
                (0.0, false)
            }
        }
        _ => (0.0, false),
    }
}
