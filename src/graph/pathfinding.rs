//! Bounded simple-path enumeration towards the anchor
//!
//! Breadth-first by hop count, so every path of length `n` is seen before
//! any path of length `n + 1`. The anchor is terminal: paths never pass
//! through it. The search stops after the first level at which `max_paths`
//! candidates exist, and the frontier is capped so dense graphs cannot blow
//! up the work per call.

use petgraph::graph::{EdgeIndex, NodeIndex};
use petgraph::visit::EdgeRef;
use std::cmp::Ordering;
use std::sync::Arc;

use super::{LiquidityGraph, PoolEdge};
use crate::types::TokenId;

/// Frontier cap used by [`LiquidityGraph::find_paths_to_anchor`]
pub const DEFAULT_MAX_FRONTIER: usize = 20_000;

/// Ordered, non-repeating sequence of pools from a token to the anchor
#[derive(Debug, Clone)]
pub struct Path {
    /// Visited tokens, source first, anchor last
    pub tokens: Vec<TokenId>,
    /// `edges[i]` connects `tokens[i]` and `tokens[i + 1]`
    pub edges: Vec<Arc<PoolEdge>>,
}

impl Path {
    pub fn hops(&self) -> usize {
        self.edges.len()
    }

    /// Weakest link along the path (USD)
    pub fn min_liquidity_usd(&self) -> f64 {
        self.edges
            .iter()
            .map(|e| e.liquidity_usd)
            .reduce(f64::min)
            .unwrap_or(0.0)
    }

    /// Every edge has a USD liquidity estimate
    pub fn liquidity_known(&self) -> bool {
        self.edges.iter().all(|e| e.liquidity_known)
    }

    /// Anchor units per unit of the source token
    pub fn rate(&self) -> Option<f64> {
        self.edges
            .iter()
            .zip(&self.tokens)
            .try_fold(1.0, |acc, (edge, from)| edge.rate_from(from).map(|r| acc * r))
            .filter(|r| r.is_finite() && *r > 0.0)
    }

    /// Oldest reserve update along the path (ms)
    pub fn oldest_update(&self) -> i64 {
        self.edges.iter().map(|e| e.updated_at).min().unwrap_or(0)
    }

    pub fn pool_ids(&self) -> Vec<&str> {
        self.edges.iter().map(|e| e.pool_id.as_str()).collect()
    }
}

struct Partial {
    nodes: Vec<NodeIndex>,
    edges: Vec<EdgeIndex>,
    min_liquidity: f64,
}

impl LiquidityGraph {
    /// Simple paths from `token` to the anchor, at most `max_hops` long.
    ///
    /// Returns at most `max_paths` paths ordered shortest first, then by
    /// higher minimum liquidity, then by pool ids. Unknown tokens, the anchor
    /// itself and unreachable tokens all yield an empty list.
    pub fn find_paths_to_anchor(&self, token: &TokenId, max_hops: usize, max_paths: usize) -> Vec<Path> {
        self.find_paths_bounded(token, max_hops, max_paths, DEFAULT_MAX_FRONTIER)
    }

    pub fn find_paths_bounded(
        &self,
        token: &TokenId,
        max_hops: usize,
        max_paths: usize,
        max_frontier: usize,
    ) -> Vec<Path> {
        if token == self.anchor() || max_hops == 0 || max_paths == 0 {
            return Vec::new();
        }
        let (Some(start), Some(anchor)) = (self.node_index(token), self.node_index(self.anchor())) else {
            return Vec::new();
        };
        let graph = self.inner();

        let mut found: Vec<Partial> = Vec::new();
        let mut frontier = vec![Partial {
            nodes: vec![start],
            edges: Vec::new(),
            min_liquidity: f64::INFINITY,
        }];

        for depth in 1..=max_hops {
            let mut next: Vec<Partial> = Vec::new();

            for partial in &frontier {
                let Some(&tail) = partial.nodes.last() else {
                    continue;
                };

                for edge in graph.edges(tail) {
                    let pool = edge.weight();
                    if !pool.is_tradable() {
                        continue;
                    }
                    let neighbor = if edge.source() == tail { edge.target() } else { edge.source() };
                    if partial.nodes.contains(&neighbor) {
                        continue;
                    }

                    let extended = Partial {
                        nodes: partial.nodes.iter().copied().chain([neighbor]).collect(),
                        edges: partial.edges.iter().copied().chain([edge.id()]).collect(),
                        min_liquidity: partial.min_liquidity.min(pool.liquidity_usd),
                    };

                    if neighbor == anchor {
                        found.push(extended);
                    } else if depth < max_hops {
                        next.push(extended);
                    }
                }
            }

            if found.len() >= max_paths || next.is_empty() {
                break;
            }

            if next.len() > max_frontier {
                next.sort_by(|a, b| by_liquidity_desc(a.min_liquidity, b.min_liquidity));
                next.truncate(max_frontier);
            }
            frontier = next;
        }

        let mut paths: Vec<(f64, Path)> = found
            .into_iter()
            .map(|p| {
                let path = Path {
                    tokens: p.nodes.iter().map(|&n| graph[n].meta.id.clone()).collect(),
                    edges: p.edges.iter().map(|&e| Arc::clone(&graph[e])).collect(),
                };
                (p.min_liquidity, path)
            })
            .collect();

        // Already grouped by length; order within a length by weakest-link liquidity
        paths.sort_by(|(liq_a, a), (liq_b, b)| {
            a.hops()
                .cmp(&b.hops())
                .then_with(|| by_liquidity_desc(*liq_a, *liq_b))
                .then_with(|| a.pool_ids().cmp(&b.pool_ids()))
        });
        paths.truncate(max_paths);
        paths.into_iter().map(|(_, path)| path).collect()
    }
}

fn by_liquidity_desc(a: f64, b: f64) -> Ordering {
    b.total_cmp(&a)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::tests::priced;
    use crate::graph::PriceBook;
    use crate::types::{PoolRecord, TokenMeta};
    use std::collections::HashSet;

    fn meta(ids: &[&str]) -> Vec<TokenMeta> {
        ids.iter().map(|id| TokenMeta::new(*id, *id, 6)).collect()
    }

    fn anchor() -> TokenMeta {
        TokenMeta::new("BTC", "BTC", 6)
    }

    fn pool(id: &str, a: &str, b: &str) -> PoolRecord {
        PoolRecord::new(id, a, b, 1_000_000, 1_000_000)
    }

    /// A - BTC, A - B - BTC, A - B - C - BTC, A - C
    fn diamond() -> LiquidityGraph {
        let pools = vec![
            pool("a-btc", "A", "BTC"),
            pool("a-b", "A", "B"),
            pool("b-btc", "B", "BTC"),
            pool("b-c", "B", "C"),
            pool("c-btc", "C", "BTC"),
            pool("a-c", "A", "C"),
        ];
        LiquidityGraph::build(&anchor(), &pools, &meta(&["A", "B", "C"]), &PriceBook::new(), 0)
    }

    #[test]
    fn test_paths_are_simple_and_bounded() {
        let graph = diamond();
        let paths = graph.find_paths_to_anchor(&TokenId::new("A"), 4, 100);

        assert!(!paths.is_empty());
        for path in &paths {
            assert!(path.hops() <= 4);
            let unique: HashSet<_> = path.tokens.iter().collect();
            assert_eq!(unique.len(), path.tokens.len());
            assert_eq!(path.tokens.last().unwrap(), graph.anchor());
            assert_eq!(path.tokens.len(), path.hops() + 1);
        }
        // anchor appears only at the end
        assert!(paths
            .iter()
            .all(|p| p.tokens[..p.tokens.len() - 1].iter().all(|t| t != graph.anchor())));
    }

    #[test]
    fn test_shorter_paths_first() {
        let graph = diamond();
        let paths = graph.find_paths_to_anchor(&TokenId::new("A"), 4, 100);
        let hops: Vec<usize> = paths.iter().map(Path::hops).collect();
        let mut sorted = hops.clone();
        sorted.sort();
        assert_eq!(hops, sorted);
        assert_eq!(paths[0].pool_ids(), vec!["a-btc"]);
    }

    #[test]
    fn test_max_hops_limits_search() {
        let graph = diamond();
        let paths = graph.find_paths_to_anchor(&TokenId::new("A"), 1, 100);
        assert_eq!(paths.len(), 1);
        assert_eq!(paths[0].hops(), 1);
    }

    #[test]
    fn test_max_paths_truncates_preferring_liquidity() {
        let tokens = meta(&["A", "B", "C"]);
        let pools = vec![
            pool("a-b", "A", "B"),
            PoolRecord::new("a-c", "A", "C", 9_000_000, 9_000_000),
            PoolRecord::new("b-btc", "B", "BTC", 1_000_000, 1_000_000),
            PoolRecord::new("c-btc", "C", "BTC", 9_000_000, 9_000_000),
        ];
        let book: PriceBook = [
            priced("A", 1.0),
            priced("B", 1.0),
            priced("C", 1.0),
            priced("BTC", 1.0),
        ]
        .into_iter()
        .collect();
        let graph = LiquidityGraph::build(&anchor(), &pools, &tokens, &book, 0);

        let paths = graph.find_paths_to_anchor(&TokenId::new("A"), 4, 1);
        assert_eq!(paths.len(), 1);
        assert_eq!(paths[0].pool_ids(), vec!["a-c", "c-btc"]);
    }

    #[test]
    fn test_unknown_anchor_and_isolated_tokens_yield_empty() {
        let pools = vec![pool("a-btc", "A", "BTC"), pool("y-z", "Y", "Z")];
        let graph = LiquidityGraph::build(&anchor(), &pools, &meta(&["A", "Y", "Z"]), &PriceBook::new(), 0);

        assert!(graph.find_paths_to_anchor(&TokenId::new("NOPE"), 4, 10).is_empty());
        assert!(graph.find_paths_to_anchor(&TokenId::new("BTC"), 4, 10).is_empty());
        assert!(graph.find_paths_to_anchor(&TokenId::new("Z"), 4, 10).is_empty());
    }

    #[test]
    fn test_drained_pools_not_traversed() {
        let pools = vec![PoolRecord::new("a-btc", "A", "BTC", 0, 1_000)];
        let graph = LiquidityGraph::build(&anchor(), &pools, &meta(&["A"]), &PriceBook::new(), 0);
        assert!(graph.find_paths_to_anchor(&TokenId::new("A"), 4, 10).is_empty());
    }

    #[test]
    fn test_parallel_pools_are_distinct_paths() {
        let pools = vec![pool("a-btc-1", "A", "BTC"), pool("a-btc-2", "A", "BTC")];
        let graph = LiquidityGraph::build(&anchor(), &pools, &meta(&["A"]), &PriceBook::new(), 0);
        let paths = graph.find_paths_to_anchor(&TokenId::new("A"), 4, 10);
        assert_eq!(paths.len(), 2);
        // equal liquidity falls back to pool id order
        assert_eq!(paths[0].pool_ids(), vec!["a-btc-1"]);
        assert_eq!(paths[1].pool_ids(), vec!["a-btc-2"]);
    }

    #[test]
    fn test_path_rate_multiplies_hops() {
        // 1 A = 2 B, 1 B = 3 BTC
        let pools = vec![
            PoolRecord::new("a-b", "A", "B", 1_000_000, 2_000_000),
            PoolRecord::new("b-btc", "B", "BTC", 1_000_000, 3_000_000),
        ];
        let graph = LiquidityGraph::build(&anchor(), &pools, &meta(&["A", "B"]), &PriceBook::new(), 0);
        let paths = graph.find_paths_to_anchor(&TokenId::new("A"), 4, 10);

        assert_eq!(paths.len(), 1);
        assert!((paths[0].rate().unwrap() - 6.0).abs() < 1e-9);
    }

    #[test]
    fn test_frontier_cap_still_terminates() {
        let graph = diamond();
        let paths = graph.find_paths_bounded(&TokenId::new("A"), 4, 100, 1);
        assert!(!paths.is_empty());
        assert!(paths.len() <= 100);
    }
}
