//! End-to-end pricing scenarios over hand-built graphs

#[cfg(test)]
mod tests {
    use poolprice::config::GraphConfig;
    use poolprice::graph::{LiquidityGraph, PriceBook};
    use poolprice::health::{
        assemble, coverage_section, graph_section, oracle_section, HealthConfig, SectionStatus,
    };
    use poolprice::oracle::OracleHealth;
    use poolprice::pricing::{remove_outliers, PathQuote, PricingConfig, Valuator};
    use poolprice::types::{
        CalculationDetail, OracleReading, PoolRecord, PriceResult, PriceWarning, PricingMethod,
        TokenId, TokenMeta,
    };

    const NOW: i64 = 1_700_000_000_000;
    const BTC_USD: f64 = 65_000.0;

    fn anchor() -> TokenMeta {
        TokenMeta::new("WBTC", "WBTC", 8)
    }

    fn reading(price: f64) -> OracleReading {
        OracleReading {
            price,
            source: "binance".to_string(),
            confidence: 0.95,
            timestamp: NOW,
        }
    }

    fn meta(ids: &[&str]) -> Vec<TokenMeta> {
        ids.iter().map(|id| TokenMeta::new(*id, *id, 6)).collect()
    }

    fn book(entries: &[(&str, f64)]) -> PriceBook {
        entries
            .iter()
            .map(|(id, usd)| {
                let token = TokenId::new(*id);
                let result = PriceResult {
                    token: token.clone(),
                    usd_price: *usd,
                    confidence: 0.9,
                    timestamp: NOW,
                    detail: CalculationDetail::new(PricingMethod::Paths, None),
                };
                (token, result)
            })
            .collect()
    }

    fn price(graph: &LiquidityGraph, token: &str) -> PriceResult {
        let r = reading(BTC_USD);
        let pricing = PricingConfig::default();
        let search = GraphConfig::default();
        Valuator::new(graph, Some(&r), &pricing, &search, NOW)
            .price(&TokenId::new(token))
            .unwrap()
    }

    // ============================================================================
    // Scenarios
    // ============================================================================

    #[test]
    fn scenario_a_single_deep_direct_pool() {
        // ~$25k a side: 3,846.15 X against 0.3846 WBTC
        let pools = vec![PoolRecord::new("x-wbtc", "X", "WBTC", 3_846_153_846, 38_461_538).updated(NOW)];
        let graph = LiquidityGraph::build(
            &anchor(),
            &pools,
            &meta(&["X"]),
            &book(&[("X", 6.5), ("WBTC", BTC_USD)]),
            NOW,
        );

        let result = price(&graph, "X");
        assert!((result.usd_price - 6.5).abs() < 0.01, "got {}", result.usd_price);
        assert!(result.confidence > 0.7, "got {}", result.confidence);
        assert_eq!(result.detail.paths_used, 1);
        assert!((result.detail.total_liquidity_usd - 50_000.0).abs() < 1.0);
        assert!(result.detail.warnings.is_empty());
    }

    fn scenario_b_pools(with_long_path: bool) -> Vec<PoolRecord> {
        // Direct: 50 Y against 0.0077 WBTC ($10 per Y, ~$1,000 deep)
        let mut pools = vec![PoolRecord::new("y-wbtc", "Y", "WBTC", 50_000_000, 769_230).updated(NOW)];
        if with_long_path {
            // Y -> A -> B -> WBTC implies $100 per Y, weakest link ~$500
            pools.push(PoolRecord::new("y-a", "Y", "A", 25_000_000, 2_500_000_000).updated(NOW));
            pools.push(PoolRecord::new("a-b", "A", "B", 1_000_000_000, 1_000_000_000).updated(NOW));
            pools.push(PoolRecord::new("b-wbtc", "B", "WBTC", 250_000_000, 384_615).updated(NOW));
        }
        pools
    }

    fn scenario_b_graph(with_long_path: bool) -> LiquidityGraph {
        LiquidityGraph::build(
            &anchor(),
            &scenario_b_pools(with_long_path),
            &meta(&["Y", "A", "B"]),
            &book(&[("Y", 10.0), ("A", 1.0), ("B", 1.0), ("WBTC", BTC_USD)]),
            NOW,
        )
    }

    #[test]
    fn scenario_b_far_outlier_path_is_dropped() {
        let result = price(&scenario_b_graph(true), "Y");

        assert!((result.usd_price - 10.0).abs() < 0.01, "got {}", result.usd_price);
        assert_eq!(result.detail.paths_found, 2);
        assert_eq!(result.detail.paths_used, 1);
        assert_eq!(result.detail.outliers_removed, 1);
        assert!(result
            .detail
            .has_warning(|w| *w == PriceWarning::OutliersRemoved { count: 1 }));

        // Same confidence as if the direct pool were the only path
        let direct_only = price(&scenario_b_graph(false), "Y");
        assert!((result.confidence - direct_only.confidence).abs() < 1e-9);
    }

    #[test]
    fn scenario_c_unreachable_token() {
        let pools = vec![
            PoolRecord::new("z-q", "Z", "Q", 1_000_000, 1_000_000).updated(NOW),
            PoolRecord::new("x-wbtc", "X", "WBTC", 1_000_000, 1_000).updated(NOW),
        ];
        let graph = LiquidityGraph::build(&anchor(), &pools, &meta(&["Z", "Q", "X"]), &PriceBook::new(), NOW);

        let result = price(&graph, "Z");
        assert_eq!(result.usd_price, 0.0);
        assert_eq!(result.confidence, 0.0);
        assert!(result.detail.has_warning(|w| *w == PriceWarning::NoPathFound));
    }

    #[test]
    fn scenario_d_stale_graph_in_health_snapshot() {
        let ids: Vec<String> = (0..12).map(|i| format!("T{}", i)).collect();
        let pools: Vec<PoolRecord> = ids
            .iter()
            .map(|id| PoolRecord::new(format!("{}-wbtc", id), id.as_str(), "WBTC", 1_000_000, 1_000))
            .collect();
        let tokens: Vec<TokenMeta> = ids.iter().map(|id| TokenMeta::new(id.as_str(), id.as_str(), 6)).collect();
        let built_at = NOW - 11 * 60 * 1000;
        let graph = LiquidityGraph::build(&anchor(), &pools, &tokens, &PriceBook::new(), built_at);
        let stats = graph.stats_at(NOW);
        assert!(stats.token_count > 0 && stats.pool_count > 0);

        let config = HealthConfig::default();
        let r = reading(BTC_USD);
        let mut warnings = Vec::new();
        let oracle = oracle_section(&OracleHealth::default(), Some(&r), &mut warnings);
        let graph_part = graph_section(&stats, &config, GraphConfig::default().staleness_threshold_ms(), &mut warnings);
        let coverage = coverage_section(stats.token_count, stats.token_count, &mut warnings);
        let snapshot = assemble(oracle, graph_part, coverage, warnings, &config, NOW);

        assert_eq!(snapshot.graph.status, SectionStatus::Stale);
        assert!(snapshot.warnings.iter().any(|w| w.contains("stale")));
    }

    // ============================================================================
    // Properties
    // ============================================================================

    #[test]
    fn anchor_identity_law() {
        let graph = LiquidityGraph::empty(&anchor());
        let pricing = PricingConfig::default();
        let search = GraphConfig::default();
        for (price, confidence) in [(65_000.0, 0.95), (1.0, 0.5), (123_456.78, 0.85)] {
            let r = OracleReading {
                confidence,
                ..reading(price)
            };
            let result = Valuator::new(&graph, Some(&r), &pricing, &search, NOW)
                .price(&TokenId::new("WBTC"))
                .unwrap();
            assert_eq!(result.usd_price, price);
            assert_eq!(result.confidence, confidence);
        }
    }

    #[test]
    fn edge_liquidity_is_non_negative_and_zero_when_unpriced() {
        let pools = vec![
            PoolRecord::new("a-b", "A", "B", 1_000_000, 2_000_000),
            PoolRecord::new("a-c", "A", "C", 5_000_000, 1_000_000),
            PoolRecord::new("b-wbtc", "B", "WBTC", 3_000_000, 100),
            PoolRecord::new("c-wbtc", "C", "WBTC", 0, 100),
        ];
        let prices = book(&[("A", 2.0), ("B", 1.0), ("WBTC", BTC_USD)]);
        let graph = LiquidityGraph::build(&anchor(), &pools, &meta(&["A", "B", "C"]), &prices, NOW);

        for edge in graph.get_all_pools() {
            assert!(edge.liquidity_usd >= 0.0);
            let both_priced = prices.contains_key(&edge.token_a) && prices.contains_key(&edge.token_b);
            if !both_priced {
                assert_eq!(edge.liquidity_usd, 0.0, "pool {}", edge.pool_id);
                assert!(!edge.liquidity_known);
            }
        }
    }

    #[test]
    fn paths_are_simple_and_bounded() {
        // Every pair of six tokens pooled, each also paired with the anchor
        let ids = ["A", "B", "C", "D", "E", "F"];
        let mut pools = Vec::new();
        for (i, a) in ids.iter().enumerate() {
            pools.push(PoolRecord::new(format!("{}-wbtc", a), *a, "WBTC", 1_000_000, 1_000));
            for b in &ids[i + 1..] {
                pools.push(PoolRecord::new(format!("{}-{}", a, b), *a, *b, 1_000_000, 1_000_000));
            }
        }
        let graph = LiquidityGraph::build(&anchor(), &pools, &meta(&ids), &PriceBook::new(), NOW);

        for max_hops in 1..=4 {
            let paths = graph.find_paths_to_anchor(&TokenId::new("A"), max_hops, 200);
            assert!(!paths.is_empty());
            for path in &paths {
                assert!(path.hops() <= max_hops);
                assert_eq!(path.tokens.len(), path.hops() + 1);
                assert_eq!(path.tokens.last(), Some(&TokenId::new("WBTC")));
                let mut seen = path.tokens.clone();
                seen.sort();
                seen.dedup();
                assert_eq!(seen.len(), path.tokens.len(), "repeated token in {:?}", path.tokens);
            }
        }

        let capped = graph.find_paths_to_anchor(&TokenId::new("A"), 4, 5);
        assert_eq!(capped.len(), 5);
        assert_eq!(capped[0].hops(), 1);
    }

    #[test]
    fn outlier_filter_is_idempotent() {
        let sets: Vec<Vec<f64>> = vec![
            vec![10.0, 100.0],
            vec![1.0, 1.1, 0.9, 3.0, 0.2],
            vec![5.0, 7.0, 9.0, 11.0, 13.0, 15.0, 17.0],
            vec![100.0, 40.0, 60.0, 149.0, 151.0],
        ];
        for prices in sets {
            let quotes: Vec<PathQuote> = prices
                .iter()
                .map(|p| PathQuote {
                    implied_price: *p,
                    liquidity_usd: 1_000.0,
                    liquidity_known: true,
                    hops: 1,
                    weight: 1.0,
                    pools: vec![],
                })
                .collect();
            let (once, _) = remove_outliers(quotes, 0.5);
            let (twice, removed) = remove_outliers(once.clone(), 0.5);
            assert_eq!(once, twice);
            assert_eq!(removed, 0);
        }
    }

    #[test]
    fn health_score_monotone_in_oracle_failures() {
        let graph = LiquidityGraph::build(
            &anchor(),
            &[PoolRecord::new("x-wbtc", "X", "WBTC", 1_000_000, 1_000)],
            &meta(&["X"]),
            &PriceBook::new(),
            NOW,
        );
        let stats = graph.stats_at(NOW);
        let config = HealthConfig::default();
        let r = reading(BTC_USD);

        let mut previous = f64::INFINITY;
        for failures in 0..10u32 {
            let health = OracleHealth {
                consecutive_failures: failures,
                ..OracleHealth::default()
            };
            let mut warnings = Vec::new();
            let oracle = oracle_section(&health, (failures < 5).then_some(&r), &mut warnings);
            let graph_part = graph_section(&stats, &config, 600_000, &mut warnings);
            let coverage = coverage_section(1, 2, &mut warnings);
            let score = assemble(oracle, graph_part, coverage, warnings, &config, NOW).overall_score;
            assert!(score <= previous, "score rose at {} failures", failures);
            previous = score;
        }
    }
}
