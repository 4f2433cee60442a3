use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use poolprice::config::GraphConfig;
use poolprice::graph::{LiquidityGraph, PriceBook};
use poolprice::pricing::{PricingConfig, Valuator};
use poolprice::types::{OracleReading, PoolRecord, TokenId, TokenMeta};

/// `tokens` tokens, each pooled with its next `degree` neighbours, every
/// fifth one also paired with the anchor
fn dense_graph(tokens: usize, degree: usize) -> LiquidityGraph {
    let anchor = TokenMeta::new("WBTC", "WBTC", 8);
    let ids: Vec<String> = (0..tokens).map(|i| format!("T{}", i)).collect();
    let meta: Vec<TokenMeta> = ids.iter().map(|id| TokenMeta::new(id.as_str(), id.as_str(), 18)).collect();

    let mut pools = Vec::new();
    for (i, a) in ids.iter().enumerate() {
        if i % 5 == 0 {
            pools.push(PoolRecord::new(format!("{}-wbtc", a), a.as_str(), "WBTC", 10u128.pow(21), 10u128.pow(8)));
        }
        for step in 1..=degree {
            let b = &ids[(i + step) % tokens];
            pools.push(PoolRecord::new(
                format!("{}-{}", a, b),
                a.as_str(),
                b.as_str(),
                10u128.pow(21) + i as u128,
                10u128.pow(21) + step as u128,
            ));
        }
    }

    LiquidityGraph::build(&anchor, &pools, &meta, &PriceBook::new(), 0)
}

fn bench_find_paths(c: &mut Criterion) {
    let mut group = c.benchmark_group("find_paths_to_anchor");
    for (tokens, degree) in [(100, 4), (500, 8), (2_000, 12)] {
        let graph = dense_graph(tokens, degree);
        let target = TokenId::new("T3");
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{}x{}", tokens, degree)),
            &graph,
            |b, graph| b.iter(|| graph.find_paths_to_anchor(black_box(&target), 4, 24)),
        );
    }
    group.finish();
}

fn bench_price(c: &mut Criterion) {
    let graph = dense_graph(500, 8);
    let reading = OracleReading {
        price: 65_000.0,
        source: "bench".to_string(),
        confidence: 0.95,
        timestamp: 0,
    };
    let pricing = PricingConfig::default();
    let search = GraphConfig::default();
    let target = TokenId::new("T3");

    c.bench_function("price_token_500x8", |b| {
        b.iter(|| {
            Valuator::new(&graph, Some(&reading), &pricing, &search, 0)
                .price(black_box(&target))
        })
    });
}

criterion_group!(benches, bench_find_paths, bench_price);
criterion_main!(benches);
