//! Health Reporter
//!
//! Folds oracle health, graph freshness and pricing coverage into one
//! snapshot. Section scoring is pure so snapshots are reproducible from
//! their inputs; [`HealthReporter`] gathers the inputs from live state.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::graph::{GraphStats, GraphStore};
use crate::oracle::{OracleHealth, ReferenceOracle};
use crate::types::OracleReading;

/// Consecutive oracle failures at which the section is reported failing
const ORACLE_FAILING_AFTER: u32 = 3;
/// Coverage below this raises a warning
const LOW_COVERAGE: f64 = 0.5;

#[derive(Debug, Clone, Deserialize)]
pub struct HealthConfig {
    /// Pool count below which pricing is flagged unreliable
    pub min_pools: usize,
    pub oracle_weight: f64,
    pub graph_weight: f64,
    pub coverage_weight: f64,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            min_pools: 10,
            oracle_weight: 0.4,
            graph_weight: 0.35,
            coverage_weight: 0.25,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionStatus {
    Healthy,
    Degraded,
    Failing,
    Stale,
    Empty,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverallStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OracleSection {
    pub score: f64,
    pub status: SectionStatus,
    pub consecutive_failures: u32,
    pub last_success: Option<i64>,
    pub available_sources: Vec<String>,
    pub anchor_price_usd: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphSection {
    pub score: f64,
    pub status: SectionStatus,
    pub stale: bool,
    pub staleness_threshold_ms: i64,
    pub stats: GraphStats,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoverageSection {
    pub score: f64,
    pub status: SectionStatus,
    pub priced_tokens: usize,
    pub total_tokens: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthSnapshot {
    pub overall_score: f64,
    pub status: OverallStatus,
    pub oracle: OracleSection,
    pub graph: GraphSection,
    pub coverage: CoverageSection,
    pub warnings: Vec<String>,
    pub generated_at: i64,
}

pub fn oracle_section(health: &OracleHealth, reading: Option<&OracleReading>, warnings: &mut Vec<String>) -> OracleSection {
    let failures = health.consecutive_failures;
    let base = if reading.is_some() { 1.0 } else { 0.3 };
    let score = base / (1.0 + failures as f64);

    let status = if failures >= ORACLE_FAILING_AFTER || (reading.is_none() && failures > 0) {
        SectionStatus::Failing
    } else if failures > 0 || reading.is_none() {
        SectionStatus::Degraded
    } else {
        SectionStatus::Healthy
    };

    if failures > 0 {
        match &health.last_error {
            Some(error) => warnings.push(format!(
                "Oracle failing: {} consecutive failure(s), last error: {}",
                failures, error
            )),
            None => warnings.push(format!("Oracle failing: {} consecutive failure(s)", failures)),
        }
    }
    if reading.is_none() {
        warnings.push("No current anchor price; anchor-dependent prices are unavailable".to_string());
    }

    OracleSection {
        score,
        status,
        consecutive_failures: failures,
        last_success: health.last_success,
        available_sources: health.available_sources.clone(),
        anchor_price_usd: reading.map(|r| r.price),
    }
}

pub fn graph_section(
    stats: &GraphStats,
    config: &HealthConfig,
    staleness_threshold_ms: i64,
    warnings: &mut Vec<String>,
) -> GraphSection {
    let stale = stats.age_ms > staleness_threshold_ms;

    if stats.pool_count == 0 {
        warnings.push("Liquidity graph is empty".to_string());
        return GraphSection {
            score: 0.0,
            status: SectionStatus::Empty,
            stale,
            staleness_threshold_ms,
            stats: stats.clone(),
        };
    }

    let mut score: f64 = 1.0;
    if stats.anchor_pool_count == 0 {
        score -= 0.5;
        warnings.push("No pools pair directly with the anchor asset".to_string());
    }
    if stats.pool_count < config.min_pools {
        score -= 0.2;
        warnings.push(format!(
            "Only {} pools in the graph (minimum {} for reliable pricing)",
            stats.pool_count, config.min_pools
        ));
    }
    if stats.skipped_pools > 0 {
        warnings.push(format!(
            "{} pool record(s) skipped during graph build",
            stats.skipped_pools
        ));
    }
    if stale {
        score *= 0.4;
        warnings.push(format!(
            "Liquidity graph is stale ({}s old, threshold {}s)",
            stats.age_ms / 1000,
            staleness_threshold_ms / 1000
        ));
    }

    let status = if stale {
        SectionStatus::Stale
    } else if score < 1.0 {
        SectionStatus::Degraded
    } else {
        SectionStatus::Healthy
    };

    GraphSection {
        score: score.max(0.0),
        status,
        stale,
        staleness_threshold_ms,
        stats: stats.clone(),
    }
}

pub fn coverage_section(priced_tokens: usize, total_tokens: usize, warnings: &mut Vec<String>) -> CoverageSection {
    if total_tokens == 0 {
        return CoverageSection {
            score: 0.0,
            status: SectionStatus::Empty,
            priced_tokens,
            total_tokens,
        };
    }

    let score = (priced_tokens as f64 / total_tokens as f64).min(1.0);
    let status = if score >= 0.8 {
        SectionStatus::Healthy
    } else if score >= LOW_COVERAGE {
        SectionStatus::Degraded
    } else {
        SectionStatus::Failing
    };
    if score < LOW_COVERAGE {
        warnings.push(format!(
            "Only {}/{} tokens resolve to a price",
            priced_tokens, total_tokens
        ));
    }

    CoverageSection {
        score,
        status,
        priced_tokens,
        total_tokens,
    }
}

/// Weighted overall score from finished sections
pub fn assemble(
    oracle: OracleSection,
    graph: GraphSection,
    coverage: CoverageSection,
    warnings: Vec<String>,
    config: &HealthConfig,
    generated_at: i64,
) -> HealthSnapshot {
    let total_weight = config.oracle_weight + config.graph_weight + config.coverage_weight;
    let weighted = config.oracle_weight * oracle.score
        + config.graph_weight * graph.score
        + config.coverage_weight * coverage.score;
    let overall_score = if total_weight > 0.0 {
        (weighted / total_weight).clamp(0.0, 1.0)
    } else {
        0.0
    };

    let status = if overall_score >= 0.9 {
        OverallStatus::Healthy
    } else if overall_score >= 0.5 {
        OverallStatus::Degraded
    } else {
        OverallStatus::Unhealthy
    };

    HealthSnapshot {
        overall_score,
        status,
        oracle,
        graph,
        coverage,
        warnings,
        generated_at,
    }
}

/// Gathers live state for a snapshot
pub struct HealthReporter {
    graphs: Arc<GraphStore>,
    oracle: Arc<ReferenceOracle>,
    config: HealthConfig,
    staleness_threshold_ms: i64,
}

impl HealthReporter {
    pub fn new(
        graphs: Arc<GraphStore>,
        oracle: Arc<ReferenceOracle>,
        config: HealthConfig,
        staleness_threshold_ms: i64,
    ) -> Self {
        Self {
            graphs,
            oracle,
            config,
            staleness_threshold_ms,
        }
    }

    pub fn get_health_snapshot(&self) -> HealthSnapshot {
        self.snapshot_at(chrono::Utc::now().timestamp_millis())
    }

    pub fn snapshot_at(&self, now: i64) -> HealthSnapshot {
        let graph = self.graphs.snapshot();
        let anchor = self.oracle.anchor_at(now);
        let reading = anchor.reading;
        let oracle_health = self.oracle.get_health();

        // Prices settled at the last refresh; a failed oracle cycle zeroes them all
        let priced = if reading.is_some() && anchor.consecutive_failures == 0 {
            graph.priced_token_count()
        } else {
            0
        };
        let total = graph.get_all_tokens().len();

        let mut warnings = Vec::new();
        let oracle = oracle_section(&oracle_health, reading.as_ref(), &mut warnings);
        let graph_part = graph_section(
            &graph.stats_at(now),
            &self.config,
            self.staleness_threshold_ms,
            &mut warnings,
        );
        let coverage = coverage_section(priced, total, &mut warnings);

        assemble(oracle, graph_part, coverage, warnings, &self.config, now)
    }
}
