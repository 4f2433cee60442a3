//! Reference oracle - USD price of the anchor asset
//!
//! Sources are tried in a fixed priority order, each bounded by its own
//! timeout. The first success becomes the current reading, replacing the
//! previous one whole. Exhausting every source is an ordinary outcome:
//! `get_price` returns `None` and the failure is recorded in the health state.

pub mod sources;

pub use sources::{build_sources, OracleSource, SourceQuote};

use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::error::SourceError;
use crate::types::OracleReading;

/// Oracle health as seen by monitoring
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OracleHealth {
    pub consecutive_failures: u32,
    /// Timestamp of the last successful reading (ms)
    pub last_success: Option<i64>,
    /// Sources whose most recent attempt did not fail, in priority order
    pub available_sources: Vec<String>,
    pub last_error: Option<String>,
}

/// Current reading together with the outcome of the latest cycle
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnchorState {
    pub reading: Option<OracleReading>,
    /// Non-zero when the latest cycle failed; `reading` is then left over
    /// from an earlier cycle
    pub consecutive_failures: u32,
}

#[derive(Debug, Default)]
struct OracleState {
    reading: Option<Arc<OracleReading>>,
    consecutive_failures: u32,
    last_success: Option<i64>,
    last_error: Option<String>,
    /// Outcome of each source's latest attempt; untried sources count as available
    source_ok: HashMap<&'static str, bool>,
    /// Bumped after every cycle, successful or not
    generation: u64,
}

pub struct ReferenceOracle {
    sources: Vec<Arc<dyn OracleSource>>,
    source_timeout: Duration,
    max_reading_age_ms: i64,
    state: RwLock<OracleState>,
}

impl ReferenceOracle {
    pub fn new(
        sources: Vec<Arc<dyn OracleSource>>,
        source_timeout: Duration,
        max_reading_age: Duration,
    ) -> Self {
        Self {
            sources,
            source_timeout,
            max_reading_age_ms: max_reading_age.as_millis() as i64,
            state: RwLock::new(OracleState::default()),
        }
    }

    /// Query sources in priority order and publish the first valid reading.
    ///
    /// Returns `None` when every source failed this cycle.
    pub async fn get_price(&self) -> Option<OracleReading> {
        let mut outcomes: Vec<(&'static str, bool)> = Vec::with_capacity(self.sources.len());
        let mut last_error: Option<String> = None;

        for source in &self.sources {
            let id = source.id();
            match self.attempt(source.as_ref()).await {
                Ok(quote) => {
                    outcomes.push((id, true));
                    let now = chrono::Utc::now().timestamp_millis();
                    let reading = OracleReading {
                        price: quote.price,
                        source: id.to_string(),
                        confidence: source.confidence().clamp(0.0, 1.0),
                        timestamp: quote.timestamp.unwrap_or(now).min(now),
                    };
                    self.publish(reading.clone(), &outcomes, now);
                    info!(
                        source = %id,
                        price = reading.price,
                        confidence = reading.confidence,
                        "Anchor price updated"
                    );
                    return Some(reading);
                }
                Err(e) => {
                    warn!(source = %id, error = %e, "Oracle source failed");
                    outcomes.push((id, false));
                    last_error = Some(format!("{}: {}", id, e));
                }
            }
        }

        self.record_failure(&outcomes, last_error);
        None
    }

    async fn attempt(&self, source: &dyn OracleSource) -> Result<SourceQuote, SourceError> {
        let quote = tokio::time::timeout(self.source_timeout, source.fetch_price())
            .await
            .map_err(|_| SourceError::Timeout(self.source_timeout.as_millis() as u64))??;

        if !(quote.price.is_finite() && quote.price > 0.0) {
            return Err(SourceError::Decode(crate::error::DecodeError::InvalidValue {
                field: "price",
                value: quote.price.to_string(),
            }));
        }
        Ok(quote)
    }

    fn publish(&self, reading: OracleReading, outcomes: &[(&'static str, bool)], now: i64) {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        for (id, ok) in outcomes {
            state.source_ok.insert(*id, *ok);
        }
        state.reading = Some(Arc::new(reading));
        state.consecutive_failures = 0;
        state.last_success = Some(now);
        state.generation += 1;
    }

    fn record_failure(&self, outcomes: &[(&'static str, bool)], last_error: Option<String>) {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        for (id, ok) in outcomes {
            state.source_ok.insert(*id, *ok);
        }
        state.consecutive_failures = state.consecutive_failures.saturating_add(1);
        state.generation += 1;
        if last_error.is_some() {
            state.last_error = last_error;
        } else {
            state.last_error = Some("no oracle sources configured".to_string());
        }
        warn!(
            consecutive_failures = state.consecutive_failures,
            "All oracle sources failed"
        );
    }

    /// Latest reading, unless it is older than the maximum reading age
    pub fn current(&self) -> Option<OracleReading> {
        self.current_at(chrono::Utc::now().timestamp_millis())
    }

    pub fn current_at(&self, now: i64) -> Option<OracleReading> {
        self.anchor_at(now).reading
    }

    /// Reading and failure count, taken under one lock
    pub fn anchor_at(&self, now: i64) -> AnchorState {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        let reading = state.reading.as_ref().and_then(|reading| {
            if now - reading.timestamp > self.max_reading_age_ms {
                debug!(
                    age_ms = now - reading.timestamp,
                    "Anchor reading too old, treating as unavailable"
                );
                return None;
            }
            Some(reading.as_ref().clone())
        });
        AnchorState {
            reading,
            consecutive_failures: state.consecutive_failures,
        }
    }

    pub fn get_health(&self) -> OracleHealth {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        let available_sources = self
            .sources
            .iter()
            .map(|s| s.id())
            .filter(|id| state.source_ok.get(id).copied().unwrap_or(true))
            .map(str::to_string)
            .collect();

        OracleHealth {
            consecutive_failures: state.consecutive_failures,
            last_success: state.last_success,
            available_sources,
            last_error: state.last_error.clone(),
        }
    }

    /// Changes after every cycle
    pub fn generation(&self) -> u64 {
        self.state
            .read()
            .map(|s| s.generation)
            .unwrap_or_else(|e| e.into_inner().generation)
    }
}
