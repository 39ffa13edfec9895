//! Retrieval evaluation engine.
//!
//! Rows flow through [`Normalizer`] → [`MatchPolicy`] → [`Evaluator`] and
//! the per-query [`MetricsResult`]s are folded by [`aggregate`] into a
//! [`DatasetSummary`]. Nothing in here performs I/O or holds shared state, so
//! callers may evaluate rows in any order or on any thread.

mod aggregate;
mod matching;
mod metrics;
mod normalize;

use serde::Serialize;

pub use self::aggregate::{DatasetSummary, SummaryAccumulator, aggregate};
pub use self::matching::MatchPolicy;
pub use self::metrics::{Evaluator, MetricsResult, QueryEvaluation};
pub use self::normalize::Normalizer;

/// Options recognized by the engine entry point.
///
/// There is no `Default`: the match policy changes precision and recall
/// materially, so callers always pick one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EvalConfig {
    pub normalization_enabled: bool,
    pub match_policy: MatchPolicy,
}

impl EvalConfig {
    pub fn new(match_policy: MatchPolicy) -> Self {
        Self {
            normalization_enabled: true,
            match_policy,
        }
    }

    pub fn with_normalization(mut self, enabled: bool) -> Self {
        self.normalization_enabled = enabled;
        self
    }

    pub fn normalizer(&self) -> Normalizer {
        Normalizer::new(self.normalization_enabled)
    }
}

/// One evaluation unit as handed over by the ingestion boundary.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryRecord {
    pub query_text: String,
    pub reference_passages: Vec<String>,
    pub retrieved_passages: Vec<String>,
}
