use serde::Serialize;

use super::matching::{MatchPolicy, ReferenceIndex};
use super::normalize::Normalizer;
use super::{EvalConfig, QueryRecord};

/// Scores for one query. All four scores are defined for every input,
/// including empty lists on either side.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct MetricsResult {
    pub hit_rate: u8,
    pub precision: f64,
    pub recall: f64,
    pub mean_reciprocal_rank: f64,
    pub retrieved_count: usize,
    pub reference_count: usize,
}

impl MetricsResult {
    fn zero(retrieved_count: usize, reference_count: usize) -> Self {
        Self {
            retrieved_count,
            reference_count,
            ..Self::default()
        }
    }
}

/// Metrics plus the relevance mask they were derived from.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryEvaluation {
    pub metrics: MetricsResult,
    /// One slot per retrieved passage in rank order; `Some(i)` names the
    /// reference passage the retrieval matched.
    pub relevance: Vec<Option<usize>>,
}

impl QueryEvaluation {
    /// 1-based ranks of relevant retrieved passages.
    pub fn relevant_ranks(&self) -> Vec<usize> {
        self.relevance
            .iter()
            .enumerate()
            .filter(|(_, matched)| matched.is_some())
            .map(|(index, _)| index + 1)
            .collect()
    }
}

/// Stateless per-query scorer built from an [`EvalConfig`].
#[derive(Debug, Clone)]
pub struct Evaluator {
    normalizer: Normalizer,
    policy: MatchPolicy,
}

impl Evaluator {
    pub fn new(config: &EvalConfig) -> Self {
        Self {
            normalizer: config.normalizer(),
            policy: config.match_policy,
        }
    }

    pub fn evaluate(&self, record: &QueryRecord) -> QueryEvaluation {
        self.evaluate_passages(&record.reference_passages, &record.retrieved_passages)
    }

    pub fn evaluate_passages(&self, references: &[String], retrieved: &[String]) -> QueryEvaluation {
        let references = self.normalizer.normalize_all(references);
        let retrieved = self.normalizer.normalize_all(retrieved);
        score_normalized(self.policy, &references, &retrieved)
    }
}

fn score_normalized(
    policy: MatchPolicy,
    references: &[String],
    retrieved: &[String],
) -> QueryEvaluation {
    if references.is_empty() || retrieved.is_empty() {
        return QueryEvaluation {
            metrics: MetricsResult::zero(retrieved.len(), references.len()),
            relevance: vec![None; retrieved.len()],
        };
    }

    let index = ReferenceIndex::new(policy, references);
    let relevance = retrieved
        .iter()
        .map(|passage| index.matched_reference(passage))
        .collect::<Vec<Option<usize>>>();

    let relevant_count = relevance.iter().filter(|matched| matched.is_some()).count();
    let covered_count = index
        .coverage(retrieved)
        .into_iter()
        .filter(|covered| *covered)
        .count();
    let mean_reciprocal_rank = relevance
        .iter()
        .position(Option::is_some)
        .map_or(0.0, |first| 1.0 / (first as f64 + 1.0));

    QueryEvaluation {
        metrics: MetricsResult {
            hit_rate: u8::from(relevant_count > 0),
            precision: relevant_count as f64 / retrieved.len() as f64,
            recall: covered_count as f64 / references.len() as f64,
            mean_reciprocal_rank,
            retrieved_count: retrieved.len(),
            reference_count: references.len(),
        },
        relevance,
    }
}
