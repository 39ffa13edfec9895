use serde::Serialize;

use super::metrics::MetricsResult;

/// Unweighted means over a set of queries.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DatasetSummary {
    pub query_count: usize,
    pub hit_rate: f64,
    pub precision: f64,
    pub recall: f64,
    pub mean_reciprocal_rank: f64,
}

/// Running sums for incremental (and mergeable) averaging.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SummaryAccumulator {
    count: usize,
    hit_rate: f64,
    precision: f64,
    recall: f64,
    mean_reciprocal_rank: f64,
}

impl SummaryAccumulator {
    pub fn push(&mut self, metrics: &MetricsResult) {
        self.count += 1;
        self.hit_rate += f64::from(metrics.hit_rate);
        self.precision += metrics.precision;
        self.recall += metrics.recall;
        self.mean_reciprocal_rank += metrics.mean_reciprocal_rank;
    }

    pub fn merge(&mut self, other: &SummaryAccumulator) {
        self.count += other.count;
        self.hit_rate += other.hit_rate;
        self.precision += other.precision;
        self.recall += other.recall;
        self.mean_reciprocal_rank += other.mean_reciprocal_rank;
    }

    pub fn count(&self) -> usize {
        self.count
    }

    /// `None` when nothing was pushed: the mean of zero queries is undefined.
    pub fn finish(&self) -> Option<DatasetSummary> {
        if self.count == 0 {
            return None;
        }

        let n = self.count as f64;
        Some(DatasetSummary {
            query_count: self.count,
            hit_rate: self.hit_rate / n,
            precision: self.precision / n,
            recall: self.recall / n,
            mean_reciprocal_rank: self.mean_reciprocal_rank / n,
        })
    }
}

pub fn aggregate(results: &[MetricsResult]) -> Option<DatasetSummary> {
    let mut accumulator = SummaryAccumulator::default();
    for metrics in results {
        accumulator.push(metrics);
    }
    accumulator.finish()
}
