use serde::Serialize;

use crate::engine::{DatasetSummary, EvalConfig};

#[derive(Debug, Clone, Serialize)]
pub struct ColumnNames {
    pub reference: String,
    pub retrieved: String,
    pub query: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IngestStats {
    pub row_count: usize,
    pub degraded_row_count: usize,
    pub degraded_cell_count: usize,
    pub empty_reference_rows: usize,
    pub empty_retrieved_rows: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct GroupSummary {
    pub value: String,
    pub summary: DatasetSummary,
}

#[derive(Debug, Clone, Serialize)]
pub struct GroupBreakdown {
    pub column: String,
    pub derived: bool,
    pub groups: Vec<GroupSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportPaths {
    pub input_path: String,
    pub results_path: String,
    pub report_path: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct EvaluationReport {
    pub report_version: u32,
    pub run_id: String,
    pub generated_at: String,
    pub input_sha256: String,
    pub paths: ReportPaths,
    pub config: EvalConfig,
    pub columns: ColumnNames,
    pub ingest: IngestStats,
    pub summary: DatasetSummary,
    pub clean_rows_summary: Option<DatasetSummary>,
    pub breakdowns: Vec<GroupBreakdown>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SimulationCounts {
    pub row_count: usize,
    pub pool_size: usize,
    pub top_rank_rows: usize,
    pub buried_rows: usize,
    pub miss_rows: usize,
    pub no_reference_rows: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct SimulationManifest {
    pub manifest_version: u32,
    pub run_id: String,
    pub generated_at: String,
    pub input_path: String,
    pub input_sha256: String,
    pub output_path: String,
    pub reference_column: String,
    pub retrieved_column: String,
    pub top_k: usize,
    pub seed: u64,
    pub counts: SimulationCounts,
}
