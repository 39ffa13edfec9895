use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use chrono::Utc;
use tracing::{debug, info, warn};

use super::breakdown::breakdown_by_column;
use super::output::{log_summary, write_results};
use super::table::{IngestedRow, ingest_records, read_table};
use crate::cli::EvaluateArgs;
use crate::engine::{EvalConfig, Evaluator, MetricsResult, QueryEvaluation, SummaryAccumulator};
use crate::model::{ColumnNames, EvaluationReport, GroupBreakdown, ReportPaths};
use crate::util::{ensure_directory, now_utc_string, sha256_file, utc_compact_string, write_json_pretty};

const REPORT_VERSION: u32 = 1;

pub fn run(args: EvaluateArgs) -> Result<()> {
    let run_id = format!("eval-{}", utc_compact_string(Utc::now()));
    let config = EvalConfig::new(args.match_policy.as_policy())
        .with_normalization(!args.no_normalization);
    let columns = ColumnNames {
        reference: args.reference_column.clone(),
        retrieved: args.retrieved_column.clone(),
        query: args.query_column.clone(),
    };
    let (results_path, report_path) = resolve_output_paths(&args)?;

    info!(
        run_id = %run_id,
        input = %args.input.display(),
        match_policy = config.match_policy.as_str(),
        normalization = config.normalization_enabled,
        "starting evaluation"
    );

    let input = File::open(&args.input)
        .with_context(|| format!("failed to open {}", args.input.display()))?;
    let table = read_table(BufReader::new(input))
        .with_context(|| format!("failed to read {}", args.input.display()))?;
    let (rows, ingest) = ingest_records(&table, &columns)?;

    if ingest.degraded_row_count > 0 {
        warn!(
            degraded_rows = ingest.degraded_row_count,
            degraded_cells = ingest.degraded_cell_count,
            rows = ingest.row_count,
            "some passage lists could not be parsed and were scored as empty"
        );
    }

    let evaluator = Evaluator::new(&config);
    let evaluations = rows
        .iter()
        .enumerate()
        .map(|(index, row)| {
            let evaluation = evaluator.evaluate(&row.record);
            debug!(
                row = index,
                query = %row.record.query_text,
                hit_rate = evaluation.metrics.hit_rate,
                mrr = evaluation.metrics.mean_reciprocal_rank,
                "scored query"
            );
            evaluation
        })
        .collect::<Vec<QueryEvaluation>>();
    let metrics = evaluations
        .iter()
        .map(|evaluation| evaluation.metrics)
        .collect::<Vec<MetricsResult>>();

    let (clean, degraded) = accumulate_by_parse_state(&rows, &metrics);
    let mut overall = clean;
    overall.merge(&degraded);
    let Some(summary) = overall.finish() else {
        bail!(
            "insufficient data: {} contains no rows to evaluate",
            args.input.display()
        );
    };
    log_summary(&summary);

    let clean_rows_summary = clean.finish();
    if degraded.count() > 0
        && let Some(clean_summary) = &clean_rows_summary
    {
        info!(
            queries = clean_summary.query_count,
            excluded = degraded.count(),
            hit_rate = clean_summary.hit_rate,
            mrr = clean_summary.mean_reciprocal_rank,
            "summary over rows whose passage lists parsed"
        );
    }

    let mut breakdowns = Vec::<GroupBreakdown>::new();
    for column in &args.group_by {
        breakdowns.push(breakdown_by_column(&table, &metrics, column, false)?);
    }
    if let Some(column) = &args.complexity_column {
        breakdowns.push(breakdown_by_column(&table, &metrics, column, true)?);
    }
    for breakdown in &breakdowns {
        for group in &breakdown.groups {
            info!(
                column = %breakdown.column,
                value = %group.value,
                queries = group.summary.query_count,
                hit_rate = group.summary.hit_rate,
                mrr = group.summary.mean_reciprocal_rank,
                "group summary"
            );
        }
    }

    if let Some(parent) = results_path.parent() {
        ensure_directory(parent)?;
    }
    let results_file = File::create(&results_path)
        .with_context(|| format!("failed to create {}", results_path.display()))?;
    write_results(BufWriter::new(results_file), &table, &rows, &evaluations)
        .with_context(|| format!("failed to write {}", results_path.display()))?;
    info!(path = %results_path.display(), rows = rows.len(), "wrote per-query results");

    let report = EvaluationReport {
        report_version: REPORT_VERSION,
        run_id,
        generated_at: now_utc_string(),
        input_sha256: sha256_file(&args.input)?,
        paths: ReportPaths {
            input_path: args.input.display().to_string(),
            results_path: results_path.display().to_string(),
            report_path: report_path.display().to_string(),
        },
        config,
        columns,
        ingest,
        summary,
        clean_rows_summary,
        breakdowns,
    };
    write_json_pretty(&report_path, &report)?;
    info!(path = %report_path.display(), "wrote evaluation report");

    Ok(())
}

/// Partial sums for rows that parsed cleanly and rows that were degraded.
fn accumulate_by_parse_state(
    rows: &[IngestedRow],
    metrics: &[MetricsResult],
) -> (SummaryAccumulator, SummaryAccumulator) {
    let mut clean = SummaryAccumulator::default();
    let mut degraded = SummaryAccumulator::default();
    for (row, row_metrics) in rows.iter().zip(metrics) {
        if row.degraded {
            degraded.push(row_metrics);
        } else {
            clean.push(row_metrics);
        }
    }
    (clean, degraded)
}

fn resolve_output_paths(args: &EvaluateArgs) -> Result<(PathBuf, PathBuf)> {
    let stem = input_stem(&args.input)?;
    let results_path = args
        .results_path
        .clone()
        .unwrap_or_else(|| args.output_dir.join(format!("{stem}_results.csv")));
    let report_path = args
        .report_path
        .clone()
        .unwrap_or_else(|| args.output_dir.join(format!("{stem}_report.json")));

    if results_path == args.input {
        bail!(
            "results path would overwrite the input file: {}",
            results_path.display()
        );
    }

    Ok((results_path, report_path))
}

fn input_stem(path: &Path) -> Result<String> {
    path.file_stem()
        .and_then(|stem| stem.to_str())
        .map(ToOwned::to_owned)
        .with_context(|| format!("input path has no usable file name: {}", path.display()))
}
