use std::io::Write;

use anyhow::{Context, Result};
use csv::WriterBuilder;
use tracing::info;

use super::table::{IngestedRow, Table};
use crate::engine::{DatasetSummary, QueryEvaluation};

pub const RESULT_COLUMNS: [&str; 8] = [
    "hit_rate",
    "precision",
    "recall",
    "mean_reciprocal_rank",
    "retrieved_count",
    "reference_count",
    "relevant_ranks",
    "degraded",
];

/// Writes the input table with one result column block appended per row.
pub fn write_results<W: Write>(
    writer: W,
    table: &Table,
    rows: &[IngestedRow],
    evaluations: &[QueryEvaluation],
) -> Result<()> {
    let mut csv_writer = WriterBuilder::new().flexible(true).from_writer(writer);

    let mut header = table.headers.clone();
    for column in RESULT_COLUMNS {
        header.push_field(column);
    }
    csv_writer
        .write_record(&header)
        .context("failed to write results header")?;

    for (index, ((raw, row), evaluation)) in table
        .rows
        .iter()
        .zip(rows)
        .zip(evaluations)
        .enumerate()
    {
        let mut record = raw.clone();
        // Short rows are padded so appended columns line up with the header.
        while record.len() < table.headers.len() {
            record.push_field("");
        }

        let metrics = &evaluation.metrics;
        let ranks = evaluation
            .relevant_ranks()
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<String>>()
            .join(";");
        record.push_field(&metrics.hit_rate.to_string());
        record.push_field(&metrics.precision.to_string());
        record.push_field(&metrics.recall.to_string());
        record.push_field(&metrics.mean_reciprocal_rank.to_string());
        record.push_field(&metrics.retrieved_count.to_string());
        record.push_field(&metrics.reference_count.to_string());
        record.push_field(&ranks);
        record.push_field(if row.degraded { "true" } else { "false" });

        csv_writer
            .write_record(&record)
            .with_context(|| format!("failed to write results row {index}"))?;
    }

    csv_writer.flush().context("failed to flush results")?;
    Ok(())
}

pub fn log_summary(summary: &DatasetSummary) {
    info!(
        queries = summary.query_count,
        hit_rate = %format_percent(summary.hit_rate),
        mrr = %format!("{:.4}", summary.mean_reciprocal_rank),
        precision = %format_percent(summary.precision),
        recall = %format_percent(summary.recall),
        "evaluation summary"
    );
}

pub fn format_percent(ratio: f64) -> String {
    format!("{:.2}%", ratio * 100.0)
}

#[cfg(test)]
mod tests {
    use super::{format_percent, write_results};
    use crate::commands::evaluate::table::{ingest_records, read_table};
    use crate::engine::{EvalConfig, Evaluator, MatchPolicy};
    use crate::model::ColumnNames;

    #[test]
    fn results_keep_input_columns_and_append_metrics() {
        let input = "\
user_input,reference_contexts,retrieved_contexts
q1,\"['Paris is the capital of France.']\",\"['Berlin is in Germany.', 'Paris is the capital of France.']\"
q2,['x'],broken
";
        let table = read_table(input.as_bytes()).expect("csv should read");
        let columns = ColumnNames {
            reference: "reference_contexts".to_string(),
            retrieved: "retrieved_contexts".to_string(),
            query: "user_input".to_string(),
        };
        let (rows, _) = ingest_records(&table, &columns).expect("columns exist");
        let evaluator = Evaluator::new(&EvalConfig::new(MatchPolicy::ExactSet));
        let evaluations = rows
            .iter()
            .map(|row| evaluator.evaluate(&row.record))
            .collect::<Vec<_>>();

        let mut buffer = Vec::new();
        write_results(&mut buffer, &table, &rows, &evaluations).expect("write should succeed");
        let output = String::from_utf8(buffer).expect("utf8 output");
        let lines = output.lines().collect::<Vec<&str>>();

        assert_eq!(
            lines[0],
            "user_input,reference_contexts,retrieved_contexts,hit_rate,precision,recall,mean_reciprocal_rank,retrieved_count,reference_count,relevant_ranks,degraded"
        );
        assert!(lines[1].starts_with("q1,"));
        assert!(lines[1].ends_with(",1,0.5,1,0.5,2,1,2,false"));
        assert_eq!(lines[2], "q2,['x'],broken,0,0,0,0,0,1,,true");
    }

    #[test]
    fn percent_uses_two_decimals() {
        assert_eq!(format_percent(2.0 / 3.0), "66.67%");
        assert_eq!(format_percent(0.0), "0.00%");
    }
}
