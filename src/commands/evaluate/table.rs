use std::io::Read;

use anyhow::{Context, Result, bail};
use csv::{ReaderBuilder, StringRecord};
use tracing::warn;

use super::list_cell::parse_passage_list;
use crate::engine::QueryRecord;
use crate::model::{ColumnNames, IngestStats};

/// Raw CSV contents kept around so results can be appended to the original
/// columns.
#[derive(Debug, Clone)]
pub struct Table {
    pub headers: StringRecord,
    pub rows: Vec<StringRecord>,
}

impl Table {
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|header| header == name)
    }

    pub fn require_column(&self, name: &str) -> Result<usize> {
        match self.column_index(name) {
            Some(index) => Ok(index),
            None => bail!(
                "column '{name}' not found in input header [{}]",
                self.headers.iter().collect::<Vec<&str>>().join(", ")
            ),
        }
    }
}

#[derive(Debug, Clone)]
pub struct IngestedRow {
    pub record: QueryRecord,
    pub degraded: bool,
}

pub fn read_table<R: Read>(reader: R) -> Result<Table> {
    let mut csv_reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let headers = csv_reader
        .headers()
        .context("failed to read CSV header row")?
        .clone();

    let mut rows = Vec::new();
    for (index, record) in csv_reader.records().enumerate() {
        let record = record.with_context(|| format!("failed to read CSV row {index}"))?;
        rows.push(record);
    }

    Ok(Table { headers, rows })
}

/// Builds query records, degrading unparseable list cells to empty lists.
pub fn ingest_records(
    table: &Table,
    columns: &ColumnNames,
) -> Result<(Vec<IngestedRow>, IngestStats)> {
    let reference_index = table.require_column(&columns.reference)?;
    let retrieved_index = table.require_column(&columns.retrieved)?;
    let query_index = table.column_index(&columns.query);
    if query_index.is_none() {
        warn!(column = %columns.query, "query column missing; query text left empty");
    }

    let mut stats = IngestStats::default();
    let mut ingested = Vec::with_capacity(table.rows.len());
    for (row_index, row) in table.rows.iter().enumerate() {
        let mut degraded_cells = 0;
        let mut parse_cell = |column: &str, index: usize| {
            let raw = row.get(index).unwrap_or_default();
            match parse_passage_list(raw) {
                Ok(passages) => passages,
                Err(err) => {
                    degraded_cells += 1;
                    warn!(
                        row = row_index,
                        column = %column,
                        error = %err,
                        "unparseable passage list; treating as empty"
                    );
                    Vec::new()
                }
            }
        };

        let reference_passages = parse_cell(columns.reference.as_str(), reference_index);
        let retrieved_passages = parse_cell(columns.retrieved.as_str(), retrieved_index);
        let query_text = query_index
            .and_then(|index| row.get(index))
            .unwrap_or_default()
            .to_string();

        stats.row_count += 1;
        stats.degraded_cell_count += degraded_cells;
        if degraded_cells > 0 {
            stats.degraded_row_count += 1;
        }
        if reference_passages.is_empty() {
            stats.empty_reference_rows += 1;
        }
        if retrieved_passages.is_empty() {
            stats.empty_retrieved_rows += 1;
        }

        ingested.push(IngestedRow {
            record: QueryRecord {
                query_text,
                reference_passages,
                retrieved_passages,
            },
            degraded: degraded_cells > 0,
        });
    }

    Ok((ingested, stats))
}

#[cfg(test)]
mod tests {
    use super::{ingest_records, read_table};
    use crate::model::ColumnNames;

    fn default_columns() -> ColumnNames {
        ColumnNames {
            reference: "reference_contexts".to_string(),
            retrieved: "retrieved_contexts".to_string(),
            query: "user_input".to_string(),
        }
    }

    #[test]
    fn ingest_parses_list_columns_and_counts_degraded_rows() {
        let csv_text = "\
user_input,reference_contexts,retrieved_contexts,synthesizer_name
q1,\"['Paris is the capital of France.']\",\"['Paris is the capital of France.', 'Berlin']\",single_hop
q2,\"['X is true.']\",not a list,multi_hop
q3,,[],single_hop
";
        let table = read_table(csv_text.as_bytes()).expect("csv should read");
        assert_eq!(table.rows.len(), 3);

        let (rows, stats) = ingest_records(&table, &default_columns()).expect("columns exist");
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].record.query_text, "q1");
        assert_eq!(rows[0].record.retrieved_passages.len(), 2);
        assert!(!rows[0].degraded);

        assert!(rows[1].degraded);
        assert!(rows[1].record.retrieved_passages.is_empty());
        assert_eq!(rows[1].record.reference_passages.len(), 1);

        assert!(rows[2].degraded);
        assert_eq!(stats.row_count, 3);
        assert_eq!(stats.degraded_row_count, 2);
        assert_eq!(stats.degraded_cell_count, 2);
        assert_eq!(stats.empty_reference_rows, 1);
        assert_eq!(stats.empty_retrieved_rows, 2);
    }

    #[test]
    fn missing_required_column_is_an_error() {
        let table = read_table("user_input,reference_contexts\nq,[]\n".as_bytes())
            .expect("csv should read");
        let err = ingest_records(&table, &default_columns()).expect_err("retrieved column missing");
        assert!(err.to_string().contains("retrieved_contexts"));
    }

    #[test]
    fn missing_query_column_leaves_query_text_empty() {
        let table = read_table("reference_contexts,retrieved_contexts\n['a'],['a']\n".as_bytes())
            .expect("csv should read");
        let (rows, stats) = ingest_records(&table, &default_columns()).expect("lists present");
        assert_eq!(rows[0].record.query_text, "");
        assert_eq!(stats.degraded_row_count, 0);
    }

    #[test]
    fn deeply_nested_cell_degrades_only_its_row() {
        let nested = format!("{}{}", "[".repeat(50_000), "]".repeat(50_000));
        let csv_text = format!(
            "user_input,reference_contexts,retrieved_contexts\nq1,{nested},['a']\nq2,['a'],['a']\n"
        );
        let table = read_table(csv_text.as_bytes()).expect("csv should read");

        let (rows, stats) = ingest_records(&table, &default_columns()).expect("columns exist");
        assert!(rows[0].degraded);
        assert!(rows[0].record.reference_passages.is_empty());
        assert!(!rows[1].degraded);
        assert_eq!(stats.degraded_cell_count, 1);
    }
}
