use anyhow::Result;

use super::table::Table;
use crate::engine::{MetricsResult, aggregate};
use crate::model::{GroupBreakdown, GroupSummary};

/// Maps a synthesizer name onto a coarse query complexity label.
pub fn complexity_label(synthesizer_name: &str) -> &'static str {
    let lowered = synthesizer_name.to_lowercase();
    if lowered.contains("single") {
        "single_hop"
    } else if lowered.contains("multi") {
        "multi_hop"
    } else {
        "other"
    }
}

/// Per distinct value of `column`, the summary over the matching rows.
/// Groups keep the order in which their value first appears.
pub fn breakdown_by_column(
    table: &Table,
    metrics: &[MetricsResult],
    column: &str,
    derive_complexity: bool,
) -> Result<GroupBreakdown> {
    let column_index = table.require_column(column)?;

    let mut groups = Vec::<(String, Vec<MetricsResult>)>::new();
    for (row, row_metrics) in table.rows.iter().zip(metrics) {
        let raw = row.get(column_index).unwrap_or_default().trim();
        let value = if derive_complexity {
            complexity_label(raw).to_string()
        } else {
            raw.to_string()
        };

        match groups.iter_mut().find(|(existing, _)| *existing == value) {
            Some((_, members)) => members.push(*row_metrics),
            None => groups.push((value, vec![*row_metrics])),
        }
    }

    Ok(GroupBreakdown {
        column: column.to_string(),
        derived: derive_complexity,
        groups: groups
            .into_iter()
            .filter_map(|(value, members)| {
                aggregate(&members).map(|summary| GroupSummary { value, summary })
            })
            .collect(),
    })
}
