//! Long to wide reshaping with sum aggregation.
//!
//! Enrollment extracts carry one row per (year, faculty, sex); the analysis
//! table wants one row per (year, faculty) with a column per sex.

use std::collections::BTreeMap;

use dwh_model::{CanonicalValue, Table};
use serde::{Deserialize, Serialize};

use crate::error::{Result, TransformError};

/// Maps a pivot category label onto an output column.
///
/// Labels match case-insensitively after trimming.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PivotCategory {
    pub label: String,
    pub column: String,
}

impl PivotCategory {
    pub fn new(label: &str, column: &str) -> Self {
        Self {
            label: label.to_string(),
            column: column.to_string(),
        }
    }

    fn matches(&self, value: &str) -> bool {
        self.label.trim().eq_ignore_ascii_case(value.trim())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Pivoted {
    pub table: Table,
    /// Rows skipped because an index value was absent.
    pub absent_index: usize,
    /// Rows whose category matched no output column.
    pub unmapped: usize,
}

/// Groups by `index`, sums `value` per category into one column each.
///
/// Groups come out sorted by index values. A group with no value for a
/// category gets 0. Absent values contribute nothing to the sum.
pub fn pivot_sum(
    table: &Table,
    index: &[&str],
    category_column: &str,
    value_column: &str,
    categories: &[PivotCategory],
) -> Result<Pivoted> {
    if index.is_empty() || categories.is_empty() {
        return Err(TransformError::NoColumns { what: "pivot" });
    }
    let index_idx = index
        .iter()
        .map(|column| table.require_column(column))
        .collect::<std::result::Result<Vec<_>, _>>()?;
    let category_idx = table.require_column(category_column)?;
    let value_idx = table.require_column(value_column)?;

    let mut groups: BTreeMap<Vec<CanonicalValue>, Vec<f64>> = BTreeMap::new();
    let mut absent_index = 0usize;
    let mut unmapped = 0usize;

    for row in table.rows() {
        let key: Vec<CanonicalValue> = index_idx.iter().map(|&idx| row[idx].clone()).collect();
        if key.iter().any(CanonicalValue::is_absent) {
            absent_index += 1;
            continue;
        }
        let sums = groups
            .entry(key)
            .or_insert_with(|| vec![0.0; categories.len()]);
        let label = row[category_idx].key_text();
        let Some(slot) = categories.iter().position(|c| c.matches(&label)) else {
            unmapped += 1;
            continue;
        };
        if let Some(value) = row[value_idx].as_number() {
            sums[slot] += value;
        }
    }

    let mut columns: Vec<String> = index.iter().map(|c| (*c).to_string()).collect();
    columns.extend(categories.iter().map(|c| c.column.clone()));
    let mut output = Table::new(columns)?;
    for (key, sums) in groups {
        let mut cells = key;
        cells.extend(sums.into_iter().map(CanonicalValue::number));
        output.push_row(cells)?;
    }

    if unmapped > 0 {
        tracing::warn!(
            column = category_column,
            unmapped,
            "rows with an unrecognised category were not counted"
        );
    }
    Ok(Pivoted {
        table: output,
        absent_index,
        unmapped,
    })
}
