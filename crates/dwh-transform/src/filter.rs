//! Row scoping.

use dwh_model::Table;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Keeps or drops rows by comparing one column with a list of values.
///
/// Values are compared after trimming, on the cell's key text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum RowFilter {
    Include { column: String, values: Vec<String> },
    Exclude { column: String, values: Vec<String> },
}

impl RowFilter {
    pub fn include(column: impl Into<String>, values: &[&str]) -> Self {
        Self::Include {
            column: column.into(),
            values: values.iter().map(|v| (*v).to_string()).collect(),
        }
    }

    pub fn exclude(column: impl Into<String>, values: &[&str]) -> Self {
        Self::Exclude {
            column: column.into(),
            values: values.iter().map(|v| (*v).to_string()).collect(),
        }
    }

    pub fn column(&self) -> &str {
        match self {
            Self::Include { column, .. } | Self::Exclude { column, .. } => column,
        }
    }

    /// Returns the number of rows removed.
    pub fn apply(&self, table: &mut Table) -> Result<usize> {
        let (column, values, keep_matches) = match self {
            Self::Include { column, values } => (column, values, true),
            Self::Exclude { column, values } => (column, values, false),
        };
        let idx = table.require_column(column)?;
        let wanted: Vec<&str> = values.iter().map(|v| v.trim()).collect();
        let removed = table.retain_rows(|row| {
            let cell = row[idx].key_text();
            wanted.contains(&cell.trim()) == keep_matches
        });
        Ok(removed)
    }
}

/// Applies filters in order, returning the total number of rows removed.
pub fn apply_filters(table: &mut Table, filters: &[RowFilter]) -> Result<usize> {
    let mut removed = 0;
    for filter in filters {
        let count = filter.apply(table)?;
        if count > 0 {
            tracing::debug!(column = filter.column(), removed = count, "filtered rows");
        }
        removed += count;
    }
    Ok(removed)
}
