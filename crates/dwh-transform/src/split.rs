//! Composite field decomposition.
//!
//! Labour extracts pack several coded sub-dimensions into one field
//! (`A,EMP,Y15-64,THS_PER,IT\TIME_PERIOD`). The splitter breaks that field
//! into exactly one part per target name; rows with any other part count are
//! set aside rather than failing the table.

use dwh_model::{CanonicalValue, Table};
use serde::Serialize;

use crate::error::{Result, TransformError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompositeSplitter {
    delimiter: String,
    targets: Vec<String>,
    suffix: Option<String>,
}

/// A row whose composite value did not split into the expected arity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SplitRejection {
    pub row: usize,
    pub value: String,
    pub found: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SplitOutcome {
    pub table: Table,
    pub rejected: Vec<SplitRejection>,
}

impl CompositeSplitter {
    pub fn new(delimiter: impl Into<String>, targets: Vec<String>) -> Result<Self> {
        if targets.is_empty() {
            return Err(TransformError::NoColumns {
                what: "composite split",
            });
        }
        Ok(Self {
            delimiter: delimiter.into(),
            targets,
            suffix: None,
        })
    }

    /// Removes `suffix` from the last part wherever it occurs.
    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        let suffix = suffix.into();
        self.suffix = (!suffix.is_empty()).then_some(suffix);
        self
    }

    pub fn targets(&self) -> &[String] {
        &self.targets
    }

    /// Splits one value. On arity mismatch returns the number of parts found.
    pub fn split(&self, value: &str) -> std::result::Result<Vec<CanonicalValue>, usize> {
        let mut parts: Vec<String> = value
            .split(self.delimiter.as_str())
            .map(|part| part.trim().to_string())
            .collect();
        if parts.len() != self.targets.len() {
            return Err(parts.len());
        }
        if let (Some(suffix), Some(last)) = (&self.suffix, parts.last_mut()) {
            *last = last.replace(suffix.as_str(), "").trim().to_string();
        }
        Ok(parts
            .into_iter()
            .map(|part| {
                if part.is_empty() {
                    CanonicalValue::Absent
                } else {
                    CanonicalValue::Text(part)
                }
            })
            .collect())
    }

    /// Replaces `column` with the target columns, at the same position.
    ///
    /// Rows with an absent composite value or a wrong part count are dropped
    /// from the output and listed in `rejected`.
    pub fn split_column(&self, table: &Table, column: &str) -> Result<SplitOutcome> {
        let idx = table.require_column(column)?;
        let mut columns: Vec<String> = table.columns()[..idx].to_vec();
        columns.extend(self.targets.iter().cloned());
        columns.extend(table.columns()[idx + 1..].iter().cloned());
        let mut output = Table::new(columns)?;
        let mut rejected = Vec::new();

        for (row_idx, row) in table.rows().iter().enumerate() {
            let composite = &row[idx];
            let parts = match composite {
                CanonicalValue::Absent => Err(0),
                value => self.split(&value.key_text()),
            };
            match parts {
                Ok(parts) => {
                    let mut cells = Vec::with_capacity(output.width());
                    cells.extend(row[..idx].iter().cloned());
                    cells.extend(parts);
                    cells.extend(row[idx + 1..].iter().cloned());
                    output.push_row(cells)?;
                }
                Err(found) => rejected.push(SplitRejection {
                    row: row_idx,
                    value: composite.key_text().into_owned(),
                    found,
                }),
            }
        }

        if !rejected.is_empty() {
            tracing::warn!(
                column,
                rejected = rejected.len(),
                expected = self.targets.len(),
                "composite values with unexpected part count were excluded"
            );
        }
        Ok(SplitOutcome {
            table: output,
            rejected,
        })
    }
}
