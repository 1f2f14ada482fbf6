//! Conversion of normalized tables into Polars frames.

use dwh_model::{CanonicalValue, Table};
use polars::prelude::*;

use crate::error::Result;

/// Builds a `DataFrame` with one column per table column.
///
/// Columns holding only numbers (and absent values) become `Float64`;
/// anything else becomes `String` with numbers in invariant form. Absent
/// values are nulls.
pub fn table_to_frame(table: &Table) -> Result<DataFrame> {
    let mut columns: Vec<Column> = Vec::with_capacity(table.width());
    for (idx, name) in table.columns().iter().enumerate() {
        let numeric = table
            .rows()
            .iter()
            .all(|row| matches!(row[idx], CanonicalValue::Number(_) | CanonicalValue::Absent));
        let column = if numeric {
            let values: Vec<Option<f64>> = table.rows().iter().map(|row| row[idx].as_number()).collect();
            Series::new(name.as_str().into(), values).into()
        } else {
            let values: Vec<Option<String>> = table
                .rows()
                .iter()
                .map(|row| (!row[idx].is_absent()).then(|| row[idx].key_text().into_owned()))
                .collect();
            Series::new(name.as_str().into(), values).into()
        };
        columns.push(column);
    }
    DataFrame::new(columns).map_err(Into::into)
}
