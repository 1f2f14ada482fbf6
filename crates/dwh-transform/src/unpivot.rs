//! Wide to long reshaping.

use dwh_model::{CanonicalValue, Table};

use crate::error::{Result, TransformError};

#[derive(Debug, Clone, PartialEq)]
pub struct Unpivoted {
    pub table: Table,
    /// Cells skipped because their value was absent.
    pub dropped_absent: usize,
}

/// Turns each value column of each row into its own output row.
///
/// Output columns are `id_columns`, then `variable_name` (the source column
/// name as text), then `value_name`. Rows come out in source row order and,
/// within a row, in `value_columns` order. Absent values produce no row.
pub fn unpivot(
    table: &Table,
    id_columns: &[&str],
    value_columns: &[&str],
    variable_name: &str,
    value_name: &str,
) -> Result<Unpivoted> {
    if value_columns.is_empty() {
        return Err(TransformError::NoColumns { what: "unpivot" });
    }
    let id_idx = id_columns
        .iter()
        .map(|column| table.require_column(column))
        .collect::<std::result::Result<Vec<_>, _>>()?;
    let value_idx = value_columns
        .iter()
        .map(|column| table.require_column(column))
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let mut columns: Vec<String> = id_columns.iter().map(|c| (*c).to_string()).collect();
    columns.push(variable_name.to_string());
    columns.push(value_name.to_string());
    let mut output = Table::new(columns)?;
    let mut dropped_absent = 0usize;

    for row in table.rows() {
        for (column, &idx) in value_columns.iter().zip(&value_idx) {
            let value = &row[idx];
            if value.is_absent() {
                dropped_absent += 1;
                continue;
            }
            let mut cells = Vec::with_capacity(id_idx.len() + 2);
            cells.extend(id_idx.iter().map(|&i| row[i].clone()));
            cells.push(CanonicalValue::text(*column));
            cells.push(value.clone());
            output.push_row(cells)?;
        }
    }

    tracing::debug!(
        rows_in = table.height(),
        rows_out = output.height(),
        dropped_absent,
        "unpivoted"
    );
    Ok(Unpivoted {
        table: output,
        dropped_absent,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn wide() -> Table {
        Table::from_rows(
            vec!["nome".to_string(), "men".to_string(), "women".to_string()],
            vec![
                vec![
                    CanonicalValue::text("Acme"),
                    CanonicalValue::number(5.0),
                    CanonicalValue::number(3.0),
                ],
                vec![
                    CanonicalValue::text("Beta"),
                    CanonicalValue::Absent,
                    CanonicalValue::number(7.0),
                ],
            ],
        )
        .expect("table")
    }

    #[test]
    fn emits_rows_in_row_then_column_order() {
        let result = unpivot(&wide(), &["nome"], &["men", "women"], "metric", "value")
            .expect("unpivot");
        assert_eq!(result.table.columns(), &["nome", "metric", "value"]);
        let rows: Vec<(String, String, String)> = result
            .table
            .rows()
            .iter()
            .map(|r| (r[0].to_string(), r[1].to_string(), r[2].to_string()))
            .collect();
        assert_eq!(
            rows,
            vec![
                ("Acme".to_string(), "men".to_string(), "5".to_string()),
                ("Acme".to_string(), "women".to_string(), "3".to_string()),
                ("Beta".to_string(), "women".to_string(), "7".to_string()),
            ]
        );
        assert_eq!(result.dropped_absent, 1);
    }

    #[test]
    fn missing_value_column_is_named() {
        let err = unpivot(&wide(), &["nome"], &["children"], "m", "v").expect_err("missing");
        assert!(err.to_string().contains("children"));
    }

    proptest! {
        #[test]
        fn output_size_is_cells_minus_absent(
            cells in proptest::collection::vec(proptest::collection::vec(proptest::option::of(-1000i32..1000), 3), 0..25)
        ) {
            let columns = vec!["id".to_string(), "a".to_string(), "b".to_string(), "c".to_string()];
            let mut rows = Vec::new();
            let mut absent = 0usize;
            for (idx, row) in cells.iter().enumerate() {
                let mut out = vec![CanonicalValue::number(idx as f64)];
                for cell in row {
                    match cell {
                        Some(v) => out.push(CanonicalValue::number(f64::from(*v))),
                        None => {
                            absent += 1;
                            out.push(CanonicalValue::Absent);
                        }
                    }
                }
                rows.push(out);
            }
            let table = Table::from_rows(columns, rows).expect("table");
            let result = unpivot(&table, &["id"], &["a", "b", "c"], "m", "v").expect("unpivot");
            prop_assert_eq!(result.table.height(), cells.len() * 3 - absent);
            prop_assert_eq!(result.dropped_absent, absent);
            prop_assert!(result.table.rows().iter().all(|r| !r[2].is_absent()));
        }
    }
}
