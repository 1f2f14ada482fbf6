//! Column profiling.
//!
//! Mirrors the exploratory pass analysts run before cleaning a new extract:
//! how many values are missing per column, how many distinct values remain,
//! the category list for low-cardinality columns and the range of numeric
//! ones.

use dwh_common::any_to_string;
use dwh_model::Table;
use polars::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::frame::table_to_frame;

/// Columns with more distinct values than this get no category list.
pub const MAX_CATEGORIES: usize = 9;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnProfile {
    pub column: String,
    pub absent: usize,
    pub distinct: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub categories: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range: Option<(f64, f64)>,
}

pub fn profile_table(table: &Table) -> Result<Vec<ColumnProfile>> {
    let df = table_to_frame(table)?;
    df.get_columns().iter().map(profile_column).collect()
}

fn profile_column(column: &Column) -> Result<ColumnProfile> {
    let series = column.as_materialized_series();
    let present = series.drop_nulls();
    let distinct = present.n_unique()?;

    let categories = if distinct > 1 && distinct <= MAX_CATEGORIES {
        let unique = present.unique_stable()?;
        let mut values = (0..unique.len())
            .map(|idx| unique.get(idx).map(any_to_string))
            .collect::<PolarsResult<Vec<_>>>()?;
        values.sort();
        Some(values)
    } else {
        None
    };

    let range = if series.dtype() == &DataType::Float64 {
        let values = series.f64()?;
        values.min().zip(values.max())
    } else {
        None
    };

    Ok(ColumnProfile {
        column: column.name().to_string(),
        absent: series.null_count(),
        distinct,
        categories,
        range,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use dwh_model::CanonicalValue;

    #[test]
    fn profiles_text_and_numeric_columns() {
        let table = Table::from_rows(
            vec!["Regioni".to_string(), "Donne".to_string()],
            vec![
                vec![CanonicalValue::text("Lombardia"), CanonicalValue::number(12.0)],
                vec![CanonicalValue::text("Lazio"), CanonicalValue::Absent],
                vec![CanonicalValue::text("Lombardia"), CanonicalValue::number(3.5)],
                vec![CanonicalValue::Absent, CanonicalValue::number(40.0)],
            ],
        )
        .expect("table");
        let profile = profile_table(&table).expect("profile");

        assert_eq!(profile[0].column, "Regioni");
        assert_eq!(profile[0].absent, 1);
        assert_eq!(profile[0].distinct, 2);
        assert_eq!(
            profile[0].categories,
            Some(vec!["Lazio".to_string(), "Lombardia".to_string()])
        );
        assert_eq!(profile[0].range, None);

        assert_eq!(profile[1].absent, 1);
        assert_eq!(profile[1].distinct, 3);
        assert_eq!(profile[1].range, Some((3.5, 40.0)));
    }

    #[test]
    fn single_value_columns_have_no_categories() {
        let table = Table::from_rows(
            vec!["anno".to_string()],
            vec![vec![CanonicalValue::number(2019.0)]; 3],
        )
        .expect("table");
        let profile = profile_table(&table).expect("profile");
        assert_eq!(profile[0].distinct, 1);
        assert_eq!(profile[0].categories, None);
    }
}
