//! Derived columns.

use dwh_common::parse_f64;
use dwh_model::{CanonicalValue, Table};
use regex::Regex;

use crate::error::{Result, TransformError};

/// Appends `target` as the `separator`-joined key text of `sources`.
///
/// Absent parts are rendered as `absent_fill`; the result is never absent.
pub fn concat_columns(
    table: Table,
    target: &str,
    sources: &[&str],
    separator: &str,
    absent_fill: &str,
) -> Result<Table> {
    if sources.is_empty() {
        return Err(TransformError::NoColumns {
            what: "concatenation",
        });
    }
    let indices = sources
        .iter()
        .map(|source| table.require_column(source))
        .collect::<std::result::Result<Vec<_>, _>>()?;
    let table = table.with_derived(target, |row| {
        let parts: Vec<String> = indices
            .iter()
            .map(|&idx| match &row[idx] {
                CanonicalValue::Absent => absent_fill.to_string(),
                value => value.key_text().into_owned(),
            })
            .collect();
        CanonicalValue::Text(parts.join(separator))
    })?;
    Ok(table)
}

/// Appends `target` holding the first match of `pattern` in `source`.
///
/// The first capture group is used when the pattern has one, the whole
/// match otherwise. Numeric matches become numbers. Returns the table and
/// the number of present values the pattern did not match.
pub fn extract_pattern(
    table: Table,
    source: &str,
    target: &str,
    pattern: &Regex,
) -> Result<(Table, usize)> {
    let idx = table.require_column(source)?;
    let mut unmatched = 0usize;
    let table = table.with_derived(target, |row| {
        let value = &row[idx];
        if value.is_absent() {
            return CanonicalValue::Absent;
        }
        let text = value.key_text();
        let Some(captures) = pattern.captures(&text) else {
            unmatched += 1;
            return CanonicalValue::Absent;
        };
        let matched = captures
            .get(1)
            .or_else(|| captures.get(0))
            .map_or("", |m| m.as_str());
        match parse_f64(matched) {
            Some(number) => CanonicalValue::number(number),
            None => CanonicalValue::text(matched),
        }
    })?;
    Ok((table, unmatched))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn measures() -> Table {
        Table::from_rows(
            vec!["wstatus".to_string(), "age".to_string()],
            vec![
                vec![CanonicalValue::text("EMP"), CanonicalValue::text("Y15-64")],
                vec![CanonicalValue::Absent, CanonicalValue::text("Y20-64")],
            ],
        )
        .expect("table")
    }

    #[test]
    fn concat_fills_absent_parts() {
        let table = concat_columns(measures(), "tipo_misura", &["wstatus", "age"], "_", "NA")
            .expect("concat");
        assert_eq!(table.rows()[0][2], CanonicalValue::text("EMP_Y15-64"));
        assert_eq!(table.rows()[1][2], CanonicalValue::text("NA_Y20-64"));
    }

    #[test]
    fn concat_requires_sources() {
        assert!(concat_columns(measures(), "x", &[], "_", "NA").is_err());
    }

    #[test]
    fn extract_year_from_academic_period() {
        let table = Table::from_rows(
            vec!["ANNO".to_string()],
            vec![
                vec![CanonicalValue::text("2023/2024")],
                vec![CanonicalValue::text("a.a. 2022")],
                vec![CanonicalValue::Absent],
            ],
        )
        .expect("table");
        let pattern = Regex::new(r"^\d{4}").expect("pattern");
        let (table, unmatched) = extract_pattern(table, "ANNO", "anno", &pattern).expect("extract");
        assert_eq!(table.rows()[0][1], CanonicalValue::number(2023.0));
        assert!(table.rows()[1][1].is_absent());
        assert!(table.rows()[2][1].is_absent());
        assert_eq!(unmatched, 1);
    }

    #[test]
    fn extract_uses_capture_group() {
        let table = Table::from_rows(
            vec!["period".to_string()],
            vec![vec![CanonicalValue::text("FY-2021-Q1")]],
        )
        .expect("table");
        let pattern = Regex::new(r"FY-(\d{4})").expect("pattern");
        let (table, _) = extract_pattern(table, "period", "year", &pattern).expect("extract");
        assert_eq!(table.rows()[0][1], CanonicalValue::number(2021.0));
    }
}
