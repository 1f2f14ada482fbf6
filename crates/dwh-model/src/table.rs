use std::collections::HashSet;

use crate::{CanonicalValue, ModelError, natural_key_text};

/// Rows as read from a delimited source, before any normalization.
///
/// Every row is exactly `headers.len()` wide; rows with more fields than
/// the header were skipped while reading and are counted in
/// `skipped_rows`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
    pub skipped_rows: usize,
}

impl RawTable {
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|header| header == name)
    }

    pub fn height(&self) -> usize {
        self.rows.len()
    }
}

/// A rectangular table of canonical values with named columns.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<CanonicalValue>>,
}

impl Table {
    pub fn new(columns: Vec<String>) -> Result<Self, ModelError> {
        check_unique(&columns)?;
        Ok(Self {
            columns,
            rows: Vec::new(),
        })
    }

    pub fn from_rows(
        columns: Vec<String>,
        rows: Vec<Vec<CanonicalValue>>,
    ) -> Result<Self, ModelError> {
        let mut table = Self::new(columns)?;
        for row in rows {
            table.push_row(row)?;
        }
        Ok(table)
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<CanonicalValue>] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<Vec<CanonicalValue>> {
        self.rows
    }

    pub fn height(&self) -> usize {
        self.rows.len()
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|column| column == name)
    }

    pub fn require_column(&self, name: &str) -> Result<usize, ModelError> {
        self.column_index(name)
            .ok_or_else(|| ModelError::ColumnNotFound {
                column: name.to_string(),
                available: self.columns.clone(),
            })
    }

    pub fn push_row(&mut self, row: Vec<CanonicalValue>) -> Result<(), ModelError> {
        if row.len() != self.columns.len() {
            return Err(ModelError::RowWidth {
                row: self.rows.len(),
                expected: self.columns.len(),
                found: row.len(),
            });
        }
        self.rows.push(row);
        Ok(())
    }

    pub fn column_values<'a>(
        &'a self,
        name: &str,
    ) -> Result<impl Iterator<Item = &'a CanonicalValue> + use<'a>, ModelError> {
        let idx = self.require_column(name)?;
        Ok(self.rows.iter().map(move |row| &row[idx]))
    }

    /// Returns a new table with only `names`, in the given order.
    pub fn select(&self, names: &[&str]) -> Result<Self, ModelError> {
        let indices = names
            .iter()
            .map(|name| self.require_column(name))
            .collect::<Result<Vec<_>, _>>()?;
        let columns: Vec<String> = names.iter().map(|name| (*name).to_string()).collect();
        let rows = self
            .rows
            .iter()
            .map(|row| indices.iter().map(|&idx| row[idx].clone()).collect())
            .collect();
        check_unique(&columns)?;
        Ok(Self { columns, rows })
    }

    pub fn rename(&mut self, from: &str, to: &str) -> Result<(), ModelError> {
        let idx = self.require_column(from)?;
        if from != to && self.column_index(to).is_some() {
            return Err(ModelError::DuplicateColumn {
                column: to.to_string(),
            });
        }
        self.columns[idx] = to.to_string();
        Ok(())
    }

    /// Appends a column holding `value` on every row.
    pub fn with_constant(
        mut self,
        name: &str,
        value: CanonicalValue,
    ) -> Result<Self, ModelError> {
        if self.column_index(name).is_some() {
            return Err(ModelError::DuplicateColumn {
                column: name.to_string(),
            });
        }
        self.columns.push(name.to_string());
        for row in &mut self.rows {
            row.push(value.clone());
        }
        Ok(self)
    }

    /// Appends a column computed from each row.
    pub fn with_derived<F>(mut self, name: &str, mut derive: F) -> Result<Self, ModelError>
    where
        F: FnMut(&[CanonicalValue]) -> CanonicalValue,
    {
        if self.column_index(name).is_some() {
            return Err(ModelError::DuplicateColumn {
                column: name.to_string(),
            });
        }
        self.columns.push(name.to_string());
        for row in &mut self.rows {
            let value = derive(row);
            row.push(value);
        }
        Ok(self)
    }

    /// Keeps rows matching `keep`, returning how many were removed.
    pub fn retain_rows<F>(&mut self, mut keep: F) -> usize
    where
        F: FnMut(&[CanonicalValue]) -> bool,
    {
        let before = self.rows.len();
        self.rows.retain(|row| keep(row));
        before - self.rows.len()
    }

    /// Drops repeated rows, keeping the first occurrence of each.
    ///
    /// Rows compare on the key text of every cell.
    pub fn dedup_rows(&mut self) -> usize {
        let mut seen = HashSet::new();
        self.retain_rows(|row| seen.insert(natural_key_text(row)))
    }
}

fn check_unique(columns: &[String]) -> Result<(), ModelError> {
    for (idx, column) in columns.iter().enumerate() {
        if columns[..idx].contains(column) {
            return Err(ModelError::DuplicateColumn {
                column: column.clone(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Table {
        Table::from_rows(
            vec!["nome".to_string(), "valore".to_string()],
            vec![
                vec![CanonicalValue::text("Acme"), CanonicalValue::number(5.0)],
                vec![CanonicalValue::text("Beta"), CanonicalValue::Absent],
            ],
        )
        .expect("table")
    }

    #[test]
    fn rejects_ragged_rows() {
        let mut table = sample();
        let err = table
            .push_row(vec![CanonicalValue::Absent])
            .expect_err("width check");
        assert!(matches!(
            err,
            ModelError::RowWidth {
                expected: 2,
                found: 1,
                ..
            }
        ));
    }

    #[test]
    fn rejects_duplicate_columns() {
        assert!(Table::new(vec!["a".to_string(), "a".to_string()]).is_err());
    }

    #[test]
    fn select_reorders_columns() {
        let selected = sample().select(&["valore", "nome"]).expect("select");
        assert_eq!(selected.columns(), &["valore", "nome"]);
        assert_eq!(selected.rows()[0][1], CanonicalValue::text("Acme"));
    }

    #[test]
    fn missing_column_names_the_column() {
        let err = sample().select(&["anno"]).expect_err("missing");
        assert!(err.to_string().contains("anno"));
    }

    #[test]
    fn constant_and_derived_columns() {
        let table = sample()
            .with_constant("anno", CanonicalValue::number(2019.0))
            .expect("constant")
            .with_derived("label", |row| CanonicalValue::text(format!("{}-{}", row[0], row[2])))
            .expect("derived");
        assert_eq!(table.rows()[1][3], CanonicalValue::text("Beta-2019"));
    }

    #[test]
    fn retain_rows_counts_removed() {
        let mut table = sample();
        let removed = table.retain_rows(|row| !row[1].is_absent());
        assert_eq!(removed, 1);
        assert_eq!(table.height(), 1);
    }

    #[test]
    fn dedup_keeps_first_occurrence() {
        let mut table = Table::from_rows(
            vec!["nome".to_string(), "anno".to_string()],
            vec![
                vec![CanonicalValue::text("Beta"), CanonicalValue::number(2019.0)],
                vec![CanonicalValue::text("Acme"), CanonicalValue::Absent],
                vec![CanonicalValue::text("Beta"), CanonicalValue::text("2019")],
                vec![CanonicalValue::text("Acme"), CanonicalValue::Absent],
            ],
        )
        .expect("table");
        assert_eq!(table.dedup_rows(), 2);
        assert_eq!(table.rows()[0][0], CanonicalValue::text("Beta"));
        assert_eq!(table.rows()[1][0], CanonicalValue::text("Acme"));
    }

    #[test]
    fn rename_column() {
        let mut table = sample();
        table.rename("nome", "nome_azienda").expect("rename");
        assert_eq!(table.column_index("nome_azienda"), Some(0));
        assert!(table.rename("valore", "nome_azienda").is_err());
    }
}
