use std::collections::{HashMap, HashSet};

use dwh_common::parse_key;

use crate::{CanonicalValue, ModelError, SurrogateKey, Table};

#[derive(Debug, Clone, PartialEq)]
pub struct DimensionRow {
    pub key: SurrogateKey,
    pub natural: Vec<CanonicalValue>,
}

/// A deduplicated dimension: one surrogate key per natural-key tuple.
///
/// Keys and natural tuples are unique. Natural tuples are compared by
/// [`CanonicalValue::key_text`], so a snapshot read back from disk matches
/// the values it was written from.
#[derive(Debug, Clone, PartialEq)]
pub struct DimensionTable {
    key_column: String,
    natural_columns: Vec<String>,
    rows: Vec<DimensionRow>,
    index: HashMap<Vec<String>, SurrogateKey>,
    keys: HashSet<SurrogateKey>,
}

impl DimensionTable {
    pub fn new(key_column: impl Into<String>, natural_columns: Vec<String>) -> Self {
        Self {
            key_column: key_column.into(),
            natural_columns,
            rows: Vec::new(),
            index: HashMap::new(),
            keys: HashSet::new(),
        }
    }

    /// Builds a dimension from explicit rows, checking key and natural-key uniqueness.
    pub fn from_rows(
        key_column: impl Into<String>,
        natural_columns: Vec<String>,
        rows: Vec<DimensionRow>,
    ) -> Result<Self, ModelError> {
        let mut table = Self::new(key_column, natural_columns);
        for row in rows {
            table.insert(row.key, row.natural)?;
        }
        Ok(table)
    }

    /// Reads a persisted snapshot.
    ///
    /// Columns other than `key_column` and `natural_columns` are ignored.
    pub fn from_table(
        table: &Table,
        key_column: &str,
        natural_columns: &[&str],
    ) -> Result<Self, ModelError> {
        let key_idx = table.require_column(key_column)?;
        let natural_idx = natural_columns
            .iter()
            .map(|column| table.require_column(column))
            .collect::<Result<Vec<_>, _>>()?;

        let mut dimension = Self::new(
            key_column,
            natural_columns.iter().map(|c| (*c).to_string()).collect(),
        );
        for (row_idx, row) in table.rows().iter().enumerate() {
            let cell = &row[key_idx];
            let key = parse_key(&cell.key_text())
                .and_then(|k| SurrogateKey::new(k).ok())
                .ok_or_else(|| ModelError::InvalidSurrogateKey {
                    column: key_column.to_string(),
                    row: row_idx,
                    value: cell.key_text().into_owned(),
                })?;
            let natural = natural_idx.iter().map(|&idx| row[idx].clone()).collect();
            dimension.insert(key, natural)?;
        }
        Ok(dimension)
    }

    pub fn key_column(&self) -> &str {
        &self.key_column
    }

    pub fn natural_columns(&self) -> &[String] {
        &self.natural_columns
    }

    pub fn rows(&self) -> &[DimensionRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn natural_index(&self, column: &str) -> Option<usize> {
        self.natural_columns.iter().position(|c| c == column)
    }

    pub fn max_key(&self) -> Option<SurrogateKey> {
        self.rows.iter().map(|row| row.key).max()
    }

    /// Key the next appended row receives.
    pub fn next_key(&self) -> Result<SurrogateKey, ModelError> {
        self.max_key().map_or(Ok(SurrogateKey::FIRST), SurrogateKey::next)
    }

    pub fn key_for(&self, natural: &[CanonicalValue]) -> Option<SurrogateKey> {
        self.index.get(&natural_key_text(natural)).copied()
    }

    pub fn contains(&self, natural: &[CanonicalValue]) -> bool {
        self.key_for(natural).is_some()
    }

    /// Appends a row with [`Self::next_key`].
    pub fn append(&mut self, natural: Vec<CanonicalValue>) -> Result<SurrogateKey, ModelError> {
        let key = self.next_key()?;
        self.insert(key, natural)?;
        Ok(key)
    }

    /// Inserts a row with an explicit key.
    pub fn insert(
        &mut self,
        key: SurrogateKey,
        natural: Vec<CanonicalValue>,
    ) -> Result<(), ModelError> {
        if natural.len() != self.natural_columns.len() {
            return Err(ModelError::RowWidth {
                row: self.rows.len(),
                expected: self.natural_columns.len(),
                found: natural.len(),
            });
        }
        if self.keys.contains(&key) {
            return Err(ModelError::DuplicateSurrogateKey {
                column: self.key_column.clone(),
                key: key.get(),
            });
        }
        let text = natural_key_text(&natural);
        if self.index.contains_key(&text) {
            return Err(ModelError::DuplicateNaturalKey {
                column: self.key_column.clone(),
                key: text.join(", "),
            });
        }
        self.index.insert(text, key);
        self.keys.insert(key);
        self.rows.push(DimensionRow { key, natural });
        Ok(())
    }

    /// Renders the dimension as `key_column` followed by the natural columns.
    pub fn to_table(&self) -> Result<Table, ModelError> {
        let mut columns = Vec::with_capacity(self.natural_columns.len() + 1);
        columns.push(self.key_column.clone());
        columns.extend(self.natural_columns.iter().cloned());
        let rows = self
            .rows
            .iter()
            .map(|row| {
                let mut cells = Vec::with_capacity(row.natural.len() + 1);
                cells.push(row.key.to_value());
                cells.extend(row.natural.iter().cloned());
                cells
            })
            .collect();
        Table::from_rows(columns, rows)
    }
}

/// Text form of a natural-key tuple, used for matching.
pub fn natural_key_text(natural: &[CanonicalValue]) -> Vec<String> {
    natural.iter().map(|v| v.key_text().into_owned()).collect()
}
