use serde::{Deserialize, Serialize};

use crate::{CanonicalValue, ModelError, SurrogateKey, Table};

/// Foreign key of a resolved fact row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "status", content = "key", rename_all = "snake_case")]
pub enum ForeignKey {
    Resolved(SurrogateKey),
    Unresolved,
}

impl ForeignKey {
    pub fn is_resolved(&self) -> bool {
        matches!(self, Self::Resolved(_))
    }

    pub fn to_value(self) -> CanonicalValue {
        match self {
            Self::Resolved(key) => key.to_value(),
            Self::Unresolved => CanonicalValue::Absent,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FactRow {
    pub key: SurrogateKey,
    pub foreign_keys: Vec<ForeignKey>,
    pub carried: Vec<CanonicalValue>,
}

/// Fact table with dense keys assigned in insertion order.
#[derive(Debug, Clone, PartialEq)]
pub struct FactTable {
    key_column: String,
    foreign_key_columns: Vec<String>,
    carried_columns: Vec<String>,
    rows: Vec<FactRow>,
}

impl FactTable {
    pub fn new(
        key_column: impl Into<String>,
        foreign_key_columns: Vec<String>,
        carried_columns: Vec<String>,
    ) -> Self {
        Self {
            key_column: key_column.into(),
            foreign_key_columns,
            carried_columns,
            rows: Vec::new(),
        }
    }

    pub fn key_column(&self) -> &str {
        &self.key_column
    }

    pub fn foreign_key_columns(&self) -> &[String] {
        &self.foreign_key_columns
    }

    pub fn carried_columns(&self) -> &[String] {
        &self.carried_columns
    }

    pub fn rows(&self) -> &[FactRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Appends a row, assigning the next dense key.
    pub fn push(
        &mut self,
        foreign_keys: Vec<ForeignKey>,
        carried: Vec<CanonicalValue>,
    ) -> Result<SurrogateKey, ModelError> {
        if foreign_keys.len() != self.foreign_key_columns.len() {
            return Err(ModelError::RowWidth {
                row: self.rows.len(),
                expected: self.foreign_key_columns.len(),
                found: foreign_keys.len(),
            });
        }
        if carried.len() != self.carried_columns.len() {
            return Err(ModelError::RowWidth {
                row: self.rows.len(),
                expected: self.carried_columns.len(),
                found: carried.len(),
            });
        }
        let key = SurrogateKey::new(self.rows.len() as u64 + 1)?;
        self.rows.push(FactRow {
            key,
            foreign_keys,
            carried,
        });
        Ok(key)
    }

    /// Number of rows whose foreign key in `column` is unresolved.
    pub fn unresolved_count(&self, column: &str) -> usize {
        let Some(idx) = self.foreign_key_columns.iter().position(|c| c == column) else {
            return 0;
        };
        self.rows
            .iter()
            .filter(|row| !row.foreign_keys[idx].is_resolved())
            .count()
    }

    /// Renders key, carried columns, then foreign keys.
    ///
    /// Unresolved foreign keys become absent cells.
    pub fn to_table(&self) -> Result<Table, ModelError> {
        let mut columns = vec![self.key_column.clone()];
        columns.extend(self.carried_columns.iter().cloned());
        columns.extend(self.foreign_key_columns.iter().cloned());
        let rows = self
            .rows
            .iter()
            .map(|row| {
                let mut cells = vec![row.key.to_value()];
                cells.extend(row.carried.iter().cloned());
                cells.extend(row.foreign_keys.iter().map(|fk| fk.to_value()));
                cells
            })
            .collect();
        Table::from_rows(columns, rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_dense_in_insertion_order() {
        let mut facts = FactTable::new(
            "id_report",
            vec!["cod_azienda".to_string()],
            vec!["valore".to_string()],
        );
        let resolved = ForeignKey::Resolved(SurrogateKey::FIRST);
        let first = facts
            .push(vec![resolved], vec![CanonicalValue::number(5.0)])
            .expect("push");
        let second = facts
            .push(vec![ForeignKey::Unresolved], vec![CanonicalValue::number(3.0)])
            .expect("push");
        assert_eq!((first.get(), second.get()), (1, 2));
        assert_eq!(facts.unresolved_count("cod_azienda"), 1);

        let table = facts.to_table().expect("table");
        assert_eq!(table.columns(), &["id_report", "valore", "cod_azienda"]);
        assert!(table.rows()[1][2].is_absent());
    }

    #[test]
    fn push_checks_widths() {
        let mut facts = FactTable::new("id", vec!["a".to_string()], vec![]);
        assert!(facts.push(vec![], vec![]).is_err());
    }
}
