//! Fact resolution.
//!
//! Each join looks up one or more long-table columns in a dimension's
//! natural columns and yields that dimension's surrogate key as a foreign
//! key. Joins behave like left joins applied in order: every long row stays
//! unless the unresolved policy says otherwise.

use std::collections::HashMap;

use dwh_model::{CanonicalValue, DimensionTable, FactTable, ForeignKey, ModelError, SurrogateKey, Table};
use serde::{Deserialize, Serialize};

use crate::error::{Result, TransformError};

/// What to do with rows that have at least one unresolved foreign key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnresolvedPolicy {
    /// Keep the row with an empty foreign key.
    #[default]
    Keep,
    /// Drop the row.
    Drop,
    /// Fail the resolution.
    Abort,
}

/// One foreign key to resolve.
#[derive(Debug, Clone)]
pub struct DimensionJoin<'a> {
    pub foreign_key: String,
    pub dimension: &'a DimensionTable,
    /// Pairs of (long-table column, dimension natural column).
    pub on: Vec<(String, String)>,
}

impl<'a> DimensionJoin<'a> {
    pub fn new(foreign_key: &str, dimension: &'a DimensionTable, on: &[(&str, &str)]) -> Self {
        Self {
            foreign_key: foreign_key.to_string(),
            dimension,
            on: on
                .iter()
                .map(|(long, natural)| ((*long).to_string(), (*natural).to_string()))
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct JoinReport {
    pub foreign_key: String,
    pub unresolved: usize,
    /// Rows matching more than one dimension row; the lowest key was used.
    pub ambiguous: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Resolved {
    pub facts: FactTable,
    pub joins: Vec<JoinReport>,
    /// Rows removed under [`UnresolvedPolicy::Drop`].
    pub dropped: usize,
}

struct Lookup {
    long_idx: Vec<usize>,
    keys: HashMap<Vec<String>, (SurrogateKey, bool)>,
}

impl Lookup {
    fn build(table: &Table, join: &DimensionJoin<'_>) -> Result<Self> {
        if join.on.is_empty() {
            return Err(TransformError::NoColumns { what: "dimension join" });
        }
        let long_idx = join
            .on
            .iter()
            .map(|(long, _)| table.require_column(long))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        let natural_idx = join
            .on
            .iter()
            .map(|(_, natural)| {
                join.dimension
                    .natural_index(natural)
                    .ok_or_else(|| ModelError::ColumnNotFound {
                        column: natural.clone(),
                        available: join.dimension.natural_columns().to_vec(),
                    })
            })
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let mut keys: HashMap<Vec<String>, (SurrogateKey, bool)> = HashMap::new();
        for row in join.dimension.rows() {
            let parts: Vec<&CanonicalValue> = natural_idx.iter().map(|&idx| &row.natural[idx]).collect();
            if parts.iter().any(|value| value.is_absent()) {
                continue;
            }
            let text: Vec<String> = parts.iter().map(|v| v.key_text().into_owned()).collect();
            keys.entry(text)
                .and_modify(|(key, ambiguous)| {
                    *ambiguous = true;
                    if row.key < *key {
                        *key = row.key;
                    }
                })
                .or_insert((row.key, false));
        }
        Ok(Self { long_idx, keys })
    }

    /// Returns the foreign key and whether the match was ambiguous.
    fn resolve(&self, row: &[CanonicalValue]) -> (ForeignKey, bool) {
        let mut text = Vec::with_capacity(self.long_idx.len());
        for &idx in &self.long_idx {
            if row[idx].is_absent() {
                return (ForeignKey::Unresolved, false);
            }
            text.push(row[idx].key_text().into_owned());
        }
        match self.keys.get(&text) {
            Some(&(key, ambiguous)) => (ForeignKey::Resolved(key), ambiguous),
            None => (ForeignKey::Unresolved, false),
        }
    }
}

/// Resolves `joins` against `table` and builds the fact table.
///
/// The fact table holds `key_column`, the `carried` columns (pairs of
/// source column and output name), and one foreign key per join. Fact keys
/// are dense 1..N in the order rows survive. Facts are not deduplicated.
pub fn resolve(
    table: &Table,
    joins: &[DimensionJoin<'_>],
    carried: &[(&str, &str)],
    key_column: &str,
    policy: UnresolvedPolicy,
) -> Result<Resolved> {
    let lookups = joins
        .iter()
        .map(|join| Lookup::build(table, join))
        .collect::<Result<Vec<_>>>()?;
    let carried_idx = carried
        .iter()
        .map(|(source, _)| table.require_column(source))
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let mut reports: Vec<JoinReport> = joins
        .iter()
        .map(|join| JoinReport {
            foreign_key: join.foreign_key.clone(),
            ..JoinReport::default()
        })
        .collect();
    let mut facts = FactTable::new(
        key_column,
        joins.iter().map(|join| join.foreign_key.clone()).collect(),
        carried.iter().map(|(_, target)| (*target).to_string()).collect(),
    );
    let mut dropped = 0usize;

    for row in table.rows() {
        let mut foreign_keys = Vec::with_capacity(lookups.len());
        for (lookup, report) in lookups.iter().zip(reports.iter_mut()) {
            let (fk, ambiguous) = lookup.resolve(row);
            if !fk.is_resolved() {
                report.unresolved += 1;
            }
            if ambiguous {
                report.ambiguous += 1;
            }
            foreign_keys.push(fk);
        }
        if policy == UnresolvedPolicy::Drop && foreign_keys.iter().any(|fk| !fk.is_resolved()) {
            dropped += 1;
            continue;
        }
        let values = carried_idx.iter().map(|&idx| row[idx].clone()).collect();
        facts.push(foreign_keys, values)?;
    }

    for report in &reports {
        if report.unresolved > 0 {
            tracing::warn!(
                foreign_key = %report.foreign_key,
                unresolved = report.unresolved,
                "rows did not match any dimension row"
            );
        }
        if report.ambiguous > 0 {
            tracing::warn!(
                foreign_key = %report.foreign_key,
                ambiguous = report.ambiguous,
                "rows matched several dimension rows, lowest key used"
            );
        }
    }
    if policy == UnresolvedPolicy::Abort
        && let Some(report) = reports.iter().find(|report| report.unresolved > 0)
    {
        return Err(TransformError::UnresolvedRejected {
            foreign_key: report.foreign_key.clone(),
            count: report.unresolved,
        });
    }

    Ok(Resolved {
        facts,
        joins: reports,
        dropped,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use dwh_model::DimensionRow;

    fn dim(key_column: &str, natural: &str, values: &[(u64, CanonicalValue)]) -> DimensionTable {
        DimensionTable::from_rows(
            key_column,
            vec![natural.to_string()],
            values
                .iter()
                .map(|(key, value)| DimensionRow {
                    key: SurrogateKey::new(*key).expect("key"),
                    natural: vec![value.clone()],
                })
                .collect(),
        )
        .expect("dimension")
    }

    fn long() -> Table {
        Table::from_rows(
            vec![
                "nome_azienda".to_string(),
                "nome_metrica".to_string(),
                "valore".to_string(),
                "anno".to_string(),
            ],
            vec![
                vec![
                    CanonicalValue::text("Acme"),
                    CanonicalValue::text("Donne"),
                    CanonicalValue::number(5.0),
                    CanonicalValue::number(2019.0),
                ],
                vec![
                    CanonicalValue::text("Ghost"),
                    CanonicalValue::text("Donne"),
                    CanonicalValue::number(3.0),
                    CanonicalValue::number(2019.0),
                ],
            ],
        )
        .expect("table")
    }

    fn companies() -> DimensionTable {
        dim("id_azienda", "nome", &[(1, CanonicalValue::text("Acme"))])
    }

    fn years() -> DimensionTable {
        dim("id_anno", "valore", &[(1, CanonicalValue::text("2019"))])
    }

    #[test]
    fn resolves_in_order_and_reports_unresolved() {
        let companies = companies();
        let years = years();
        let joins = [
            DimensionJoin::new("cod_azienda", &companies, &[("nome_azienda", "nome")]),
            DimensionJoin::new("cod_anno", &years, &[("anno", "valore")]),
        ];
        let resolved = resolve(
            &long(),
            &joins,
            &[("nome_metrica", "nome"), ("valore", "valore")],
            "id_report",
            UnresolvedPolicy::Keep,
        )
        .expect("resolve");

        assert_eq!(resolved.facts.len(), 2);
        let first = &resolved.facts.rows()[0];
        assert_eq!(first.key.get(), 1);
        assert_eq!(
            first.foreign_keys,
            vec![
                ForeignKey::Resolved(SurrogateKey::FIRST),
                ForeignKey::Resolved(SurrogateKey::FIRST)
            ]
        );
        assert_eq!(resolved.facts.rows()[1].foreign_keys[0], ForeignKey::Unresolved);
        assert_eq!(resolved.joins[0].unresolved, 1);
        assert_eq!(resolved.joins[1].unresolved, 0);

        let table = resolved.facts.to_table().expect("table");
        assert_eq!(
            table.columns(),
            &["id_report", "nome", "valore", "cod_azienda", "cod_anno"]
        );
    }

    #[test]
    fn drop_policy_removes_rows_and_keeps_keys_dense() {
        let companies = companies();
        let joins = [DimensionJoin::new("cod_azienda", &companies, &[("nome_azienda", "nome")])];
        let resolved = resolve(
            &long(),
            &joins,
            &[("valore", "valore")],
            "id_report",
            UnresolvedPolicy::Drop,
        )
        .expect("resolve");
        assert_eq!(resolved.facts.len(), 1);
        assert_eq!(resolved.dropped, 1);
        assert_eq!(resolved.joins[0].unresolved, 1);
    }

    #[test]
    fn abort_policy_fails_with_count() {
        let companies = companies();
        let joins = [DimensionJoin::new("cod_azienda", &companies, &[("nome_azienda", "nome")])];
        let err = resolve(&long(), &joins, &[], "id_report", UnresolvedPolicy::Abort)
            .expect_err("abort");
        assert!(matches!(
            err,
            TransformError::UnresolvedRejected { count: 1, .. }
        ));
    }

    #[test]
    fn ambiguous_matches_use_lowest_key() {
        let companies = DimensionTable::from_rows(
            "id_azienda",
            vec!["nome".to_string(), "cod_ateco".to_string()],
            vec![
                DimensionRow {
                    key: SurrogateKey::new(4).expect("key"),
                    natural: vec![CanonicalValue::text("Acme"), CanonicalValue::number(2.0)],
                },
                DimensionRow {
                    key: SurrogateKey::new(3).expect("key"),
                    natural: vec![CanonicalValue::text("Acme"), CanonicalValue::number(1.0)],
                },
            ],
        )
        .expect("dimension");
        let joins = [DimensionJoin::new("cod_azienda", &companies, &[("nome_azienda", "nome")])];
        let resolved = resolve(&long(), &joins, &[], "id", UnresolvedPolicy::Keep).expect("resolve");
        assert_eq!(
            resolved.facts.rows()[0].foreign_keys[0],
            ForeignKey::Resolved(SurrogateKey::new(3).expect("key"))
        );
        assert_eq!(resolved.joins[0].ambiguous, 1);
    }

    #[test]
    fn absent_join_values_never_match() {
        let table = Table::from_rows(
            vec!["nome_azienda".to_string()],
            vec![vec![CanonicalValue::Absent]],
        )
        .expect("table");
        let companies = dim("id_azienda", "nome", &[(1, CanonicalValue::Absent)]);
        let joins = [DimensionJoin::new("cod_azienda", &companies, &[("nome_azienda", "nome")])];
        let resolved = resolve(&table, &joins, &[], "id", UnresolvedPolicy::Keep).expect("resolve");
        assert_eq!(resolved.joins[0].unresolved, 1);
    }

    #[test]
    fn duplicate_long_rows_are_kept() {
        let mut table = long();
        let first = table.rows()[0].clone();
        table.push_row(first).expect("push");
        let companies = companies();
        let joins = [DimensionJoin::new("cod_azienda", &companies, &[("nome_azienda", "nome")])];
        let resolved = resolve(&table, &joins, &[], "id", UnresolvedPolicy::Keep).expect("resolve");
        assert_eq!(resolved.facts.len(), 3);
    }

    #[test]
    fn unknown_natural_column_is_an_error() {
        let companies = companies();
        let joins = [DimensionJoin::new("cod_azienda", &companies, &[("nome_azienda", "ragione")])];
        assert!(resolve(&long(), &joins, &[], "id", UnresolvedPolicy::Keep).is_err());
    }

    #[test]
    fn policy_uses_lowercase_labels() {
        let policy: UnresolvedPolicy = serde_json::from_str("\"abort\"").expect("policy");
        assert_eq!(policy, UnresolvedPolicy::Abort);
        assert_eq!(
            serde_json::to_string(&UnresolvedPolicy::Keep).expect("serialize"),
            "\"keep\""
        );
    }
}
