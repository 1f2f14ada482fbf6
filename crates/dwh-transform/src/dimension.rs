//! Dimension building.
//!
//! A fresh build deduplicates the observed natural keys, sorts them and
//! numbers them 1..N. An incremental build keeps every row of a prior
//! snapshot untouched and appends only unseen keys, numbered from the
//! snapshot's maximum key in the sorted order of the new keys.

use std::collections::HashSet;

use dwh_model::{CanonicalValue, DimensionRow, DimensionTable, Table, natural_key_text};

use crate::error::{Result, TransformError};

/// Output schema of a dimension table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DimensionSchema {
    pub key_column: String,
    pub natural_columns: Vec<String>,
}

impl DimensionSchema {
    pub fn new(key_column: &str, natural_columns: &[&str]) -> Self {
        Self {
            key_column: key_column.to_string(),
            natural_columns: natural_columns.iter().map(|c| (*c).to_string()).collect(),
        }
    }

    fn empty(&self) -> DimensionTable {
        DimensionTable::new(self.key_column.clone(), self.natural_columns.clone())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DimensionBuild {
    pub dimension: DimensionTable,
    /// Rows appended by this build.
    pub added: usize,
    /// Source rows skipped because every natural-key part was absent.
    pub absent_keys: usize,
}

/// Distinct natural keys of `source_columns`, sorted ascending.
fn observed_keys(table: &Table, source_columns: &[&str]) -> Result<(Vec<Vec<CanonicalValue>>, usize)> {
    if source_columns.is_empty() {
        return Err(TransformError::NoColumns {
            what: "dimension natural key",
        });
    }
    let indices = source_columns
        .iter()
        .map(|column| table.require_column(column))
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let mut seen = HashSet::new();
    let mut keys = Vec::new();
    let mut absent_keys = 0usize;
    for row in table.rows() {
        let natural: Vec<CanonicalValue> = indices.iter().map(|&idx| row[idx].clone()).collect();
        if natural.iter().all(CanonicalValue::is_absent) {
            absent_keys += 1;
            continue;
        }
        if seen.insert(natural_key_text(&natural)) {
            keys.push(natural);
        }
    }
    keys.sort();
    Ok((keys, absent_keys))
}

fn check_width(schema_len: usize, source_columns: &[&str]) -> Result<()> {
    if schema_len != source_columns.len() {
        return Err(dwh_model::ModelError::RowWidth {
            row: 0,
            expected: schema_len,
            found: source_columns.len(),
        }
        .into());
    }
    Ok(())
}

/// Builds a dimension from scratch with keys 1..N in ascending key order.
///
/// `source_columns` map positionally onto the schema's natural columns.
pub fn build_fresh(
    table: &Table,
    source_columns: &[&str],
    schema: &DimensionSchema,
) -> Result<DimensionBuild> {
    check_width(schema.natural_columns.len(), source_columns)?;
    let (keys, absent_keys) = observed_keys(table, source_columns)?;
    let mut dimension = schema.empty();
    for natural in keys {
        dimension.append(natural)?;
    }
    let added = dimension.len();
    tracing::debug!(
        dimension = %schema.key_column,
        rows = added,
        absent_keys,
        "built dimension"
    );
    Ok(DimensionBuild {
        dimension,
        added,
        absent_keys,
    })
}

/// Extends `base` with the natural keys of `table` it does not contain yet.
pub fn build_incremental(
    mut base: DimensionTable,
    table: &Table,
    source_columns: &[&str],
) -> Result<DimensionBuild> {
    check_width(base.natural_columns().len(), source_columns)?;
    let (keys, absent_keys) = observed_keys(table, source_columns)?;
    let mut added = 0usize;
    for natural in keys {
        if !base.contains(&natural) {
            base.append(natural)?;
            added += 1;
        }
    }
    tracing::debug!(
        dimension = %base.key_column(),
        rows = base.len(),
        added,
        absent_keys,
        "extended dimension"
    );
    Ok(DimensionBuild {
        dimension: base,
        added,
        absent_keys,
    })
}

/// Incremental build that degrades when no snapshot exists.
///
/// Without a base the dimension is seeded with `anchor` (when given) and
/// then extended as usual, so the anchor keeps its key.
pub fn build_incremental_or_seed(
    base: Option<DimensionTable>,
    anchor: Option<DimensionRow>,
    table: &Table,
    source_columns: &[&str],
    schema: &DimensionSchema,
) -> Result<DimensionBuild> {
    let base = match base {
        Some(base) => base,
        None => {
            let mut seeded = schema.empty();
            if let Some(anchor) = anchor {
                tracing::info!(
                    dimension = %schema.key_column,
                    key = %anchor.key,
                    "no snapshot, seeding with anchor row"
                );
                seeded.insert(anchor.key, anchor.natural)?;
            }
            seeded
        }
    };
    build_incremental(base, table, source_columns)
}
