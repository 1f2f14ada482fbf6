//! Artifact access shared by the families.

use std::path::Path;

use dwh_ingest::{SourceFormat, read_delimited};
use dwh_model::{DimensionTable, RawTable, Table};
use dwh_output::write_table;
use dwh_transform::{ColumnKind, Normalizer};
use tracing::debug;

use crate::config::SourceConfig;
use crate::error::StageError;
use crate::report::StageReport;

/// Reads a family's raw extract. Malformed rows are counted on `report`.
pub(crate) fn read_source(
    source: &SourceConfig,
    section: &str,
    report: &mut StageReport,
) -> Result<RawTable, StageError> {
    let raw = read_delimited(&source.path, source.format(section)?)?;
    report.rows_in = raw.height() + raw.skipped_rows;
    report.exclude("malformed row", raw.skipped_rows);
    Ok(raw)
}

/// Reads an artifact written by an earlier stage.
///
/// Cells are kept as text so values round-trip exactly; empty cells are
/// absent.
pub(crate) fn read_artifact(path: &Path) -> Result<Table, StageError> {
    let raw = read_delimited(path, SourceFormat::artifact())?;
    let normalized = Normalizer::default().normalize_table(&raw, |_| ColumnKind::Text)?;
    Ok(normalized.table)
}

pub(crate) fn load_dimension(
    path: &Path,
    key_column: &str,
    natural_columns: &[&str],
) -> Result<DimensionTable, StageError> {
    let table = read_artifact(path)?;
    let dimension = DimensionTable::from_table(&table, key_column, natural_columns)?;
    debug!(path = %path.display(), rows = dimension.len(), "loaded dimension");
    Ok(dimension)
}

/// A prior dimension snapshot, or `None` when it has not been written yet.
pub(crate) fn load_snapshot(
    path: &Path,
    key_column: &str,
    natural_columns: &[&str],
) -> Result<Option<DimensionTable>, StageError> {
    if !path.exists() {
        debug!(path = %path.display(), "no snapshot");
        return Ok(None);
    }
    load_dimension(path, key_column, natural_columns).map(Some)
}

pub(crate) fn write_artifact(
    table: &Table,
    path: &Path,
    report: &mut StageReport,
) -> Result<(), StageError> {
    write_table(table, path)?;
    report.artifacts.push(path.to_path_buf());
    Ok(())
}

/// First of `candidates` present in `table`.
pub(crate) fn find_column(
    table: &Table,
    candidates: &[String],
    path: &Path,
) -> Result<String, StageError> {
    candidates
        .iter()
        .find(|candidate| table.column_index(candidate).is_some())
        .cloned()
        .ok_or_else(|| StageError::MissingColumn {
            path: path.to_path_buf(),
            candidates: candidates.to_vec(),
        })
}

pub(crate) fn names(columns: &[String]) -> Vec<&str> {
    columns.iter().map(String::as_str).collect()
}
