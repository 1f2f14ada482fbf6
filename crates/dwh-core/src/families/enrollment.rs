//! University enrollment series.
//!
//! One long row per (academic year, faculty, sex). Years and faculties
//! become dimensions; the analysis fact pivots the sex rows into one
//! enrolled-count column per category.

use std::path::Path;

use dwh_model::{CanonicalValue, DimensionRow, SurrogateKey, Table};
use dwh_transform::{
    ColumnKind, DimensionJoin, DimensionSchema, RowFilter, build_fresh,
    build_incremental_or_seed, extract_pattern, pivot_sum, resolve,
};
use tracing::{info, warn};

use super::normalizer;
use crate::config::EnrollmentConfig;
use crate::error::StageError;
use crate::io::{self, names};
use crate::registry::FamilyKind;
use crate::report::StageReport;
use crate::stage::{Artifact, Family, Stage};

const SECTION: &str = "enrollment";

/// Year extracted from the period label.
const YEAR_COLUMN: &str = "anno_valore";

pub fn family() -> Family<EnrollmentConfig> {
    Family::new(FamilyKind::Enrollment)
        .add_stage(Box::new(PeriodsStage))
        .add_stage(Box::new(FacultiesStage))
        .add_stage(Box::new(AnalysisStage))
}

fn new_report(stage: &str) -> StageReport {
    StageReport::new(FamilyKind::Enrollment.as_str(), stage)
}

fn source(config: &EnrollmentConfig) -> Artifact {
    Artifact::new("source", config.source.path.clone())
}

/// Source rows in scope, with the extracted year appended.
///
/// Stages look up only the columns they use, so a period-only extract is
/// enough for the year dimension.
fn scoped_table(config: &EnrollmentConfig, report: &mut StageReport) -> Result<Table, StageError> {
    let raw = io::read_source(&config.source, SECTION, report)?;
    let normalized = normalizer(&config.absent_tokens).normalize_table(&raw, |column| {
        if config.enrolled_columns.iter().any(|c| c == column) {
            ColumnKind::Numeric
        } else {
            ColumnKind::Text
        }
    })?;
    report.coercion_failures = normalized.coercion_failures;
    let mut table = normalized.table;

    if !config.scope_values.is_empty() {
        let scope = RowFilter::include(
            config.scope_column.as_str(),
            &names(&config.scope_values),
        );
        report.exclude("out of scope", scope.apply(&mut table)?);
    }

    let (mut table, unmatched) = extract_pattern(
        table,
        &config.period_column,
        YEAR_COLUMN,
        &config.period_regex()?,
    )?;
    if unmatched > 0 {
        warn!(
            column = %config.period_column,
            unmatched,
            "period labels without a year"
        );
    }
    let year_idx = table.require_column(YEAR_COLUMN)?;
    let dropped = table.retain_rows(|row| !row[year_idx].is_absent());
    report.exclude("unrecognised period", dropped);

    Ok(table)
}

struct PeriodsStage;

impl Stage<EnrollmentConfig> for PeriodsStage {
    fn name(&self) -> &'static str {
        "periods"
    }

    fn description(&self) -> &'static str {
        "Extend the year dimension with the years found in the source"
    }

    fn inputs(&self, config: &EnrollmentConfig) -> Vec<Artifact> {
        vec![source(config)]
    }

    fn outputs(&self, config: &EnrollmentConfig) -> Vec<Artifact> {
        vec![Artifact::new(
            "years",
            config.artifact(&config.files.years),
        )]
    }

    fn run(&self, config: &EnrollmentConfig) -> Result<StageReport, StageError> {
        let mut report = new_report(self.name());
        let table = scoped_table(config, &mut report)?;
        let path = config.artifact(&config.files.years);

        let snapshot = io::load_snapshot(&path, "id_anno", &["valore"])?;
        let anchor = DimensionRow {
            key: SurrogateKey::new(config.anchor_key)?,
            natural: vec![CanonicalValue::number(f64::from(config.anchor_year))],
        };
        let years = build_incremental_or_seed(
            snapshot,
            Some(anchor),
            &table,
            &[YEAR_COLUMN],
            &DimensionSchema::new("id_anno", &["valore"]),
        )?;
        info!(
            rows = years.dimension.len(),
            added = years.added,
            "year dimension"
        );
        report.rows_out = years.dimension.len();
        io::write_artifact(&years.dimension.to_table()?, &path, &mut report)?;
        Ok(report)
    }
}

struct FacultiesStage;

impl Stage<EnrollmentConfig> for FacultiesStage {
    fn name(&self) -> &'static str {
        "faculties"
    }

    fn description(&self) -> &'static str {
        "Build the faculty dimension"
    }

    fn inputs(&self, config: &EnrollmentConfig) -> Vec<Artifact> {
        vec![source(config)]
    }

    fn outputs(&self, config: &EnrollmentConfig) -> Vec<Artifact> {
        vec![Artifact::new(
            "faculties",
            config.artifact(&config.files.faculties),
        )]
    }

    fn run(&self, config: &EnrollmentConfig) -> Result<StageReport, StageError> {
        let mut report = new_report(self.name());
        let table = scoped_table(config, &mut report)?;
        let faculty = io::find_column(&table, &config.faculty_columns, &config.source.path)?;
        let faculties = build_fresh(
            &table,
            &[faculty.as_str()],
            &DimensionSchema::new("id_facolta", &["nome"]),
        )?;
        report.exclude("absent faculty", faculties.absent_keys);
        report.rows_out = faculties.dimension.len();
        io::write_artifact(
            &faculties.dimension.to_table()?,
            &config.artifact(&config.files.faculties),
            &mut report,
        )?;
        Ok(report)
    }
}

struct AnalysisStage;

impl Stage<EnrollmentConfig> for AnalysisStage {
    fn name(&self) -> &'static str {
        "analysis"
    }

    fn description(&self) -> &'static str {
        "Pivot enrolled counts by sex and resolve faculty and year keys"
    }

    fn inputs(&self, config: &EnrollmentConfig) -> Vec<Artifact> {
        vec![
            source(config),
            Artifact::new("years", config.artifact(&config.files.years)),
            Artifact::new("faculties", config.artifact(&config.files.faculties)),
        ]
    }

    fn outputs(&self, config: &EnrollmentConfig) -> Vec<Artifact> {
        vec![Artifact::new(
            "analysis",
            config.artifact(&config.files.analysis),
        )]
    }

    fn run(&self, config: &EnrollmentConfig) -> Result<StageReport, StageError> {
        let mut report = new_report(self.name());
        let table = scoped_table(config, &mut report)?;
        let path: &Path = &config.source.path;
        let faculty = io::find_column(&table, &config.faculty_columns, path)?;
        let faculty = faculty.as_str();
        let enrolled = io::find_column(&table, &config.enrolled_columns, path)?;
        let sex = io::find_column(&table, &config.sex_columns, path)?;

        let pivoted = pivot_sum(
            &table,
            &[YEAR_COLUMN, faculty],
            &sex,
            &enrolled,
            &config.categories,
        )?;
        report.exclude("absent year or faculty", pivoted.absent_index);
        report.exclude("unmapped category", pivoted.unmapped);

        let years = io::load_dimension(
            &config.artifact(&config.files.years),
            "id_anno",
            &["valore"],
        )?;
        let faculties = io::load_dimension(
            &config.artifact(&config.files.faculties),
            "id_facolta",
            &["nome"],
        )?;
        let joins = [
            DimensionJoin::new("cod_facolta", &faculties, &[(faculty, "nome")]),
            DimensionJoin::new("cod_anno", &years, &[(YEAR_COLUMN, "valore")]),
        ];
        let carried: Vec<(&str, &str)> = config
            .categories
            .iter()
            .map(|category| (category.column.as_str(), category.column.as_str()))
            .collect();
        let resolved = resolve(
            &pivoted.table,
            &joins,
            &carried,
            "id_analisi",
            config.unresolved,
        )?;
        report.exclude("unresolved foreign key", resolved.dropped);
        report.joins = resolved.joins;

        let mut output_columns = vec!["id_analisi"];
        output_columns.extend(carried.iter().map(|(_, column)| *column));
        output_columns.extend(["cod_facolta", "cod_anno"]);
        let output = resolved.facts.to_table()?.select(&output_columns)?;
        report.rows_out = output.height();
        io::write_artifact(
            &output,
            &config.artifact(&config.files.analysis),
            &mut report,
        )?;
        Ok(report)
    }
}
