//! Company gender-gap disclosures.
//!
//! The source has one wide row per company: a name, a region, a sector and
//! thirteen workforce and board metrics, all for a single reference year.
//! The family publishes year, region and sector dimensions, a company table
//! keyed to region and sector, and a long fact table with one row per
//! (company, metric).

use std::collections::HashSet;

use dwh_model::{CanonicalValue, DimensionRow, SurrogateKey, Table};
use dwh_transform::{
    ColumnKind, DimensionBuild, DimensionJoin, DimensionSchema, RowFilter, build_fresh,
    build_incremental_or_seed, null_counts, profile_table, resolve, unpivot,
};
use tracing::{debug, info};

use super::normalizer;
use crate::config::GenderGapConfig;
use crate::error::StageError;
use crate::io::{self, names};
use crate::registry::FamilyKind;
use crate::report::StageReport;
use crate::stage::{Artifact, Family, Stage};

const SECTION: &str = "gender_gap";

/// Reference-year column attached to the long table before resolution.
const YEAR_COLUMN: &str = "anno_riferimento";

const COMPANY_COLUMNS: [&str; 4] = ["id_azienda", "nome", "cod_ateco", "cod_regione"];
const FACT_COLUMNS: [&str; 5] = ["id_report", "nome", "cod_azienda", "valore", "cod_anno"];

pub fn family() -> Family<GenderGapConfig> {
    Family::new(FamilyKind::GenderGap)
        .add_stage(Box::new(ProfileStage))
        .add_stage(Box::new(CleanStage))
        .add_stage(Box::new(DimensionsStage))
        .add_stage(Box::new(CompaniesStage))
        .add_stage(Box::new(FactsStage))
}

fn new_report(stage: &str) -> StageReport {
    StageReport::new(FamilyKind::GenderGap.as_str(), stage)
}

fn source(config: &GenderGapConfig) -> Artifact {
    Artifact::new("source", config.source.path.clone())
}

fn artifact(config: &GenderGapConfig, name: &'static str) -> Artifact {
    let files = &config.files;
    let file = match name {
        "wide" => &files.wide,
        "years" => &files.years,
        "regions" => &files.regions,
        "sectors" => &files.sectors,
        "companies" => &files.companies,
        _ => &files.facts,
    };
    Artifact::new(name, config.artifact(file))
}

/// Reads the source with metric columns numeric and the rest as text.
fn read_source(config: &GenderGapConfig, report: &mut StageReport) -> Result<Table, StageError> {
    let raw = io::read_source(&config.source, SECTION, report)?;
    let metrics: HashSet<&str> = config.metric_columns.iter().map(String::as_str).collect();
    let normalized = normalizer(&config.absent_tokens).normalize_table(&raw, |column| {
        if metrics.contains(column) {
            ColumnKind::Numeric
        } else {
            ColumnKind::Text
        }
    })?;
    report.coercion_failures = normalized.coercion_failures;
    Ok(normalized.table)
}

fn exclude_entities(config: &GenderGapConfig, table: &mut Table) -> Result<usize, StageError> {
    let filter = RowFilter::exclude(
        config.entity_column.as_str(),
        &names(&config.excluded_entities),
    );
    Ok(filter.apply(table)?)
}

/// Entity and metric columns, excluded entities removed.
fn wide_table(config: &GenderGapConfig, report: &mut StageReport) -> Result<Table, StageError> {
    let table = read_source(config, report)?;
    let mut columns = vec![config.entity_column.as_str()];
    columns.extend(names(&config.metric_columns));
    let mut wide = table.select(&columns)?;
    let excluded = exclude_entities(config, &mut wide)?;
    report.exclude("excluded entity", excluded);
    Ok(wide)
}

fn year_dimension(config: &GenderGapConfig) -> Result<DimensionBuild, StageError> {
    let snapshot = io::load_snapshot(
        &config.artifact(&config.files.years),
        "id_anno",
        &["valore"],
    )?;
    let year = CanonicalValue::number(f64::from(config.reference_year));
    let anchor = DimensionRow {
        key: SurrogateKey::new(config.year_anchor_key)?,
        natural: vec![year.clone()],
    };
    let observed = Table::from_rows(vec![YEAR_COLUMN.to_string()], vec![vec![year]])?;
    Ok(build_incremental_or_seed(
        snapshot,
        Some(anchor),
        &observed,
        &[YEAR_COLUMN],
        &DimensionSchema::new("id_anno", &["valore"]),
    )?)
}

struct ProfileStage;

impl Stage<GenderGapConfig> for ProfileStage {
    fn name(&self) -> &'static str {
        "profile"
    }

    fn description(&self) -> &'static str {
        "Profile every source column: absent values, distinct values and ranges"
    }

    fn inputs(&self, config: &GenderGapConfig) -> Vec<Artifact> {
        vec![source(config)]
    }

    fn outputs(&self, _config: &GenderGapConfig) -> Vec<Artifact> {
        Vec::new()
    }

    fn run(&self, config: &GenderGapConfig) -> Result<StageReport, StageError> {
        let mut report = new_report(self.name());
        let raw = io::read_source(&config.source, SECTION, &mut report)?;
        let normalized =
            normalizer(&config.absent_tokens).normalize_table(&raw, |_| ColumnKind::Auto)?;
        let table = normalized.table;
        report.rows_out = table.height();
        report.null_counts = null_counts(&table);
        report.profile = Some(profile_table(&table)?);
        for (column, count) in &report.null_counts {
            debug!(column = %column, count, "absent values");
        }
        Ok(report)
    }
}

struct CleanStage;

impl Stage<GenderGapConfig> for CleanStage {
    fn name(&self) -> &'static str {
        "clean"
    }

    fn description(&self) -> &'static str {
        "Keep the entity and metric columns, drop excluded entities, coerce metrics"
    }

    fn inputs(&self, config: &GenderGapConfig) -> Vec<Artifact> {
        vec![source(config)]
    }

    fn outputs(&self, config: &GenderGapConfig) -> Vec<Artifact> {
        vec![artifact(config, "wide")]
    }

    fn run(&self, config: &GenderGapConfig) -> Result<StageReport, StageError> {
        let mut report = new_report(self.name());
        let wide = wide_table(config, &mut report)?;
        report.rows_out = wide.height();
        io::write_artifact(&wide, &config.artifact(&config.files.wide), &mut report)?;
        Ok(report)
    }
}

struct DimensionsStage;

impl Stage<GenderGapConfig> for DimensionsStage {
    fn name(&self) -> &'static str {
        "dimensions"
    }

    fn description(&self) -> &'static str {
        "Build the year, region and sector dimensions"
    }

    fn inputs(&self, config: &GenderGapConfig) -> Vec<Artifact> {
        vec![source(config)]
    }

    fn outputs(&self, config: &GenderGapConfig) -> Vec<Artifact> {
        vec![
            artifact(config, "years"),
            artifact(config, "regions"),
            artifact(config, "sectors"),
        ]
    }

    fn run(&self, config: &GenderGapConfig) -> Result<StageReport, StageError> {
        let mut report = new_report(self.name());
        let table = read_source(config, &mut report)?;

        let years = year_dimension(config)?;
        let regions = build_fresh(
            &table,
            &[config.region_column.as_str()],
            &DimensionSchema::new("id_regione", &["nome"]),
        )?;
        let sectors = build_fresh(
            &table,
            &[config.sector_column.as_str()],
            &DimensionSchema::new("id_ateco", &["settore"]),
        )?;
        report.exclude("absent region", regions.absent_keys);
        report.exclude("absent sector", sectors.absent_keys);
        report.rows_out = years.dimension.len() + regions.dimension.len() + sectors.dimension.len();
        info!(
            years = years.dimension.len(),
            years_added = years.added,
            regions = regions.dimension.len(),
            sectors = sectors.dimension.len(),
            "built dimensions"
        );

        io::write_artifact(
            &years.dimension.to_table()?,
            &config.artifact(&config.files.years),
            &mut report,
        )?;
        io::write_artifact(
            &regions.dimension.to_table()?,
            &config.artifact(&config.files.regions),
            &mut report,
        )?;
        io::write_artifact(
            &sectors.dimension.to_table()?,
            &config.artifact(&config.files.sectors),
            &mut report,
        )?;
        Ok(report)
    }
}

struct CompaniesStage;

impl Stage<GenderGapConfig> for CompaniesStage {
    fn name(&self) -> &'static str {
        "companies"
    }

    fn description(&self) -> &'static str {
        "Build the company table keyed to its sector and region"
    }

    fn inputs(&self, config: &GenderGapConfig) -> Vec<Artifact> {
        vec![
            source(config),
            artifact(config, "regions"),
            artifact(config, "sectors"),
        ]
    }

    fn outputs(&self, config: &GenderGapConfig) -> Vec<Artifact> {
        vec![artifact(config, "companies")]
    }

    fn run(&self, config: &GenderGapConfig) -> Result<StageReport, StageError> {
        let mut report = new_report(self.name());
        let entity = config.entity_column.as_str();
        let sector = config.sector_column.as_str();
        let region = config.region_column.as_str();

        let mut companies = read_source(config, &mut report)?.select(&[entity, sector, region])?;
        let excluded = exclude_entities(config, &mut companies)?;
        report.exclude("excluded entity", excluded);
        let unnamed = companies.retain_rows(|row| !row[0].is_absent());
        report.exclude("absent entity", unnamed);
        let duplicates = companies.dedup_rows();
        report.exclude("duplicate row", duplicates);

        let regions = io::load_dimension(
            &config.artifact(&config.files.regions),
            "id_regione",
            &["nome"],
        )?;
        let sectors = io::load_dimension(
            &config.artifact(&config.files.sectors),
            "id_ateco",
            &["settore"],
        )?;
        let joins = [
            DimensionJoin::new("cod_ateco", &sectors, &[(sector, "settore")]),
            DimensionJoin::new("cod_regione", &regions, &[(region, "nome")]),
        ];
        let resolved = resolve(
            &companies,
            &joins,
            &[(entity, "nome")],
            "id_azienda",
            config.unresolved,
        )?;
        report.exclude("unresolved foreign key", resolved.dropped);
        report.joins = resolved.joins;

        let output = resolved.facts.to_table()?.select(&COMPANY_COLUMNS)?;
        report.rows_out = output.height();
        io::write_artifact(
            &output,
            &config.artifact(&config.files.companies),
            &mut report,
        )?;
        Ok(report)
    }
}

struct FactsStage;

impl Stage<GenderGapConfig> for FactsStage {
    fn name(&self) -> &'static str {
        "facts"
    }

    fn description(&self) -> &'static str {
        "Unpivot the metrics and resolve company and year keys"
    }

    fn inputs(&self, config: &GenderGapConfig) -> Vec<Artifact> {
        vec![
            source(config),
            artifact(config, "companies"),
            artifact(config, "years"),
        ]
    }

    fn outputs(&self, config: &GenderGapConfig) -> Vec<Artifact> {
        vec![artifact(config, "facts")]
    }

    fn run(&self, config: &GenderGapConfig) -> Result<StageReport, StageError> {
        let mut report = new_report(self.name());
        let entity = config.entity_column.as_str();

        let wide = wide_table(config, &mut report)?;
        let long = unpivot(
            &wide,
            &[entity],
            &names(&config.metric_columns),
            "nome_metrica",
            "valore",
        )?;
        report.exclude("absent value", long.dropped_absent);
        let long = long.table.with_constant(
            YEAR_COLUMN,
            CanonicalValue::number(f64::from(config.reference_year)),
        )?;

        let companies = io::load_dimension(
            &config.artifact(&config.files.companies),
            "id_azienda",
            &["nome", "cod_ateco", "cod_regione"],
        )?;
        let years = io::load_dimension(
            &config.artifact(&config.files.years),
            "id_anno",
            &["valore"],
        )?;
        let joins = [
            DimensionJoin::new("cod_azienda", &companies, &[(entity, "nome")]),
            DimensionJoin::new("cod_anno", &years, &[(YEAR_COLUMN, "valore")]),
        ];
        let resolved = resolve(
            &long,
            &joins,
            &[("nome_metrica", "nome"), ("valore", "valore")],
            "id_report",
            config.unresolved,
        )?;
        report.exclude("unresolved foreign key", resolved.dropped);
        report.joins = resolved.joins;

        let output = resolved.facts.to_table()?.select(&FACT_COLUMNS)?;
        report.rows_out = output.height();
        io::write_artifact(&output, &config.artifact(&config.files.facts), &mut report)?;
        Ok(report)
    }
}
