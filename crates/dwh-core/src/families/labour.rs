//! Labour-force indicators.
//!
//! The extract packs frequency, working status, age band, unit and country
//! into a single composite first column and spreads the observations over
//! one column per year, with flag letters glued to some values. Cleaning
//! splits the composite and strips the flags; the later stages derive the
//! measure and aggregation names, unpivot the years and resolve the
//! observation fact against the year dimension the enrollment family owns.

use dwh_model::Table;
use dwh_transform::{
    ColumnKind, CompositeSplitter, DimensionJoin, DimensionSchema, build_fresh, concat_columns,
    resolve, unpivot,
};
use regex::Regex;
use tracing::{debug, info};

use super::normalizer;
use crate::config::LabourConfig;
use crate::error::StageError;
use crate::io::{self, names};
use crate::registry::FamilyKind;
use crate::report::StageReport;
use crate::stage::{Artifact, Family, Stage};

const SECTION: &str = "labour";

const MEASURE_NAME: &str = "tipo_misura_valore";
const AGGREGATION_NAME: &str = "metodo_aggr_nome";
const PERIOD_LABEL: &str = "ANNO_valore";
const VALUE_LABEL: &str = "valore_misurato";
const OBSERVATION_NAME: &str = "nome_observation";

const OBSERVATION_COLUMNS: [&str; 6] = [
    "id_observation",
    "nome",
    "cod_misura",
    "cod_anno",
    "cod_aggr",
    "valore",
];

pub fn family() -> Family<LabourConfig> {
    Family::new(FamilyKind::Labour)
        .add_stage(Box::new(CleanStage))
        .add_stage(Box::new(DimensionsStage))
        .add_stage(Box::new(UnpivotStage))
        .add_stage(Box::new(ObservationsStage))
}

fn new_report(stage: &str) -> StageReport {
    StageReport::new(FamilyKind::Labour.as_str(), stage)
}

fn artifact(config: &LabourConfig, name: &'static str) -> Artifact {
    let files = &config.files;
    let file = match name {
        "source" => return Artifact::new(name, config.source.path.clone()),
        "clean" => &files.clean,
        "measures" => &files.measures,
        "aggregations" => &files.aggregations,
        "long" => &files.long,
        "years" => &config.year_lookup,
        _ => &files.observations,
    };
    Artifact::new(name, config.artifact(file))
}

fn period_columns<'a>(table: &'a Table, pattern: &Regex) -> Vec<&'a str> {
    table
        .columns()
        .iter()
        .map(String::as_str)
        .filter(|column| pattern.is_match(column))
        .collect()
}

/// Appends the measure-type and aggregation-method names.
fn with_derived_names(config: &LabourConfig, table: Table) -> Result<Table, StageError> {
    let table = concat_columns(
        table,
        MEASURE_NAME,
        &names(&config.measure_parts),
        &config.name_separator,
        &config.absent_fill,
    )?;
    let table = concat_columns(
        table,
        AGGREGATION_NAME,
        &names(&config.aggregation_parts),
        &config.name_separator,
        &config.absent_fill,
    )?;
    Ok(table)
}

fn read_clean(config: &LabourConfig) -> Result<Table, StageError> {
    let table = io::read_artifact(&config.artifact(&config.files.clean))?;
    with_derived_names(config, table)
}

struct CleanStage;

impl Stage<LabourConfig> for CleanStage {
    fn name(&self) -> &'static str {
        "clean"
    }

    fn description(&self) -> &'static str {
        "Split the composite column and strip flag annotations from the year columns"
    }

    fn inputs(&self, config: &LabourConfig) -> Vec<Artifact> {
        vec![artifact(config, "source")]
    }

    fn outputs(&self, config: &LabourConfig) -> Vec<Artifact> {
        vec![artifact(config, "clean")]
    }

    fn run(&self, config: &LabourConfig) -> Result<StageReport, StageError> {
        let mut report = new_report(self.name());
        let periods = config.period_regex()?;
        let raw = io::read_source(&config.source, SECTION, &mut report)?;
        let normalized = normalizer(&config.absent_tokens)
            .with_strip_patterns(config.strip_regexes()?)
            .normalize_table(&raw, |column| {
                if periods.is_match(column) {
                    ColumnKind::Numeric
                } else {
                    ColumnKind::Text
                }
            })?;
        report.coercion_failures = normalized.coercion_failures;
        let table = normalized.table;

        let composite = match &config.composite_column {
            Some(column) => column.clone(),
            None => table
                .columns()
                .first()
                .cloned()
                .ok_or_else(|| StageError::MissingColumn {
                    path: config.source.path.clone(),
                    candidates: Vec::new(),
                })?,
        };
        debug!(column = %composite, "splitting composite column");
        let splitter = CompositeSplitter::new(
            config.composite_delimiter.as_str(),
            config.composite_targets.clone(),
        )?
        .with_suffix(config.composite_suffix.as_str());
        let split = splitter.split_column(&table, &composite)?;
        report.exclude("composite arity mismatch", split.rejected.len());

        let mut keep = names(&config.composite_targets);
        let years = period_columns(&split.table, &periods);
        info!(years = years.len(), "period columns");
        keep.extend(years);
        let clean = split.table.select(&keep)?;
        report.rows_out = clean.height();
        io::write_artifact(&clean, &config.artifact(&config.files.clean), &mut report)?;
        Ok(report)
    }
}

struct DimensionsStage;

impl Stage<LabourConfig> for DimensionsStage {
    fn name(&self) -> &'static str {
        "dimensions"
    }

    fn description(&self) -> &'static str {
        "Build the measure-type and aggregation-method dimensions"
    }

    fn inputs(&self, config: &LabourConfig) -> Vec<Artifact> {
        vec![artifact(config, "clean")]
    }

    fn outputs(&self, config: &LabourConfig) -> Vec<Artifact> {
        vec![
            artifact(config, "measures"),
            artifact(config, "aggregations"),
        ]
    }

    fn run(&self, config: &LabourConfig) -> Result<StageReport, StageError> {
        let mut report = new_report(self.name());
        let table = read_clean(config)?;
        report.rows_in = table.height();

        let measures = build_fresh(
            &table,
            &[MEASURE_NAME],
            &DimensionSchema::new("id_misura", &["valore"]),
        )?;
        let aggregations = build_fresh(
            &table,
            &[AGGREGATION_NAME],
            &DimensionSchema::new("id_aggr", &["nome"]),
        )?;
        report.rows_out = measures.dimension.len() + aggregations.dimension.len();
        info!(
            measures = measures.dimension.len(),
            aggregations = aggregations.dimension.len(),
            "built dimensions"
        );

        io::write_artifact(
            &measures.dimension.to_table()?,
            &config.artifact(&config.files.measures),
            &mut report,
        )?;
        io::write_artifact(
            &aggregations.dimension.to_table()?,
            &config.artifact(&config.files.aggregations),
            &mut report,
        )?;
        Ok(report)
    }
}

struct UnpivotStage;

impl Stage<LabourConfig> for UnpivotStage {
    fn name(&self) -> &'static str {
        "unpivot"
    }

    fn description(&self) -> &'static str {
        "Turn the year columns into one row per country, measure, method and year"
    }

    fn inputs(&self, config: &LabourConfig) -> Vec<Artifact> {
        vec![artifact(config, "clean")]
    }

    fn outputs(&self, config: &LabourConfig) -> Vec<Artifact> {
        vec![artifact(config, "long")]
    }

    fn run(&self, config: &LabourConfig) -> Result<StageReport, StageError> {
        let mut report = new_report(self.name());
        let periods = config.period_regex()?;
        let table = read_clean(config)?;
        report.rows_in = table.height();

        let years = period_columns(&table, &periods);
        let long = unpivot(
            &table,
            &[config.geo_column.as_str(), MEASURE_NAME, AGGREGATION_NAME],
            &years,
            PERIOD_LABEL,
            VALUE_LABEL,
        )?;
        report.exclude("absent value", long.dropped_absent);
        report.rows_out = long.table.height();
        io::write_artifact(&long.table, &config.artifact(&config.files.long), &mut report)?;
        Ok(report)
    }
}

struct ObservationsStage;

impl Stage<LabourConfig> for ObservationsStage {
    fn name(&self) -> &'static str {
        "observations"
    }

    fn description(&self) -> &'static str {
        "Resolve measure, method and year keys into the observation fact"
    }

    fn inputs(&self, config: &LabourConfig) -> Vec<Artifact> {
        vec![
            artifact(config, "long"),
            artifact(config, "measures"),
            artifact(config, "aggregations"),
            artifact(config, "years"),
        ]
    }

    fn outputs(&self, config: &LabourConfig) -> Vec<Artifact> {
        vec![artifact(config, "observations")]
    }

    fn run(&self, config: &LabourConfig) -> Result<StageReport, StageError> {
        let mut report = new_report(self.name());
        let long = io::read_artifact(&config.artifact(&config.files.long))?;
        report.rows_in = long.height();
        let long = concat_columns(
            long,
            OBSERVATION_NAME,
            &[config.geo_column.as_str(), MEASURE_NAME, AGGREGATION_NAME],
            &config.name_separator,
            &config.absent_fill,
        )?;

        let measures = io::load_dimension(
            &config.artifact(&config.files.measures),
            "id_misura",
            &["valore"],
        )?;
        let aggregations = io::load_dimension(
            &config.artifact(&config.files.aggregations),
            "id_aggr",
            &["nome"],
        )?;
        let years = io::load_dimension(
            &config.artifact(&config.year_lookup),
            "id_anno",
            &["valore"],
        )?;
        let joins = [
            DimensionJoin::new("cod_misura", &measures, &[(MEASURE_NAME, "valore")]),
            DimensionJoin::new("cod_aggr", &aggregations, &[(AGGREGATION_NAME, "nome")]),
            DimensionJoin::new("cod_anno", &years, &[(PERIOD_LABEL, "valore")]),
        ];
        let resolved = resolve(
            &long,
            &joins,
            &[(OBSERVATION_NAME, "nome"), (VALUE_LABEL, "valore")],
            "id_observation",
            config.unresolved,
        )?;
        report.exclude("unresolved foreign key", resolved.dropped);
        report.joins = resolved.joins;

        let output = resolved.facts.to_table()?.select(&OBSERVATION_COLUMNS)?;
        report.rows_out = output.height();
        io::write_artifact(
            &output,
            &config.artifact(&config.files.observations),
            &mut report,
        )?;
        Ok(report)
    }
}
