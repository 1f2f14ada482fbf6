//! Pipeline configuration.
//!
//! One TOML file with a section per family. Every field has a default, so
//! an empty file (or no file at all) runs each family against the layout its
//! national extract is published in. Artifact file names are relative to the
//! family's `output_dir`.
//!
//! ```toml
//! [gender_gap]
//! output_dir = "out"
//! reference_year = 2019
//! unresolved = "drop"
//!
//! [labour.source]
//! path = "estat.tsv"
//! delimiter = "\t"
//! encoding = "latin-1"
//! ```

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Component, Path, PathBuf};

use dwh_ingest::{SourceFormat, TextEncoding};
use dwh_transform::{PivotCategory, UnresolvedPolicy};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    pub gender_gap: GenderGapConfig,
    pub enrollment: EnrollmentConfig,
    pub labour: LabourConfig,
}

impl PipelineConfig {
    /// Reads and parses a TOML configuration file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Loads `path` when given, the built-in defaults otherwise.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    /// Checks every section. Called by the entry points before any I/O.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.gender_gap.validate()?;
        self.enrollment.validate()?;
        self.labour.validate()?;
        self.check_outputs_disjoint()
    }

    /// Every artifact has a single writer, so families can run in any order.
    fn check_outputs_disjoint(&self) -> Result<(), ConfigError> {
        let outputs = [
            ("gender_gap", self.gender_gap.outputs()),
            ("enrollment", self.enrollment.outputs()),
            ("labour", self.labour.outputs()),
        ];
        let mut writers: HashMap<PathBuf, String> = HashMap::new();
        for (section, files) in outputs {
            for (field, path) in files {
                let owner = format!("{section}.files.{field}");
                if let Some(first) = writers.insert(lexical(&path), owner.clone()) {
                    return Err(ConfigError::SharedOutput {
                        path,
                        first,
                        second: owner,
                    });
                }
            }
        }
        Ok(())
    }
}

/// `./out/a.csv` and `out/a.csv` name the same file.
fn lexical(path: &Path) -> PathBuf {
    path.components()
        .filter(|component| !matches!(component, Component::CurDir))
        .collect()
}

/// Where a family's raw extract lives and how it is laid out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SourceConfig {
    pub path: PathBuf,
    pub delimiter: String,
    pub encoding: TextEncoding,
}

impl SourceConfig {
    fn new(path: &str, delimiter: &str, encoding: TextEncoding) -> Self {
        Self {
            path: PathBuf::from(path),
            delimiter: delimiter.to_string(),
            encoding,
        }
    }

    /// The physical format; `section` only labels errors.
    pub fn format(&self, section: &str) -> Result<SourceFormat, ConfigError> {
        let delimiter = match self.delimiter.as_bytes() {
            [byte] if byte.is_ascii() => *byte,
            _ => {
                return Err(ConfigError::InvalidDelimiter {
                    field: format!("{section}.source.delimiter"),
                    value: self.delimiter.clone(),
                });
            }
        };
        Ok(SourceFormat::new(delimiter, self.encoding))
    }
}

/// Company gender-gap disclosures (one wide row per company).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GenderGapConfig {
    pub source: SourceConfig,
    pub output_dir: PathBuf,
    pub absent_tokens: Vec<String>,
    pub unresolved: UnresolvedPolicy,
    pub entity_column: String,
    pub metric_columns: Vec<String>,
    pub region_column: String,
    pub sector_column: String,
    /// Entities removed before any table is built.
    pub excluded_entities: Vec<String>,
    /// Year every disclosure refers to.
    pub reference_year: u16,
    /// Key given to the reference year when no year snapshot exists.
    pub year_anchor_key: u64,
    pub files: GenderGapFiles,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GenderGapFiles {
    pub wide: PathBuf,
    pub years: PathBuf,
    pub regions: PathBuf,
    pub sectors: PathBuf,
    pub companies: PathBuf,
    pub facts: PathBuf,
}

impl Default for GenderGapConfig {
    fn default() -> Self {
        Self {
            source: SourceConfig::new("DNF.csv", ";", TextEncoding::Utf8),
            output_dir: PathBuf::from("."),
            absent_tokens: strings(&[
                "N.A.", "n.d.", "ND", "-", "..", "n.q.", "N/A", "NaN", "None", "N.R.",
            ]),
            unresolved: UnresolvedPolicy::Keep,
            entity_column: "Aziende_nel_Database".to_string(),
            metric_columns: strings(&[
                "N_uomini_dipendenti",
                "N_donne_dipendenti",
                "Donne_nel_CdA_(%)",
                "Donne_in_posizioni_manageriali_di_vertice_(%)",
                "Disuguaglianza_salariale_di_genere_(%)",
                "Eta_media_dipendenti_(%)",
                "Dipendenti_con_eta_30_per",
                "Dipendenti_con_eta_30_50_per",
                "Dipendenti_con_eta_50_per",
                "Eta_media_in_CdA_(%)",
                "Membri_del_CdA_con_eta_30_per",
                "Membri_del_CdA_con_eta_30_50_per",
                "Membri_del_CdA_con_eta_50_per",
            ]),
            region_column: "Regioni".to_string(),
            sector_column: "Settore".to_string(),
            excluded_entities: strings(&["KIKO SPA", "COFIDE"]),
            reference_year: 2019,
            year_anchor_key: 1,
            files: GenderGapFiles::default(),
        }
    }
}

impl Default for GenderGapFiles {
    fn default() -> Self {
        Self {
            wide: PathBuf::from("gender_gap_dnf_wide.csv"),
            years: PathBuf::from("anno_dnf_export.csv"),
            regions: PathBuf::from("regione_export.csv"),
            sectors: PathBuf::from("ateco_export.csv"),
            companies: PathBuf::from("aziende_export.csv"),
            facts: PathBuf::from("gender_gap_dnf_filatrato.csv"),
        }
    }
}

impl GenderGapConfig {
    pub fn artifact(&self, file: &Path) -> PathBuf {
        self.output_dir.join(file)
    }

    /// Artifacts the family writes, by field name.
    pub fn outputs(&self) -> Vec<(&'static str, PathBuf)> {
        let files = &self.files;
        vec![
            ("wide", self.artifact(&files.wide)),
            ("years", self.artifact(&files.years)),
            ("regions", self.artifact(&files.regions)),
            ("sectors", self.artifact(&files.sectors)),
            ("companies", self.artifact(&files.companies)),
            ("facts", self.artifact(&files.facts)),
        ]
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        const SECTION: &str = "gender_gap";
        self.source.format(SECTION)?;
        require_name(SECTION, "entity_column", &self.entity_column)?;
        require_name(SECTION, "region_column", &self.region_column)?;
        require_name(SECTION, "sector_column", &self.sector_column)?;
        require_columns(SECTION, "metric_columns", &self.metric_columns)?;
        if self.metric_columns.contains(&self.entity_column) {
            return Err(invalid(
                SECTION,
                "metric_columns",
                format!("{} is the entity column", self.entity_column),
            ));
        }
        require_key(SECTION, "year_anchor_key", self.year_anchor_key)
    }
}

/// University enrollment series (one long row per year, faculty and sex).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EnrollmentConfig {
    pub source: SourceConfig,
    pub output_dir: PathBuf,
    pub absent_tokens: Vec<String>,
    pub unresolved: UnresolvedPolicy,
    /// Rows are kept only when this column holds one of `scope_values`.
    /// An empty list keeps every row.
    pub scope_column: String,
    pub scope_values: Vec<String>,
    pub period_column: String,
    /// Extracts the year from a period label such as `2023/2024`.
    pub period_pattern: String,
    /// Candidate names, first present wins.
    pub faculty_columns: Vec<String>,
    pub enrolled_columns: Vec<String>,
    pub sex_columns: Vec<String>,
    pub anchor_year: u16,
    pub anchor_key: u64,
    /// Sex labels pivoted into one measure column each.
    pub categories: Vec<PivotCategory>,
    pub files: EnrollmentFiles,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EnrollmentFiles {
    pub years: PathBuf,
    pub faculties: PathBuf,
    pub analysis: PathBuf,
}

impl Default for EnrollmentConfig {
    fn default() -> Self {
        Self {
            source: SourceConfig::new("bdg_serie_iscritti.csv", ";", TextEncoding::Latin1),
            output_dir: PathBuf::from("."),
            absent_tokens: strings(&["N/A", "NaN", "NULL", "null"]),
            unresolved: UnresolvedPolicy::Keep,
            scope_column: "AteneoNOME".to_string(),
            scope_values: strings(&["TOTALE ATENEI"]),
            period_column: "ANNO".to_string(),
            period_pattern: r"^\d{4}".to_string(),
            faculty_columns: strings(&["DESC_FoET2013", "nome_facolta"]),
            enrolled_columns: strings(&["ISC", "num_iscritti"]),
            sex_columns: strings(&["SEX", "Sesso", "Genere", "sesso", "sesso_agg"]),
            anchor_year: 2019,
            anchor_key: 1,
            categories: vec![
                PivotCategory::new("M", "num_iscritti_m"),
                PivotCategory::new("F", "num_iscritti_f"),
            ],
            files: EnrollmentFiles::default(),
        }
    }
}

impl Default for EnrollmentFiles {
    fn default() -> Self {
        Self {
            years: PathBuf::from("anno_export.csv"),
            faculties: PathBuf::from("facolta_export.csv"),
            analysis: PathBuf::from("analisi_export.csv"),
        }
    }
}

impl EnrollmentConfig {
    pub fn artifact(&self, file: &Path) -> PathBuf {
        self.output_dir.join(file)
    }

    pub fn outputs(&self) -> Vec<(&'static str, PathBuf)> {
        let files = &self.files;
        vec![
            ("years", self.artifact(&files.years)),
            ("faculties", self.artifact(&files.faculties)),
            ("analysis", self.artifact(&files.analysis)),
        ]
    }

    pub fn period_regex(&self) -> Result<Regex, ConfigError> {
        compile("enrollment", "period_pattern", &self.period_pattern)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        const SECTION: &str = "enrollment";
        self.source.format(SECTION)?;
        self.period_regex()?;
        require_name(SECTION, "period_column", &self.period_column)?;
        if !self.scope_values.is_empty() {
            require_name(SECTION, "scope_column", &self.scope_column)?;
        }
        require_columns(SECTION, "faculty_columns", &self.faculty_columns)?;
        require_columns(SECTION, "enrolled_columns", &self.enrolled_columns)?;
        require_columns(SECTION, "sex_columns", &self.sex_columns)?;
        if self.categories.is_empty() {
            return Err(invalid(SECTION, "categories", "at least one category is required"));
        }
        let outputs: Vec<String> = self.categories.iter().map(|c| c.column.clone()).collect();
        require_columns(SECTION, "categories", &outputs)?;
        require_key(SECTION, "anchor_key", self.anchor_key)
    }
}

/// Labour-force extract: composite first column, one column per year.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LabourConfig {
    pub source: SourceConfig,
    pub output_dir: PathBuf,
    pub absent_tokens: Vec<String>,
    pub unresolved: UnresolvedPolicy,
    /// Composite column; the first column when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub composite_column: Option<String>,
    pub composite_delimiter: String,
    pub composite_targets: Vec<String>,
    /// Removed from the last composite part.
    pub composite_suffix: String,
    /// Headers matching this pattern are period columns.
    pub period_header_pattern: String,
    /// Flag annotations removed from the period columns.
    pub strip_patterns: Vec<String>,
    pub geo_column: String,
    /// Composite parts joined into the measure-type name.
    pub measure_parts: Vec<String>,
    /// Composite parts joined into the aggregation-method name.
    pub aggregation_parts: Vec<String>,
    pub name_separator: String,
    /// Rendered in place of an absent part in derived names.
    pub absent_fill: String,
    /// Year dimension written by another family; relative to `output_dir`.
    pub year_lookup: PathBuf,
    pub files: LabourFiles,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LabourFiles {
    pub clean: PathBuf,
    pub measures: PathBuf,
    pub aggregations: PathBuf,
    pub long: PathBuf,
    pub observations: PathBuf,
}

impl Default for LabourConfig {
    fn default() -> Self {
        Self {
            source: SourceConfig::new("estat.csv", "\t", TextEncoding::Latin1),
            output_dir: PathBuf::from("."),
            absent_tokens: strings(&[":"]),
            unresolved: UnresolvedPolicy::Keep,
            composite_column: None,
            composite_delimiter: ",".to_string(),
            composite_targets: strings(&["freq", "wstatus", "age", "unit", "geo"]),
            composite_suffix: r"\TIME_PERIOD".to_string(),
            period_header_pattern: r"^[0-9]{4}$".to_string(),
            strip_patterns: strings(&[r"\s+[bu]"]),
            geo_column: "geo".to_string(),
            measure_parts: strings(&["wstatus", "age"]),
            aggregation_parts: strings(&["freq", "unit"]),
            name_separator: "_".to_string(),
            absent_fill: "NA".to_string(),
            year_lookup: PathBuf::from("anno_export.csv"),
            files: LabourFiles::default(),
        }
    }
}

impl Default for LabourFiles {
    fn default() -> Self {
        Self {
            clean: PathBuf::from("estat_clean.csv"),
            measures: PathBuf::from("tipo_misura_import_full.csv"),
            aggregations: PathBuf::from("metodo_aggr_import_full.csv"),
            long: PathBuf::from("estat_long.csv"),
            observations: PathBuf::from("observation_import_full.csv"),
        }
    }
}

impl LabourConfig {
    pub fn artifact(&self, file: &Path) -> PathBuf {
        self.output_dir.join(file)
    }

    /// `year_lookup` is read, not written, so it is not listed.
    pub fn outputs(&self) -> Vec<(&'static str, PathBuf)> {
        let files = &self.files;
        vec![
            ("clean", self.artifact(&files.clean)),
            ("measures", self.artifact(&files.measures)),
            ("aggregations", self.artifact(&files.aggregations)),
            ("long", self.artifact(&files.long)),
            ("observations", self.artifact(&files.observations)),
        ]
    }

    pub fn period_regex(&self) -> Result<Regex, ConfigError> {
        compile("labour", "period_header_pattern", &self.period_header_pattern)
    }

    pub fn strip_regexes(&self) -> Result<Vec<Regex>, ConfigError> {
        self.strip_patterns
            .iter()
            .map(|pattern| compile("labour", "strip_patterns", pattern))
            .collect()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        const SECTION: &str = "labour";
        self.source.format(SECTION)?;
        self.period_regex()?;
        self.strip_regexes()?;
        if self.composite_delimiter.is_empty() {
            return Err(invalid(SECTION, "composite_delimiter", "must not be empty"));
        }
        require_columns(SECTION, "composite_targets", &self.composite_targets)?;
        require_columns(SECTION, "measure_parts", &self.measure_parts)?;
        require_columns(SECTION, "aggregation_parts", &self.aggregation_parts)?;
        let parts = std::iter::once(&self.geo_column)
            .chain(&self.measure_parts)
            .chain(&self.aggregation_parts);
        for part in parts {
            if !self.composite_targets.contains(part) {
                return Err(invalid(
                    SECTION,
                    "composite_targets",
                    format!("{part} is used in a derived name but is not a composite part"),
                ));
            }
        }
        Ok(())
    }
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| (*value).to_string()).collect()
}

fn invalid(section: &str, field: &str, message: impl Into<String>) -> ConfigError {
    ConfigError::InvalidField {
        field: format!("{section}.{field}"),
        message: message.into(),
    }
}

fn compile(section: &str, field: &str, pattern: &str) -> Result<Regex, ConfigError> {
    Regex::new(pattern).map_err(|source| ConfigError::InvalidPattern {
        field: format!("{section}.{field}"),
        source,
    })
}

fn require_name(section: &str, field: &str, value: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(invalid(section, field, "must not be empty"));
    }
    Ok(())
}

fn require_columns(section: &str, field: &str, columns: &[String]) -> Result<(), ConfigError> {
    if columns.is_empty() {
        return Err(invalid(section, field, "at least one column is required"));
    }
    let mut seen = HashSet::new();
    for column in columns {
        require_name(section, field, column)?;
        if !seen.insert(column.as_str()) {
            return Err(invalid(section, field, format!("{column} is listed twice")));
        }
    }
    Ok(())
}

fn require_key(section: &str, field: &str, key: u64) -> Result<(), ConfigError> {
    if key == 0 {
        return Err(invalid(section, field, "surrogate keys start at 1"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        PipelineConfig::default().validate().expect("defaults");
    }

    #[test]
    fn empty_file_means_defaults() {
        let config: PipelineConfig = toml::from_str("").expect("parse");
        assert_eq!(config, PipelineConfig::default());
    }

    #[test]
    fn sections_override_individual_fields() {
        let config: PipelineConfig = toml::from_str(
            r#"
            [gender_gap]
            reference_year = 2020
            excluded_entities = ["ACME"]
            unresolved = "drop"

            [labour.source]
            path = "data/estat.tsv"
            delimiter = "\t"
            encoding = "latin-1"
            "#,
        )
        .expect("parse");
        assert_eq!(config.gender_gap.reference_year, 2020);
        assert_eq!(config.gender_gap.excluded_entities, vec!["ACME".to_string()]);
        assert_eq!(config.gender_gap.unresolved, UnresolvedPolicy::Drop);
        assert_eq!(config.gender_gap.region_column, "Regioni");
        let format = config.labour.source.format("labour").expect("format");
        assert_eq!(format.delimiter, b'\t');
        assert_eq!(format.encoding, TextEncoding::Latin1);
        assert_eq!(config.labour.composite_targets.len(), 5);
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let parsed: Result<PipelineConfig, _> = toml::from_str("[gender_gap]\nyear = 2019\n");
        assert!(parsed.is_err());
    }

    #[test]
    fn multi_character_delimiter_is_invalid() {
        let mut config = PipelineConfig::default();
        config.enrollment.source.delimiter = ";;".to_string();
        let err = config.validate().expect_err("delimiter");
        assert!(matches!(err, ConfigError::InvalidDelimiter { .. }));
        assert!(err.to_string().contains("enrollment.source.delimiter"));
    }

    #[test]
    fn broken_pattern_is_invalid() {
        let mut config = PipelineConfig::default();
        config.labour.strip_patterns = vec!["(".to_string()];
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidPattern { .. })
        ));
    }

    #[test]
    fn derived_name_parts_must_be_composite_parts() {
        let mut config = PipelineConfig::default();
        config.labour.geo_column = "country".to_string();
        let err = config.validate().expect_err("geo");
        assert!(err.to_string().contains("country"));
    }

    #[test]
    fn anchor_key_zero_is_invalid() {
        let mut config = PipelineConfig::default();
        config.enrollment.anchor_key = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn default_families_write_disjoint_artifacts() {
        let config = PipelineConfig::default();
        assert_ne!(
            config.gender_gap.artifact(&config.gender_gap.files.years),
            config.enrollment.artifact(&config.enrollment.files.years)
        );
        assert_eq!(
            config.labour.artifact(&config.labour.year_lookup),
            config.enrollment.artifact(&config.enrollment.files.years)
        );
    }

    #[test]
    fn artifact_shared_between_families_is_invalid() {
        let mut config: PipelineConfig = toml::from_str(
            r#"
            [gender_gap.files]
            years = "anno_export.csv"

            [enrollment]
            output_dir = "./"
            "#,
        )
        .expect("parse");
        let err = config.validate().expect_err("shared years");
        assert!(matches!(err, ConfigError::SharedOutput { .. }));
        let message = err.to_string();
        assert!(message.contains("gender_gap.files.years"), "{message}");
        assert!(message.contains("enrollment.files.years"), "{message}");

        config.enrollment.output_dir = PathBuf::from("mur");
        config.validate().expect("separate directories");
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let err = PipelineConfig::load(Path::new("/nonexistent/dwh.toml")).expect_err("read");
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
