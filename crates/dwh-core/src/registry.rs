//! Family registry and pipeline entry points.
//!
//! Families are built once and shared. Every entry point validates the whole
//! configuration first, so a configuration error never leaves a partially
//! written artifact behind.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

use crate::config::{EnrollmentConfig, GenderGapConfig, LabourConfig, PipelineConfig};
use crate::error::{ConfigError, Result};
use crate::families::{enrollment, gender_gap, labour};
use crate::report::{RunReport, StageReport};
use crate::stage::Family;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FamilyKind {
    GenderGap,
    Enrollment,
    Labour,
}

impl FamilyKind {
    pub const ALL: [Self; 3] = [Self::GenderGap, Self::Enrollment, Self::Labour];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::GenderGap => "gender-gap",
            Self::Enrollment => "enrollment",
            Self::Labour => "labour",
        }
    }

    pub fn aliases(self) -> &'static [&'static str] {
        match self {
            Self::GenderGap => &["dnf", "gender_gap"],
            Self::Enrollment => &["mur"],
            Self::Labour => &["estat", "eurostat", "labor"],
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Self::GenderGap => "Company gender-gap disclosures by region and sector",
            Self::Enrollment => "University enrollment by year, faculty and sex",
            Self::Labour => "Labour-force indicators by country, measure and year",
        }
    }

    /// Resolves a family name or alias, ignoring case.
    pub fn parse(name: &str) -> Result<Self, ConfigError> {
        let wanted = name.trim();
        Self::ALL
            .into_iter()
            .find(|kind| {
                kind.as_str().eq_ignore_ascii_case(wanted)
                    || kind
                        .aliases()
                        .iter()
                        .any(|alias| alias.eq_ignore_ascii_case(wanted))
            })
            .ok_or_else(|| ConfigError::UnknownFamily {
                name: name.to_string(),
                known: Self::ALL.map(Self::as_str).join(", "),
            })
    }
}

impl fmt::Display for FamilyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FamilyKind {
    type Err = ConfigError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        Self::parse(name)
    }
}

/// Name and description of a stage, for listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageInfo {
    pub name: &'static str,
    pub description: &'static str,
}

fn gender_gap_family() -> &'static Family<GenderGapConfig> {
    static FAMILY: OnceLock<Family<GenderGapConfig>> = OnceLock::new();
    FAMILY.get_or_init(gender_gap::family)
}

fn enrollment_family() -> &'static Family<EnrollmentConfig> {
    static FAMILY: OnceLock<Family<EnrollmentConfig>> = OnceLock::new();
    FAMILY.get_or_init(enrollment::family)
}

fn labour_family() -> &'static Family<LabourConfig> {
    static FAMILY: OnceLock<Family<LabourConfig>> = OnceLock::new();
    FAMILY.get_or_init(labour::family)
}

fn catalog<C: 'static>(family: &Family<C>) -> Vec<StageInfo> {
    family
        .stages()
        .iter()
        .map(|stage| StageInfo {
            name: stage.name(),
            description: stage.description(),
        })
        .collect()
}

/// Stages of `kind` in execution order.
pub fn stage_catalog(kind: FamilyKind) -> Vec<StageInfo> {
    match kind {
        FamilyKind::GenderGap => catalog(gender_gap_family()),
        FamilyKind::Enrollment => catalog(enrollment_family()),
        FamilyKind::Labour => catalog(labour_family()),
    }
}

/// Runs a single stage of `family`.
pub fn run_stage(config: &PipelineConfig, family: &str, stage: &str) -> Result<StageReport> {
    config.validate()?;
    match FamilyKind::parse(family)? {
        FamilyKind::GenderGap => gender_gap_family().run_stage(&config.gender_gap, stage),
        FamilyKind::Enrollment => enrollment_family().run_stage(&config.enrollment, stage),
        FamilyKind::Labour => labour_family().run_stage(&config.labour, stage),
    }
}

/// Runs every stage of `family` in order, stopping at the first failure.
///
/// Stage failures are reported in the returned [`RunReport`]; only
/// configuration errors are returned as `Err`.
pub fn run_all(config: &PipelineConfig, family: &str) -> Result<RunReport> {
    config.validate()?;
    let report = match FamilyKind::parse(family)? {
        FamilyKind::GenderGap => gender_gap_family().run_all(&config.gender_gap),
        FamilyKind::Enrollment => enrollment_family().run_all(&config.enrollment),
        FamilyKind::Labour => labour_family().run_all(&config.labour),
    };
    Ok(report)
}

/// Outputs of `family` that already exist, so callers can refuse to
/// overwrite them.
pub fn outputs_present(config: &PipelineConfig, family: &str) -> Result<Vec<PathBuf>> {
    config.validate()?;
    let present = match FamilyKind::parse(family)? {
        FamilyKind::GenderGap => gender_gap_family().outputs_present(&config.gender_gap),
        FamilyKind::Enrollment => enrollment_family().outputs_present(&config.enrollment),
        FamilyKind::Labour => labour_family().outputs_present(&config.labour),
    };
    Ok(present)
}
