//! Stage and run reports.

use std::collections::BTreeMap;
use std::path::PathBuf;

use dwh_transform::{ColumnProfile, JoinReport};
use serde::Serialize;

/// What one stage did: row counts, exclusions by reason, join outcomes and
/// the artifacts it wrote.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StageReport {
    pub family: String,
    pub stage: String,
    pub rows_in: usize,
    pub rows_out: usize,
    pub exclusions: BTreeMap<String, usize>,
    pub joins: Vec<JoinReport>,
    pub coercion_failures: Vec<(String, usize)>,
    pub null_counts: Vec<(String, usize)>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile: Option<Vec<ColumnProfile>>,
    pub artifacts: Vec<PathBuf>,
    pub duration_ms: u64,
}

impl StageReport {
    pub fn new(family: &str, stage: &str) -> Self {
        Self {
            family: family.to_string(),
            stage: stage.to_string(),
            ..Self::default()
        }
    }

    /// Counts `count` rows excluded for `reason`. Zero counts are not recorded.
    pub fn exclude(&mut self, reason: &str, count: usize) {
        if count > 0 {
            *self.exclusions.entry(reason.to_string()).or_default() += count;
        }
    }

    pub fn excluded(&self) -> usize {
        self.exclusions.values().sum()
    }

    pub fn unresolved(&self) -> usize {
        self.joins.iter().map(|join| join.unresolved).sum()
    }
}

/// Why a run stopped early.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageFailure {
    pub stage: String,
    pub message: String,
    /// Stages that did not run because of the failure.
    pub skipped: Vec<String>,
}

/// Outcome of running a family's stages in order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunReport {
    pub family: String,
    pub stages: Vec<StageReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<StageFailure>,
}

impl RunReport {
    pub fn is_success(&self) -> bool {
        self.failure.is_none()
    }
}
