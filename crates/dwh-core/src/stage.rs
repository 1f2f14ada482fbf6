//! Stages and the families that sequence them.
//!
//! A family is an ordered list of stages. Each stage declares the artifacts
//! it needs; the family opens every one of them before the stage runs, so a
//! missing upstream artifact aborts the stage before anything is written.
//! Running the whole family stops at the first failing stage and leaves the
//! artifacts of earlier stages in place.

use std::fs::File;
use std::path::PathBuf;
use std::time::Instant;

use tracing::{info, info_span, warn};

use crate::error::{ConfigError, PipelineError, StageError};
use crate::registry::FamilyKind;
use crate::report::{RunReport, StageFailure, StageReport};

/// A file a stage reads or writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub name: &'static str,
    pub path: PathBuf,
}

impl Artifact {
    pub fn new(name: &'static str, path: PathBuf) -> Self {
        Self { name, path }
    }
}

/// One step of a family, parameterised by the family's configuration.
pub trait Stage<C>: Send + Sync {
    fn name(&self) -> &'static str;

    fn description(&self) -> &'static str {
        ""
    }

    /// Artifacts that must exist before the stage runs.
    ///
    /// Optional inputs, such as a prior dimension snapshot, are not listed.
    fn inputs(&self, config: &C) -> Vec<Artifact>;

    fn outputs(&self, config: &C) -> Vec<Artifact>;

    fn run(&self, config: &C) -> Result<StageReport, StageError>;
}

pub struct Family<C> {
    kind: FamilyKind,
    stages: Vec<Box<dyn Stage<C>>>,
}

impl<C: 'static> Family<C> {
    pub fn new(kind: FamilyKind) -> Self {
        Self {
            kind,
            stages: Vec::new(),
        }
    }

    /// Appends a stage; stages run in the order they were added.
    pub fn add_stage(mut self, stage: Box<dyn Stage<C>>) -> Self {
        self.stages.push(stage);
        self
    }

    pub fn kind(&self) -> FamilyKind {
        self.kind
    }

    pub fn stages(&self) -> &[Box<dyn Stage<C>>] {
        &self.stages
    }

    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|stage| stage.name()).collect()
    }

    pub fn stage(&self, name: &str) -> Result<&dyn Stage<C>, ConfigError> {
        self.stages
            .iter()
            .find(|stage| stage.name().eq_ignore_ascii_case(name.trim()))
            .map(Box::as_ref)
            .ok_or_else(|| ConfigError::UnknownStage {
                family: self.kind.as_str(),
                name: name.to_string(),
                known: self.stage_names().join(", "),
            })
    }

    /// Runs one stage by name.
    pub fn run_stage(&self, config: &C, name: &str) -> Result<StageReport, PipelineError> {
        let stage = self.stage(name)?;
        self.execute(stage, config)
            .map_err(|source| PipelineError::Stage {
                family: self.kind.as_str(),
                stage: stage.name(),
                source,
            })
    }

    /// Runs every stage in order, stopping at the first failure.
    pub fn run_all(&self, config: &C) -> RunReport {
        let mut report = RunReport {
            family: self.kind.as_str().to_string(),
            ..RunReport::default()
        };
        for (idx, stage) in self.stages.iter().enumerate() {
            match self.execute(stage.as_ref(), config) {
                Ok(stage_report) => report.stages.push(stage_report),
                Err(error) => {
                    let skipped: Vec<String> = self.stages[idx + 1..]
                        .iter()
                        .map(|stage| stage.name().to_string())
                        .collect();
                    warn!(
                        family = self.kind.as_str(),
                        stage = stage.name(),
                        skipped = skipped.len(),
                        %error,
                        "stage failed, stopping run"
                    );
                    report.failure = Some(StageFailure {
                        stage: stage.name().to_string(),
                        message: error.to_string(),
                        skipped,
                    });
                    break;
                }
            }
        }
        report
    }

    /// Declared outputs that already exist on disk.
    pub fn outputs_present(&self, config: &C) -> Vec<PathBuf> {
        let mut present: Vec<PathBuf> = Vec::new();
        for stage in &self.stages {
            for artifact in stage.outputs(config) {
                if artifact.path.exists() && !present.contains(&artifact.path) {
                    present.push(artifact.path);
                }
            }
        }
        present
    }

    fn execute(&self, stage: &dyn Stage<C>, config: &C) -> Result<StageReport, StageError> {
        let span = info_span!("stage", family = self.kind.as_str(), stage = stage.name());
        let _guard = span.enter();

        for input in stage.inputs(config) {
            File::open(&input.path).map_err(|source| StageError::InputUnavailable {
                artifact: input.name,
                path: input.path.clone(),
                source,
            })?;
        }

        let started = Instant::now();
        let mut report = stage.run(config)?;
        report.duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        for (reason, count) in &report.exclusions {
            warn!(reason = %reason, count, "rows excluded");
        }
        for join in report.joins.iter().filter(|join| join.unresolved > 0) {
            warn!(
                foreign_key = %join.foreign_key,
                unresolved = join.unresolved,
                ambiguous = join.ambiguous,
                "foreign key left unresolved"
            );
        }
        info!(
            rows_in = report.rows_in,
            rows_out = report.rows_out,
            excluded = report.excluded(),
            unresolved = report.unresolved(),
            artifacts = report.artifacts.len(),
            duration_ms = report.duration_ms,
            "stage complete"
        );
        Ok(report)
    }
}
