use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use serde_json::Value;
use tracing::{error, info};

use dwh_core::{FamilyKind, PipelineConfig, PipelineError, RunReport, StageFailure};

use crate::cli::RunAllArgs;
use crate::summary::print_catalog;

pub fn load_config(path: Option<&Path>) -> Result<PipelineConfig> {
    let config = PipelineConfig::load_or_default(path)?;
    config.validate()?;
    if let Some(path) = path {
        info!(path = %path.display(), "loaded configuration");
    }
    Ok(config)
}

pub fn run_stages(family: Option<&str>) -> Result<()> {
    let kinds = match family {
        Some(name) => vec![FamilyKind::parse(name)?],
        None => FamilyKind::ALL.to_vec(),
    };
    print_catalog(&kinds);
    Ok(())
}

/// Runs one stage. A failing stage still yields a report, so `--report`
/// records it; configuration errors are returned as errors.
pub fn run_stage(config: &PipelineConfig, family: &str, stage: &str) -> Result<RunReport> {
    match dwh_core::run_stage(config, family, stage) {
        Ok(report) => Ok(RunReport {
            family: report.family.clone(),
            stages: vec![report],
            failure: None,
        }),
        Err(PipelineError::Stage {
            family,
            stage,
            source,
        }) => {
            error!(family, stage, error = %source, "stage failed");
            Ok(RunReport {
                family: family.to_string(),
                stages: Vec::new(),
                failure: Some(StageFailure {
                    stage: stage.to_string(),
                    message: source.to_string(),
                    skipped: Vec::new(),
                }),
            })
        }
        Err(error) => Err(error.into()),
    }
}

pub fn run_all(config: &PipelineConfig, args: &RunAllArgs) -> Result<RunReport> {
    if !args.force {
        let present = dwh_core::outputs_present(config, &args.family)?;
        if !present.is_empty() {
            let listed: Vec<String> = present
                .iter()
                .map(|path| path.display().to_string())
                .collect();
            bail!(
                "outputs already exist, pass --force to overwrite: {}",
                listed.join(", ")
            );
        }
    }
    let report = dwh_core::run_all(config, &args.family)?;
    if let Some(failure) = &report.failure {
        error!(stage = %failure.stage, message = %failure.message, "run stopped");
    }
    Ok(report)
}

/// Writes `report` as pretty JSON.
pub fn write_report(path: &Path, report: &Value) -> Result<()> {
    let json = serde_json::to_string_pretty(report).context("serialize report")?;
    fs::write(path, json).with_context(|| format!("write report {}", path.display()))?;
    info!(path = %path.display(), "wrote report");
    Ok(())
}
