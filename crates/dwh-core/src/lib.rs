//! Star-schema ETL pipeline.
//!
//! Each dataset family turns one national extract into dimension and fact
//! tables through an ordered list of stages. Stages communicate only through
//! the CSV artifacts they write, so any stage can be rerun on its own once
//! its inputs exist.

pub mod config;
pub mod error;
pub mod families;
mod io;
pub mod registry;
pub mod report;
pub mod stage;

pub use config::{
    EnrollmentConfig, GenderGapConfig, LabourConfig, PipelineConfig, SourceConfig,
};
pub use error::{ConfigError, PipelineError, Result, StageError};
pub use registry::{FamilyKind, StageInfo, outputs_present, run_all, run_stage, stage_catalog};
pub use report::{RunReport, StageFailure, StageReport};
pub use stage::{Artifact, Family, Stage};
