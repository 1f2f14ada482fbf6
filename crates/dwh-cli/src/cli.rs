//! CLI argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colorchoice_clap::Color;

#[derive(Parser)]
#[command(
    name = "dwh",
    version,
    about = "Build star-schema tables from national statistics extracts",
    long_about = "Build star-schema tables from national statistics extracts.\n\n\
                  Each family (gender-gap, enrollment, labour) turns one extract into\n\
                  dimension and fact CSV files through an ordered list of stages."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Pipeline configuration file (TOML). Defaults apply when omitted.
    #[arg(long = "config", value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Write the run report as JSON to this file.
    #[arg(long = "report", value_name = "PATH", global = true)]
    pub report: Option<PathBuf>,

    /// Adjust log verbosity (-v for info, -vv for debug, -q for errors only).
    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,

    /// Control ANSI color output (auto, always, never).
    #[command(flatten)]
    pub color: Color,

    /// Explicit log level (overrides -v/-q flags).
    #[arg(long = "log-level", value_enum, global = true)]
    pub log_level: Option<LogLevelArg>,

    /// Log output format.
    #[arg(
        long = "log-format",
        value_enum,
        default_value = "pretty",
        global = true
    )]
    pub log_format: LogFormatArg,

    /// Write logs to a file instead of stderr.
    #[arg(long = "log-file", value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Command {
    /// List the families and their stages.
    Stages {
        /// Only this family.
        #[arg(value_name = "FAMILY")]
        family: Option<String>,
    },

    /// Run a single stage.
    Run {
        #[arg(value_name = "FAMILY")]
        family: String,
        #[arg(value_name = "STAGE")]
        stage: String,
    },

    /// Run every stage of a family in order, stopping at the first failure.
    RunAll(RunAllArgs),
}

#[derive(Parser)]
pub struct RunAllArgs {
    #[arg(value_name = "FAMILY")]
    pub family: String,

    /// Overwrite outputs left by a previous run.
    #[arg(long = "force")]
    pub force: bool,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn global_options_follow_the_subcommand() {
        let cli = Cli::try_parse_from([
            "dwh", "run-all", "labour", "--force", "--config", "dwh.toml", "--log-format", "json",
        ])
        .expect("parse");
        assert!(matches!(cli.log_format, LogFormatArg::Json));
        assert_eq!(cli.config, Some(PathBuf::from("dwh.toml")));
        match cli.command {
            Command::RunAll(args) => {
                assert_eq!(args.family, "labour");
                assert!(args.force);
            }
            _ => panic!("expected run-all"),
        }
    }

    #[test]
    fn run_requires_a_stage() {
        assert!(Cli::try_parse_from(["dwh", "run", "labour"]).is_err());
    }
}
