//! `dwh` command-line front end.

use std::io::{self, IsTerminal};

use anyhow::Result;
use clap::{ColorChoice, Parser};
use dwh_cli::logging::{LogConfig, LogFormat, init_logging};
use tracing::level_filters::LevelFilter;

mod cli;
mod commands;
mod summary;

use crate::cli::{Cli, Command, LogFormatArg, LogLevelArg};
use crate::commands::{load_config, run_all, run_stage, run_stages, write_report};
use crate::summary::print_run_report;

fn main() {
    let cli = Cli::parse();
    cli.color.write_global();
    let log_config = log_config_from_cli(&cli);
    if let Err(error) = init_logging(&log_config) {
        eprintln!("error: failed to initialize logging: {error}");
        std::process::exit(1);
    }
    let exit_code = match execute(&cli) {
        Ok(code) => code,
        Err(error) => {
            eprintln!("error: {error:#}");
            1
        }
    };
    std::process::exit(exit_code);
}

fn execute(cli: &Cli) -> Result<i32> {
    match &cli.command {
        Command::Stages { family } => {
            run_stages(family.as_deref())?;
            Ok(0)
        }
        Command::Run { family, stage } => {
            let config = load_config(cli.config.as_deref())?;
            let report = run_stage(&config, family, stage)?;
            print_run_report(&report);
            if let Some(path) = &cli.report {
                write_report(path, &serde_json::to_value(&report)?)?;
            }
            Ok(if report.is_success() { 0 } else { 1 })
        }
        Command::RunAll(args) => {
            let config = load_config(cli.config.as_deref())?;
            let report = run_all(&config, args)?;
            print_run_report(&report);
            if let Some(path) = &cli.report {
                write_report(path, &serde_json::to_value(&report)?)?;
            }
            Ok(if report.is_success() { 0 } else { 1 })
        }
    }
}

/// Logging configuration from CLI flags; `--log-level` beats `-v/-q`, and
/// either beats `RUST_LOG`.
fn log_config_from_cli(cli: &Cli) -> LogConfig {
    let mut config = LogConfig {
        level_filter: cli.verbosity.tracing_level_filter(),
        ..LogConfig::default()
    };
    config.use_env_filter = !(cli.verbosity.is_present() || cli.log_level.is_some());
    if let Some(level) = cli.log_level {
        config.level_filter = match level {
            LogLevelArg::Error => LevelFilter::ERROR,
            LogLevelArg::Warn => LevelFilter::WARN,
            LogLevelArg::Info => LevelFilter::INFO,
            LogLevelArg::Debug => LevelFilter::DEBUG,
            LogLevelArg::Trace => LevelFilter::TRACE,
        };
    }
    config.format = match cli.log_format {
        LogFormatArg::Pretty => LogFormat::Pretty,
        LogFormatArg::Compact => LogFormat::Compact,
        LogFormatArg::Json => LogFormat::Json,
    };
    config.log_file = cli.log_file.clone();
    config.with_ansi = match cli.color.color {
        ColorChoice::Always => true,
        ColorChoice::Never => false,
        ColorChoice::Auto => cli.log_file.is_none() && io::stderr().is_terminal(),
    };
    config
}
