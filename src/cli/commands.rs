//! CLI command handlers.

use std::process::ExitCode;

use tracing::{error, info};

use super::args::{Args, Command, Preset, RunArgs, ScenarioArgs};
use super::output::{emit, format_verification, render_report};
use crate::error::SimResult;
use crate::line::simulate;

/// Main CLI entry point.
///
/// Dispatches to the command handler and maps errors to a failing exit code.
#[must_use]
pub fn run_cli(args: Args) -> ExitCode {
    let result = match &args.command {
        Command::Run(run) => run_line(run),
        Command::Config { preset } => print_config(*preset),
        Command::Verify { scenario, runs } => verify(scenario, *runs),
    };
    match result {
        Ok(code) => code,
        Err(err) => {
            error!(%err, "command failed");
            eprintln!("Error: {err}");
            ExitCode::from(2)
        }
    }
}

/// Simulate one run and emit its report.
///
/// # Errors
///
/// Returns configuration, simulation or output errors.
pub fn run_line(args: &RunArgs) -> SimResult<ExitCode> {
    let config = args.scenario.resolve()?;
    let report = simulate(&config)?;
    let rendered = render_report(&report, args.json)?;
    emit(&rendered, args.output.as_deref())?;
    if let Some(path) = &args.output {
        info!(path = %path.display(), "report written");
    }
    Ok(ExitCode::SUCCESS)
}

/// Print a preset as YAML.
///
/// # Errors
///
/// Returns error if serialization or stdout fails.
pub fn print_config(preset: Preset) -> SimResult<ExitCode> {
    emit(&preset.config().to_yaml()?, None)?;
    Ok(ExitCode::SUCCESS)
}

/// Run the scenario `runs` times and compare the JSON reports byte for byte.
///
/// # Errors
///
/// Returns configuration or simulation errors.
pub fn verify(scenario: &ScenarioArgs, runs: u32) -> SimResult<ExitCode> {
    let config = scenario.resolve()?;
    let reports = (0..runs)
        .map(|_| simulate(&config)?.to_json())
        .collect::<SimResult<Vec<String>>>()?;

    let identical = reports.windows(2).all(|pair| pair[0] == pair[1]);
    let sizes: Vec<usize> = reports.iter().map(String::len).collect();
    emit(&format_verification(config.seed, &sizes, identical), None)?;

    Ok(if identical {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(1)
    })
}
