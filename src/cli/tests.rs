//! CLI module tests.

#![allow(clippy::unwrap_used)]

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use super::args::{Args, Command, Preset, RunArgs, ScenarioArgs};
use super::commands::{run_line, verify};
use super::output::{format_verification, render_report};
use crate::config::LineConfig;
use crate::line::simulate;

// ============================================================================
// Args parsing tests
// ============================================================================

#[test]
fn test_parse_run_defaults() {
    let args = Args::try_parse_from(["canline", "run"]).unwrap();
    assert_eq!(args.verbose, 0);
    let Command::Run(run) = args.command else {
        unreachable!("expected run");
    };
    assert_eq!(run.scenario.preset, Preset::Low);
    assert!(run.scenario.config.is_none());
    assert!(!run.json);
}

#[test]
fn test_parse_run_overrides() {
    let args = Args::try_parse_from([
        "canline", "-vv", "run", "--preset", "high", "--seed", "9", "--horizon", "3600", "--json",
        "-o", "out.json",
    ])
    .unwrap();
    assert_eq!(args.verbose, 2);
    assert_eq!(
        args.command,
        Command::Run(RunArgs {
            scenario: ScenarioArgs {
                config: None,
                preset: Preset::High,
                seed: Some(9),
                horizon: Some(3600.0),
            },
            json: true,
            output: Some(PathBuf::from("out.json")),
        })
    );
}

#[test]
fn test_parse_verify_runs_lower_bound() {
    assert!(Args::try_parse_from(["canline", "verify", "--runs", "1"]).is_err());
    let args = Args::try_parse_from(["canline", "verify", "--runs", "3"]).unwrap();
    assert!(matches!(args.command, Command::Verify { runs: 3, .. }));
}

#[test]
fn test_parse_config_preset() {
    let args = Args::try_parse_from(["canline", "config", "--preset", "high"]).unwrap();
    assert_eq!(args.command, Command::Config { preset: Preset::High });
}

#[test]
fn test_parse_unknown_preset_fails() {
    assert!(Args::try_parse_from(["canline", "run", "--preset", "medium"]).is_err());
}

#[test]
fn test_parse_requires_command() {
    assert!(Args::try_parse_from(["canline"]).is_err());
}

// ============================================================================
// Scenario resolution tests
// ============================================================================

fn scenario(preset: Preset) -> ScenarioArgs {
    ScenarioArgs {
        config: None,
        preset,
        seed: None,
        horizon: None,
    }
}

#[test]
fn test_resolve_preset_with_overrides() {
    let mut args = scenario(Preset::High);
    args.seed = Some(11);
    args.horizon = Some(100.0);
    let config = args.resolve().unwrap();
    assert_eq!(config.seed, 11);
    assert!((config.horizon - 100.0).abs() < f64::EPSILON);
    assert_eq!(config.stations, LineConfig::high_capacity().stations);
}

#[test]
fn test_resolve_rejects_bad_horizon() {
    let mut args = scenario(Preset::Low);
    args.horizon = Some(-5.0);
    assert!(args.resolve().unwrap_err().is_config_error());
}

#[test]
fn test_resolve_missing_file() {
    let mut args = scenario(Preset::Low);
    args.config = Some(PathBuf::from("/nonexistent/canline.yaml"));
    assert!(args.resolve().is_err());
}

#[test]
fn test_resolve_from_file() {
    let path = std::env::temp_dir().join(format!("canline-cli-{}.yaml", std::process::id()));
    std::fs::write(&path, "seed: 5\nhorizon: 50.0\n").unwrap();
    let mut args = scenario(Preset::High);
    args.config = Some(path.clone());
    let config = args.resolve().unwrap();
    std::fs::remove_file(&path).unwrap();

    assert_eq!(config.seed, 5);
    // The file replaces the preset entirely
    assert!((config.arrival_interval - 1.0).abs() < f64::EPSILON);
}

// ============================================================================
// Command tests
// ============================================================================

#[test]
fn test_run_line_writes_json_file() {
    let path = std::env::temp_dir().join(format!("canline-report-{}.json", std::process::id()));
    let mut run = RunArgs {
        scenario: scenario(Preset::Low),
        json: true,
        output: Some(path.clone()),
    };
    run.scenario.horizon = Some(60.0);

    assert_eq!(run_line(&run).unwrap(), ExitCode::SUCCESS);
    let written = std::fs::read_to_string(&path).unwrap();
    std::fs::remove_file(&path).unwrap();
    assert!(written.contains("\"tomatoes_generated\": 61"));
}

#[test]
fn test_verify_is_deterministic() {
    let mut args = scenario(Preset::High);
    args.horizon = Some(500.0);
    assert_eq!(verify(&args, 2).unwrap(), ExitCode::SUCCESS);
}

#[test]
fn test_render_report_text_and_json() {
    let config = LineConfig::builder().horizon(30.0).build().unwrap();
    let report = simulate(&config).unwrap();
    assert!(render_report(&report, false).unwrap().contains("Counters:"));
    assert!(render_report(&report, true).unwrap().starts_with('{'));
}

#[test]
fn test_format_verification() {
    let ok = format_verification(42, &[100, 100], true);
    assert!(ok.contains("seed 42"));
    assert!(ok.contains("run 2: 100 bytes"));
    assert!(ok.contains("identical"));
    assert!(format_verification(1, &[1, 2], false).contains("differ"));
}
