//! CLI argument parsing.

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand, ValueEnum};

use crate::config::LineConfig;
use crate::error::SimResult;

const VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), " (", env!("CANLINE_GIT_HASH"), ")");

/// Tomato canning line simulator.
#[derive(Debug, Parser)]
#[command(name = "canline", version = VERSION, about, long_about = None)]
pub struct Args {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Command to execute.
    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI commands.
#[derive(Debug, Clone, PartialEq, Subcommand)]
pub enum Command {
    /// Simulate one run and print the report.
    Run(RunArgs),
    /// Print a preset configuration as YAML.
    Config {
        /// Preset to print.
        #[arg(long, value_enum, default_value_t = Preset::Low)]
        preset: Preset,
    },
    /// Run the same scenario several times and check the reports are identical.
    Verify {
        /// Scenario selection.
        #[command(flatten)]
        scenario: ScenarioArgs,
        /// Number of runs to compare.
        #[arg(long, default_value_t = 2, value_parser = clap::value_parser!(u32).range(2..))]
        runs: u32,
    },
}

/// Arguments of `canline run`.
#[derive(Debug, Clone, PartialEq, clap::Args)]
pub struct RunArgs {
    /// Scenario selection.
    #[command(flatten)]
    pub scenario: ScenarioArgs,
    /// Print the report as JSON.
    #[arg(long)]
    pub json: bool,
    /// Write the report to a file instead of stdout.
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,
}

/// Which configuration to simulate.
#[derive(Debug, Clone, PartialEq, clap::Args)]
pub struct ScenarioArgs {
    /// YAML configuration file; overrides the preset.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,
    /// Built-in line layout.
    #[arg(long, value_enum, default_value_t = Preset::Low)]
    pub preset: Preset,
    /// Override the seed.
    #[arg(long)]
    pub seed: Option<u64>,
    /// Override the horizon.
    #[arg(long)]
    pub horizon: Option<f64>,
}

impl ScenarioArgs {
    /// Resolve to a validated configuration.
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read or the result fails validation.
    pub fn resolve(&self) -> SimResult<LineConfig> {
        let mut config = match &self.config {
            Some(path) => LineConfig::load(path)?,
            None => self.preset.config(),
        };
        if let Some(seed) = self.seed {
            config.seed = seed;
        }
        if let Some(horizon) = self.horizon {
            config.horizon = horizon;
        }
        config.check()?;
        Ok(config)
    }
}

/// Built-in line layouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Preset {
    /// One machine per station, one tomato per time unit.
    Low,
    /// Parallel machine banks, two tomatoes per time unit.
    High,
}

impl Preset {
    /// Configuration of this preset.
    #[must_use]
    pub fn config(self) -> LineConfig {
        match self {
            Self::Low => LineConfig::low_capacity(),
            Self::High => LineConfig::high_capacity(),
        }
    }
}
