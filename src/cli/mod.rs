//! CLI module for canline.
//!
//! All command logic lives here so that `main.rs` only parses arguments,
//! installs logging and forwards to [`run_cli`].

mod args;
mod commands;
mod output;

pub use args::{Args, Command, Preset, RunArgs, ScenarioArgs};
pub use commands::{print_config, run_cli, run_line, verify};
pub use output::{emit, format_verification, render_report};

#[cfg(test)]
mod tests;
