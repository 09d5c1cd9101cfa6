//! canline CLI - tomato canning line simulator
//!
//! All logic lives in the `cli` module; this binary parses arguments and
//! installs the log subscriber.

use std::process::ExitCode;

use clap::Parser;
use tracing::Level;

use canline::cli::{run_cli, Args};

fn main() -> ExitCode {
    let args = Args::parse();

    let level = match args.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    run_cli(args)
}
