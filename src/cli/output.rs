//! CLI output formatting.

use std::io::Write;
use std::path::Path;

use crate::error::SimResult;
use crate::report::LineReport;

/// Render a report as text or pretty JSON.
///
/// # Errors
///
/// Returns error if JSON serialization fails.
pub fn render_report(report: &LineReport, json: bool) -> SimResult<String> {
    if json {
        report.to_json()
    } else {
        Ok(report.to_string())
    }
}

/// Write a rendered report to `path`, or to stdout if none is given.
///
/// # Errors
///
/// Returns error if the destination cannot be written.
pub fn emit(rendered: &str, path: Option<&Path>) -> SimResult<()> {
    match path {
        Some(path) => std::fs::write(path, rendered)?,
        None => {
            let mut stdout = std::io::stdout().lock();
            writeln!(stdout, "{rendered}")?;
        }
    }
    Ok(())
}

/// One line per verification run plus a verdict.
#[must_use]
pub fn format_verification(seed: u64, sizes: &[usize], identical: bool) -> String {
    let runs: Vec<String> = sizes
        .iter()
        .enumerate()
        .map(|(run, len)| format!("  run {}: {len} bytes of report", run + 1))
        .collect();
    let verdict = if identical {
        "  ✓ all reports identical"
    } else {
        "  ✗ reports differ"
    };
    format!(
        "Reproducibility check, seed {seed}:\n{}\n{verdict}",
        runs.join("\n")
    )
}
