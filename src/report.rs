//! Run-end report.
//!
//! A [`LineReport`] is a plain snapshot: configuration echo, run outcome,
//! counters, latency statistics and per-resource summaries. It renders as a
//! text table through `Display` or as JSON through `serde_json`.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::LineConfig;
use crate::engine::{ResourceReport, RunOutcome, WaitQueueReport};
use crate::error::SimResult;
use crate::line::{LineCounters, LineLatencies};

/// Everything a finished run exposes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineReport {
    /// Configuration the run used.
    pub config: LineConfig,
    /// How the run ended.
    pub outcome: RunOutcome,
    /// Run-end counters.
    pub counters: LineCounters,
    /// Latency statistics per process kind.
    pub latency: LineLatencies,
    /// Tomatoes left over in an unfinished jar.
    pub tomatoes_in_current_jar: u32,
    /// One entry per station, in flow order.
    pub stations: Vec<ResourceReport>,
    /// Barrier in front of the sterilizer.
    pub sterilization_queue: WaitQueueReport,
}

impl LineReport {
    /// Pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns error if serialization fails.
    pub fn to_json(&self) -> SimResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Station summary by report name.
    #[must_use]
    pub fn station(&self, name: &str) -> Option<&ResourceReport> {
        self.stations.iter().find(|station| station.name == name)
    }
}

const RULE: &str = "------------------------------------------------------------------";

impl fmt::Display for LineReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let c = &self.counters;
        writeln!(f, "{RULE}")?;
        writeln!(
            f,
            "Canning line: horizon {}, seed {}, arrival every {}",
            self.config.horizon, self.config.seed, self.config.arrival_interval
        )?;
        writeln!(
            f,
            "Events: {}, parked processes: {}, pending events: {}",
            self.outcome.events_processed,
            self.outcome.parked_processes,
            self.outcome.pending_events
        )?;
        writeln!(f, "{RULE}")?;

        writeln!(f, "Counters:")?;
        writeln!(f, "  Tomatoes generated:           {}", c.tomatoes_generated)?;
        writeln!(f, "  Rejected (size):              {}", c.rejected_size)?;
        writeln!(f, "  Rejected (defect):            {}", c.rejected_defect)?;
        writeln!(f, "  Rejected (quality control):   {}", c.rejected_quality_control)?;
        writeln!(f, "  Tomatoes filled:              {}", c.tomatoes_filled)?;
        writeln!(f, "  Jars filled:                  {}", c.jars_filled)?;
        writeln!(f, "  Jars sterilized:              {}", c.jars_sterilized)?;
        writeln!(f, "  Sterilization cycles:         {}", c.sterilization_cycles)?;
        writeln!(f, "  Jars labelled:                {}", c.jars_labelled)?;
        writeln!(f, "  Jars date-printed:            {}", c.jars_date_printed)?;
        writeln!(f, "{RULE}")?;

        writeln!(f, "Stations:")?;
        for station in &self.stations {
            writeln!(f, "{station}")?;
        }
        writeln!(f, "{}", self.sterilization_queue)?;
        writeln!(f, "{RULE}")?;

        writeln!(f, "Latency:")?;
        writeln!(f, "  {}", self.latency.tomato)?;
        writeln!(f, "  {}", self.latency.jar)?;
        write!(f, "  {}", self.latency.sterilized_jar)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::RejectionConfig;
    use crate::line::simulate;

    fn small_report() -> LineReport {
        let config = LineConfig::builder()
            .rejection(RejectionConfig::none())
            .max_arrivals(20)
            .sterilization_batch(2)
            .horizon(10_000.0)
            .build()
            .unwrap();
        simulate(&config).unwrap()
    }

    #[test]
    fn test_report_lists_every_station() {
        let report = small_report();
        assert_eq!(report.stations.len(), 9);
        assert!(report.station("datePrinter").is_some());
        assert!(report.station("conveyor").is_none());
        assert_eq!(report.sterilization_queue.name, "sterilizationQueue");
    }

    #[test]
    fn test_report_display() {
        let text = small_report().to_string();
        assert!(text.contains("Tomatoes generated:           20"));
        assert!(text.contains("sterilizationMachine (facility, capacity 1)"));
        assert!(text.contains("Time to Process One Jar After Sterilization"));
    }

    #[test]
    fn test_report_json_round_trip() {
        let report = small_report();
        let json = report.to_json().unwrap();
        assert!(json.contains("\"jars_sterilized\": 4"));
        let parsed: LineReport = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.counters, report.counters);
    }
}
