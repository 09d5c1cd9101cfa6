//! Run-end counters and latency statistics of the line.

use serde::{Deserialize, Serialize};

use crate::engine::StatsAccumulator;

/// Why a tomato left the line early.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rejection {
    /// Out of size at the size sorter.
    Size,
    /// Defective at the defect sorter.
    Defect,
    /// Turned down by the quality control worker.
    QualityControl,
}

/// Plain integer counters exposed at the end of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineCounters {
    /// Tomatoes that arrived.
    pub tomatoes_generated: u64,
    /// Rejected by the size sorter.
    pub rejected_size: u64,
    /// Rejected by the defect sorter.
    pub rejected_defect: u64,
    /// Rejected by quality control.
    pub rejected_quality_control: u64,
    /// Tomatoes that made it into a jar.
    pub tomatoes_filled: u64,
    /// Jars started.
    pub jars_filled: u64,
    /// Jars released from the sterilization barrier.
    pub jars_sterilized: u64,
    /// Sterilizer cycles completed.
    pub sterilization_cycles: u64,
    /// Jars through the label applicator.
    pub jars_labelled: u64,
    /// Jars through the date printer.
    pub jars_date_printed: u64,
}

impl LineCounters {
    /// Count a rejection.
    pub fn reject(&mut self, reason: Rejection) {
        match reason {
            Rejection::Size => self.rejected_size += 1,
            Rejection::Defect => self.rejected_defect += 1,
            Rejection::QualityControl => self.rejected_quality_control += 1,
        }
    }

    /// All rejections.
    #[must_use]
    pub const fn tomatoes_rejected(&self) -> u64 {
        self.rejected_size + self.rejected_defect + self.rejected_quality_control
    }

    /// Tomatoes that reached an outcome, rejected or filled.
    #[must_use]
    pub const fn tomatoes_finished(&self) -> u64 {
        self.tomatoes_rejected() + self.tomatoes_filled
    }
}

/// Latency statistics per process kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineLatencies {
    /// Arrival to rejection or filling.
    pub tomato: StatsAccumulator,
    /// Brine filling to release from the sterilization barrier.
    pub jar: StatsAccumulator,
    /// Labelling through date printing.
    pub sterilized_jar: StatsAccumulator,
}

impl Default for LineLatencies {
    fn default() -> Self {
        Self {
            tomato: StatsAccumulator::new("Time to Process One Tomato Before Filling"),
            jar: StatsAccumulator::new("Time to Process One Jar After Filling Before Sterilization"),
            sterilized_jar: StatsAccumulator::new("Time to Process One Jar After Sterilization"),
        }
    }
}
