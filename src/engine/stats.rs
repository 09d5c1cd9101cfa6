//! Output statistics.
//!
//! Two kinds of measurement are collected:
//! - [`StatsAccumulator`]: tally of discrete observations (latencies, waits)
//! - [`TimeWeighted`]: integral of a piecewise-constant level over virtual time
//!   (busy units, queue lengths)

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::engine::SimTime;

/// Running count, mean, extrema and sample standard deviation of observations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatsAccumulator {
    label: String,
    count: u64,
    sum: f64,
    sum_sq: f64,
    min: Option<f64>,
    max: Option<f64>,
}

impl StatsAccumulator {
    /// Create an empty accumulator.
    #[must_use]
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            count: 0,
            sum: 0.0,
            sum_sq: 0.0,
            min: None,
            max: None,
        }
    }

    /// Record one observation.
    pub fn record(&mut self, value: f64) {
        self.count += 1;
        self.sum += value;
        self.sum_sq += value * value;
        self.min = Some(self.min.map_or(value, |m| m.min(value)));
        self.max = Some(self.max.map_or(value, |m| m.max(value)));
    }

    /// Record a duration in time units.
    pub fn record_time(&mut self, value: SimTime) {
        self.record(value.as_secs_f64());
    }

    /// Label given at construction.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Number of observations.
    #[must_use]
    pub const fn count(&self) -> u64 {
        self.count
    }

    /// Arithmetic mean, zero when empty.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum / self.count as f64
        }
    }

    /// Sample variance (n - 1 denominator), zero for fewer than two observations.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            return 0.0;
        }
        let n = self.count as f64;
        let mean = self.sum / n;
        // Cancellation can push the difference slightly negative.
        ((self.sum_sq - n * mean * mean) / (n - 1.0)).max(0.0)
    }

    /// Sample standard deviation.
    #[must_use]
    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    /// Smallest observation.
    #[must_use]
    pub const fn min(&self) -> Option<f64> {
        self.min
    }

    /// Largest observation.
    #[must_use]
    pub const fn max(&self) -> Option<f64> {
        self.max
    }
}

impl fmt::Display for StatsAccumulator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.count == 0 {
            return write!(f, "{}: no observations", self.label);
        }
        write!(
            f,
            "{}: n = {}, mean = {:.3}, min = {:.3}, max = {:.3}, std = {:.3}",
            self.label,
            self.count,
            self.mean(),
            self.min.unwrap_or_default(),
            self.max.unwrap_or_default(),
            self.std_dev()
        )
    }
}

/// Time average of a piecewise-constant level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeWeighted {
    start: SimTime,
    last_change: SimTime,
    level: f64,
    integral: f64,
    max: f64,
}

impl TimeWeighted {
    /// Start tracking at `start` with level zero.
    #[must_use]
    pub const fn new(start: SimTime) -> Self {
        Self {
            start,
            last_change: start,
            level: 0.0,
            integral: 0.0,
            max: 0.0,
        }
    }

    /// Change the level at `now`.
    pub fn set(&mut self, level: f64, now: SimTime) {
        self.integral += self.level * (now - self.last_change).as_secs_f64();
        self.last_change = now;
        self.level = level;
        self.max = self.max.max(level);
    }

    /// Current level.
    #[must_use]
    pub const fn level(&self) -> f64 {
        self.level
    }

    /// Time-averaged level over `[start, now]`; the current level if no time has passed.
    #[must_use]
    pub fn mean(&self, now: SimTime) -> f64 {
        let elapsed = (now - self.start).as_secs_f64();
        if elapsed <= 0.0 {
            return self.level;
        }
        let integral = self.integral + self.level * (now - self.last_change).as_secs_f64();
        integral / elapsed
    }

    /// Highest level seen.
    #[must_use]
    pub const fn max(&self) -> f64 {
        self.max
    }
}

/// Which primitive a [`ResourceReport`] describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    /// Exclusive single-slot resource.
    Facility,
    /// Counted multi-slot resource.
    Store,
}

/// Utilization and queue summary of a facility or store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceReport {
    /// Resource name.
    pub name: String,
    /// Facility or store.
    pub kind: ResourceKind,
    /// Number of slots (1 for a facility).
    pub capacity: u32,
    /// Requests made, granted or not.
    pub requests: u64,
    /// Time-averaged fraction of capacity in use.
    pub utilization: f64,
    /// Time-averaged number of waiting requests.
    pub mean_queue_len: f64,
    /// Longest queue seen.
    pub max_queue_len: f64,
    /// Time from request to grant, for granted requests.
    pub wait_time: StatsAccumulator,
}

impl fmt::Display for ResourceReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.kind {
            ResourceKind::Facility => "facility",
            ResourceKind::Store => "store",
        };
        writeln!(
            f,
            "{} ({kind}, capacity {}): requests = {}, utilization = {:.4}",
            self.name, self.capacity, self.requests, self.utilization
        )?;
        write!(
            f,
            "  queue: mean length = {:.3}, max length = {}, wait mean = {:.3}, wait max = {:.3}",
            self.mean_queue_len,
            self.max_queue_len,
            self.wait_time.mean(),
            self.wait_time.max().unwrap_or_default()
        )
    }
}

/// Length summary of an explicit wait queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaitQueueReport {
    /// Queue name.
    pub name: String,
    /// Processes ever enqueued.
    pub entries: u64,
    /// Processes queued at report time.
    pub current_len: usize,
    /// Time-averaged length.
    pub mean_len: f64,
    /// Longest length seen.
    pub max_len: f64,
}

impl fmt::Display for WaitQueueReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (queue): entries = {}, current = {}, mean length = {:.3}, max length = {}",
            self.name, self.entries, self.current_len, self.mean_len, self.max_len
        )
    }
}
