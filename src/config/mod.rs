//! Line configuration with YAML schema and validation.
//!
//! Every run is driven by a [`LineConfig`]. Configuration is checked in two
//! passes before any event is scheduled:
//! - schema rules (`validator` derive: ranges, nested sections)
//! - semantic rules (positive representable times, batch sizes, sterilizer capacity)
//!
//! A bad configuration is a setup error and never reaches the engine.

use serde::{Deserialize, Serialize};
use std::path::Path;
use validator::Validate;

use crate::engine::SimTime;
use crate::error::{SimError, SimResult};

/// Top-level configuration of a canning line run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct LineConfig {
    /// End of the simulated window in time units.
    #[serde(default = "default_horizon")]
    pub horizon: f64,

    /// Master seed for the rejection draws.
    #[serde(default = "default_seed")]
    pub seed: u64,

    /// Time between tomato arrivals.
    #[serde(default = "default_arrival_interval")]
    pub arrival_interval: f64,

    /// Stop generating after this many arrivals; unlimited if absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_arrivals: Option<u64>,

    /// Tomatoes that make one jar.
    #[validate(range(min = 1))]
    #[serde(default = "default_tomatoes_per_jar")]
    pub tomatoes_per_jar: u32,

    /// Jars sterilized together in one machine cycle.
    #[validate(range(min = 1))]
    #[serde(default = "default_sterilization_batch")]
    pub sterilization_batch: u32,

    /// Rejection probabilities at the three inspection stages.
    #[validate(nested)]
    #[serde(default)]
    pub rejection: RejectionConfig,

    /// Service time and capacity of every station.
    #[validate(nested)]
    #[serde(default)]
    pub stations: StationsConfig,
}

const fn default_horizon() -> f64 {
    86_400.0
}

const fn default_seed() -> u64 {
    42
}

const fn default_arrival_interval() -> f64 {
    1.0
}

const fn default_tomatoes_per_jar() -> u32 {
    5
}

const fn default_sterilization_batch() -> u32 {
    50
}

impl Default for LineConfig {
    fn default() -> Self {
        Self::low_capacity()
    }
}

impl LineConfig {
    /// One machine per station, one tomato per time unit.
    #[must_use]
    pub fn low_capacity() -> Self {
        Self {
            horizon: default_horizon(),
            seed: default_seed(),
            arrival_interval: default_arrival_interval(),
            max_arrivals: None,
            tomatoes_per_jar: default_tomatoes_per_jar(),
            sterilization_batch: default_sterilization_batch(),
            rejection: RejectionConfig::default(),
            stations: StationsConfig::default(),
        }
    }

    /// Two tomatoes per time unit with parallel banks wherever a single
    /// machine would be overloaded.
    #[must_use]
    pub fn high_capacity() -> Self {
        let mut stations = StationsConfig::default();
        for station in [
            &mut stations.size_sorter,
            &mut stations.defect_sorter,
            &mut stations.quality_control,
            &mut stations.jar_filler,
            &mut stations.brine_filler,
            &mut stations.lid_closer,
        ] {
            station.capacity = 2;
        }
        stations.label_applicator.capacity = 3;
        stations.date_printer.capacity = 3;

        Self {
            arrival_interval: 0.5,
            stations,
            ..Self::low_capacity()
        }
    }

    /// Preset by name (`low` or `high`).
    ///
    /// # Errors
    ///
    /// Returns `SimError::Config` for an unknown name.
    pub fn preset(name: &str) -> SimResult<Self> {
        match name {
            "low" | "low-capacity" => Ok(Self::low_capacity()),
            "high" | "high-capacity" => Ok(Self::high_capacity()),
            other => Err(SimError::config(format!(
                "unknown preset '{other}', expected 'low' or 'high'"
            ))),
        }
    }

    /// Load configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - YAML parsing fails
    /// - Validation fails
    pub fn load<P: AsRef<Path>>(path: P) -> SimResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from YAML string. Missing fields take the
    /// low-capacity defaults.
    ///
    /// # Errors
    ///
    /// Returns error if parsing or validation fails.
    pub fn from_yaml(yaml: &str) -> SimResult<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.check()?;
        Ok(config)
    }

    /// Render as YAML.
    ///
    /// # Errors
    ///
    /// Returns error if serialization fails.
    pub fn to_yaml(&self) -> SimResult<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Create a builder starting from the low-capacity preset.
    #[must_use]
    pub fn builder() -> LineConfigBuilder {
        LineConfigBuilder::default()
    }

    /// Run schema and semantic validation.
    ///
    /// # Errors
    ///
    /// Returns `SimError::Validation` or `SimError::Config` describing the
    /// first problem found.
    pub fn check(&self) -> SimResult<()> {
        self.validate()?;
        self.validate_semantic()
    }

    fn validate_semantic(&self) -> SimResult<()> {
        SimTime::try_positive_secs("horizon", self.horizon)?;
        SimTime::try_positive_secs("arrival interval", self.arrival_interval)?;
        let rejection = self.rejection;
        for (stage, p) in [
            ("size", rejection.size),
            ("defect", rejection.defect),
            ("quality_control", rejection.quality_control),
        ] {
            if p.is_nan() {
                return Err(SimError::config(format!(
                    "rejection probability '{stage}' is not a number"
                )));
            }
        }
        for (name, station) in self.stations.named() {
            SimTime::try_positive_secs(&format!("station '{name}' duration"), station.duration)?;
        }
        if self.stations.sterilizer.capacity != 1 {
            return Err(SimError::config(
                "the sterilizer runs one batch at a time and must have capacity 1",
            ));
        }
        Ok(())
    }

    /// Horizon as simulation time.
    ///
    /// # Errors
    ///
    /// Returns `SimError::Config` if the horizon is not a positive, representable time.
    pub fn horizon_time(&self) -> SimResult<SimTime> {
        SimTime::try_positive_secs("horizon", self.horizon)
    }

    /// Arrival interval as simulation time.
    ///
    /// # Errors
    ///
    /// Returns `SimError::Config` if the interval is not a positive, representable time.
    pub fn arrival_time(&self) -> SimResult<SimTime> {
        SimTime::try_positive_secs("arrival interval", self.arrival_interval)
    }
}

/// Rejection probabilities.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct RejectionConfig {
    /// Rejected by the size sorter.
    #[validate(range(min = 0.0, max = 1.0))]
    #[serde(default = "default_size_rejection")]
    pub size: f64,
    /// Rejected by the defect sorter.
    #[validate(range(min = 0.0, max = 1.0))]
    #[serde(default = "default_defect_rejection")]
    pub defect: f64,
    /// Rejected by manual quality control.
    #[validate(range(min = 0.0, max = 1.0))]
    #[serde(default = "default_quality_control_rejection")]
    pub quality_control: f64,
}

const fn default_size_rejection() -> f64 {
    0.05
}

const fn default_defect_rejection() -> f64 {
    0.05
}

const fn default_quality_control_rejection() -> f64 {
    0.02
}

impl Default for RejectionConfig {
    fn default() -> Self {
        Self {
            size: default_size_rejection(),
            defect: default_defect_rejection(),
            quality_control: default_quality_control_rejection(),
        }
    }
}

impl RejectionConfig {
    /// Nothing is ever rejected.
    #[must_use]
    pub const fn none() -> Self {
        Self {
            size: 0.0,
            defect: 0.0,
            quality_control: 0.0,
        }
    }
}

/// Service time and number of parallel machines at one station.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct StationConfig {
    /// Service time per item.
    pub duration: f64,
    /// Parallel machines; 1 is an exclusive facility, more is a store.
    #[validate(range(min = 1))]
    #[serde(default = "default_capacity")]
    pub capacity: u32,
}

const fn default_capacity() -> u32 {
    1
}

impl StationConfig {
    /// Single machine with the given service time.
    #[must_use]
    pub const fn single(duration: f64) -> Self {
        Self {
            duration,
            capacity: 1,
        }
    }
}

/// All nine stations of the line, in flow order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct StationsConfig {
    /// Size sorting machine.
    #[validate(nested)]
    #[serde(default = "default_sorter")]
    pub size_sorter: StationConfig,
    /// Defect sorting machine.
    #[validate(nested)]
    #[serde(default = "default_sorter")]
    pub defect_sorter: StationConfig,
    /// Manual inspection.
    #[validate(nested)]
    #[serde(default = "default_sorter")]
    pub quality_control: StationConfig,
    /// Tomato jar filler.
    #[validate(nested)]
    #[serde(default = "default_jar_filler")]
    pub jar_filler: StationConfig,
    /// Brine filler.
    #[validate(nested)]
    #[serde(default = "default_finishing")]
    pub brine_filler: StationConfig,
    /// Lid closer.
    #[validate(nested)]
    #[serde(default = "default_finishing")]
    pub lid_closer: StationConfig,
    /// Batch sterilization machine.
    #[validate(nested)]
    #[serde(default = "default_sterilizer")]
    pub sterilizer: StationConfig,
    /// Label applicator.
    #[validate(nested)]
    #[serde(default = "default_finishing")]
    pub label_applicator: StationConfig,
    /// Date printer.
    #[validate(nested)]
    #[serde(default = "default_finishing")]
    pub date_printer: StationConfig,
}

const fn default_sorter() -> StationConfig {
    StationConfig::single(0.5)
}

const fn default_jar_filler() -> StationConfig {
    StationConfig::single(1.0)
}

const fn default_finishing() -> StationConfig {
    StationConfig::single(3.0)
}

const fn default_sterilizer() -> StationConfig {
    StationConfig::single(2400.0)
}

impl Default for StationsConfig {
    fn default() -> Self {
        Self {
            size_sorter: default_sorter(),
            defect_sorter: default_sorter(),
            quality_control: default_sorter(),
            jar_filler: default_jar_filler(),
            brine_filler: default_finishing(),
            lid_closer: default_finishing(),
            sterilizer: default_sterilizer(),
            label_applicator: default_finishing(),
            date_printer: default_finishing(),
        }
    }
}

impl StationsConfig {
    /// Stations paired with their report names, in flow order.
    #[must_use]
    pub const fn named(&self) -> [(&'static str, StationConfig); 9] {
        [
            ("tomatoSizeSorter", self.size_sorter),
            ("tomatoDefectSorter", self.defect_sorter),
            ("qualityControlWorker", self.quality_control),
            ("tomatoJarFiller", self.jar_filler),
            ("brineJarFiller", self.brine_filler),
            ("lidCloser", self.lid_closer),
            ("sterilizationMachine", self.sterilizer),
            ("labelApplicator", self.label_applicator),
            ("datePrinter", self.date_printer),
        ]
    }
}

/// Configuration builder for programmatic construction.
#[derive(Debug, Default)]
pub struct LineConfigBuilder {
    base: Option<LineConfig>,
    seed: Option<u64>,
    horizon: Option<f64>,
    arrival_interval: Option<f64>,
    max_arrivals: Option<u64>,
    tomatoes_per_jar: Option<u32>,
    sterilization_batch: Option<u32>,
    rejection: Option<RejectionConfig>,
}

impl LineConfigBuilder {
    /// Start from a preset instead of the low-capacity defaults.
    #[must_use]
    pub fn preset(mut self, config: LineConfig) -> Self {
        self.base = Some(config);
        self
    }

    /// Set the random seed.
    #[must_use]
    pub const fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Set the horizon.
    #[must_use]
    pub const fn horizon(mut self, horizon: f64) -> Self {
        self.horizon = Some(horizon);
        self
    }

    /// Set the arrival interval.
    #[must_use]
    pub const fn arrival_interval(mut self, interval: f64) -> Self {
        self.arrival_interval = Some(interval);
        self
    }

    /// Stop generating after `n` arrivals.
    #[must_use]
    pub const fn max_arrivals(mut self, n: u64) -> Self {
        self.max_arrivals = Some(n);
        self
    }

    /// Set the number of tomatoes per jar.
    #[must_use]
    pub const fn tomatoes_per_jar(mut self, n: u32) -> Self {
        self.tomatoes_per_jar = Some(n);
        self
    }

    /// Set the sterilization batch size.
    #[must_use]
    pub const fn sterilization_batch(mut self, n: u32) -> Self {
        self.sterilization_batch = Some(n);
        self
    }

    /// Set the rejection probabilities.
    #[must_use]
    pub const fn rejection(mut self, rejection: RejectionConfig) -> Self {
        self.rejection = Some(rejection);
        self
    }

    /// Build and validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns error if the resulting configuration fails validation.
    pub fn build(self) -> SimResult<LineConfig> {
        let mut config = self.base.unwrap_or_default();

        if let Some(seed) = self.seed {
            config.seed = seed;
        }
        if let Some(horizon) = self.horizon {
            config.horizon = horizon;
        }
        if let Some(interval) = self.arrival_interval {
            config.arrival_interval = interval;
        }
        if self.max_arrivals.is_some() {
            config.max_arrivals = self.max_arrivals;
        }
        if let Some(n) = self.tomatoes_per_jar {
            config.tomatoes_per_jar = n;
        }
        if let Some(n) = self.sterilization_batch {
            config.sterilization_batch = n;
        }
        if let Some(rejection) = self.rejection {
            config.rejection = rejection;
        }

        config.check()?;
        Ok(config)
    }
}
