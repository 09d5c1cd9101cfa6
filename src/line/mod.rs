//! Tomato canning line model.
//!
//! Tomatoes arrive at a fixed interval and pass three inspection stations,
//! each of which may reject them. Survivors are filled into jars, several
//! tomatoes per jar. Jars get brine and a lid, then wait at a barrier until a
//! full sterilization batch has gathered. After one sterilizer cycle per
//! batch, every jar is labelled and date-printed.
//!
//! # Example
//!
//! ```rust
//! use canline::config::{LineConfig, RejectionConfig};
//! use canline::line::simulate;
//!
//! let config = LineConfig::builder()
//!     .rejection(RejectionConfig::none())
//!     .max_arrivals(250)
//!     .build()
//!     .unwrap();
//! let report = simulate(&config).unwrap();
//! assert_eq!(report.counters.jars_filled, 50);
//! assert_eq!(report.counters.sterilization_cycles, 1);
//! ```

mod counters;
mod pipeline;
mod station;

use std::cell::{Ref, RefCell};
use std::rc::Rc;

use tracing::info;

pub use counters::{LineCounters, LineLatencies, Rejection};
pub use station::{Station, StationResource};

use crate::config::LineConfig;
use crate::engine::{
    ProcessId, RandomSource, RunOutcome, SimEngine, SimRng, SimTime, WaitQueueId,
};
use crate::error::SimResult;
use crate::report::LineReport;

/// The nine stations, in flow order.
#[derive(Debug, Clone)]
pub struct Stations {
    /// Size sorting machine.
    pub size_sorter: Station,
    /// Defect sorting machine.
    pub defect_sorter: Station,
    /// Manual inspection.
    pub quality_control: Station,
    /// Tomato jar filler.
    pub jar_filler: Station,
    /// Brine filler.
    pub brine_filler: Station,
    /// Lid closer.
    pub lid_closer: Station,
    /// Batch sterilizer.
    pub sterilizer: Station,
    /// Label applicator.
    pub label_applicator: Station,
    /// Date printer.
    pub date_printer: Station,
}

impl Stations {
    fn install(engine: &mut SimEngine, config: &LineConfig) -> SimResult<Self> {
        let [
            size_sorter,
            defect_sorter,
            quality_control,
            jar_filler,
            brine_filler,
            lid_closer,
            sterilizer,
            label_applicator,
            date_printer,
        ] = config.stations.named();
        Ok(Self {
            size_sorter: Station::install(engine, size_sorter.0, size_sorter.1)?,
            defect_sorter: Station::install(engine, defect_sorter.0, defect_sorter.1)?,
            quality_control: Station::install(engine, quality_control.0, quality_control.1)?,
            jar_filler: Station::install(engine, jar_filler.0, jar_filler.1)?,
            brine_filler: Station::install(engine, brine_filler.0, brine_filler.1)?,
            lid_closer: Station::install(engine, lid_closer.0, lid_closer.1)?,
            sterilizer: Station::install(engine, sterilizer.0, sterilizer.1)?,
            label_applicator: Station::install(engine, label_applicator.0, label_applicator.1)?,
            date_printer: Station::install(engine, date_printer.0, date_printer.1)?,
        })
    }

    /// All stations in flow order.
    #[must_use]
    pub const fn all(&self) -> [&Station; 9] {
        [
            &self.size_sorter,
            &self.defect_sorter,
            &self.quality_control,
            &self.jar_filler,
            &self.brine_filler,
            &self.lid_closer,
            &self.sterilizer,
            &self.label_applicator,
            &self.date_printer,
        ]
    }
}

/// Mutable bookkeeping shared by every process of the line.
struct LineState {
    counters: LineCounters,
    latency: LineLatencies,
    rng: Box<dyn RandomSource>,
    tomatoes_in_current_jar: u32,
}

/// A canning line installed on an engine.
///
/// Processes share it through `Rc`; its state is only touched between
/// suspension points, so a `RefCell` borrow never spans an `.await`.
pub struct CanningLine {
    config: LineConfig,
    stations: Stations,
    sterilization_queue: WaitQueueId,
    state: RefCell<LineState>,
}

impl CanningLine {
    /// Validate `config` and register every resource of the line with `engine`.
    ///
    /// # Errors
    ///
    /// Returns a configuration error before any event is scheduled.
    pub fn build(
        engine: &mut SimEngine,
        config: LineConfig,
        rng: Box<dyn RandomSource>,
    ) -> SimResult<Rc<Self>> {
        config.check()?;
        let stations = Stations::install(engine, &config)?;
        let sterilization_queue = engine.add_wait_queue("sterilizationQueue");
        Ok(Rc::new(Self {
            config,
            stations,
            sterilization_queue,
            state: RefCell::new(LineState {
                counters: LineCounters::default(),
                latency: LineLatencies::default(),
                rng,
                tomatoes_in_current_jar: 0,
            }),
        }))
    }

    /// Spawn the tomato generator at the engine's current time.
    pub fn start(self: &Rc<Self>, engine: &SimEngine) -> ProcessId {
        let sim = engine.handle();
        engine.spawn("generator", pipeline::generator(Rc::clone(self), sim))
    }

    /// Configuration the line was built from.
    #[must_use]
    pub const fn config(&self) -> &LineConfig {
        &self.config
    }

    /// Stations of the line.
    #[must_use]
    pub const fn stations(&self) -> &Stations {
        &self.stations
    }

    /// Barrier where jars wait for a full batch.
    #[must_use]
    pub const fn sterilization_queue(&self) -> WaitQueueId {
        self.sterilization_queue
    }

    /// Snapshot of the counters.
    #[must_use]
    pub fn counters(&self) -> LineCounters {
        self.state.borrow().counters
    }

    /// Latency statistics collected so far.
    #[must_use]
    pub fn latency(&self) -> Ref<'_, LineLatencies> {
        Ref::map(self.state.borrow(), |state| &state.latency)
    }

    /// Tomatoes waiting for the current jar to fill.
    #[must_use]
    pub fn tomatoes_in_current_jar(&self) -> u32 {
        self.state.borrow().tomatoes_in_current_jar
    }

    /// Snapshot of the whole line for reporting.
    ///
    /// # Errors
    ///
    /// Returns an invariant violation if `engine` is not the one the line was built on.
    pub fn report(&self, engine: &SimEngine, outcome: RunOutcome) -> SimResult<LineReport> {
        let stations = self
            .stations
            .all()
            .iter()
            .map(|station| station.report(engine))
            .collect::<SimResult<Vec<_>>>()?;
        let state = self.state.borrow();
        Ok(LineReport {
            config: self.config.clone(),
            outcome,
            counters: state.counters,
            latency: state.latency.clone(),
            tomatoes_in_current_jar: state.tomatoes_in_current_jar,
            stations,
            sterilization_queue: engine.wait_queue_report(self.sterilization_queue)?,
        })
    }

    fn batch_size(&self) -> usize {
        self.config.sterilization_batch as usize
    }

    fn draw(&self, probability: f64) -> bool {
        self.state.borrow_mut().rng.chance(probability)
    }

    fn count_arrival(&self) {
        self.state.borrow_mut().counters.tomatoes_generated += 1;
    }

    fn reject(&self, reason: Rejection, latency: SimTime) {
        let mut state = self.state.borrow_mut();
        state.counters.reject(reason);
        state.latency.tomato.record_time(latency);
    }

    /// Record a filled tomato; true if it completed a jar.
    fn fill(&self, latency: SimTime) -> bool {
        let mut state = self.state.borrow_mut();
        state.latency.tomato.record_time(latency);
        state.counters.tomatoes_filled += 1;
        state.tomatoes_in_current_jar += 1;
        if state.tomatoes_in_current_jar == self.config.tomatoes_per_jar {
            state.tomatoes_in_current_jar = 0;
            state.counters.jars_filled += 1;
            true
        } else {
            false
        }
    }

    fn count_sterilized(&self) {
        self.state.borrow_mut().counters.jars_sterilized += 1;
    }

    fn count_cycle(&self) {
        self.state.borrow_mut().counters.sterilization_cycles += 1;
    }

    fn record_jar(&self, latency: SimTime) {
        self.state.borrow_mut().latency.jar.record_time(latency);
    }

    fn count_labelled(&self) {
        self.state.borrow_mut().counters.jars_labelled += 1;
    }

    fn count_date_printed(&self) {
        self.state.borrow_mut().counters.jars_date_printed += 1;
    }

    fn record_sterilized_jar(&self, latency: SimTime) {
        self.state
            .borrow_mut()
            .latency
            .sterilized_jar
            .record_time(latency);
    }
}

impl std::fmt::Debug for CanningLine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CanningLine")
            .field("config", &self.config)
            .field("counters", &self.counters())
            .finish_non_exhaustive()
    }
}

/// Run a line seeded from `config.seed` to the configured horizon.
///
/// # Errors
///
/// Returns configuration errors before the run and invariant violations from it.
pub fn simulate(config: &LineConfig) -> SimResult<LineReport> {
    simulate_with(config, Box::new(SimRng::new(config.seed)))
}

/// Run a line with an injected random source.
///
/// # Errors
///
/// Returns configuration errors before the run and invariant violations from it.
pub fn simulate_with(config: &LineConfig, rng: Box<dyn RandomSource>) -> SimResult<LineReport> {
    let mut engine = SimEngine::new();
    let line = CanningLine::build(&mut engine, config.clone(), rng)?;
    let horizon = config.horizon_time()?;
    line.start(&engine);

    info!(seed = config.seed, horizon = %horizon, "canning line started");
    let outcome = engine.run_until(horizon)?;
    let report = line.report(&engine, outcome)?;
    info!(
        generated = report.counters.tomatoes_generated,
        sterilized = report.counters.jars_sterilized,
        parked = outcome.parked_processes,
        "canning line finished"
    );
    Ok(report)
}
