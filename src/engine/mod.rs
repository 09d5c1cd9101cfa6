//! Discrete-event simulation engine.
//!
//! Implements a single logical timeline with:
//! - Fixed-point virtual time that only jumps to the next scheduled event
//! - Event scheduling with deterministic (time, insertion order) ordering
//! - Processes as stackless coroutines that suspend on holds, resources and barriers
//! - Contention primitives: exclusive facilities, counted stores, explicit wait queues
//!
//! Exactly one process runs at any instant. A process runs from its resume
//! point until it reaches the next suspension primitive, then control returns
//! to [`SimEngine::run_until`], which pops the next event.

pub mod clock;
pub mod facility;
pub mod process;
pub mod rng;
pub mod scheduler;
pub mod stats;
pub mod store;
pub mod wait_queue;

use std::cell::RefCell;
use std::future::Future;
use std::rc::Rc;
use std::task::{Context, Poll};

use futures::task::noop_waker_ref;
use serde::{Deserialize, Serialize};
use tracing::{info, trace};

pub use clock::SimClock;
pub use facility::{Facility, FacilityId};
pub use process::{ProcessId, ProcessState, SimHandle};
pub use rng::{FixedSource, RandomSource, SimRng};
pub use scheduler::{Due, EventScheduler, ScheduledEvent};
pub use stats::{ResourceKind, ResourceReport, StatsAccumulator, TimeWeighted, WaitQueueReport};
pub use store::{Store, StoreId};
pub use wait_queue::{WaitQueue, WaitQueueId};

use crate::error::{SimError, SimResult};
use process::ProcessTable;

const NANOS_PER_SEC: f64 = 1_000_000_000.0;

/// Simulation time representation.
///
/// Uses a fixed-point representation for reproducibility across platforms.
/// Internal representation is in nanoseconds so that equal-time events compare
/// exactly and ties fall back to insertion order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub struct SimTime {
    /// Time in nanoseconds from simulation start.
    nanos: u64,
}

impl SimTime {
    /// Zero time (simulation start).
    pub const ZERO: Self = Self { nanos: 0 };

    /// Largest representable time, in seconds.
    pub const MAX_SECS: f64 = u64::MAX as f64 / NANOS_PER_SEC;

    /// Create time from seconds, clamping instead of failing.
    ///
    /// Negative and NaN inputs become zero; values past [`Self::MAX_SECS`]
    /// saturate. Use [`Self::try_from_secs`] for values from configuration.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn from_secs(secs: f64) -> Self {
        // `as` saturates and maps NaN to zero
        Self {
            nanos: (secs * NANOS_PER_SEC).round() as u64,
        }
    }

    /// Create time from seconds, rejecting values with no exact meaning.
    ///
    /// # Errors
    ///
    /// Returns `SimError::Config` if `secs` is negative, NaN, infinite or
    /// beyond [`Self::MAX_SECS`].
    pub fn try_from_secs(secs: f64) -> SimResult<Self> {
        if !secs.is_finite() || secs < 0.0 {
            return Err(SimError::config(format!(
                "time value {secs} must be finite and non-negative"
            )));
        }
        if (secs * NANOS_PER_SEC).round() >= u64::MAX as f64 {
            return Err(SimError::config(format!(
                "time value {secs} exceeds the representable range of {} time units",
                Self::MAX_SECS
            )));
        }
        Ok(Self::from_secs(secs))
    }

    /// Like [`Self::try_from_secs`], but also rejects values that round to
    /// zero nanoseconds.
    ///
    /// # Errors
    ///
    /// Returns `SimError::Config` naming `what` for a non-positive value.
    pub fn try_positive_secs(what: &str, secs: f64) -> SimResult<Self> {
        let time = Self::try_from_secs(secs)
            .map_err(|err| SimError::config(format!("{what}: {err}")))?;
        if time == Self::ZERO {
            return Err(SimError::config(format!(
                "{what} must be at least one nanosecond, got {secs}"
            )));
        }
        Ok(time)
    }

    /// Create time from nanoseconds.
    #[must_use]
    pub const fn from_nanos(nanos: u64) -> Self {
        Self { nanos }
    }

    /// Get time as seconds (f64).
    #[must_use]
    pub fn as_secs_f64(&self) -> f64 {
        self.nanos as f64 / NANOS_PER_SEC
    }

    /// Get time as nanoseconds.
    #[must_use]
    pub const fn as_nanos(&self) -> u64 {
        self.nanos
    }

    /// Add a duration, `None` on overflow.
    #[must_use]
    pub const fn checked_add(self, rhs: Self) -> Option<Self> {
        match self.nanos.checked_add(rhs.nanos) {
            Some(nanos) => Some(Self { nanos }),
            None => None,
        }
    }

    /// Add nanoseconds, saturating at the largest representable time.
    #[must_use]
    pub const fn add_nanos(self, nanos: u64) -> Self {
        Self {
            nanos: self.nanos.saturating_add(nanos),
        }
    }

    /// Subtract duration from time, saturating at zero.
    #[must_use]
    pub const fn saturating_sub_nanos(self, nanos: u64) -> Self {
        Self {
            nanos: self.nanos.saturating_sub(nanos),
        }
    }
}

/// Saturating; the engine itself uses [`SimTime::checked_add`].
impl std::ops::Add for SimTime {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self {
            nanos: self.nanos.saturating_add(rhs.nanos),
        }
    }
}

impl std::ops::Sub for SimTime {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self {
            nanos: self.nanos.saturating_sub(rhs.nanos),
        }
    }
}

impl std::fmt::Display for SimTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.3}", self.as_secs_f64())
    }
}

/// Engine-owned state shared with running processes through [`SimHandle`].
///
/// Never borrowed across a process poll: the engine releases its borrow
/// before resuming a process, and primitives borrow only for the duration of
/// a single registration.
pub(crate) struct Kernel {
    pub(crate) clock: SimClock,
    pub(crate) events: EventScheduler,
    pub(crate) processes: ProcessTable,
    pub(crate) facilities: Vec<Facility>,
    pub(crate) stores: Vec<Store>,
    pub(crate) queues: Vec<WaitQueue>,
}

impl Kernel {
    fn new() -> Self {
        Self {
            clock: SimClock::new(),
            events: EventScheduler::new(),
            processes: ProcessTable::default(),
            facilities: Vec::new(),
            stores: Vec::new(),
            queues: Vec::new(),
        }
    }

    pub(crate) const fn now(&self) -> SimTime {
        self.clock.current_time()
    }

    /// Move a suspended process from `from` to ready and schedule it at the current time.
    pub(crate) fn wake(&mut self, pid: ProcessId, from: ProcessState) -> SimResult<()> {
        self.processes.transition(pid, from, ProcessState::Ready)?;
        let now = self.now();
        self.events.schedule(now, pid);
        Ok(())
    }

    pub(crate) fn facility_mut(&mut self, id: FacilityId) -> SimResult<&mut Facility> {
        self.facilities
            .get_mut(id.index())
            .ok_or_else(|| SimError::invariant(format!("unknown facility {id:?}")))
    }

    pub(crate) fn store_mut(&mut self, id: StoreId) -> SimResult<&mut Store> {
        self.stores
            .get_mut(id.index())
            .ok_or_else(|| SimError::invariant(format!("unknown store {id:?}")))
    }

    pub(crate) fn queue_mut(&mut self, id: WaitQueueId) -> SimResult<&mut WaitQueue> {
        self.queues
            .get_mut(id.index())
            .ok_or_else(|| SimError::invariant(format!("unknown wait queue {id:?}")))
    }
}

/// Summary of a call to [`SimEngine::run_until`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunOutcome {
    /// Events dispatched during this run.
    pub events_processed: u64,
    /// Clock value when the run stopped (the horizon).
    pub stopped_at: SimTime,
    /// Events still scheduled beyond the horizon.
    pub pending_events: usize,
    /// Processes suspended without a scheduled resume (blocked or passive).
    pub parked_processes: usize,
    /// True if the run ended because no events were left.
    pub queue_exhausted: bool,
    /// Earliest event left beyond the horizon, if the run stopped there.
    pub next_event_at: Option<SimTime>,
}

/// Main simulation engine (the scheduler).
///
/// Owns the clock, the event queue, the process table and every resource.
/// Processes are spawned as futures and driven exclusively by popped events.
///
/// # Example
///
/// ```rust
/// use canline::engine::{SimEngine, SimTime};
///
/// let mut engine = SimEngine::new();
/// let press = engine.add_facility("press");
/// let sim = engine.handle();
/// engine.spawn("job", async move {
///     sim.seize(press).await?;
///     sim.hold(SimTime::from_secs(2.0)).await?;
///     sim.release(press)
/// });
///
/// let outcome = engine.run_until(SimTime::from_secs(10.0)).unwrap();
/// assert_eq!(outcome.parked_processes, 0);
/// assert!(engine.facility_report(press).unwrap().utilization > 0.19);
/// ```
pub struct SimEngine {
    kernel: Rc<RefCell<Kernel>>,
    events_processed: u64,
}

impl SimEngine {
    /// Create an empty engine at time zero.
    #[must_use]
    pub fn new() -> Self {
        Self {
            kernel: Rc::new(RefCell::new(Kernel::new())),
            events_processed: 0,
        }
    }

    /// Handle for processes and setup code to reach the engine.
    #[must_use]
    pub fn handle(&self) -> SimHandle {
        SimHandle::new(Rc::clone(&self.kernel))
    }

    /// Get current simulation time.
    #[must_use]
    pub fn now(&self) -> SimTime {
        self.kernel.borrow().now()
    }

    /// Register an exclusive single-slot resource.
    pub fn add_facility(&mut self, name: impl Into<String>) -> FacilityId {
        let mut kernel = self.kernel.borrow_mut();
        let id = FacilityId::new(kernel.facilities.len());
        let now = kernel.now();
        kernel.facilities.push(Facility::new(name, now));
        id
    }

    /// Register a counted resource with `capacity` interchangeable units.
    ///
    /// # Errors
    ///
    /// Returns `SimError::Config` if `capacity` is zero.
    pub fn add_store(&mut self, name: impl Into<String>, capacity: u32) -> SimResult<StoreId> {
        let mut kernel = self.kernel.borrow_mut();
        let id = StoreId::new(kernel.stores.len());
        let now = kernel.now();
        kernel.stores.push(Store::new(name, capacity, now)?);
        Ok(id)
    }

    /// Register an explicit, manually released wait queue.
    pub fn add_wait_queue(&mut self, name: impl Into<String>) -> WaitQueueId {
        let mut kernel = self.kernel.borrow_mut();
        let id = WaitQueueId::new(kernel.queues.len());
        let now = kernel.now();
        kernel.queues.push(WaitQueue::new(name, now));
        id
    }

    /// Spawn a process activated at the current time.
    pub fn spawn<F>(&self, name: &'static str, body: F) -> ProcessId
    where
        F: Future<Output = SimResult<()>> + 'static,
    {
        self.handle().spawn(name, body)
    }

    /// Spawn a process whose first activation happens at `at`.
    ///
    /// # Errors
    ///
    /// Returns `SimError::Config` if `at` lies in the past.
    pub fn spawn_at<F>(&self, name: &'static str, body: F, at: SimTime) -> SimResult<ProcessId>
    where
        F: Future<Output = SimResult<()>> + 'static,
    {
        let mut kernel = self.kernel.borrow_mut();
        if at < kernel.now() {
            return Err(SimError::config(format!(
                "cannot spawn '{name}' at {at}, clock is already at {}",
                kernel.now()
            )));
        }
        let pid = kernel.processes.insert(name, Box::pin(body));
        kernel.events.schedule(at, pid);
        Ok(pid)
    }

    /// Schedule a passive process to resume at `at`.
    ///
    /// # Errors
    ///
    /// Returns an invariant violation if the process is not passive, or a
    /// configuration error if `at` lies in the past.
    pub fn schedule(&self, pid: ProcessId, at: SimTime) -> SimResult<()> {
        let mut kernel = self.kernel.borrow_mut();
        if at < kernel.now() {
            return Err(SimError::config(format!(
                "cannot schedule {pid} at {at}, clock is already at {}",
                kernel.now()
            )));
        }
        kernel
            .processes
            .transition(pid, ProcessState::Passive, ProcessState::Ready)?;
        kernel.events.schedule(at, pid);
        Ok(())
    }

    /// Dispatch the next event regardless of any horizon.
    ///
    /// Returns `false` when the event queue is empty.
    ///
    /// # Errors
    ///
    /// Returns the error of the resumed process, or an invariant violation if
    /// the event targets a process that is not waiting for it.
    pub fn step(&mut self) -> SimResult<bool> {
        let event = self.kernel.borrow_mut().events.next();
        match event {
            Some(event) => {
                self.dispatch(event)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Run the simulation until `horizon`.
    ///
    /// Pops every event scheduled at or before the horizon, advancing the
    /// clock to each and resuming its process. Stops early if the queue
    /// drains; processes still parked at that point are reported, not
    /// treated as an error. The clock ends at the horizon.
    ///
    /// # Errors
    ///
    /// Returns `SimError::Config` if the horizon lies in the past, and
    /// propagates the first process error or invariant violation.
    pub fn run_until(&mut self, horizon: SimTime) -> SimResult<RunOutcome> {
        if horizon < self.now() {
            return Err(SimError::config(format!(
                "horizon {horizon} lies before the current time {}",
                self.now()
            )));
        }
        info!(horizon = %horizon, "simulation run started");
        let start_count = self.events_processed;

        let next_event_at = loop {
            let due = self.kernel.borrow_mut().events.pop_due(horizon);
            match due {
                Due::Event(event) => self.dispatch(event)?,
                Due::Beyond(time) => break Some(time),
                Due::Exhausted => break None,
            }
        };

        let outcome = {
            let mut kernel = self.kernel.borrow_mut();
            kernel.clock.advance_to(horizon)?;
            RunOutcome {
                events_processed: self.events_processed - start_count,
                stopped_at: kernel.now(),
                pending_events: kernel.events.len(),
                parked_processes: kernel.processes.parked_count(),
                queue_exhausted: next_event_at.is_none(),
                next_event_at,
            }
        };
        info!(
            events = outcome.events_processed,
            parked = outcome.parked_processes,
            exhausted = outcome.queue_exhausted,
            "simulation run finished"
        );
        Ok(outcome)
    }

    /// Resume the process targeted by `event` until it suspends or terminates.
    fn dispatch(&mut self, event: ScheduledEvent) -> SimResult<()> {
        let pid = event.process;
        let mut body = {
            let mut kernel = self.kernel.borrow_mut();
            kernel.clock.advance_to(event.time)?;
            match kernel.processes.state(pid) {
                Some(ProcessState::Ready | ProcessState::Holding) => {}
                Some(state) => {
                    return Err(SimError::invariant(format!(
                        "{pid} ({}) resumed at {} while {state:?}",
                        kernel.processes.name(pid).unwrap_or("unnamed"),
                        event.time
                    )));
                }
                None => return Err(SimError::UnknownProcess(pid)),
            }
            kernel.processes.set_state(pid, ProcessState::Running)?;
            kernel.processes.set_current(Some(pid));
            kernel.processes.take_body(pid)?
        };
        self.events_processed += 1;
        trace!(process = %pid, time = %event.time, "dispatch");

        let mut cx = Context::from_waker(noop_waker_ref());
        let poll = body.as_mut().poll(&mut cx);

        let mut kernel = self.kernel.borrow_mut();
        kernel.processes.set_current(None);
        match poll {
            Poll::Ready(result) => {
                kernel.processes.remove(pid);
                drop(kernel);
                drop(body);
                trace!(process = %pid, "terminated");
                result
            }
            Poll::Pending => {
                if kernel.processes.state(pid) == Some(ProcessState::Running) {
                    return Err(SimError::invariant(format!(
                        "{pid} yielded without reaching a suspension point"
                    )));
                }
                kernel.processes.restore_body(pid, body)
            }
        }
    }

    /// Number of live (not yet terminated) processes.
    #[must_use]
    pub fn process_count(&self) -> usize {
        self.kernel.borrow().processes.len()
    }

    /// Lifecycle state of a live process, `None` once it has terminated.
    #[must_use]
    pub fn process_state(&self, pid: ProcessId) -> Option<ProcessState> {
        self.kernel.borrow().processes.state(pid)
    }

    /// Number of events waiting in the queue.
    #[must_use]
    pub fn pending_events(&self) -> usize {
        self.kernel.borrow().events.len()
    }

    /// Utilization and queue summary of a facility up to the current time.
    ///
    /// # Errors
    ///
    /// Returns an invariant violation for an id from another engine.
    pub fn facility_report(&self, id: FacilityId) -> SimResult<ResourceReport> {
        let mut kernel = self.kernel.borrow_mut();
        let now = kernel.now();
        Ok(kernel.facility_mut(id)?.report(now))
    }

    /// Utilization and queue summary of a store up to the current time.
    ///
    /// # Errors
    ///
    /// Returns an invariant violation for an id from another engine.
    pub fn store_report(&self, id: StoreId) -> SimResult<ResourceReport> {
        let mut kernel = self.kernel.borrow_mut();
        let now = kernel.now();
        Ok(kernel.store_mut(id)?.report(now))
    }

    /// Length statistics of an explicit wait queue up to the current time.
    ///
    /// # Errors
    ///
    /// Returns an invariant violation for an id from another engine.
    pub fn wait_queue_report(&self, id: WaitQueueId) -> SimResult<WaitQueueReport> {
        let mut kernel = self.kernel.borrow_mut();
        let now = kernel.now();
        Ok(kernel.queue_mut(id)?.report(now))
    }
}

impl Default for SimEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for SimEngine {
    fn drop(&mut self) {
        // Suspended bodies hold handles back to the kernel; drop them outside the borrow.
        let bodies = self.kernel.borrow_mut().processes.clear();
        drop(bodies);
    }
}

impl std::fmt::Debug for SimEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kernel = self.kernel.borrow();
        f.debug_struct("SimEngine")
            .field("now", &kernel.now())
            .field("processes", &kernel.processes.len())
            .field("pending_events", &kernel.events.len())
            .field("events_processed", &self.events_processed)
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_sim_time_creation() {
        let t1 = SimTime::from_secs(1.5);
        assert!((t1.as_secs_f64() - 1.5).abs() < 1e-9);

        let t2 = SimTime::from_nanos(1_500_000_000);
        assert_eq!(t1, t2);
    }

    #[test]
    fn test_sim_time_try_from_secs() {
        assert!(SimTime::try_from_secs(2400.0).is_ok());
        assert!(SimTime::try_from_secs(-1.0).is_err());
        assert!(SimTime::try_from_secs(f64::NAN).is_err());
        assert!(SimTime::try_from_secs(f64::INFINITY).is_err());
    }

    #[test]
    fn test_sim_time_try_from_secs_rejects_overflow() {
        assert!(SimTime::try_from_secs(1.0e10).is_ok());
        let err = SimTime::try_from_secs(2.0e10).unwrap_err();
        assert!(err.is_config_error());
        assert!(SimTime::try_from_secs(SimTime::MAX_SECS).is_err());
    }

    #[test]
    fn test_sim_time_try_positive_secs() {
        assert_eq!(
            SimTime::try_positive_secs("interval", 0.5).unwrap(),
            SimTime::from_nanos(500_000_000)
        );
        assert!(SimTime::try_positive_secs("interval", 0.0).is_err());
        let err = SimTime::try_positive_secs("interval", 1e-12).unwrap_err();
        assert!(err.to_string().contains("interval"));
        assert!(SimTime::try_positive_secs("interval", 3.0e10).is_err());
    }

    #[test]
    fn test_sim_time_from_secs_clamps() {
        assert_eq!(SimTime::from_secs(-2.0), SimTime::ZERO);
        assert_eq!(SimTime::from_secs(f64::NAN), SimTime::ZERO);
        assert_eq!(SimTime::from_secs(f64::INFINITY).as_nanos(), u64::MAX);
    }

    #[test]
    fn test_sim_time_checked_add() {
        let max = SimTime::from_nanos(u64::MAX);
        assert_eq!(max.checked_add(SimTime::from_nanos(1)), None);
        assert_eq!(max + SimTime::from_nanos(1), max);
        assert_eq!(max.add_nanos(5), max);
        assert_eq!(
            SimTime::from_secs(1.0).checked_add(SimTime::from_secs(2.0)),
            Some(SimTime::from_secs(3.0))
        );
    }

    #[test]
    fn test_sim_time_arithmetic() {
        let t1 = SimTime::from_secs(1.0);
        let t2 = SimTime::from_secs(0.5);

        let sum = t1 + t2;
        assert!((sum.as_secs_f64() - 1.5).abs() < 1e-9);

        let diff = t1 - t2;
        assert!((diff.as_secs_f64() - 0.5).abs() < 1e-9);

        // Sub saturates
        assert_eq!((t2 - t1).as_nanos(), 0);
    }

    #[test]
    fn test_sim_time_ordering() {
        let t1 = SimTime::from_secs(1.0);
        let t2 = SimTime::from_secs(2.0);

        assert!(t1 < t2);
        assert_eq!(t1, t1);
    }

    #[test]
    fn test_sim_time_display() {
        let t = SimTime::from_secs(86_400.0);
        assert_eq!(t.to_string(), "86400.000");
    }

    #[test]
    fn test_engine_initial_state() {
        let engine = SimEngine::new();
        assert_eq!(engine.now(), SimTime::ZERO);
        assert_eq!(engine.process_count(), 0);
        assert_eq!(engine.pending_events(), 0);
    }

    #[test]
    fn test_run_until_empty_queue_advances_clock() {
        let mut engine = SimEngine::new();
        let outcome = engine.run_until(SimTime::from_secs(5.0)).unwrap();
        assert_eq!(outcome.events_processed, 0);
        assert!(outcome.queue_exhausted);
        assert_eq!(engine.now(), SimTime::from_secs(5.0));
    }

    #[test]
    fn test_run_until_rejects_past_horizon() {
        let mut engine = SimEngine::new();
        engine.run_until(SimTime::from_secs(5.0)).unwrap();
        let err = engine.run_until(SimTime::from_secs(1.0)).unwrap_err();
        assert!(err.is_config_error());
    }

    #[test]
    fn test_hold_resumes_after_duration() {
        let mut engine = SimEngine::new();
        let sim = engine.handle();
        let finished = Rc::new(Cell::new(None));
        let seen = Rc::clone(&finished);
        engine.spawn("sleeper", async move {
            sim.hold(SimTime::from_secs(3.0)).await?;
            seen.set(Some(sim.now()));
            Ok::<(), SimError>(())
        });

        engine.run_until(SimTime::from_secs(10.0)).unwrap();
        assert_eq!(finished.get(), Some(SimTime::from_secs(3.0)));
        assert_eq!(engine.process_count(), 0);
    }

    #[test]
    fn test_events_beyond_horizon_stay_pending() {
        let mut engine = SimEngine::new();
        let sim = engine.handle();
        let pid = engine.spawn("late", async move {
            sim.hold(SimTime::from_secs(20.0)).await
        });

        let outcome = engine.run_until(SimTime::from_secs(10.0)).unwrap();
        assert_eq!(outcome.pending_events, 1);
        assert!(!outcome.queue_exhausted);
        assert_eq!(outcome.next_event_at, Some(SimTime::from_secs(20.0)));
        assert_eq!(engine.process_state(pid), Some(ProcessState::Holding));

        // Continuing past the horizon completes it
        engine.run_until(SimTime::from_secs(30.0)).unwrap();
        assert_eq!(engine.process_state(pid), None);
    }

    #[test]
    fn test_equal_time_events_run_in_insertion_order() {
        let mut engine = SimEngine::new();
        let order = Rc::new(RefCell::new(Vec::new()));
        for i in 0..5 {
            let sim = engine.handle();
            let order = Rc::clone(&order);
            engine.spawn("worker", async move {
                sim.hold(SimTime::from_secs(1.0)).await?;
                order.borrow_mut().push(i);
                Ok::<(), SimError>(())
            });
        }

        engine.run_until(SimTime::from_secs(2.0)).unwrap();
        assert_eq!(*order.borrow(), vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_spawn_at_future_time() {
        let mut engine = SimEngine::new();
        let sim = engine.handle();
        let started = Rc::new(Cell::new(None));
        let seen = Rc::clone(&started);
        engine
            .spawn_at(
                "deferred",
                async move {
                    seen.set(Some(sim.now()));
                    Ok::<(), SimError>(())
                },
                SimTime::from_secs(4.0),
            )
            .unwrap();

        engine.run_until(SimTime::from_secs(10.0)).unwrap();
        assert_eq!(started.get(), Some(SimTime::from_secs(4.0)));
    }

    #[test]
    fn test_schedule_resumes_passive_process() {
        let mut engine = SimEngine::new();
        let sim = engine.handle();
        let woke = Rc::new(Cell::new(None));
        let seen = Rc::clone(&woke);
        let pid = engine.spawn("parked", async move {
            sim.passivate().await?;
            seen.set(Some(sim.now()));
            Ok::<(), SimError>(())
        });

        engine.run_until(SimTime::from_secs(1.0)).unwrap();
        assert_eq!(engine.process_state(pid), Some(ProcessState::Passive));

        engine.schedule(pid, SimTime::from_secs(7.0)).unwrap();
        engine.run_until(SimTime::from_secs(10.0)).unwrap();
        assert_eq!(woke.get(), Some(SimTime::from_secs(7.0)));
    }

    #[test]
    fn test_schedule_non_passive_is_invariant_violation() {
        let mut engine = SimEngine::new();
        let sim = engine.handle();
        let pid = engine.spawn("holder", async move {
            sim.hold(SimTime::from_secs(5.0)).await
        });
        engine.run_until(SimTime::from_secs(1.0)).unwrap();

        let err = engine.schedule(pid, SimTime::from_secs(2.0)).unwrap_err();
        assert!(err.is_invariant_violation());
    }

    #[test]
    fn test_hold_past_time_range_is_error_not_overflow() {
        let mut engine = SimEngine::new();
        let sim = engine.handle();
        engine.spawn("endless", async move {
            sim.hold(SimTime::from_secs(1.0)).await?;
            sim.hold(SimTime::from_nanos(u64::MAX)).await
        });

        let err = engine.run_until(SimTime::from_secs(10.0)).unwrap_err();
        assert!(err.is_config_error());
        assert!(err.to_string().contains("overflow"));
    }

    #[test]
    fn test_process_error_stops_run() {
        let mut engine = SimEngine::new();
        engine.spawn("faulty", async { Err::<(), _>(SimError::invariant("boom")) });

        let err = engine.run_until(SimTime::from_secs(1.0)).unwrap_err();
        assert!(err.to_string().contains("boom"));
    }

    #[test]
    fn test_foreign_pending_is_invariant_violation() {
        let mut engine = SimEngine::new();
        engine.spawn("stray", async {
            futures::future::pending::<()>().await;
            Ok::<(), SimError>(())
        });

        let err = engine.run_until(SimTime::from_secs(1.0)).unwrap_err();
        assert!(err.is_invariant_violation());
    }

    #[test]
    fn test_parked_processes_are_not_an_error() {
        let mut engine = SimEngine::new();
        let sim = engine.handle();
        engine.spawn("forever", async move { sim.passivate().await });

        let outcome = engine.run_until(SimTime::from_secs(100.0)).unwrap();
        assert!(outcome.queue_exhausted);
        assert_eq!(outcome.parked_processes, 1);
        assert_eq!(outcome.stopped_at, SimTime::from_secs(100.0));
    }

    #[test]
    fn test_step_dispatches_single_event() {
        let mut engine = SimEngine::new();
        let sim = engine.handle();
        engine.spawn("two-step", async move {
            sim.hold(SimTime::from_secs(1.0)).await
        });

        assert!(engine.step().unwrap());
        assert_eq!(engine.process_count(), 1);
        assert!(engine.step().unwrap());
        assert_eq!(engine.process_count(), 0);
        assert!(!engine.step().unwrap());
    }

    #[test]
    fn test_engine_debug() {
        let engine = SimEngine::new();
        let debug = format!("{engine:?}");
        assert!(debug.contains("SimEngine"));
    }
}
