//! Future event list of the engine.
//!
//! Every entry is one pending resumption of one process. Entries pop in
//! (time, insertion sequence) order, so processes made ready at the same
//! instant resume in the order they were made ready: a spawned process runs
//! after everything already due at its spawn time.
//!
//! [`EventScheduler::pop_due`] is the only way the run loop reads the queue;
//! it also reports why nothing was returned, which is what distinguishes a
//! drained simulation from one stopped at its horizon.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

use serde::{Deserialize, Serialize};

use crate::engine::process::ProcessId;
use crate::engine::SimTime;

/// A scheduled resumption of a process.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ScheduledEvent {
    /// Scheduled time.
    pub time: SimTime,
    /// Insertion sequence; breaks ties between equal times.
    pub sequence: u64,
    /// The process to resume.
    pub process: ProcessId,
}

impl ScheduledEvent {
    /// Create a new scheduled event.
    #[must_use]
    pub const fn new(time: SimTime, sequence: u64, process: ProcessId) -> Self {
        Self {
            time,
            sequence,
            process,
        }
    }

    const fn key(&self) -> (SimTime, u64) {
        (self.time, self.sequence)
    }
}

// Identity is the (time, sequence) key; the process is payload.
impl PartialEq for ScheduledEvent {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for ScheduledEvent {}

impl PartialOrd for ScheduledEvent {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ScheduledEvent {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key().cmp(&other.key())
    }
}

/// Result of asking the queue for the next event due by a horizon.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Due {
    /// An event at or before the horizon, removed from the queue.
    Event(ScheduledEvent),
    /// The earliest event lies after the horizon; it stays queued.
    Beyond(SimTime),
    /// Nothing is scheduled at all.
    Exhausted,
}

/// Priority-ordered future event list.
///
/// # Example
///
/// ```rust
/// use canline::engine::scheduler::{Due, EventScheduler};
/// use canline::engine::{ProcessId, SimTime};
///
/// let mut scheduler = EventScheduler::new();
/// scheduler.schedule(SimTime::from_secs(1.0), ProcessId::new(1));
/// scheduler.schedule(SimTime::from_secs(1.0), ProcessId::new(2));
/// scheduler.schedule(SimTime::from_secs(9.0), ProcessId::new(3));
///
/// let horizon = SimTime::from_secs(5.0);
/// assert!(matches!(scheduler.pop_due(horizon), Due::Event(e) if e.process == ProcessId::new(1)));
/// assert!(matches!(scheduler.pop_due(horizon), Due::Event(e) if e.process == ProcessId::new(2)));
/// assert_eq!(scheduler.pop_due(horizon), Due::Beyond(SimTime::from_secs(9.0)));
/// ```
#[derive(Debug, Default)]
pub struct EventScheduler {
    queue: BinaryHeap<Reverse<ScheduledEvent>>,
    sequence: u64,
}

impl EventScheduler {
    /// Create an empty event list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule a resumption of `process` at `time`.
    pub fn schedule(&mut self, time: SimTime, process: ProcessId) {
        let sequence = self.sequence;
        self.sequence += 1;
        self.queue
            .push(Reverse(ScheduledEvent::new(time, sequence, process)));
    }

    /// Remove the earliest event regardless of its time.
    #[must_use]
    #[allow(clippy::should_implement_trait)] // Not an Iterator, different semantics
    pub fn next(&mut self) -> Option<ScheduledEvent> {
        self.queue.pop().map(|Reverse(e)| e)
    }

    /// Remove the earliest event if it is due at or before `horizon`.
    ///
    /// The horizon is inclusive.
    #[must_use]
    pub fn pop_due(&mut self, horizon: SimTime) -> Due {
        match self.queue.peek().map(|Reverse(e)| e.time) {
            None => Due::Exhausted,
            Some(time) if time > horizon => Due::Beyond(time),
            Some(_) => self.next().map_or(Due::Exhausted, Due::Event),
        }
    }

    /// True if nothing is scheduled.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Number of pending events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Number of events ever scheduled.
    #[must_use]
    pub const fn scheduled_total(&self) -> u64 {
        self.sequence
    }
}
