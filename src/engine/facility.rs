//! Exclusive single-slot resources.
//!
//! At most one process owns a facility at a time. Requests made while it is
//! busy wait in strict FIFO order; a release hands ownership directly to the
//! head of the queue, so no later arrival can overtake a waiter.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::engine::process::ProcessId;
use crate::engine::stats::{ResourceKind, ResourceReport, StatsAccumulator, TimeWeighted};
use crate::engine::SimTime;
use crate::error::{SimError, SimResult};

/// Index of a facility within its engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FacilityId(usize);

impl FacilityId {
    pub(crate) const fn new(index: usize) -> Self {
        Self(index)
    }

    pub(crate) const fn index(self) -> usize {
        self.0
    }
}

/// Outcome of a resource request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Grant {
    /// Acquired without waiting.
    Immediate,
    /// Appended to the wait queue.
    Queued,
}

/// Exclusive resource with a FIFO wait queue.
#[derive(Debug, Clone)]
pub struct Facility {
    name: String,
    owner: Option<ProcessId>,
    waiters: VecDeque<(ProcessId, SimTime)>,
    requests: u64,
    busy: TimeWeighted,
    queue: TimeWeighted,
    wait_time: StatsAccumulator,
}

impl Facility {
    /// Create an idle facility, measuring from `now`.
    #[must_use]
    pub fn new(name: impl Into<String>, now: SimTime) -> Self {
        Self {
            name: name.into(),
            owner: None,
            waiters: VecDeque::new(),
            requests: 0,
            busy: TimeWeighted::new(now),
            queue: TimeWeighted::new(now),
            wait_time: StatsAccumulator::new("wait"),
        }
    }

    /// Facility name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current owner, if busy.
    #[must_use]
    pub const fn owner(&self) -> Option<ProcessId> {
        self.owner
    }

    /// Number of queued requests.
    #[must_use]
    pub fn queue_len(&self) -> usize {
        self.waiters.len()
    }

    /// Request ownership for `pid`.
    pub fn request(&mut self, pid: ProcessId, now: SimTime) -> Grant {
        self.requests += 1;
        if self.owner.is_none() {
            self.owner = Some(pid);
            self.busy.set(1.0, now);
            self.wait_time.record(0.0);
            Grant::Immediate
        } else {
            self.waiters.push_back((pid, now));
            self.queue.set(self.waiters.len() as f64, now);
            Grant::Queued
        }
    }

    /// Release ownership held by `pid`.
    ///
    /// Returns the waiter that now owns the facility, if any.
    ///
    /// # Errors
    ///
    /// Returns an invariant violation if `pid` is not the owner.
    pub fn release(&mut self, pid: ProcessId, now: SimTime) -> SimResult<Option<ProcessId>> {
        if self.owner != Some(pid) {
            return Err(SimError::invariant(format!(
                "{pid} released facility '{}' owned by {:?}",
                self.name, self.owner
            )));
        }
        match self.waiters.pop_front() {
            Some((next, since)) => {
                self.owner = Some(next);
                self.queue.set(self.waiters.len() as f64, now);
                self.wait_time.record_time(now - since);
                Ok(Some(next))
            }
            None => {
                self.owner = None;
                self.busy.set(0.0, now);
                Ok(None)
            }
        }
    }

    /// Summary of usage up to `now`.
    #[must_use]
    pub fn report(&self, now: SimTime) -> ResourceReport {
        ResourceReport {
            name: self.name.clone(),
            kind: ResourceKind::Facility,
            capacity: 1,
            requests: self.requests,
            utilization: self.busy.mean(now),
            mean_queue_len: self.queue.mean(now),
            max_queue_len: self.queue.max(),
            wait_time: self.wait_time.clone(),
        }
    }
}
