//! Counted multi-slot resources.
//!
//! A store has a fixed number of interchangeable units. A process requests a
//! number of units and waits until they are free. Waiting requests are served
//! strictly FIFO: while the head of the queue does not fit, later requests
//! wait too, even if they would fit.

use std::collections::{HashMap, VecDeque};

use serde::{Deserialize, Serialize};

use crate::engine::facility::Grant;
use crate::engine::process::ProcessId;
use crate::engine::stats::{ResourceKind, ResourceReport, StatsAccumulator, TimeWeighted};
use crate::engine::SimTime;
use crate::error::{SimError, SimResult};

/// Index of a store within its engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StoreId(usize);

impl StoreId {
    pub(crate) const fn new(index: usize) -> Self {
        Self(index)
    }

    pub(crate) const fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, Copy)]
struct PendingRequest {
    pid: ProcessId,
    units: u32,
    since: SimTime,
}

/// Counted resource with a FIFO wait queue.
#[derive(Debug, Clone)]
pub struct Store {
    name: String,
    capacity: u32,
    in_use: u32,
    holders: HashMap<ProcessId, u32>,
    waiters: VecDeque<PendingRequest>,
    requests: u64,
    busy: TimeWeighted,
    queue: TimeWeighted,
    wait_time: StatsAccumulator,
}

impl Store {
    /// Create an empty store, measuring from `now`.
    ///
    /// # Errors
    ///
    /// Returns `SimError::Config` if `capacity` is zero.
    pub fn new(name: impl Into<String>, capacity: u32, now: SimTime) -> SimResult<Self> {
        let name = name.into();
        if capacity == 0 {
            return Err(SimError::config(format!(
                "store '{name}' must have a capacity of at least 1"
            )));
        }
        Ok(Self {
            name,
            capacity,
            in_use: 0,
            holders: HashMap::new(),
            waiters: VecDeque::new(),
            requests: 0,
            busy: TimeWeighted::new(now),
            queue: TimeWeighted::new(now),
            wait_time: StatsAccumulator::new("wait"),
        })
    }

    /// Store name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Total units.
    #[must_use]
    pub const fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Units currently held.
    #[must_use]
    pub const fn in_use(&self) -> u32 {
        self.in_use
    }

    /// Units currently free.
    #[must_use]
    pub const fn free(&self) -> u32 {
        self.capacity - self.in_use
    }

    /// Units held by `pid`.
    #[must_use]
    pub fn held_by(&self, pid: ProcessId) -> u32 {
        self.holders.get(&pid).copied().unwrap_or(0)
    }

    /// Whether `pid` has a request still waiting.
    #[must_use]
    pub fn is_waiting(&self, pid: ProcessId) -> bool {
        self.waiters.iter().any(|req| req.pid == pid)
    }

    /// Number of queued requests.
    #[must_use]
    pub fn queue_len(&self) -> usize {
        self.waiters.len()
    }

    /// Request `units` for `pid`.
    ///
    /// # Errors
    ///
    /// Returns `SimError::ExceedsCapacity` if the request can never be
    /// satisfied, or `SimError::Config` for a zero-unit request.
    pub fn request(&mut self, pid: ProcessId, units: u32, now: SimTime) -> SimResult<Grant> {
        if units > self.capacity {
            return Err(SimError::ExceedsCapacity {
                store: self.name.clone(),
                requested: units,
                capacity: self.capacity,
            });
        }
        if units == 0 {
            return Err(SimError::config(format!(
                "store '{}' request for zero units",
                self.name
            )));
        }
        self.requests += 1;
        if self.waiters.is_empty() && units <= self.free() {
            self.acquire(pid, units, now);
            self.wait_time.record(0.0);
            Ok(Grant::Immediate)
        } else {
            self.waiters.push_back(PendingRequest {
                pid,
                units,
                since: now,
            });
            self.queue.set(self.waiters.len() as f64, now);
            Ok(Grant::Queued)
        }
    }

    /// Return `units` held by `pid`.
    ///
    /// Returns the waiters granted as a result, in queue order.
    ///
    /// # Errors
    ///
    /// Returns an invariant violation if `pid` holds fewer than `units`.
    pub fn release(&mut self, pid: ProcessId, units: u32, now: SimTime) -> SimResult<Vec<ProcessId>> {
        let held = self.held_by(pid);
        if units == 0 || held < units {
            return Err(SimError::invariant(format!(
                "{pid} returned {units} units of store '{}' but holds {held}",
                self.name
            )));
        }
        if held == units {
            self.holders.remove(&pid);
        } else {
            self.holders.insert(pid, held - units);
        }
        self.in_use -= units;

        let mut granted = Vec::new();
        while let Some(head) = self.waiters.front().copied() {
            if head.units > self.free() {
                break;
            }
            self.waiters.pop_front();
            self.acquire(head.pid, head.units, now);
            self.wait_time.record_time(now - head.since);
            granted.push(head.pid);
        }
        if !granted.is_empty() {
            self.queue.set(self.waiters.len() as f64, now);
        }
        self.busy.set(f64::from(self.in_use), now);
        Ok(granted)
    }

    fn acquire(&mut self, pid: ProcessId, units: u32, now: SimTime) {
        *self.holders.entry(pid).or_insert(0) += units;
        self.in_use += units;
        self.busy.set(f64::from(self.in_use), now);
    }

    /// Summary of usage up to `now`. Utilization is busy units over capacity.
    #[must_use]
    pub fn report(&self, now: SimTime) -> ResourceReport {
        ResourceReport {
            name: self.name.clone(),
            kind: ResourceKind::Store,
            capacity: self.capacity,
            requests: self.requests,
            utilization: self.busy.mean(now) / f64::from(self.capacity),
            mean_queue_len: self.queue.mean(now),
            max_queue_len: self.queue.max(),
            wait_time: self.wait_time.clone(),
        }
    }
}
