//! Explicit wait queues.
//!
//! Unlike facility and store queues, nothing is released from a wait queue
//! automatically. A process appends itself and usually passivates; another
//! process later removes members from the front and decides whom to activate.
//! This is the building block for batch barriers.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::engine::process::ProcessId;
use crate::engine::stats::{TimeWeighted, WaitQueueReport};
use crate::engine::SimTime;
use crate::error::{SimError, SimResult};

/// Index of a wait queue within its engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WaitQueueId(usize);

impl WaitQueueId {
    pub(crate) const fn new(index: usize) -> Self {
        Self(index)
    }

    pub(crate) const fn index(self) -> usize {
        self.0
    }
}

/// FIFO list of processes, released only on request.
#[derive(Debug, Clone)]
pub struct WaitQueue {
    name: String,
    members: VecDeque<ProcessId>,
    entries: u64,
    length: TimeWeighted,
}

impl WaitQueue {
    /// Create an empty queue, measuring from `now`.
    #[must_use]
    pub fn new(name: impl Into<String>, now: SimTime) -> Self {
        Self {
            name: name.into(),
            members: VecDeque::new(),
            entries: 0,
            length: TimeWeighted::new(now),
        }
    }

    /// Queue name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Append `pid`.
    pub fn push(&mut self, pid: ProcessId, now: SimTime) {
        self.members.push_back(pid);
        self.entries += 1;
        self.length.set(self.members.len() as f64, now);
    }

    /// Number of members.
    #[must_use]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// True if nobody is waiting.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Remove exactly `count` members from the front, in arrival order.
    ///
    /// # Errors
    ///
    /// Returns an invariant violation if fewer than `count` are waiting.
    pub fn pop_front(&mut self, count: usize, now: SimTime) -> SimResult<Vec<ProcessId>> {
        if count > self.members.len() {
            return Err(SimError::invariant(format!(
                "cannot release {count} from '{}' holding {}",
                self.name,
                self.members.len()
            )));
        }
        let released: Vec<ProcessId> = self.members.drain(..count).collect();
        self.length.set(self.members.len() as f64, now);
        Ok(released)
    }

    /// Length statistics up to `now`.
    #[must_use]
    pub fn report(&self, now: SimTime) -> WaitQueueReport {
        WaitQueueReport {
            name: self.name.clone(),
            entries: self.entries,
            current_len: self.members.len(),
            mean_len: self.length.mean(now),
            max_len: self.length.max(),
        }
    }
}
