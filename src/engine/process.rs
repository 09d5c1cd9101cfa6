//! Processes and their suspension primitives.
//!
//! A process is a stackless coroutine (`Future<Output = SimResult<()>>`) owned
//! by the engine. Its local progress point is the coroutine's own state, so
//! pipeline code reads as a straight line of stages:
//!
//! ```rust
//! use canline::engine::{SimEngine, SimTime};
//!
//! let mut engine = SimEngine::new();
//! let sorter = engine.add_facility("sorter");
//! let sim = engine.handle();
//! engine.spawn("tomato", async move {
//!     sim.seize(sorter).await?;
//!     sim.hold(SimTime::from_secs(0.5)).await?;
//!     sim.release(sorter)
//! });
//! engine.run_until(SimTime::from_secs(1.0)).unwrap();
//! ```
//!
//! Suspension points are exactly: a timed [`SimHandle::hold`], a blocked
//! [`SimHandle::seize`] or [`SimHandle::enter`], and an explicit
//! [`SimHandle::passivate`]. Each primitive registers its suspension with the
//! engine on first poll and completes on the poll that follows the resume.

use std::cell::RefCell;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll};

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::engine::facility::{FacilityId, Grant};
use crate::engine::store::StoreId;
use crate::engine::wait_queue::WaitQueueId;
use crate::engine::{Kernel, SimTime};
use crate::error::{SimError, SimResult};

/// Boxed process body as stored in the process table.
pub(crate) type ProcessBody = Pin<Box<dyn Future<Output = SimResult<()>>>>;

/// Identifier of a process, unique for the lifetime of an engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ProcessId(u64);

impl ProcessId {
    /// Wrap a raw id.
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Raw numeric id.
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for ProcessId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Lifecycle state of a process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProcessState {
    /// Activation event pending at the current or a future time.
    Ready,
    /// Currently executing; only one process is ever in this state.
    Running,
    /// Suspended in a timed hold; resume event pending.
    Holding,
    /// Suspended in a facility or store wait queue.
    Blocked,
    /// Suspended explicitly; resumes only through `activate`.
    Passive,
    /// Finished; the process is discarded.
    Terminated,
}

impl ProcessState {
    /// Suspended with no event that would resume it.
    #[must_use]
    pub const fn is_parked(self) -> bool {
        matches!(self, Self::Blocked | Self::Passive)
    }
}

struct ProcessEntry {
    name: &'static str,
    state: ProcessState,
    body: Option<ProcessBody>,
}

/// Table of live processes. Terminated processes are removed, ids are never reused.
#[derive(Default)]
pub(crate) struct ProcessTable {
    entries: HashMap<ProcessId, ProcessEntry>,
    next_id: u64,
    current: Option<ProcessId>,
}

impl ProcessTable {
    pub(crate) fn insert(&mut self, name: &'static str, body: ProcessBody) -> ProcessId {
        self.next_id += 1;
        let pid = ProcessId(self.next_id);
        self.entries.insert(
            pid,
            ProcessEntry {
                name,
                state: ProcessState::Ready,
                body: Some(body),
            },
        );
        trace!(process = %pid, name, "spawned");
        pid
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn state(&self, pid: ProcessId) -> Option<ProcessState> {
        self.entries.get(&pid).map(|entry| entry.state)
    }

    pub(crate) fn name(&self, pid: ProcessId) -> Option<&'static str> {
        self.entries.get(&pid).map(|entry| entry.name)
    }

    pub(crate) fn set_state(&mut self, pid: ProcessId, state: ProcessState) -> SimResult<()> {
        let entry = self
            .entries
            .get_mut(&pid)
            .ok_or(SimError::UnknownProcess(pid))?;
        entry.state = state;
        Ok(())
    }

    /// Change state only if the process is currently in `from`.
    pub(crate) fn transition(
        &mut self,
        pid: ProcessId,
        from: ProcessState,
        to: ProcessState,
    ) -> SimResult<()> {
        let entry = self
            .entries
            .get_mut(&pid)
            .ok_or(SimError::UnknownProcess(pid))?;
        if entry.state != from {
            return Err(SimError::invariant(format!(
                "{pid} ({}) expected {from:?} but is {:?}",
                entry.name, entry.state
            )));
        }
        entry.state = to;
        Ok(())
    }

    pub(crate) const fn set_current(&mut self, pid: Option<ProcessId>) {
        self.current = pid;
    }

    pub(crate) fn current(&self) -> SimResult<ProcessId> {
        self.current.ok_or(SimError::NoCurrentProcess)
    }

    pub(crate) fn take_body(&mut self, pid: ProcessId) -> SimResult<ProcessBody> {
        self.entries
            .get_mut(&pid)
            .and_then(|entry| entry.body.take())
            .ok_or_else(|| SimError::invariant(format!("{pid} has no body to resume")))
    }

    pub(crate) fn restore_body(&mut self, pid: ProcessId, body: ProcessBody) -> SimResult<()> {
        let entry = self
            .entries
            .get_mut(&pid)
            .ok_or(SimError::UnknownProcess(pid))?;
        entry.body = Some(body);
        Ok(())
    }

    pub(crate) fn remove(&mut self, pid: ProcessId) {
        self.entries.remove(&pid);
    }

    pub(crate) fn parked_count(&self) -> usize {
        self.entries
            .values()
            .filter(|entry| entry.state.is_parked())
            .count()
    }

    /// Drop every entry, returning the bodies so the caller controls where they are dropped.
    pub(crate) fn clear(&mut self) -> Vec<ProcessBody> {
        self.current = None;
        self.entries
            .drain()
            .filter_map(|(_, entry)| entry.body)
            .collect()
    }
}

/// Handle through which processes and setup code reach the engine.
///
/// Cheap to clone; every process captures its own copy. All primitives act on
/// the currently running process.
#[derive(Clone)]
pub struct SimHandle {
    kernel: Rc<RefCell<Kernel>>,
}

impl SimHandle {
    pub(crate) const fn new(kernel: Rc<RefCell<Kernel>>) -> Self {
        Self { kernel }
    }

    fn with_kernel<T>(&self, f: impl FnOnce(&mut Kernel) -> T) -> T {
        f(&mut self.kernel.borrow_mut())
    }

    /// Current virtual time.
    #[must_use]
    pub fn now(&self) -> SimTime {
        self.kernel.borrow().now()
    }

    /// Id of the running process.
    ///
    /// # Errors
    ///
    /// Returns `SimError::NoCurrentProcess` outside of a process.
    pub fn current(&self) -> SimResult<ProcessId> {
        self.kernel.borrow().processes.current()
    }

    /// Spawn a new process, activated at the current time after every event
    /// already due at this time.
    pub fn spawn<F>(&self, name: &'static str, body: F) -> ProcessId
    where
        F: Future<Output = SimResult<()>> + 'static,
    {
        self.with_kernel(|kernel| {
            let pid = kernel.processes.insert(name, Box::pin(body));
            let now = kernel.now();
            kernel.events.schedule(now, pid);
            pid
        })
    }

    /// Suspend the running process for `duration`.
    pub fn hold(&self, duration: SimTime) -> Hold {
        Hold {
            handle: self.clone(),
            duration,
            armed: false,
        }
    }

    /// Acquire a facility, waiting in FIFO order if it is busy.
    pub fn seize(&self, facility: FacilityId) -> Seize {
        Seize {
            handle: self.clone(),
            facility,
            queued: false,
        }
    }

    /// Release a facility held by the running process.
    ///
    /// The longest waiting process becomes the owner and resumes at the
    /// current time.
    ///
    /// # Errors
    ///
    /// Returns an invariant violation if the running process is not the owner.
    pub fn release(&self, facility: FacilityId) -> SimResult<()> {
        self.with_kernel(|kernel| {
            let pid = kernel.processes.current()?;
            let now = kernel.now();
            if let Some(next) = kernel.facility_mut(facility)?.release(pid, now)? {
                kernel.wake(next, ProcessState::Blocked)?;
            }
            Ok(())
        })
    }

    /// Acquire `units` of a store, waiting in FIFO order until they are free.
    pub fn enter(&self, store: StoreId, units: u32) -> Enter {
        Enter {
            handle: self.clone(),
            store,
            units,
            queued: false,
        }
    }

    /// Return `units` of a store held by the running process.
    ///
    /// Waiting requests are granted from the head of the queue for as long as
    /// they fit.
    ///
    /// # Errors
    ///
    /// Returns an invariant violation if the running process holds fewer units.
    pub fn leave(&self, store: StoreId, units: u32) -> SimResult<()> {
        self.with_kernel(|kernel| {
            let pid = kernel.processes.current()?;
            let now = kernel.now();
            let granted = kernel.store_mut(store)?.release(pid, units, now)?;
            for next in granted {
                kernel.wake(next, ProcessState::Blocked)?;
            }
            Ok(())
        })
    }

    /// Suspend the running process until another process activates it.
    pub fn passivate(&self) -> Passivate {
        Passivate {
            handle: self.clone(),
            armed: false,
        }
    }

    /// Resume a passive process at the current time.
    ///
    /// # Errors
    ///
    /// Returns an invariant violation if the process is not passive.
    pub fn activate(&self, pid: ProcessId) -> SimResult<()> {
        self.with_kernel(|kernel| kernel.wake(pid, ProcessState::Passive))
    }

    /// Append the running process to a wait queue. Does not suspend.
    ///
    /// # Errors
    ///
    /// Returns an invariant violation outside of a process.
    pub fn enqueue(&self, queue: WaitQueueId) -> SimResult<()> {
        self.with_kernel(|kernel| {
            let pid = kernel.processes.current()?;
            let now = kernel.now();
            kernel.queue_mut(queue)?.push(pid, now);
            Ok(())
        })
    }

    /// Number of processes in a wait queue.
    ///
    /// # Errors
    ///
    /// Returns an invariant violation for an unknown queue.
    pub fn queue_len(&self, queue: WaitQueueId) -> SimResult<usize> {
        self.with_kernel(|kernel| Ok(kernel.queue_mut(queue)?.len()))
    }

    /// Remove exactly `count` processes from the front of a wait queue.
    ///
    /// The removed processes are not resumed; the caller decides which ones
    /// to [`activate`](Self::activate).
    ///
    /// # Errors
    ///
    /// Returns an invariant violation if fewer than `count` are queued.
    pub fn dequeue_front(&self, queue: WaitQueueId, count: usize) -> SimResult<Vec<ProcessId>> {
        self.with_kernel(|kernel| {
            let now = kernel.now();
            kernel.queue_mut(queue)?.pop_front(count, now)
        })
    }
}

impl std::fmt::Debug for SimHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimHandle").field("now", &self.now()).finish()
    }
}

/// Future returned by [`SimHandle::hold`].
#[must_use = "a hold does nothing unless awaited"]
#[derive(Debug)]
pub struct Hold {
    handle: SimHandle,
    duration: SimTime,
    armed: bool,
}

impl Future for Hold {
    type Output = SimResult<()>;

    fn poll(mut self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Self::Output> {
        if self.armed {
            return Poll::Ready(Ok(()));
        }
        let duration = self.duration;
        let registered = self.handle.with_kernel(|kernel| -> SimResult<()> {
            let pid = kernel.processes.current()?;
            let wake_at = kernel.now().checked_add(duration).ok_or_else(|| {
                SimError::config(format!(
                    "{pid} cannot hold {duration} past {}, time would overflow",
                    kernel.now()
                ))
            })?;
            kernel.processes.set_state(pid, ProcessState::Holding)?;
            kernel.events.schedule(wake_at, pid);
            Ok(())
        });
        match registered {
            Ok(()) => {
                self.armed = true;
                Poll::Pending
            }
            Err(err) => Poll::Ready(Err(err)),
        }
    }
}

/// Future returned by [`SimHandle::seize`].
#[must_use = "a seize does nothing unless awaited"]
#[derive(Debug)]
pub struct Seize {
    handle: SimHandle,
    facility: FacilityId,
    queued: bool,
}

impl Future for Seize {
    type Output = SimResult<()>;

    fn poll(mut self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Self::Output> {
        let facility = self.facility;
        if self.queued {
            // Resumed by a release that handed us the facility.
            let owned = self.handle.with_kernel(|kernel| {
                let pid = kernel.processes.current()?;
                let owner = kernel.facility_mut(facility)?.owner();
                if owner == Some(pid) {
                    Ok(())
                } else {
                    Err(SimError::invariant(format!(
                        "{pid} resumed on {facility:?} without owning it"
                    )))
                }
            });
            return Poll::Ready(owned);
        }
        let requested = self.handle.with_kernel(|kernel| -> SimResult<Grant> {
            let pid = kernel.processes.current()?;
            let now = kernel.now();
            let grant = kernel.facility_mut(facility)?.request(pid, now);
            if grant == Grant::Queued {
                kernel.processes.set_state(pid, ProcessState::Blocked)?;
            }
            Ok(grant)
        });
        match requested {
            Ok(Grant::Immediate) => Poll::Ready(Ok(())),
            Ok(Grant::Queued) => {
                self.queued = true;
                Poll::Pending
            }
            Err(err) => Poll::Ready(Err(err)),
        }
    }
}

/// Future returned by [`SimHandle::enter`].
#[must_use = "an enter does nothing unless awaited"]
#[derive(Debug)]
pub struct Enter {
    handle: SimHandle,
    store: StoreId,
    units: u32,
    queued: bool,
}

impl Future for Enter {
    type Output = SimResult<()>;

    fn poll(mut self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Self::Output> {
        let (store, units) = (self.store, self.units);
        if self.queued {
            let granted = self.handle.with_kernel(|kernel| {
                let pid = kernel.processes.current()?;
                let store_ref = kernel.store_mut(store)?;
                if store_ref.is_waiting(pid) {
                    Err(SimError::invariant(format!(
                        "{pid} resumed on store '{}' before its request was granted",
                        store_ref.name()
                    )))
                } else {
                    Ok(())
                }
            });
            return Poll::Ready(granted);
        }
        let requested = self.handle.with_kernel(|kernel| -> SimResult<Grant> {
            let pid = kernel.processes.current()?;
            let now = kernel.now();
            let grant = kernel.store_mut(store)?.request(pid, units, now)?;
            if grant == Grant::Queued {
                kernel.processes.set_state(pid, ProcessState::Blocked)?;
            }
            Ok(grant)
        });
        match requested {
            Ok(Grant::Immediate) => Poll::Ready(Ok(())),
            Ok(Grant::Queued) => {
                self.queued = true;
                Poll::Pending
            }
            Err(err) => Poll::Ready(Err(err)),
        }
    }
}

/// Future returned by [`SimHandle::passivate`].
#[must_use = "a passivate does nothing unless awaited"]
#[derive(Debug)]
pub struct Passivate {
    handle: SimHandle,
    armed: bool,
}

impl Future for Passivate {
    type Output = SimResult<()>;

    fn poll(mut self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Self::Output> {
        if self.armed {
            return Poll::Ready(Ok(()));
        }
        let parked = self.handle.with_kernel(|kernel| {
            let pid = kernel.processes.current()?;
            kernel.processes.set_state(pid, ProcessState::Passive)
        });
        match parked {
            Ok(()) => {
                self.armed = true;
                Poll::Pending
            }
            Err(err) => Poll::Ready(Err(err)),
        }
    }
}
