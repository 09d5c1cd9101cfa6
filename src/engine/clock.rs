//! Simulation clock management.
//!
//! The clock never ticks on its own: it jumps to the time of each popped
//! event and, at the end of a run, to the horizon. Time never moves backwards.

use serde::{Deserialize, Serialize};

use crate::engine::SimTime;
use crate::error::{SimError, SimResult};

/// Virtual clock for event-driven simulation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SimClock {
    /// Current simulation time.
    current: SimTime,
    /// Number of forward jumps taken.
    advance_count: u64,
}

impl SimClock {
    /// Create a clock at time zero.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            current: SimTime::ZERO,
            advance_count: 0,
        }
    }

    /// Get current simulation time.
    #[must_use]
    pub const fn current_time(&self) -> SimTime {
        self.current
    }

    /// Get number of forward jumps taken.
    #[must_use]
    pub const fn advance_count(&self) -> u64 {
        self.advance_count
    }

    /// Jump to `target`.
    ///
    /// Staying at the same time is allowed (zero-delay events); moving
    /// backwards is a scheduler defect.
    ///
    /// # Errors
    ///
    /// Returns an invariant violation if `target` is before the current time.
    pub fn advance_to(&mut self, target: SimTime) -> SimResult<SimTime> {
        if target < self.current {
            return Err(SimError::invariant(format!(
                "clock cannot move backwards from {} to {target}",
                self.current
            )));
        }
        if target > self.current {
            self.current = target;
            self.advance_count += 1;
        }
        Ok(self.current)
    }

    /// Reset clock to initial state.
    #[allow(clippy::missing_const_for_fn)] // Mutable const not stable
    pub fn reset(&mut self) {
        self.current = SimTime::ZERO;
        self.advance_count = 0;
    }

    /// Calculate time until a target time.
    #[must_use]
    pub fn time_until(&self, target: SimTime) -> SimTime {
        if target > self.current {
            target - self.current
        } else {
            SimTime::ZERO
        }
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Falsification: the clock is monotonic whatever order targets arrive in.
        #[test]
        fn prop_clock_monotonic(targets in prop::collection::vec(0u64..1_000_000, 1..200)) {
            let mut clock = SimClock::new();
            let mut last = SimTime::ZERO;

            for nanos in targets {
                let target = SimTime::from_nanos(nanos);
                let result = clock.advance_to(target);
                prop_assert_eq!(result.is_ok(), target >= last);
                prop_assert!(clock.current_time() >= last);
                last = clock.current_time();
            }
        }
    }
}
