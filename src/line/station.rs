//! Processing stations.
//!
//! A station is one step of the line: acquire a machine, hold for the
//! service time, release it. A single machine is an exclusive facility; a
//! bank of identical machines is a store requested one unit at a time.

use crate::config::StationConfig;
use crate::engine::{FacilityId, ResourceReport, SimEngine, SimHandle, SimTime, StoreId};
use crate::error::SimResult;

/// Resource backing a station.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StationResource {
    /// One machine.
    Facility(FacilityId),
    /// `capacity` interchangeable machines.
    Store(StoreId),
}

/// One step of the line.
#[derive(Debug, Clone)]
pub struct Station {
    name: &'static str,
    resource: StationResource,
    duration: SimTime,
}

impl Station {
    /// Register the backing resource with `engine`.
    ///
    /// # Errors
    ///
    /// Returns `SimError::Config` for a duration below one nanosecond or past
    /// the time range, or a zero capacity.
    pub fn install(
        engine: &mut SimEngine,
        name: &'static str,
        config: StationConfig,
    ) -> SimResult<Self> {
        let duration = SimTime::try_positive_secs(name, config.duration)?;
        let resource = if config.capacity == 1 {
            StationResource::Facility(engine.add_facility(name))
        } else {
            StationResource::Store(engine.add_store(name, config.capacity)?)
        };
        Ok(Self {
            name,
            resource,
            duration,
        })
    }

    /// Station name as shown in reports.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Backing resource.
    #[must_use]
    pub const fn resource(&self) -> StationResource {
        self.resource
    }

    /// Service time per item.
    #[must_use]
    pub const fn duration(&self) -> SimTime {
        self.duration
    }

    /// Put the running process through this station.
    ///
    /// # Errors
    ///
    /// Propagates invariant violations from the engine.
    pub async fn process(&self, sim: &SimHandle) -> SimResult<()> {
        match self.resource {
            StationResource::Facility(id) => {
                sim.seize(id).await?;
                sim.hold(self.duration).await?;
                sim.release(id)
            }
            StationResource::Store(id) => {
                sim.enter(id, 1).await?;
                sim.hold(self.duration).await?;
                sim.leave(id, 1)
            }
        }
    }

    /// Utilization and queue summary up to the engine's current time.
    ///
    /// # Errors
    ///
    /// Returns an invariant violation if installed on another engine.
    pub fn report(&self, engine: &SimEngine) -> SimResult<ResourceReport> {
        match self.resource {
            StationResource::Facility(id) => engine.facility_report(id),
            StationResource::Store(id) => engine.store_report(id),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::engine::ResourceKind;
    use crate::error::SimError;

    #[test]
    fn test_capacity_selects_resource_kind() {
        let mut engine = SimEngine::new();
        let single = Station::install(&mut engine, "lidCloser", StationConfig::single(3.0)).unwrap();
        let bank = Station::install(
            &mut engine,
            "labelApplicator",
            StationConfig {
                duration: 3.0,
                capacity: 3,
            },
        )
        .unwrap();

        assert!(matches!(single.resource(), StationResource::Facility(_)));
        assert!(matches!(bank.resource(), StationResource::Store(_)));
        assert_eq!(bank.report(&engine).unwrap().kind, ResourceKind::Store);
        assert_eq!(bank.report(&engine).unwrap().capacity, 3);
        assert_eq!(single.name(), "lidCloser");
    }

    #[test]
    fn test_non_positive_duration_rejected() {
        let mut engine = SimEngine::new();
        for duration in [-1.0, 0.0, 1e-12] {
            let err = Station::install(&mut engine, "bad", StationConfig::single(duration))
                .unwrap_err();
            assert!(err.is_config_error());
            assert!(err.to_string().contains("bad"));
        }
    }

    #[test]
    fn test_bank_serves_in_parallel() {
        let mut engine = SimEngine::new();
        let station = Station::install(
            &mut engine,
            "brineJarFiller",
            StationConfig {
                duration: 3.0,
                capacity: 2,
            },
        )
        .unwrap();

        for _ in 0..3 {
            let sim = engine.handle();
            let station = station.clone();
            engine.spawn("jar", async move { station.process(&sim).await });
        }

        let outcome = engine.run_until(SimTime::from_secs(20.0)).unwrap();
        assert_eq!(outcome.parked_processes, 0);
        let report = station.report(&engine).unwrap();
        assert_eq!(report.requests, 3);
        // Two served at once, the third waits one full service time
        assert_eq!(report.wait_time.max(), Some(3.0));
        // 9 busy unit-time over 2 units and 20 time units
        assert!((report.utilization - 9.0 / 40.0).abs() < 1e-9);
    }

    #[test]
    fn test_single_machine_serializes_work() {
        let mut engine = SimEngine::new();
        let station = Station::install(&mut engine, "sterilizationMachine", StationConfig::single(2400.0)).unwrap();
        let finished = std::rc::Rc::new(std::cell::RefCell::new(Vec::new()));

        for _ in 0..2 {
            let sim = engine.handle();
            let station = station.clone();
            let finished = std::rc::Rc::clone(&finished);
            engine.spawn("representative", async move {
                station.process(&sim).await?;
                finished.borrow_mut().push(sim.now());
                Ok::<(), SimError>(())
            });
        }

        engine.run_until(SimTime::from_secs(10_000.0)).unwrap();
        assert_eq!(
            *finished.borrow(),
            vec![SimTime::from_secs(2400.0), SimTime::from_secs(4800.0)]
        );
    }
}
