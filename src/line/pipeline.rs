//! Process bodies of the line.
//!
//! Each function is the whole life of one entity, written as straight-line
//! code; every `.await` is a point where the engine may run other entities.

use std::rc::Rc;

use tracing::{debug, trace};

use super::counters::Rejection;
use super::CanningLine;
use crate::engine::SimHandle;
use crate::error::{SimError, SimResult};

/// Spawns one tomato per arrival interval until the arrival budget, if any, runs out.
pub(crate) async fn generator(line: Rc<CanningLine>, sim: SimHandle) -> SimResult<()> {
    let interval = line.config().arrival_time()?;
    loop {
        if let Some(max) = line.config().max_arrivals {
            if line.counters().tomatoes_generated >= max {
                debug!(arrivals = max, "arrival budget exhausted");
                return Ok(());
            }
        }
        line.count_arrival();
        sim.spawn("tomato", tomato(Rc::clone(&line), sim.clone()));
        sim.hold(interval).await?;
    }
}

/// Sorting, inspection and filling of one tomato.
pub(crate) async fn tomato(line: Rc<CanningLine>, sim: SimHandle) -> SimResult<()> {
    let start = sim.now();
    let stations = line.stations();
    let rejection = line.config().rejection;

    for (station, probability, reason) in [
        (&stations.size_sorter, rejection.size, Rejection::Size),
        (&stations.defect_sorter, rejection.defect, Rejection::Defect),
        (
            &stations.quality_control,
            rejection.quality_control,
            Rejection::QualityControl,
        ),
    ] {
        station.process(&sim).await?;
        if line.draw(probability) {
            line.reject(reason, sim.now() - start);
            trace!(?reason, "tomato rejected");
            return Ok(());
        }
    }

    stations.jar_filler.process(&sim).await?;
    if line.fill(sim.now() - start) {
        sim.spawn("jar", jar(Rc::clone(&line), sim.clone()));
    }
    Ok(())
}

/// Brine, lid and the sterilization barrier for one jar.
///
/// The jar whose arrival completes a batch releases the other members, runs
/// the single sterilizer cycle for the whole batch, and spawns one sterilized
/// jar per member. Every other jar parks until such a release.
pub(crate) async fn jar(line: Rc<CanningLine>, sim: SimHandle) -> SimResult<()> {
    let start = sim.now();
    let stations = line.stations();
    stations.brine_filler.process(&sim).await?;
    stations.lid_closer.process(&sim).await?;

    let queue = line.sterilization_queue();
    let batch = line.batch_size();
    sim.enqueue(queue)?;

    if sim.queue_len(queue)? >= batch {
        let me = sim.current()?;
        let cohort = sim.dequeue_front(queue, batch)?;
        if !cohort.contains(&me) {
            return Err(SimError::invariant(format!(
                "{me} completed a sterilization batch it is not part of"
            )));
        }
        for &member in &cohort {
            if member != me {
                sim.activate(member)?;
            }
            line.count_sterilized();
        }
        debug!(time = %sim.now(), jars = cohort.len(), "sterilization batch released");

        stations.sterilizer.process(&sim).await?;
        line.count_cycle();
        debug!(time = %sim.now(), "sterilization cycle finished");

        for _ in &cohort {
            sim.spawn("sterilized_jar", sterilized_jar(Rc::clone(&line), sim.clone()));
        }
    } else {
        sim.passivate().await?;
    }

    line.record_jar(sim.now() - start);
    Ok(())
}

/// Labelling and date printing of one sterilized jar.
pub(crate) async fn sterilized_jar(line: Rc<CanningLine>, sim: SimHandle) -> SimResult<()> {
    let start = sim.now();
    let stations = line.stations();

    stations.label_applicator.process(&sim).await?;
    line.count_labelled();

    stations.date_printer.process(&sim).await?;
    line.count_date_printed();

    line.record_sterilized_jar(sim.now() - start);
    Ok(())
}
