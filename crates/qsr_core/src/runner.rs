//! Simulation runner: advances the clock and routes events into the ECS.
//!
//! Clock progression and event routing happen here, outside systems. Each step
//! pops the next event from [SimulationClock], inserts it as [CurrentEvent],
//! then runs the schedule. A handler fault stops the run at that step.

use bevy_ecs::prelude::{Res, Schedule, World};
use bevy_ecs::schedule::{apply_deferred, ExecutorKind, IntoSystemConfigs};
use bevy_ecs::system::IntoSystem;
use log::{debug, error, info, warn};
use serde::Serialize;

use crate::clock::{CurrentEvent, Event, EventKind, SimulationClock};
use crate::ecs::{Customer, Outcome};
use crate::equipment::{CoffeeUrns, PickupShelf, ShelfStats, UrnStats};
use crate::error::{SimError, SimResult};
use crate::pools::{PoolStats, ResourcePools};
use crate::scenario::{build_simulation, SimConfig, SimulationHorizonMs};
use crate::systems::{
    arrival::arrival_system,
    brew::brew_complete_system,
    departure::departure_system,
    fault::{capture_fault, RunFault},
    renege::renege_system,
    service_complete::service_complete_system,
    service_start::service_start_system,
};
use crate::telemetry::{
    EventCounts, EventTrace, MetricsSink, OutcomeCounts, OutcomeRecord, SimTelemetry,
};

fn is_arrival(event: Option<Res<CurrentEvent>>) -> bool {
    event.map(|e| e.0.kind == EventKind::Arrival).unwrap_or(false)
}

fn is_service_start(event: Option<Res<CurrentEvent>>) -> bool {
    event
        .map(|e| e.0.kind == EventKind::ServiceStart)
        .unwrap_or(false)
}

fn is_service_complete(event: Option<Res<CurrentEvent>>) -> bool {
    event
        .map(|e| e.0.kind == EventKind::ServiceComplete)
        .unwrap_or(false)
}

fn is_renege(event: Option<Res<CurrentEvent>>) -> bool {
    event.map(|e| e.0.kind == EventKind::Renege).unwrap_or(false)
}

fn is_brew_complete(event: Option<Res<CurrentEvent>>) -> bool {
    event
        .map(|e| e.0.kind == EventKind::BrewComplete)
        .unwrap_or(false)
}

fn is_departure(event: Option<Res<CurrentEvent>>) -> bool {
    event
        .map(|e| e.0.kind == EventKind::Departure)
        .unwrap_or(false)
}

/// Outcome of a single [run_next_event] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Processed(Event),
    /// The event queue is empty.
    Drained,
    /// The next event lies past [SimulationHorizonMs]; it stays queued.
    HorizonReached,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RunEnd {
    Drained,
    HorizonReached,
}

/// Everything a finished run reports.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsStream {
    pub seed: u64,
    /// Terminal outcome records in emission order.
    pub records: Vec<OutcomeRecord>,
    pub counts: OutcomeCounts,
    pub end: RunEnd,
    /// Clock time of the last processed event.
    pub ended_at_ms: u64,
    pub events_processed: u64,
    /// Customers still inside when the horizon cut the run.
    pub in_flight: usize,
    pub pool_stats: Vec<PoolStats>,
    pub coffee: UrnStats,
    pub shelf: ShelfStats,
    pub waste: WasteTally,
}

/// Product thrown away over the day.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct WasteTally {
    /// Coffee poured for cancelled orders plus what was left in the urns.
    pub coffee_portions: u64,
    /// Items of orders caught mid-preparation by the horizon.
    pub unfinished_items: u64,
}

impl MetricsStream {
    pub fn completed(&self) -> impl Iterator<Item = &OutcomeRecord> {
        self.records
            .iter()
            .filter(|r| r.outcome == Outcome::Completed)
    }
}

/// Builds the dispatcher schedule: one handler per event kind, each gated on
/// the current event and piped into [capture_fault], then [apply_deferred] so
/// spawns and despawns land before the next step.
pub fn simulation_schedule() -> Schedule {
    let mut schedule = Schedule::default();
    schedule.set_executor_kind(ExecutorKind::SingleThreaded);
    schedule.add_systems(
        (
            arrival_system.pipe(capture_fault).run_if(is_arrival),
            service_start_system
                .pipe(capture_fault)
                .run_if(is_service_start),
            service_complete_system
                .pipe(capture_fault)
                .run_if(is_service_complete),
            renege_system.pipe(capture_fault).run_if(is_renege),
            brew_complete_system
                .pipe(capture_fault)
                .run_if(is_brew_complete),
            departure_system.pipe(capture_fault).run_if(is_departure),
            apply_deferred,
        )
            .chain(),
    );
    schedule
}

/// Attaches the failing time and the recent event trace to an invariant error.
fn with_context(err: SimError, at_ms: u64, world: &World) -> SimError {
    match err {
        SimError::Invariant { message, .. } => SimError::Invariant {
            message,
            at_ms,
            trace: world
                .get_resource::<EventTrace>()
                .map(EventTrace::snapshot)
                .unwrap_or_default(),
        },
        other => other,
    }
}

/// Runs one simulation step: pops the next event, inserts it as [CurrentEvent],
/// then runs the schedule. Events past [SimulationHorizonMs] (when that
/// resource is present) are left in the queue.
pub fn run_next_event(world: &mut World, schedule: &mut Schedule) -> SimResult<Step> {
    let horizon = world.get_resource::<SimulationHorizonMs>().map(|h| h.0);
    let Some(next_ts) = world.resource::<SimulationClock>().next_event_time() else {
        return Ok(Step::Drained);
    };
    if horizon.is_some_and(|end_ms| next_ts > end_ms) {
        return Ok(Step::HorizonReached);
    }

    let Some(event) = world.resource_mut::<SimulationClock>().pop_next() else {
        return Ok(Step::Drained);
    };
    world.insert_resource(CurrentEvent(event));
    if let Some(mut trace) = world.get_resource_mut::<EventTrace>() {
        trace.push(event);
    }
    if let Some(mut counts) = world.get_resource_mut::<EventCounts>() {
        counts.record(event.kind);
    }
    debug!("{} ms: {:?} {:?}", event.timestamp, event.kind, event.subject);

    schedule.run(world);

    let fault = world
        .get_resource_mut::<RunFault>()
        .and_then(|mut fault| fault.0.take());
    match fault {
        Some(err) => Err(with_context(err, event.timestamp, world)),
        None => Ok(Step::Processed(event)),
    }
}

/// Steps until the queue drains or the horizon is reached, handing every new
/// outcome record to `sink` as soon as its step completes.
pub fn run_until_end(
    world: &mut World,
    schedule: &mut Schedule,
    sink: &mut dyn MetricsSink,
) -> SimResult<RunEnd> {
    let mut forwarded = world
        .get_resource::<SimTelemetry>()
        .map(|t| t.records.len())
        .unwrap_or(0);
    loop {
        let step = run_next_event(world, schedule);
        if let Some(telemetry) = world.get_resource::<SimTelemetry>() {
            for record in &telemetry.records[forwarded..] {
                sink.record(record);
            }
            forwarded = telemetry.records.len();
        }
        match step? {
            Step::Processed(_) => {}
            Step::Drained => return Ok(RunEnd::Drained),
            Step::HorizonReached => return Ok(RunEnd::HorizonReached),
        }
    }
}

/// Drains the world's telemetry into a [MetricsStream].
fn collect_stream(world: &mut World, seed: u64, end: RunEnd) -> SimResult<MetricsStream> {
    let now = world.resource::<SimulationClock>().now();
    let (in_flight, unfinished_items) = world
        .query::<&Customer>()
        .iter(world)
        .filter(|customer| !customer.is_terminal())
        .fold((0usize, 0u64), |(count, items), customer| {
            let started = if customer.has_started_service() {
                customer.order.items.len() as u64
            } else {
                0
            };
            (count + 1, items + started)
        });
    if end == RunEnd::Drained && in_flight > 0 {
        return Err(with_context(
            SimError::invariant(format!(
                "event queue drained with {in_flight} customers still in the system"
            )),
            now,
            world,
        ));
    }
    let events_processed = world
        .get_resource::<EventCounts>()
        .map(EventCounts::total)
        .unwrap_or(0);
    let pool_stats = world.resource::<ResourcePools>().stats(now);
    let coffee = world
        .get_resource::<CoffeeUrns>()
        .map(CoffeeUrns::stats)
        .unwrap_or_default();
    let shelf = world
        .get_resource::<PickupShelf>()
        .map(PickupShelf::stats)
        .unwrap_or_default();
    let waste = WasteTally {
        coffee_portions: coffee.portions_discarded + u64::from(coffee.portions_left),
        unfinished_items,
    };
    let mut telemetry = world.resource_mut::<SimTelemetry>();
    Ok(MetricsStream {
        seed,
        records: std::mem::take(&mut telemetry.records),
        counts: telemetry.counts,
        end,
        ended_at_ms: now,
        events_processed,
        in_flight,
        pool_stats,
        coffee,
        shelf,
        waste,
    })
}

/// Simulates one day and returns its metrics stream.
pub fn run(config: &SimConfig, seed: u64) -> SimResult<MetricsStream> {
    let mut ignored = Vec::new();
    run_with_sink(config, seed, &mut ignored)
}

/// Simulates one day, streaming every outcome record into `sink` as it is
/// emitted. The returned stream holds the same records.
pub fn run_with_sink(
    config: &SimConfig,
    seed: u64,
    sink: &mut dyn MetricsSink,
) -> SimResult<MetricsStream> {
    let mut world = World::new();
    build_simulation(&mut world, config, seed)?;
    let mut schedule = simulation_schedule();
    info!(
        "day run started: seed {seed}, staffing {:?}, open {}..{} min, horizon {} min",
        config.staffing, config.opening_minutes, config.closing_minutes, config.horizon_minutes
    );

    let stream = match run_until_end(&mut world, &mut schedule, sink)
        .and_then(|end| collect_stream(&mut world, seed, end))
    {
        Ok(stream) => stream,
        Err(err) => {
            error!("day run aborted: {err}");
            return Err(err);
        }
    };

    if stream.in_flight > 0 {
        warn!(
            "horizon reached at {} ms with {} customers still in the system",
            stream.ended_at_ms, stream.in_flight
        );
    }
    info!(
        "day run finished ({:?}) at {} ms: {} events, {} completed, {} balked, {} reneged",
        stream.end,
        stream.ended_at_ms,
        stream.events_processed,
        stream.counts.completed,
        stream.counts.balked,
        stream.counts.reneged
    );
    Ok(stream)
}
