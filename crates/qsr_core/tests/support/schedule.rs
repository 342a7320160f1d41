use bevy_ecs::prelude::World;
use bevy_ecs::schedule::Schedule;
use qsr_core::error::SimResult;
use qsr_core::runner::{run_next_event, run_until_end, simulation_schedule, RunEnd, Step};
use qsr_core::telemetry::OutcomeRecord;

/// Helper that owns a reusable `Schedule` so tests can step or drain the event queue.
pub struct ScheduleRunner {
    schedule: Schedule,
}

impl Default for ScheduleRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl ScheduleRunner {
    /// Create a runner with the default dispatcher schedule.
    pub fn new() -> Self {
        Self {
            schedule: simulation_schedule(),
        }
    }

    /// Process a single event.
    pub fn run_one(&mut self, world: &mut World) -> SimResult<Step> {
        run_next_event(world, &mut self.schedule)
    }

    /// Process events until the queue drains or the horizon is reached.
    pub fn run_full(&mut self, world: &mut World) -> SimResult<(RunEnd, Vec<OutcomeRecord>)> {
        let mut records = Vec::new();
        let end = run_until_end(world, &mut self.schedule, &mut records)?;
        Ok((end, records))
    }
}
