use bevy_ecs::prelude::World;
use log::debug;

use crate::arrivals::{schedule_first_arrivals, ArrivalGenerators};
use crate::clock::{minutes_to_ms, SimulationClock};
use crate::equipment::{CoffeeUrns, PickupShelf};
use crate::error::SimResult;
use crate::menu::Menu;
use crate::pools::ResourcePools;
use crate::rng::RandomStreams;
use crate::scenario::params::{SimConfig, SimulationHorizonMs};
use crate::systems::fault::RunFault;
use crate::telemetry::{EventCounts, EventTrace, SimTelemetry};

/// Validates `config` and inserts every resource a day run needs into
/// `world`, with the first arrival of each channel already queued.
///
/// The clock starts at opening time. Nothing is inserted when validation fails.
pub fn build_simulation(world: &mut World, config: &SimConfig, seed: u64) -> SimResult<()> {
    config.validate()?;
    let menu = Menu::new(config.menu.clone(), config.items_per_order)?;

    let mut clock = SimulationClock::starting_at(minutes_to_ms(config.opening_minutes));
    let mut generators = ArrivalGenerators::from_config(config);
    let mut streams = RandomStreams::new(seed);
    schedule_first_arrivals(&mut clock, &mut generators, &mut streams)?;
    debug!(
        "built day with {} initial arrivals, closing at {} ms",
        clock.len(),
        generators.closing_ms()
    );

    world.insert_resource(clock);
    world.insert_resource(generators);
    world.insert_resource(streams);
    world.insert_resource(menu);
    world.insert_resource(ResourcePools::new(|kind| config.staffing.capacity(kind)));
    world.insert_resource(CoffeeUrns::new(&config.coffee));
    world.insert_resource(PickupShelf::new(config.pickup_shelf_capacity));
    world.insert_resource(SimulationHorizonMs(minutes_to_ms(config.horizon_minutes)));
    world.insert_resource(config.clone());
    world.insert_resource(SimTelemetry::default());
    world.insert_resource(EventCounts::default());
    world.insert_resource(EventTrace::default());
    world.insert_resource(RunFault::default());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::ResourceKind;
    use crate::error::{ConfigError, SimError};
    use crate::scenario::Staffing;

    #[test]
    fn build_inserts_pools_sized_by_staffing() {
        let mut world = World::new();
        let config = SimConfig::default().with_staffing(Staffing {
            cashiers: 2,
            cooks: 4,
            espresso_machines: 1,
            packers: 3,
            pickup_windows: 2,
        });
        build_simulation(&mut world, &config, 9).unwrap();

        let pools = world.resource::<ResourcePools>();
        assert_eq!(pools.get(ResourceKind::Cashier).capacity(), 2);
        assert_eq!(pools.get(ResourceKind::Cook).capacity(), 4);
        assert_eq!(pools.get(ResourceKind::Packer).capacity(), 3);
        assert_eq!(pools.get(ResourceKind::PickupWindow).capacity(), 2);
        let urns = world.resource::<CoffeeUrns>();
        assert_eq!(urns.portions(), config.coffee.capacity_portions());
        assert_eq!(world.resource::<PickupShelf>().capacity(), 20);
        assert_eq!(world.resource::<SimulationHorizonMs>().0, 540 * 60_000);
        assert!(!world.resource::<SimulationClock>().is_empty());
    }

    #[test]
    fn invalid_config_is_rejected_before_building() {
        let mut world = World::new();
        let config = SimConfig::default().with_items_per_order(0, 0);
        let err = build_simulation(&mut world, &config, 9).expect_err("invalid");
        assert!(matches!(err, SimError::Config(ConfigError::InvalidMenu(_))));
        assert!(world.get_resource::<SimulationClock>().is_none());
    }

    #[test]
    fn clock_starts_at_opening() {
        let mut world = World::new();
        let config = SimConfig::default().with_hours(360.0, 840.0);
        build_simulation(&mut world, &config, 1).unwrap();
        let clock = world.resource::<SimulationClock>();
        assert_eq!(clock.now(), 360 * 60_000);
        assert!(clock.next_event_time().unwrap() >= clock.now());
    }
}
