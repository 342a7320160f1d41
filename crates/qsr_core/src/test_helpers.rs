//! Test helpers for common test setup and utilities.
//!
//! This module provides shared fixtures so unit tests, integration tests and
//! benches build days the same way.

use bevy_ecs::prelude::{Entity, World};

use crate::distributions::DurationDistribution;
use crate::ecs::{AbandonmentPolicy, Channel, Customer, Order, ResourceKind};
use crate::scenario::{build_simulation, ArrivalProcess, SimConfig, Staffing};

/// Default config with every channel switched off.
pub fn quiet_config() -> SimConfig {
    let mut config = SimConfig::default();
    for channel in Channel::ALL {
        config.channel_mut(channel).arrivals = ArrivalProcess::Off;
    }
    config
}

/// One unit per pool, fixed service times, no arrivals.
///
/// Every menu item is plain (no kitchen stage, no coffee) so counter
/// customers visit the cashier and the packer only, and mobile orders are
/// collected the moment they are bagged.
pub fn single_server_config(service_minutes: f64) -> SimConfig {
    let mut config = quiet_config().with_staffing(Staffing {
        cashiers: 1,
        cooks: 1,
        espresso_machines: 1,
        packers: 1,
        pickup_windows: 1,
    });
    for resource in ResourceKind::ALL {
        config = config.with_service(resource, DurationDistribution::fixed(service_minutes));
    }
    for item in &mut config.menu {
        item.requires.clear();
        item.coffee_portions = 0;
    }
    config.with_pickup_lag(Channel::Mobile, DurationDistribution::fixed(0.0))
}

/// Cashier-only route for `channel`, so a customer holds exactly one pool.
pub fn cashier_only(config: SimConfig, channel: Channel) -> SimConfig {
    config
        .with_route(channel, Some(ResourceKind::Cashier), None)
        .with_pickup_stage(channel, None)
}

/// Builds a day world.
///
/// # Panics
///
/// Panics if `config` does not validate.
pub fn create_test_world(config: &SimConfig, seed: u64) -> World {
    let mut world = World::new();
    build_simulation(&mut world, config, seed).expect("test config should build");
    world
}

pub fn test_order() -> Order {
    Order {
        items: vec!["drip coffee".to_string()],
        value: 2.25,
        material_cost: 0.45,
        coffee_portions: 1,
    }
}

/// Spawns a customer directly, bypassing arrival handling.
pub fn spawn_test_customer(
    world: &mut World,
    id: u64,
    channel: Channel,
    stages: Vec<ResourceKind>,
    policy: AbandonmentPolicy,
) -> Entity {
    world
        .spawn(Customer::new(id, channel, 0, test_order(), stages, policy))
        .id()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::SimulationClock;

    #[test]
    fn quiet_world_has_no_events() {
        let world = create_test_world(&quiet_config(), 1);
        assert!(world.resource::<SimulationClock>().is_empty());
    }

    #[test]
    fn single_server_config_validates() {
        let config = cashier_only(single_server_config(5.0), Channel::DriveThru);
        config.validate().unwrap();
        assert_eq!(config.drive_thru.exit_stage, None);
        assert_eq!(config.drive_thru.pickup_stage, None);
        assert!(config.menu.iter().all(|item| item.requires.is_empty()));
    }
}
