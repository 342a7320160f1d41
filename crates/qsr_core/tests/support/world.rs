use bevy_ecs::prelude::World;
use qsr_core::distributions::DurationDistribution;
use qsr_core::ecs::{Channel, ResourceKind};
use qsr_core::scenario::{ArrivalProcess, BalkRule, CoffeeService, MenuItem, SimConfig, Staffing};
use qsr_core::test_helpers::{cashier_only, create_test_world, single_server_config};

/// Builder for small, hand-timed days.
#[derive(Clone, Debug)]
pub struct TestDay {
    pub config: SimConfig,
    pub seed: u64,
}

impl TestDay {
    /// One unit per pool and fixed `service_minutes` everywhere; no arrivals yet.
    pub fn single_server(service_minutes: f64) -> Self {
        Self {
            config: single_server_config(service_minutes),
            seed: 42,
        }
    }

    /// Restricts `channel` to the cashier stage.
    pub fn cashier_only(mut self, channel: Channel) -> Self {
        self.config = cashier_only(self.config, channel);
        self
    }

    pub fn scripted(mut self, channel: Channel, at_minutes: &[f64]) -> Self {
        self.config = self
            .config
            .with_arrivals(channel, ArrivalProcess::scripted(at_minutes.to_vec()));
        self
    }

    pub fn service(mut self, resource: ResourceKind, minutes: f64) -> Self {
        self.config = self
            .config
            .with_service(resource, DurationDistribution::fixed(minutes));
        self
    }

    pub fn balk_rule(mut self, rule: BalkRule) -> Self {
        self.config = self.config.with_balk_rule(rule);
        self
    }

    pub fn mobile_patience(mut self, minutes: f64) -> Self {
        self.config = self
            .config
            .with_mobile_patience(DurationDistribution::fixed(minutes));
        self
    }

    /// Single-urn coffee service and a menu of one-portion drip coffee.
    pub fn coffee_only(mut self, portions_per_urn: u32, brew_minutes: f64) -> Self {
        self.config = self
            .config
            .with_coffee(CoffeeService {
                urns: 1,
                portions_per_urn,
                brew_minutes,
                ..CoffeeService::default()
            })
            .with_menu(vec![MenuItem::new("drip coffee", 2.25, 0.45, 1.0).with_coffee(1)])
            .with_items_per_order(1, 1);
        self
    }

    pub fn shelf_capacity(mut self, capacity: u32) -> Self {
        self.config = self.config.with_shelf_capacity(capacity);
        self
    }

    pub fn pickup_lag(mut self, channel: Channel, minutes: f64) -> Self {
        self.config = self
            .config
            .with_pickup_lag(channel, DurationDistribution::fixed(minutes));
        self
    }

    pub fn build(&self) -> World {
        create_test_world(&self.config, self.seed)
    }
}

/// Default menu and service times with enough staff that every pool is
/// below saturation, and a horizon late enough for the queue to drain.
pub fn well_staffed_day() -> SimConfig {
    SimConfig::default()
        .with_staffing(Staffing {
            cashiers: 2,
            cooks: 3,
            espresso_machines: 2,
            packers: 2,
            pickup_windows: 2,
        })
        .with_horizon(24.0 * 60.0)
}

/// Drive-thru only, arriving faster than one cashier can serve.
pub fn congested_drive_thru(rule: BalkRule) -> SimConfig {
    let mut config = SimConfig::default();
    config.walk_in.arrivals = ArrivalProcess::Off;
    config.mobile.arrivals = ArrivalProcess::Off;
    config
        .with_arrivals(Channel::DriveThru, ArrivalProcess::poisson(60.0))
        .with_hours(0.0, 240.0)
        .with_horizon(24.0 * 60.0)
        .with_balk_rule(rule)
}
