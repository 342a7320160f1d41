use bevy_ecs::prelude::Resource;
use serde::{Deserialize, Serialize};

use crate::clock::minutes_to_ms;
use crate::distributions::DurationDistribution;
use crate::ecs::{Channel, ResourceKind};
use crate::error::ConfigError;

/// Default trading day: an 8-hour shift, with one extra hour to serve the
/// customers still inside at closing.
const DEFAULT_CLOSING_MINUTES: f64 = 480.0;
const DEFAULT_CLEANUP_MINUTES: f64 = 60.0;
const DEFAULT_SHELF_CAPACITY: u32 = 20;

fn default_pickup_windows() -> u32 {
    1
}

fn no_delay() -> DurationDistribution {
    DurationDistribution::fixed(0.0)
}

fn default_window_service() -> DurationDistribution {
    DurationDistribution::exponential(1.0)
}

fn default_waste_penalty() -> f64 {
    2.00
}

/// Capacity of each resource pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Staffing {
    pub cashiers: u32,
    pub cooks: u32,
    pub espresso_machines: u32,
    pub packers: u32,
    #[serde(default = "default_pickup_windows")]
    pub pickup_windows: u32,
}

impl Default for Staffing {
    fn default() -> Self {
        Self {
            cashiers: 1,
            cooks: 3,
            espresso_machines: 1,
            packers: 1,
            pickup_windows: 1,
        }
    }
}

impl Staffing {
    pub fn capacity(&self, resource: ResourceKind) -> u32 {
        match resource {
            ResourceKind::Cashier => self.cashiers,
            ResourceKind::Cook => self.cooks,
            ResourceKind::Espresso => self.espresso_machines,
            ResourceKind::Packer => self.packers,
            ResourceKind::PickupWindow => self.pickup_windows,
        }
    }

    /// Headcount of paid staff (espresso machines excluded).
    pub fn staff_count(&self) -> u32 {
        ResourceKind::ALL
            .into_iter()
            .filter(|kind| kind.is_staffed())
            .map(|kind| self.capacity(kind))
            .sum()
    }
}

/// How customers of one channel arrive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ArrivalProcess {
    Off,
    /// Exponential gaps at `per_hour`, scaled by `hourly_multipliers[hour since opening]`.
    Poisson {
        per_hour: f64,
        #[serde(default)]
        hourly_multipliers: Vec<f64>,
    },
    Fixed { every_minutes: f64 },
    /// Explicit arrival instants, in minutes since opening.
    Scripted { at_minutes: Vec<f64> },
}

impl ArrivalProcess {
    pub fn poisson(per_hour: f64) -> Self {
        ArrivalProcess::Poisson {
            per_hour,
            hourly_multipliers: Vec::new(),
        }
    }

    pub fn scripted(at_minutes: impl Into<Vec<f64>>) -> Self {
        ArrivalProcess::Scripted {
            at_minutes: at_minutes.into(),
        }
    }

    fn validate(&self, channel: Channel) -> Result<(), ConfigError> {
        let malformed = |reason: &str| ConfigError::MalformedDistribution {
            what: format!("{channel:?} arrivals"),
            reason: reason.to_string(),
        };
        match self {
            ArrivalProcess::Off => {}
            ArrivalProcess::Poisson {
                per_hour,
                hourly_multipliers,
            } => {
                if !(per_hour.is_finite() && *per_hour >= 0.0) {
                    return Err(malformed("rate must be finite and >= 0"));
                }
                if hourly_multipliers.iter().any(|m| !(m.is_finite() && *m >= 0.0)) {
                    return Err(malformed("hourly multipliers must be finite and >= 0"));
                }
            }
            ArrivalProcess::Fixed { every_minutes } => {
                if !(every_minutes.is_finite() && *every_minutes > 0.0) {
                    return Err(malformed("fixed interval must be finite and > 0"));
                }
                if minutes_to_ms(*every_minutes) == 0 {
                    return Err(malformed("fixed interval rounds to 0 ms"));
                }
            }
            ArrivalProcess::Scripted { at_minutes } => {
                if at_minutes.iter().any(|t| !(t.is_finite() && *t >= 0.0)) {
                    return Err(malformed("scripted instants must be finite and >= 0"));
                }
                if at_minutes.windows(2).any(|pair| pair[1] < pair[0]) {
                    return Err(malformed("scripted instants must be sorted"));
                }
            }
        }
        Ok(())
    }
}

/// Arrival process, fixed route stages and pickup of one channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelConfig {
    pub arrivals: ArrivalProcess,
    /// Stage every order of this channel starts with (order taking).
    pub entry_stage: Option<ResourceKind>,
    /// Stage every order of this channel ends its preparation with (bagging).
    pub exit_stage: Option<ResourceKind>,
    /// Hand-over stage after bagging.
    #[serde(default)]
    pub pickup_stage: Option<ResourceKind>,
    /// Delay between the last stage and the customer collecting the order.
    #[serde(default = "no_delay")]
    pub pickup_lag: DurationDistribution,
}

impl ChannelConfig {
    pub fn counter(arrivals: ArrivalProcess) -> Self {
        Self {
            arrivals,
            entry_stage: Some(ResourceKind::Cashier),
            exit_stage: Some(ResourceKind::Packer),
            pickup_stage: None,
            pickup_lag: no_delay(),
        }
    }

    /// Counter route with the order handed over at the pickup window.
    pub fn lane(arrivals: ArrivalProcess) -> Self {
        Self {
            pickup_stage: Some(ResourceKind::PickupWindow),
            ..Self::counter(arrivals)
        }
    }

    /// Prepaid app orders skip the cashier and are collected from the shelf
    /// some time after bagging.
    pub fn app(arrivals: ArrivalProcess) -> Self {
        Self {
            arrivals,
            entry_stage: None,
            exit_stage: Some(ResourceKind::Packer),
            pickup_stage: None,
            pickup_lag: DurationDistribution::Uniform {
                min_minutes: 0.0,
                max_minutes: 10.0,
            },
        }
    }
}

/// Service-time distribution per resource type.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ServiceTimes {
    pub cashier: DurationDistribution,
    pub cook: DurationDistribution,
    pub espresso: DurationDistribution,
    pub packer: DurationDistribution,
    #[serde(default = "default_window_service")]
    pub pickup_window: DurationDistribution,
}

impl Default for ServiceTimes {
    fn default() -> Self {
        Self {
            cashier: DurationDistribution::exponential(1.5),
            cook: DurationDistribution::Normal {
                mean_minutes: 3.5,
                std_minutes: 1.0,
                floor_minutes: 0.5,
            },
            espresso: DurationDistribution::Normal {
                mean_minutes: 1.0,
                std_minutes: 0.25,
                floor_minutes: 0.3,
            },
            packer: DurationDistribution::fixed(1.0),
            pickup_window: default_window_service(),
        }
    }
}

impl ServiceTimes {
    pub fn get(&self, resource: ResourceKind) -> &DurationDistribution {
        match resource {
            ResourceKind::Cashier => &self.cashier,
            ResourceKind::Cook => &self.cook,
            ResourceKind::Espresso => &self.espresso,
            ResourceKind::Packer => &self.packer,
            ResourceKind::PickupWindow => &self.pickup_window,
        }
    }

    pub fn set(&mut self, resource: ResourceKind, distribution: DurationDistribution) {
        match resource {
            ResourceKind::Cashier => self.cashier = distribution,
            ResourceKind::Cook => self.cook = distribution,
            ResourceKind::Espresso => self.espresso = distribution,
            ResourceKind::Packer => self.packer = distribution,
            ResourceKind::PickupWindow => self.pickup_window = distribution,
        }
    }
}

/// When a drive-thru customer refuses to join the lane.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BalkRule {
    /// Balk when at least `max_waiting` customers are already waiting for the first stage.
    QueueLength { max_waiting: u32 },
    /// Balk when the expected wait for the first stage exceeds `max_minutes`.
    EstimatedWait { max_minutes: f64 },
}

impl Default for BalkRule {
    fn default() -> Self {
        BalkRule::QueueLength { max_waiting: 12 }
    }
}

/// One row of the order-value table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MenuItem {
    pub name: String,
    pub price: f64,
    pub material_cost: f64,
    /// Relative popularity.
    pub weight: f64,
    /// Preparation resources the item needs beyond the channel's route.
    #[serde(default)]
    pub requires: Vec<ResourceKind>,
    /// Portions drawn from the coffee urns.
    #[serde(default)]
    pub coffee_portions: u32,
}

impl MenuItem {
    pub fn new(name: &str, price: f64, material_cost: f64, weight: f64) -> Self {
        Self {
            name: name.to_string(),
            price,
            material_cost,
            weight,
            requires: Vec::new(),
            coffee_portions: 0,
        }
    }

    pub fn requiring(mut self, resource: ResourceKind) -> Self {
        self.requires.push(resource);
        self
    }

    pub fn with_coffee(mut self, portions: u32) -> Self {
        self.coffee_portions = portions;
        self
    }
}

fn default_menu() -> Vec<MenuItem> {
    vec![
        MenuItem::new("drip coffee", 2.25, 0.45, 5.0).with_coffee(1),
        MenuItem::new("latte", 4.75, 1.10, 3.0).requiring(ResourceKind::Espresso),
        MenuItem::new("breakfast sandwich", 5.50, 1.80, 3.0).requiring(ResourceKind::Cook),
        MenuItem::new("donut", 1.60, 0.35, 2.0),
    ]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemsPerOrder {
    pub min: u32,
    pub max: u32,
}

impl Default for ItemsPerOrder {
    fn default() -> Self {
        Self { min: 1, max: 3 }
    }
}

/// Money parameters used when summarising a day.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CostModel {
    pub hourly_wage: f64,
    /// Opportunity cost of a drive-thru car that drove away.
    pub balk_penalty: f64,
    /// Refund and goodwill cost of a cancelled mobile order.
    pub renege_penalty: f64,
    /// Cost of each item prepared for an order that was never collected.
    #[serde(default = "default_waste_penalty")]
    pub waste_penalty: f64,
}

impl Default for CostModel {
    fn default() -> Self {
        Self {
            hourly_wage: 16.50,
            balk_penalty: 5.00,
            renege_penalty: 12.00,
            waste_penalty: default_waste_penalty(),
        }
    }
}

/// Coffee urns. Urns start full; a brew refills one urn and starts only
/// when an order is waiting for coffee.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoffeeService {
    pub urns: u32,
    pub portions_per_urn: u32,
    pub brew_minutes: f64,
    /// Material cost of a portion discarded unsold.
    pub portion_cost: f64,
    /// Stage at which orders draw their coffee.
    pub pour_stage: ResourceKind,
}

impl Default for CoffeeService {
    fn default() -> Self {
        Self {
            urns: 2,
            portions_per_urn: 40,
            brew_minutes: 5.0,
            portion_cost: 0.45,
            pour_stage: ResourceKind::Packer,
        }
    }
}

impl CoffeeService {
    pub fn capacity_portions(&self) -> u32 {
        self.urns.saturating_mul(self.portions_per_urn)
    }
}

/// Last instant (ms) at which events are still processed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Resource)]
pub struct SimulationHorizonMs(pub u64);

/// Full configuration of one simulated day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Resource)]
#[serde(default)]
pub struct SimConfig {
    pub opening_minutes: f64,
    /// No arrivals are generated after this time.
    pub closing_minutes: f64,
    /// End of day: no event after this time is processed.
    pub horizon_minutes: f64,
    pub staffing: Staffing,
    pub walk_in: ChannelConfig,
    pub drive_thru: ChannelConfig,
    pub mobile: ChannelConfig,
    pub service: ServiceTimes,
    pub drive_thru_balk: BalkRule,
    pub mobile_patience: DurationDistribution,
    pub menu: Vec<MenuItem>,
    pub items_per_order: ItemsPerOrder,
    pub costs: CostModel,
    pub coffee: CoffeeService,
    /// Bagged orders that fit on the pickup shelf; packing waits for a slot.
    pub pickup_shelf_capacity: u32,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            opening_minutes: 0.0,
            closing_minutes: DEFAULT_CLOSING_MINUTES,
            horizon_minutes: DEFAULT_CLOSING_MINUTES + DEFAULT_CLEANUP_MINUTES,
            staffing: Staffing::default(),
            walk_in: ChannelConfig::counter(ArrivalProcess::poisson(30.0)),
            drive_thru: ChannelConfig::lane(ArrivalProcess::poisson(20.0)),
            mobile: ChannelConfig::app(ArrivalProcess::poisson(20.0)),
            service: ServiceTimes::default(),
            drive_thru_balk: BalkRule::default(),
            mobile_patience: DurationDistribution::fixed(15.0),
            menu: default_menu(),
            items_per_order: ItemsPerOrder::default(),
            costs: CostModel::default(),
            coffee: CoffeeService::default(),
            pickup_shelf_capacity: DEFAULT_SHELF_CAPACITY,
        }
    }
}

impl SimConfig {
    pub fn channel(&self, channel: Channel) -> &ChannelConfig {
        match channel {
            Channel::WalkIn => &self.walk_in,
            Channel::DriveThru => &self.drive_thru,
            Channel::Mobile => &self.mobile,
        }
    }

    pub fn channel_mut(&mut self, channel: Channel) -> &mut ChannelConfig {
        match channel {
            Channel::WalkIn => &mut self.walk_in,
            Channel::DriveThru => &mut self.drive_thru,
            Channel::Mobile => &mut self.mobile,
        }
    }

    /// Open hours, used for labor cost and utilization.
    pub fn open_hours(&self) -> f64 {
        (self.closing_minutes - self.opening_minutes).max(0.0) / 60.0
    }

    pub fn with_staffing(mut self, staffing: Staffing) -> Self {
        self.staffing = staffing;
        self
    }

    /// Set opening and closing time (minutes); the horizon keeps its cleanup margin.
    pub fn with_hours(mut self, opening_minutes: f64, closing_minutes: f64) -> Self {
        let cleanup = self.horizon_minutes - self.closing_minutes;
        self.opening_minutes = opening_minutes;
        self.closing_minutes = closing_minutes;
        self.horizon_minutes = closing_minutes + cleanup.max(0.0);
        self
    }

    pub fn with_horizon(mut self, horizon_minutes: f64) -> Self {
        self.horizon_minutes = horizon_minutes;
        self
    }

    pub fn with_arrivals(mut self, channel: Channel, arrivals: ArrivalProcess) -> Self {
        self.channel_mut(channel).arrivals = arrivals;
        self
    }

    /// Replace a channel's fixed route stages.
    pub fn with_route(
        mut self,
        channel: Channel,
        entry_stage: Option<ResourceKind>,
        exit_stage: Option<ResourceKind>,
    ) -> Self {
        let config = self.channel_mut(channel);
        config.entry_stage = entry_stage;
        config.exit_stage = exit_stage;
        self
    }

    pub fn with_pickup_stage(mut self, channel: Channel, stage: Option<ResourceKind>) -> Self {
        self.channel_mut(channel).pickup_stage = stage;
        self
    }

    pub fn with_pickup_lag(mut self, channel: Channel, lag: DurationDistribution) -> Self {
        self.channel_mut(channel).pickup_lag = lag;
        self
    }

    pub fn with_service(mut self, resource: ResourceKind, distribution: DurationDistribution) -> Self {
        self.service.set(resource, distribution);
        self
    }

    pub fn with_balk_rule(mut self, rule: BalkRule) -> Self {
        self.drive_thru_balk = rule;
        self
    }

    pub fn with_mobile_patience(mut self, patience: DurationDistribution) -> Self {
        self.mobile_patience = patience;
        self
    }

    pub fn with_menu(mut self, menu: Vec<MenuItem>) -> Self {
        self.menu = menu;
        self
    }

    pub fn with_items_per_order(mut self, min: u32, max: u32) -> Self {
        self.items_per_order = ItemsPerOrder { min, max };
        self
    }

    pub fn with_costs(mut self, costs: CostModel) -> Self {
        self.costs = costs;
        self
    }

    pub fn with_coffee(mut self, coffee: CoffeeService) -> Self {
        self.coffee = coffee;
        self
    }

    pub fn with_shelf_capacity(mut self, capacity: u32) -> Self {
        self.pickup_shelf_capacity = capacity;
        self
    }

    /// Checks every parameter the simulation depends on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for resource in ResourceKind::ALL {
            let capacity = self.staffing.capacity(resource);
            if capacity < 1 {
                return Err(ConfigError::InvalidCapacity { resource, capacity });
            }
        }

        let times = [self.opening_minutes, self.closing_minutes, self.horizon_minutes];
        if times.iter().any(|t| !(t.is_finite() && *t >= 0.0)) {
            return Err(ConfigError::InvalidHorizon(
                "times must be finite and >= 0".to_string(),
            ));
        }
        if self.horizon_minutes <= self.opening_minutes {
            return Err(ConfigError::InvalidHorizon(format!(
                "horizon {} must be after opening {}",
                self.horizon_minutes, self.opening_minutes
            )));
        }
        if self.closing_minutes <= self.opening_minutes {
            return Err(ConfigError::InvalidHorizon(format!(
                "closing {} must be after opening {}",
                self.closing_minutes, self.opening_minutes
            )));
        }
        if self.horizon_minutes < self.closing_minutes {
            return Err(ConfigError::InvalidHorizon(format!(
                "horizon {} must not precede closing {}",
                self.horizon_minutes, self.closing_minutes
            )));
        }

        for channel in Channel::ALL {
            let config = self.channel(channel);
            config.arrivals.validate(channel)?;
            config
                .pickup_lag
                .validate(&format!("{channel:?} pickup lag"))?;
        }
        for resource in ResourceKind::ALL {
            self.service
                .get(resource)
                .validate(&format!("{resource:?} service time"))?;
        }
        self.mobile_patience.validate("mobile patience")?;

        if let BalkRule::EstimatedWait { max_minutes } = self.drive_thru_balk {
            if !(max_minutes.is_finite() && max_minutes >= 0.0) {
                return Err(ConfigError::InvalidBalkRule(
                    "estimated-wait limit must be finite and >= 0".to_string(),
                ));
            }
        }

        if self.menu.is_empty() {
            return Err(ConfigError::InvalidMenu("menu is empty".to_string()));
        }
        for item in &self.menu {
            let money_ok = |x: f64| x.is_finite() && x >= 0.0;
            if !money_ok(item.price) || !money_ok(item.material_cost) || !money_ok(item.weight) {
                return Err(ConfigError::InvalidMenu(format!(
                    "item '{}' has a negative or non-finite price, cost or weight",
                    item.name
                )));
            }
        }
        if self.menu.iter().all(|item| item.weight == 0.0) {
            return Err(ConfigError::InvalidMenu("all item weights are zero".to_string()));
        }
        let ItemsPerOrder { min, max } = self.items_per_order;
        if min < 1 || min > max {
            return Err(ConfigError::InvalidMenu(format!(
                "items per order must satisfy 1 <= min <= max, got {min}..={max}"
            )));
        }
        self.validate_equipment()
    }

    fn validate_equipment(&self) -> Result<(), ConfigError> {
        let coffee = &self.coffee;
        if coffee.urns < 1 || coffee.portions_per_urn < 1 {
            return Err(ConfigError::InvalidEquipment(format!(
                "need at least one urn of at least one portion, got {} x {}",
                coffee.urns, coffee.portions_per_urn
            )));
        }
        if !(coffee.brew_minutes.is_finite() && coffee.brew_minutes >= 0.0) {
            return Err(ConfigError::InvalidEquipment(
                "brew time must be finite and >= 0".to_string(),
            ));
        }
        if !(coffee.portion_cost.is_finite() && coffee.portion_cost >= 0.0) {
            return Err(ConfigError::InvalidEquipment(
                "coffee portion cost must be finite and >= 0".to_string(),
            ));
        }
        let largest_pour = self
            .menu
            .iter()
            .map(|item| item.coffee_portions)
            .max()
            .unwrap_or(0)
            .saturating_mul(self.items_per_order.max);
        if largest_pour > coffee.capacity_portions() {
            return Err(ConfigError::InvalidEquipment(format!(
                "an order can need {largest_pour} coffee portions but the urns hold {}",
                coffee.capacity_portions()
            )));
        }
        if self.pickup_shelf_capacity < 1 {
            return Err(ConfigError::InvalidEquipment(
                "pickup shelf must hold at least one order".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        SimConfig::default().validate().expect("defaults validate");
    }

    #[test]
    fn zero_capacity_is_rejected() {
        let config = SimConfig::default().with_staffing(Staffing {
            cooks: 0,
            ..Staffing::default()
        });
        assert_eq!(
            config.validate(),
            Err(ConfigError::InvalidCapacity {
                resource: ResourceKind::Cook,
                capacity: 0
            })
        );
    }

    #[test]
    fn horizon_must_follow_opening() {
        let config = SimConfig::default().with_hours(60.0, 120.0).with_horizon(60.0);
        assert!(matches!(config.validate(), Err(ConfigError::InvalidHorizon(_))));

        let config = SimConfig::default().with_hours(60.0, 60.0);
        assert!(matches!(config.validate(), Err(ConfigError::InvalidHorizon(_))));
    }

    #[test]
    fn malformed_arrival_and_service_parameters_are_rejected() {
        let config = SimConfig::default().with_arrivals(Channel::Mobile, ArrivalProcess::poisson(-1.0));
        assert!(matches!(
            config.validate(),
            Err(ConfigError::MalformedDistribution { .. })
        ));

        let config = SimConfig::default()
            .with_arrivals(Channel::WalkIn, ArrivalProcess::scripted(vec![5.0, 1.0]));
        assert!(config.validate().is_err());

        let config = SimConfig::default()
            .with_service(ResourceKind::Packer, DurationDistribution::exponential(-2.0));
        assert!(config.validate().is_err());
    }

    #[test]
    fn sub_millisecond_fixed_interval_is_rejected() {
        let config = SimConfig::default()
            .with_arrivals(Channel::WalkIn, ArrivalProcess::Fixed { every_minutes: 1e-6 });
        assert!(matches!(
            config.validate(),
            Err(ConfigError::MalformedDistribution { .. })
        ));

        let config = SimConfig::default()
            .with_arrivals(Channel::WalkIn, ArrivalProcess::Fixed { every_minutes: 0.001 });
        config.validate().expect("a 60 ms interval is valid");
    }

    #[test]
    fn menu_problems_are_rejected() {
        assert!(SimConfig::default().with_menu(vec![]).validate().is_err());
        let zero = vec![MenuItem::new("water", 0.0, 0.0, 0.0)];
        assert!(SimConfig::default().with_menu(zero).validate().is_err());
        assert!(SimConfig::default()
            .with_items_per_order(2, 1)
            .validate()
            .is_err());
    }

    #[test]
    fn with_hours_keeps_cleanup_margin() {
        let config = SimConfig::default().with_hours(360.0, 600.0);
        assert_eq!(config.horizon_minutes, 660.0);
        assert_eq!(config.open_hours(), 4.0);
    }

    #[test]
    fn staff_count_excludes_machines() {
        let staffing = Staffing {
            cashiers: 2,
            cooks: 3,
            espresso_machines: 4,
            packers: 1,
            pickup_windows: 1,
        };
        assert_eq!(staffing.staff_count(), 7);
    }

    #[test]
    fn config_deserializes_with_defaults() {
        let json = r#"{
            "staffing": { "cashiers": 2, "cooks": 4, "espresso_machines": 1, "packers": 2 },
            "drive_thru_balk": { "kind": "queue_length", "max_waiting": 3 },
            "mobile_patience": { "kind": "exponential", "mean_minutes": 10.0 }
        }"#;
        let config: SimConfig = serde_json::from_str(json).expect("config parses");
        assert_eq!(config.staffing.cashiers, 2);
        assert_eq!(config.drive_thru_balk, BalkRule::QueueLength { max_waiting: 3 });
        assert_eq!(config.closing_minutes, DEFAULT_CLOSING_MINUTES);
        assert_eq!(config.staffing.pickup_windows, 1);
        assert_eq!(config.coffee, CoffeeService::default());
        config.validate().expect("valid");
    }

    #[test]
    fn drive_thru_lane_ends_at_the_pickup_window() {
        let config = SimConfig::default();
        assert_eq!(
            config.drive_thru.pickup_stage,
            Some(ResourceKind::PickupWindow)
        );
        assert_eq!(config.walk_in.pickup_stage, None);
        assert_eq!(config.walk_in.pickup_lag, DurationDistribution::fixed(0.0));
        assert_eq!(config.mobile.pickup_lag.mean_minutes(), 5.0);
    }

    #[test]
    fn equipment_problems_are_rejected() {
        let no_urns = SimConfig::default().with_coffee(CoffeeService {
            urns: 0,
            ..CoffeeService::default()
        });
        assert!(matches!(
            no_urns.validate(),
            Err(ConfigError::InvalidEquipment(_))
        ));

        let tiny_urn = SimConfig::default()
            .with_coffee(CoffeeService {
                urns: 1,
                portions_per_urn: 2,
                ..CoffeeService::default()
            })
            .with_items_per_order(1, 3);
        assert!(matches!(
            tiny_urn.validate(),
            Err(ConfigError::InvalidEquipment(_))
        ));

        let no_shelf = SimConfig::default().with_shelf_capacity(0);
        assert!(no_shelf.validate().is_err());

        let bad_lag = SimConfig::default()
            .with_pickup_lag(Channel::Mobile, DurationDistribution::fixed(-1.0));
        assert!(matches!(
            bad_lag.validate(),
            Err(ConfigError::MalformedDistribution { .. })
        ));
    }
}
