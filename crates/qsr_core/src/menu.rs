//! Order composition: weighted draws from the menu and the stage route an
//! order takes through the kitchen.

use std::collections::BTreeSet;

use bevy_ecs::prelude::Resource;
use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;

use crate::ecs::{Order, ResourceKind};
use crate::error::ConfigError;
use crate::scenario::{ChannelConfig, ItemsPerOrder, MenuItem};

/// An order together with the preparation resources its items need.
#[derive(Debug, Clone, PartialEq)]
pub struct SampledOrder {
    pub order: Order,
    pub requires: BTreeSet<ResourceKind>,
}

#[derive(Debug, Clone, Resource)]
pub struct Menu {
    items: Vec<MenuItem>,
    popularity: WeightedIndex<f64>,
    items_per_order: ItemsPerOrder,
}

impl Menu {
    pub fn new(items: Vec<MenuItem>, items_per_order: ItemsPerOrder) -> Result<Self, ConfigError> {
        let popularity = WeightedIndex::new(items.iter().map(|item| item.weight))
            .map_err(|err| ConfigError::InvalidMenu(err.to_string()))?;
        if items_per_order.min < 1 || items_per_order.min > items_per_order.max {
            return Err(ConfigError::InvalidMenu(format!(
                "items per order {}..={} is empty",
                items_per_order.min, items_per_order.max
            )));
        }
        Ok(Self {
            items,
            popularity,
            items_per_order,
        })
    }

    pub fn items(&self) -> &[MenuItem] {
        &self.items
    }

    /// Average order value, used for reporting.
    pub fn expected_order_value(&self) -> f64 {
        let total_weight: f64 = self.items.iter().map(|item| item.weight).sum();
        let mean_price = self
            .items
            .iter()
            .map(|item| item.price * item.weight / total_weight)
            .sum::<f64>();
        let ItemsPerOrder { min, max } = self.items_per_order;
        mean_price * f64::from(min + max) / 2.0
    }

    pub fn sample_order<R: Rng + ?Sized>(&self, rng: &mut R) -> SampledOrder {
        let ItemsPerOrder { min, max } = self.items_per_order;
        let count = rng.gen_range(min..=max);

        let mut order = Order {
            items: Vec::with_capacity(count as usize),
            value: 0.0,
            material_cost: 0.0,
            coffee_portions: 0,
        };
        let mut requires = BTreeSet::new();
        for _ in 0..count {
            let item = &self.items[self.popularity.sample(rng)];
            order.items.push(item.name.clone());
            order.value += item.price;
            order.material_cost += item.material_cost;
            order.coffee_portions += item.coffee_portions;
            requires.extend(item.requires.iter().copied());
        }
        SampledOrder { order, requires }
    }
}

/// Stages a customer visits: the channel's entry stage, then every required
/// preparation resource in canonical order, then the channel's exit and
/// pickup stages. A resource appears at most once.
pub fn stage_route(channel: &ChannelConfig, requires: &BTreeSet<ResourceKind>) -> Vec<ResourceKind> {
    let fixed = [channel.entry_stage, channel.exit_stage, channel.pickup_stage];
    let mut route = Vec::with_capacity(requires.len() + fixed.len());
    route.extend(channel.entry_stage);
    for &resource in requires {
        if !fixed.contains(&Some(resource)) {
            route.push(resource);
        }
    }
    for stage in [channel.exit_stage, channel.pickup_stage].into_iter().flatten() {
        if !route.contains(&stage) {
            route.push(stage);
        }
    }
    route
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenario::ArrivalProcess;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn menu() -> Menu {
        Menu::new(
            vec![
                MenuItem::new("drip coffee", 2.0, 0.5, 1.0),
                MenuItem::new("latte", 5.0, 1.0, 1.0).requiring(ResourceKind::Espresso),
                MenuItem::new("wrap", 7.0, 2.0, 1.0).requiring(ResourceKind::Cook),
            ],
            ItemsPerOrder { min: 1, max: 3 },
        )
        .expect("valid menu")
    }

    #[test]
    fn order_value_is_sum_of_item_prices() {
        let menu = menu();
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..200 {
            let sampled = menu.sample_order(&mut rng);
            let expected: f64 = sampled
                .order
                .items
                .iter()
                .map(|name| menu.items().iter().find(|i| &i.name == name).unwrap().price)
                .sum();
            assert!((sampled.order.value - expected).abs() < 1e-9);
            assert!((1..=3).contains(&sampled.order.items.len()));
        }
    }

    #[test]
    fn coffee_portions_add_up_per_item() {
        let menu = Menu::new(
            vec![MenuItem::new("drip coffee", 2.0, 0.5, 1.0).with_coffee(1)],
            ItemsPerOrder { min: 3, max: 3 },
        )
        .unwrap();
        let sampled = menu.sample_order(&mut StdRng::seed_from_u64(2));
        assert_eq!(sampled.order.coffee_portions, 3);
        assert!(sampled.requires.is_empty());
    }

    #[test]
    fn zero_weight_items_are_never_ordered() {
        let menu = Menu::new(
            vec![
                MenuItem::new("donut", 1.5, 0.3, 1.0),
                MenuItem::new("seasonal special", 9.0, 3.0, 0.0),
            ],
            ItemsPerOrder { min: 2, max: 2 },
        )
        .unwrap();
        let mut rng = StdRng::seed_from_u64(5);
        for _ in 0..100 {
            let sampled = menu.sample_order(&mut rng);
            assert!(sampled.order.items.iter().all(|name| name == "donut"));
            assert!(sampled.requires.is_empty());
        }
    }

    #[test]
    fn all_zero_weights_are_rejected() {
        let err = Menu::new(
            vec![MenuItem::new("water", 0.0, 0.0, 0.0)],
            ItemsPerOrder::default(),
        )
        .expect_err("no positive weight");
        assert!(matches!(err, ConfigError::InvalidMenu(_)));
    }

    #[test]
    fn route_follows_canonical_order() {
        let counter = ChannelConfig::counter(ArrivalProcess::Off);
        let requires = BTreeSet::from([ResourceKind::Espresso, ResourceKind::Cook]);
        assert_eq!(
            stage_route(&counter, &requires),
            vec![
                ResourceKind::Cashier,
                ResourceKind::Cook,
                ResourceKind::Espresso,
                ResourceKind::Packer
            ]
        );

        let lane = ChannelConfig::lane(ArrivalProcess::Off);
        assert_eq!(
            stage_route(&lane, &BTreeSet::from([ResourceKind::Espresso])),
            vec![
                ResourceKind::Cashier,
                ResourceKind::Espresso,
                ResourceKind::Packer,
                ResourceKind::PickupWindow
            ]
        );

        let app = ChannelConfig::app(ArrivalProcess::Off);
        assert_eq!(
            stage_route(&app, &BTreeSet::new()),
            vec![ResourceKind::Packer]
        );
    }

    #[test]
    fn route_without_fixed_stages_can_be_empty() {
        let bare = ChannelConfig {
            arrivals: ArrivalProcess::Off,
            entry_stage: None,
            exit_stage: None,
            pickup_stage: None,
            pickup_lag: crate::distributions::DurationDistribution::fixed(0.0),
        };
        assert!(stage_route(&bare, &BTreeSet::new()).is_empty());
        assert_eq!(
            stage_route(&bare, &BTreeSet::from([ResourceKind::Cook])),
            vec![ResourceKind::Cook]
        );
    }
}
