use bevy_ecs::prelude::Component;
use serde::{Deserialize, Serialize};

use crate::scenario::BalkRule;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Channel {
    WalkIn,
    DriveThru,
    Mobile,
}

impl Channel {
    pub const ALL: [Channel; 3] = [Channel::WalkIn, Channel::DriveThru, Channel::Mobile];

    pub fn index(self) -> usize {
        match self {
            Channel::WalkIn => 0,
            Channel::DriveThru => 1,
            Channel::Mobile => 2,
        }
    }
}

/// Typed server pools. Declaration order is the canonical stage order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ResourceKind {
    Cashier,
    Cook,
    Espresso,
    Packer,
    /// Drive-thru hand-over window.
    PickupWindow,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 5] = [
        ResourceKind::Cashier,
        ResourceKind::Cook,
        ResourceKind::Espresso,
        ResourceKind::Packer,
        ResourceKind::PickupWindow,
    ];

    pub fn index(self) -> usize {
        match self {
            ResourceKind::Cashier => 0,
            ResourceKind::Cook => 1,
            ResourceKind::Espresso => 2,
            ResourceKind::Packer => 3,
            ResourceKind::PickupWindow => 4,
        }
    }

    /// Whether the pool is staffed by paid labor (machines are not).
    pub fn is_staffed(self) -> bool {
        !matches!(self, ResourceKind::Espresso)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Outcome {
    Completed,
    Balked,
    Reneged,
}

/// Abandonment capability carried by each customer, evaluated at fixed checkpoints:
/// balking once at arrival, reneging when the patience timer fires.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AbandonmentPolicy {
    Never,
    Balk(BalkRule),
    Renege { patience_ms: u64 },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Order {
    /// Menu item names, in the order they were drawn.
    pub items: Vec<String>,
    pub value: f64,
    pub material_cost: f64,
    /// Urn coffee portions the order needs.
    pub coffee_portions: u32,
}

/// One resource-holding interval of a customer's pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StageHold {
    pub resource: ResourceKind,
    pub started_at: u64,
    pub duration_ms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CustomerState {
    /// Waiting for (or about to request) a unit of `ResourceKind`.
    Queued(ResourceKind),
    InService(ResourceKind),
    /// All stages done; the Departure event is pending.
    Departing,
    /// Already recorded; kept only until its outstanding renege timer fires.
    Terminal(Outcome),
}

#[derive(Debug, Clone, Component)]
pub struct Customer {
    pub id: u64,
    pub channel: Channel,
    pub arrival_time: u64,
    pub order: Order,
    pub stages: Vec<ResourceKind>,
    pub next_stage: usize,
    pub state: CustomerState,
    pub policy: AbandonmentPolicy,
    /// Set while a renege timer is scheduled and has not fired yet.
    pub renege_timer_pending: bool,
    /// Time the customer started waiting for the current stage.
    pub queued_since: u64,
    pub wait_ms: u64,
    pub holds: Vec<StageHold>,
    pub coffee_poured: bool,
    /// Holds a pickup-shelf slot, reserved before packing and freed on departure.
    pub shelf_slot: bool,
    /// Time between the last stage and departure.
    pub pickup_ms: u64,
}

impl Customer {
    pub fn new(
        id: u64,
        channel: Channel,
        arrival_time: u64,
        order: Order,
        stages: Vec<ResourceKind>,
        policy: AbandonmentPolicy,
    ) -> Self {
        let state = match stages.first() {
            Some(&first) => CustomerState::Queued(first),
            None => CustomerState::Departing,
        };
        Self {
            id,
            channel,
            arrival_time,
            order,
            stages,
            next_stage: 0,
            state,
            policy,
            renege_timer_pending: false,
            queued_since: arrival_time,
            wait_ms: 0,
            holds: Vec::new(),
            coffee_poured: false,
            shelf_slot: false,
            pickup_ms: 0,
        }
    }

    pub fn current_stage(&self) -> Option<ResourceKind> {
        self.stages.get(self.next_stage).copied()
    }

    /// True once the first stage has been granted a resource.
    pub fn has_started_service(&self) -> bool {
        !self.holds.is_empty()
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.state, CustomerState::Terminal(_))
    }

    pub fn total_hold_ms(&self) -> u64 {
        self.holds.iter().map(|hold| hold.duration_ms).sum()
    }

    /// Whether the order's coffee is still to be poured on entering
    /// `resource`: at `pour_stage` when the route visits it, otherwise at the
    /// route's last stage.
    pub fn pours_coffee_at(&self, resource: ResourceKind, pour_stage: ResourceKind) -> bool {
        if self.order.coffee_portions == 0 || self.coffee_poured {
            return false;
        }
        if self.stages.contains(&pour_stage) {
            resource == pour_stage
        } else {
            self.stages.last() == Some(&resource)
        }
    }
}
