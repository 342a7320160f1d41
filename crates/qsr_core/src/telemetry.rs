//! Metrics sink: one immutable record per customer reaching a terminal outcome.

use std::collections::VecDeque;

use bevy_ecs::prelude::Resource;
use serde::Serialize;

use crate::clock::{Event, EventKind};
use crate::ecs::{Channel, Customer, Outcome, StageHold};

/// Number of recently processed events kept for invariant reports.
pub const EVENT_TRACE_LEN: usize = 32;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutcomeRecord {
    pub customer_id: u64,
    pub channel: Channel,
    pub outcome: Outcome,
    pub arrival_ms: u64,
    pub end_ms: u64,
    /// Total time spent waiting in pool and equipment queues.
    pub wait_ms: u64,
    /// Time between the last stage and collecting the order.
    pub pickup_ms: u64,
    pub revenue: f64,
    /// Order value that was not collected (balked or reneged).
    pub lost_revenue: f64,
    pub material_cost: f64,
    pub items: Vec<String>,
    pub holds: Vec<StageHold>,
}

impl OutcomeRecord {
    /// Record for a customer whose order was handed over.
    pub fn completed(customer: &Customer, end_ms: u64) -> Self {
        Self {
            customer_id: customer.id,
            channel: customer.channel,
            outcome: Outcome::Completed,
            arrival_ms: customer.arrival_time,
            end_ms,
            wait_ms: customer.wait_ms,
            pickup_ms: customer.pickup_ms,
            revenue: customer.order.value,
            lost_revenue: 0.0,
            material_cost: customer.order.material_cost,
            items: customer.order.items.clone(),
            holds: customer.holds.clone(),
        }
    }

    /// Record for a customer who abandoned before any stage began.
    pub fn abandoned(customer: &Customer, outcome: Outcome, end_ms: u64) -> Self {
        Self {
            customer_id: customer.id,
            channel: customer.channel,
            outcome,
            arrival_ms: customer.arrival_time,
            end_ms,
            wait_ms: customer.wait_ms,
            pickup_ms: 0,
            revenue: 0.0,
            lost_revenue: customer.order.value,
            material_cost: 0.0,
            items: customer.order.items.clone(),
            holds: Vec::new(),
        }
    }

    pub fn time_in_system(&self) -> u64 {
        self.end_ms.saturating_sub(self.arrival_ms)
    }

    pub fn total_hold_ms(&self) -> u64 {
        self.holds.iter().map(|hold| hold.duration_ms).sum()
    }
}

/// Consumer of terminal outcome records, called in emission order.
pub trait MetricsSink {
    fn record(&mut self, record: &OutcomeRecord);
}

impl MetricsSink for Vec<OutcomeRecord> {
    fn record(&mut self, record: &OutcomeRecord) {
        self.push(record.clone());
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct OutcomeCounts {
    pub completed: u64,
    pub balked: u64,
    pub reneged: u64,
}

impl OutcomeCounts {
    pub fn total(&self) -> u64 {
        self.completed + self.balked + self.reneged
    }

    fn bump(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Completed => self.completed = self.completed.saturating_add(1),
            Outcome::Balked => self.balked = self.balked.saturating_add(1),
            Outcome::Reneged => self.reneged = self.reneged.saturating_add(1),
        }
    }
}

/// In-world sink collecting every record of the run.
#[derive(Debug, Default, Resource)]
pub struct SimTelemetry {
    pub records: Vec<OutcomeRecord>,
    pub counts: OutcomeCounts,
    pub by_channel: [OutcomeCounts; 3],
}

impl SimTelemetry {
    pub fn channel_counts(&self, channel: Channel) -> OutcomeCounts {
        self.by_channel[channel.index()]
    }
}

impl MetricsSink for SimTelemetry {
    fn record(&mut self, record: &OutcomeRecord) {
        self.counts.bump(record.outcome);
        self.by_channel[record.channel.index()].bump(record.outcome);
        self.records.push(record.clone());
    }
}

/// Processed events per kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Resource)]
pub struct EventCounts {
    pub arrival: u64,
    pub service_start: u64,
    pub service_complete: u64,
    pub renege: u64,
    pub departure: u64,
    pub brew_complete: u64,
}

impl EventCounts {
    pub fn record(&mut self, kind: EventKind) {
        let slot = match kind {
            EventKind::Arrival => &mut self.arrival,
            EventKind::ServiceStart => &mut self.service_start,
            EventKind::ServiceComplete => &mut self.service_complete,
            EventKind::Renege => &mut self.renege,
            EventKind::Departure => &mut self.departure,
            EventKind::BrewComplete => &mut self.brew_complete,
        };
        *slot = slot.saturating_add(1);
    }

    pub fn total(&self) -> u64 {
        self.arrival
            + self.service_start
            + self.service_complete
            + self.renege
            + self.departure
            + self.brew_complete
    }
}

/// Ring buffer of the most recently processed events.
#[derive(Debug, Resource)]
pub struct EventTrace {
    events: VecDeque<Event>,
    capacity: usize,
}

impl Default for EventTrace {
    fn default() -> Self {
        Self::with_capacity(EVENT_TRACE_LEN)
    }
}

impl EventTrace {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            events: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, event: Event) {
        if self.capacity == 0 {
            return;
        }
        if self.events.len() == self.capacity {
            self.events.pop_front();
        }
        self.events.push_back(event);
    }

    /// Oldest first.
    pub fn snapshot(&self) -> Vec<Event> {
        self.events.iter().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
