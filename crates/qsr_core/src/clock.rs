use std::cmp::Ordering;
use std::collections::BinaryHeap;

use bevy_ecs::prelude::{Entity, Resource};

use crate::ecs::{Channel, ResourceKind};
use crate::error::ClockError;

pub const ONE_SEC_MS: u64 = 1000;
pub const ONE_MIN_MS: u64 = 60 * ONE_SEC_MS;

/// Converts a configured duration in minutes to simulation milliseconds.
/// Negative and non-finite inputs clamp to zero.
pub fn minutes_to_ms(minutes: f64) -> u64 {
    if !minutes.is_finite() || minutes <= 0.0 {
        return 0;
    }
    (minutes * ONE_MIN_MS as f64).round() as u64
}

pub fn ms_to_minutes(ms: u64) -> f64 {
    ms as f64 / ONE_MIN_MS as f64
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EventKind {
    Arrival,
    ServiceStart,
    ServiceComplete,
    Renege,
    Departure,
    /// A coffee brew finished; refill the urns.
    BrewComplete,
}

/// What an event refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventSubject {
    Channel(Channel),
    Customer(Entity),
    Stage(Entity, ResourceKind),
    CoffeeUrns,
}

impl EventSubject {
    pub fn customer(&self) -> Option<Entity> {
        match *self {
            EventSubject::Customer(entity) | EventSubject::Stage(entity, _) => Some(entity),
            EventSubject::Channel(_) | EventSubject::CoffeeUrns => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Event {
    pub timestamp: u64,
    /// Insertion order; the only tie-break for equal timestamps.
    pub sequence: u64,
    pub kind: EventKind,
    pub subject: EventSubject,
}

impl Ord for Event {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse ordering to make BinaryHeap a min-heap by (timestamp, sequence).
        other
            .timestamp
            .cmp(&self.timestamp)
            .then_with(|| other.sequence.cmp(&self.sequence))
    }
}

impl PartialOrd for Event {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// The event being dispatched in the current step.
#[derive(Debug, Clone, Copy, Resource)]
pub struct CurrentEvent(pub Event);

#[derive(Debug, Default, Resource)]
pub struct SimulationClock {
    now: u64,
    next_sequence: u64,
    events: BinaryHeap<Event>,
}

impl SimulationClock {
    /// A clock whose time starts at `start_ms` (the opening time).
    pub fn starting_at(start_ms: u64) -> Self {
        Self {
            now: start_ms,
            ..Default::default()
        }
    }

    pub fn now(&self) -> u64 {
        self.now
    }

    pub fn schedule(
        &mut self,
        timestamp: u64,
        kind: EventKind,
        subject: EventSubject,
    ) -> Result<(), ClockError> {
        if timestamp < self.now {
            return Err(ClockError::InvalidTime {
                requested: timestamp,
                now: self.now,
            });
        }
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        self.events.push(Event {
            timestamp,
            sequence,
            kind,
            subject,
        });
        Ok(())
    }

    pub fn schedule_in(
        &mut self,
        delay_ms: u64,
        kind: EventKind,
        subject: EventSubject,
    ) -> Result<(), ClockError> {
        self.schedule(self.now.saturating_add(delay_ms), kind, subject)
    }

    /// Removes the earliest event and advances the clock to it.
    /// `None` means the queue is empty.
    pub fn pop_next(&mut self) -> Option<Event> {
        let event = self.events.pop()?;
        self.now = event.timestamp;
        Some(event)
    }

    pub fn next_event_time(&self) -> Option<u64> {
        self.events.peek().map(|event| event.timestamp)
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }
}
