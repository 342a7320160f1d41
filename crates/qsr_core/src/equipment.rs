//! Shared equipment that gates stages: the coffee urns and the pickup shelf.
//!
//! Neither is a server pool. The urns hold a stock of portions refilled in
//! batches; the shelf holds bagged orders until their customers collect them.
//! A customer blocked by either waits in its FIFO queue and re-requests the
//! stage once unblocked.

use std::collections::VecDeque;

use bevy_ecs::prelude::{Entity, Resource};
use serde::Serialize;

use crate::clock::minutes_to_ms;
use crate::ecs::ResourceKind;
use crate::error::{SimError, SimResult};
use crate::pools::Acquire;
use crate::scenario::CoffeeService;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct UrnStats {
    pub brews: u32,
    pub portions_poured: u64,
    /// Portions poured for orders that were then cancelled.
    pub portions_discarded: u64,
    /// Portions still in the urns when the run ended.
    pub portions_left: u32,
    pub peak_waiting: usize,
}

#[derive(Debug, Clone, Resource)]
pub struct CoffeeUrns {
    capacity: u32,
    batch: u32,
    brew_ms: u64,
    pour_stage: ResourceKind,
    portions: u32,
    brewing: bool,
    waiting: VecDeque<(Entity, u32)>,
    stats: UrnStats,
}

impl CoffeeUrns {
    /// Urns filled to capacity.
    pub fn new(service: &CoffeeService) -> Self {
        let capacity = service.capacity_portions();
        Self {
            capacity,
            batch: service.portions_per_urn,
            brew_ms: minutes_to_ms(service.brew_minutes),
            pour_stage: service.pour_stage,
            portions: capacity,
            brewing: false,
            waiting: VecDeque::new(),
            stats: UrnStats::default(),
        }
    }

    pub fn pour_stage(&self) -> ResourceKind {
        self.pour_stage
    }

    pub fn portions(&self) -> u32 {
        self.portions
    }

    pub fn is_brewing(&self) -> bool {
        self.brewing
    }

    pub fn waiting_len(&self) -> usize {
        self.waiting.len()
    }

    pub fn is_waiting(&self, customer: Entity) -> bool {
        self.waiting.iter().any(|&(waiting, _)| waiting == customer)
    }

    /// Pours `portions` at once if the urns hold enough and nobody is queued
    /// ahead; otherwise the customer waits for a brew.
    pub fn try_pour(&mut self, customer: Entity, portions: u32) -> Acquire {
        if self.waiting.is_empty() && portions <= self.portions {
            self.pour(portions);
            return Acquire::Granted;
        }
        self.waiting.push_back((customer, portions));
        self.stats.peak_waiting = self.stats.peak_waiting.max(self.waiting.len());
        Acquire::Queued
    }

    /// Starts a brew if customers are waiting and none is running. Returns
    /// the instant the brew completes.
    pub fn start_brew_if_needed(&mut self, now: u64) -> Option<u64> {
        if self.brewing || self.waiting.is_empty() {
            return None;
        }
        self.brewing = true;
        Some(now.saturating_add(self.brew_ms))
    }

    /// Refills one urn and pours for waiters in FIFO order while the stock
    /// lasts. Returns the customers served.
    pub fn finish_brew(&mut self) -> SimResult<Vec<Entity>> {
        if !self.brewing {
            return Err(SimError::invariant("coffee brew completed while none was running"));
        }
        self.brewing = false;
        self.stats.brews += 1;
        self.portions = self.portions.saturating_add(self.batch).min(self.capacity);

        let mut served = Vec::new();
        while let Some(&(customer, portions)) = self.waiting.front() {
            if portions > self.portions {
                break;
            }
            self.waiting.pop_front();
            self.pour(portions);
            served.push(customer);
        }
        Ok(served)
    }

    /// Removes a waiting customer (reneging). Returns whether it was queued here.
    pub fn withdraw(&mut self, customer: Entity) -> bool {
        match self.waiting.iter().position(|&(waiting, _)| waiting == customer) {
            Some(index) => {
                self.waiting.remove(index);
                true
            }
            None => false,
        }
    }

    /// Portions already poured for an order that was cancelled.
    pub fn discard(&mut self, portions: u32) {
        self.stats.portions_discarded += u64::from(portions);
    }

    pub fn stats(&self) -> UrnStats {
        UrnStats {
            portions_left: self.portions,
            ..self.stats
        }
    }

    fn pour(&mut self, portions: u32) {
        self.portions -= portions;
        self.stats.portions_poured += u64::from(portions);
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ShelfStats {
    pub capacity: u32,
    pub peak_occupied: u32,
    /// Orders that had to wait for a free slot before packing.
    pub blocked_orders: u64,
}

/// Pass-through shelf between the packers and the customers. A slot is
/// reserved before packing starts and freed when the customer collects the
/// order, so packing stalls while the shelf is full.
#[derive(Debug, Clone, Resource)]
pub struct PickupShelf {
    capacity: u32,
    occupied: u32,
    waiting: VecDeque<Entity>,
    peak_occupied: u32,
    blocked_orders: u64,
}

impl PickupShelf {
    pub fn new(capacity: u32) -> Self {
        Self {
            capacity,
            occupied: 0,
            waiting: VecDeque::new(),
            peak_occupied: 0,
            blocked_orders: 0,
        }
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    pub fn occupied(&self) -> u32 {
        self.occupied
    }

    pub fn waiting_len(&self) -> usize {
        self.waiting.len()
    }

    pub fn is_waiting(&self, customer: Entity) -> bool {
        self.waiting.contains(&customer)
    }

    pub fn try_reserve(&mut self, customer: Entity) -> Acquire {
        if self.occupied < self.capacity {
            self.occupied += 1;
            self.peak_occupied = self.peak_occupied.max(self.occupied);
            Acquire::Granted
        } else {
            self.waiting.push_back(customer);
            self.blocked_orders += 1;
            Acquire::Queued
        }
    }

    /// Frees a slot. A waiting customer takes it over at once and is returned.
    pub fn release(&mut self) -> SimResult<Option<Entity>> {
        if self.occupied == 0 {
            return Err(SimError::invariant("pickup shelf released while empty"));
        }
        if let Some(next) = self.waiting.pop_front() {
            return Ok(Some(next));
        }
        self.occupied -= 1;
        Ok(None)
    }

    pub fn withdraw(&mut self, customer: Entity) -> bool {
        match self.waiting.iter().position(|&waiting| waiting == customer) {
            Some(index) => {
                self.waiting.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn stats(&self) -> ShelfStats {
        ShelfStats {
            capacity: self.capacity,
            peak_occupied: self.peak_occupied,
            blocked_orders: self.blocked_orders,
        }
    }
}
