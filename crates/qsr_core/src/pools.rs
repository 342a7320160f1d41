//! Fixed-capacity typed server pools with FIFO wait queues.
//!
//! Capacity is handed from a releasing customer to the head waiter inside the
//! same call, so a pool is never idle while its queue is non-empty.

use std::collections::VecDeque;

use bevy_ecs::prelude::{Entity, Resource};
use serde::Serialize;

use crate::ecs::ResourceKind;
use crate::error::{SimError, SimResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Acquire {
    Granted,
    Queued,
}

#[derive(Debug, Clone)]
pub struct ResourcePool {
    kind: ResourceKind,
    capacity: u32,
    busy: u32,
    waiting: VecDeque<Entity>,
    peak_busy: u32,
    busy_since: u64,
    busy_ms: u64,
}

impl ResourcePool {
    pub fn new(kind: ResourceKind, capacity: u32) -> Self {
        Self {
            kind,
            capacity,
            busy: 0,
            waiting: VecDeque::new(),
            peak_busy: 0,
            busy_since: 0,
            busy_ms: 0,
        }
    }

    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    pub fn busy(&self) -> u32 {
        self.busy
    }

    pub fn waiting_len(&self) -> usize {
        self.waiting.len()
    }

    pub fn is_waiting(&self, customer: Entity) -> bool {
        self.waiting.contains(&customer)
    }

    /// Grants a unit immediately if one is free, otherwise appends the
    /// customer to the FIFO queue.
    pub fn try_acquire(&mut self, customer: Entity, now: u64) -> SimResult<Acquire> {
        if self.busy < self.capacity {
            self.accumulate(now);
            self.busy += 1;
            self.peak_busy = self.peak_busy.max(self.busy);
            Ok(Acquire::Granted)
        } else {
            self.waiting.push_back(customer);
            Ok(Acquire::Queued)
        }
    }

    /// Frees one unit. If a customer is waiting, the unit passes straight to
    /// them and their entity is returned; the busy count is unchanged.
    /// Fails if the pool is idle or holds more units than its capacity.
    pub fn release(&mut self, now: u64) -> SimResult<Option<Entity>> {
        if self.busy == 0 {
            return Err(SimError::invariant(format!(
                "{:?} pool released while idle",
                self.kind
            )));
        }
        self.check_capacity()?;
        if let Some(next) = self.waiting.pop_front() {
            return Ok(Some(next));
        }
        self.accumulate(now);
        self.busy -= 1;
        Ok(None)
    }

    /// Removes a waiting customer (reneging). Returns whether it was queued here.
    pub fn withdraw(&mut self, customer: Entity) -> bool {
        match self.waiting.iter().position(|&waiting| waiting == customer) {
            Some(index) => {
                self.waiting.remove(index);
                true
            }
            None => false,
        }
    }

    /// Busy unit-milliseconds accumulated up to `now`.
    pub fn busy_ms_until(&self, now: u64) -> u64 {
        self.busy_ms + u64::from(self.busy) * now.saturating_sub(self.busy_since)
    }

    pub fn stats(&self, now: u64) -> PoolStats {
        PoolStats {
            resource: self.kind,
            capacity: self.capacity,
            peak_busy: self.peak_busy,
            busy_ms: self.busy_ms_until(now),
            still_waiting: self.waiting.len(),
        }
    }

    fn accumulate(&mut self, now: u64) {
        self.busy_ms = self.busy_ms_until(now);
        self.busy_since = now;
    }

    fn check_capacity(&self) -> SimResult<()> {
        if self.busy > self.capacity {
            return Err(SimError::invariant(format!(
                "{:?} busy count {} exceeds capacity {}",
                self.kind, self.busy, self.capacity
            )));
        }
        Ok(())
    }
}

/// Per-pool usage summary reported with the metrics stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PoolStats {
    pub resource: ResourceKind,
    pub capacity: u32,
    pub peak_busy: u32,
    pub busy_ms: u64,
    pub still_waiting: usize,
}

/// All pools of the run, indexed by [ResourceKind].
#[derive(Debug, Clone, Resource)]
pub struct ResourcePools {
    pools: [ResourcePool; ResourceKind::ALL.len()],
}

impl ResourcePools {
    pub fn new(capacity_of: impl Fn(ResourceKind) -> u32) -> Self {
        Self {
            pools: ResourceKind::ALL.map(|kind| ResourcePool::new(kind, capacity_of(kind))),
        }
    }

    pub fn get(&self, kind: ResourceKind) -> &ResourcePool {
        &self.pools[kind.index()]
    }

    pub fn get_mut(&mut self, kind: ResourceKind) -> &mut ResourcePool {
        &mut self.pools[kind.index()]
    }

    pub fn iter(&self) -> impl Iterator<Item = &ResourcePool> {
        self.pools.iter()
    }

    pub fn stats(&self, now: u64) -> Vec<PoolStats> {
        self.pools.iter().map(|pool| pool.stats(now)).collect()
    }
}
