//! Event handlers. Each system reacts to one [EventKind] and returns a
//! [SimResult]; the runner pipes every handler into [fault::capture_fault].

use bevy_ecs::prelude::{Entity, Query};
use log::trace;

use crate::clock::{EventKind, EventSubject, SimulationClock};
use crate::ecs::{Customer, CustomerState, ResourceKind, StageHold};
use crate::equipment::{CoffeeUrns, PickupShelf};
use crate::error::{SimError, SimResult};
use crate::pools::{Acquire, ResourcePools};
use crate::rng::RandomStreams;
use crate::scenario::{ServiceTimes, SimConfig};

pub mod arrival;
pub mod brew;
pub mod departure;
pub mod fault;
pub mod renege;
pub mod service_complete;
pub mod service_start;

/// Fails unless the customer can still take part in the pipeline.
pub(crate) fn ensure_live(customer: &Customer, kind: EventKind) -> SimResult<()> {
    if customer.is_terminal() {
        return Err(SimError::invariant(format!(
            "{kind:?} for customer {} which already ended as {:?}",
            customer.id, customer.state
        )));
    }
    Ok(())
}

pub(crate) fn unknown_customer(kind: EventKind, entity: Entity) -> SimError {
    SimError::invariant(format!("{kind:?} for unknown customer entity {entity:?}"))
}

pub(crate) fn wrong_subject(kind: EventKind, subject: EventSubject) -> SimError {
    SimError::invariant(format!("{kind:?} with unexpected subject {subject:?}"))
}

/// Everything a stage request can touch.
pub(crate) struct Floor<'a> {
    pub clock: &'a mut SimulationClock,
    pub pools: &'a mut ResourcePools,
    pub streams: &'a mut RandomStreams,
    pub urns: &'a mut CoffeeUrns,
    pub shelf: &'a mut PickupShelf,
    pub config: &'a SimConfig,
}

/// Requests the customer's current stage. Coffee is poured before the pour
/// stage and a shelf slot is reserved before packing; a customer blocked by
/// either waits in that queue and comes back here through [resume_request].
pub(crate) fn request_stage(
    entity: Entity,
    customer: &mut Customer,
    resource: ResourceKind,
    now: u64,
    floor: &mut Floor,
) -> SimResult<()> {
    if customer.pours_coffee_at(resource, floor.urns.pour_stage()) {
        match floor.urns.try_pour(entity, customer.order.coffee_portions) {
            Acquire::Granted => customer.coffee_poured = true,
            Acquire::Queued => {
                trace!(
                    "customer {} waits for coffee ({} portions left)",
                    customer.id,
                    floor.urns.portions()
                );
                return start_brew(now, floor);
            }
        }
    }
    if resource == ResourceKind::Packer && !customer.shelf_slot {
        match floor.shelf.try_reserve(entity) {
            Acquire::Granted => customer.shelf_slot = true,
            Acquire::Queued => {
                trace!(
                    "customer {} waits for a shelf slot ({} in queue)",
                    customer.id,
                    floor.shelf.waiting_len()
                );
                return Ok(());
            }
        }
    }
    match floor.pools.get_mut(resource).try_acquire(entity, now)? {
        Acquire::Granted => begin_service(
            entity,
            customer,
            resource,
            now,
            floor.clock,
            floor.streams,
            &floor.config.service,
        ),
        Acquire::Queued => {
            trace!(
                "customer {} waits for {resource:?} ({} in queue)",
                customer.id,
                floor.pools.get(resource).waiting_len()
            );
            Ok(())
        }
    }
}

/// What released a customer from an equipment queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Unblocked {
    CoffeePoured,
    ShelfSlot,
}

/// Continues the stage request of a customer just released from the urn or
/// shelf queue.
pub(crate) fn resume_request(
    waiter: Entity,
    unblocked: Unblocked,
    now: u64,
    floor: &mut Floor,
    customers: &mut Query<&mut Customer>,
    kind: EventKind,
) -> SimResult<()> {
    let Ok(mut customer) = customers.get_mut(waiter) else {
        return Err(unknown_customer(kind, waiter));
    };
    ensure_live(&customer, kind)?;
    let CustomerState::Queued(resource) = customer.state else {
        return Err(SimError::invariant(format!(
            "customer {} released by {unblocked:?} while {:?}",
            customer.id, customer.state
        )));
    };
    match unblocked {
        Unblocked::CoffeePoured => customer.coffee_poured = true,
        Unblocked::ShelfSlot => customer.shelf_slot = true,
    }
    request_stage(waiter, &mut customer, resource, now, floor)
}

/// Frees a pickup-shelf slot, passing it to the head of the shelf queue.
pub(crate) fn free_shelf_slot(
    now: u64,
    floor: &mut Floor,
    customers: &mut Query<&mut Customer>,
    kind: EventKind,
) -> SimResult<()> {
    if let Some(waiter) = floor.shelf.release()? {
        resume_request(waiter, Unblocked::ShelfSlot, now, floor, customers, kind)?;
    }
    Ok(())
}

/// Schedules a brew when orders wait for coffee and none is running.
pub(crate) fn start_brew(now: u64, floor: &mut Floor) -> SimResult<()> {
    if let Some(done_at) = floor.urns.start_brew_if_needed(now) {
        trace!("coffee brew started at {now} ms, ready at {done_at} ms");
        floor
            .clock
            .schedule(done_at, EventKind::BrewComplete, EventSubject::CoffeeUrns)?;
    }
    Ok(())
}

/// Starts the customer's stage on a unit just granted to them: closes the
/// wait interval, draws the service time and schedules its completion.
pub(crate) fn begin_service(
    entity: Entity,
    customer: &mut Customer,
    resource: ResourceKind,
    now: u64,
    clock: &mut SimulationClock,
    streams: &mut RandomStreams,
    service: &ServiceTimes,
) -> SimResult<()> {
    if customer.state != CustomerState::Queued(resource) {
        return Err(SimError::invariant(format!(
            "customer {} granted {resource:?} while {:?}",
            customer.id, customer.state
        )));
    }
    customer.wait_ms = customer
        .wait_ms
        .saturating_add(now.saturating_sub(customer.queued_since));
    let duration_ms = service.get(resource).sample_ms(streams.service(resource));
    customer.state = CustomerState::InService(resource);
    customer.holds.push(StageHold {
        resource,
        started_at: now,
        duration_ms,
    });
    clock.schedule(
        now.saturating_add(duration_ms),
        EventKind::ServiceComplete,
        EventSubject::Stage(entity, resource),
    )?;
    Ok(())
}
