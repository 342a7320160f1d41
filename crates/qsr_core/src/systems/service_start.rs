use bevy_ecs::prelude::{Query, Res, ResMut};

use crate::clock::{CurrentEvent, EventKind, EventSubject, SimulationClock};
use crate::ecs::{Customer, CustomerState};
use crate::equipment::{CoffeeUrns, PickupShelf};
use crate::error::{SimError, SimResult};
use crate::pools::ResourcePools;
use crate::rng::RandomStreams;
use crate::scenario::SimConfig;

use super::{ensure_live, request_stage, unknown_customer, wrong_subject, Floor};

/// A customer requests the resource of their current stage: served at once
/// when a unit is free, otherwise appended to the pool's FIFO queue. Coffee
/// and shelf gates are passed first.
#[allow(clippy::too_many_arguments)]
pub fn service_start_system(
    event: Res<CurrentEvent>,
    mut clock: ResMut<SimulationClock>,
    mut pools: ResMut<ResourcePools>,
    mut streams: ResMut<RandomStreams>,
    mut urns: ResMut<CoffeeUrns>,
    mut shelf: ResMut<PickupShelf>,
    config: Res<SimConfig>,
    mut customers: Query<&mut Customer>,
) -> SimResult<()> {
    let EventSubject::Stage(entity, resource) = event.0.subject else {
        return Err(wrong_subject(EventKind::ServiceStart, event.0.subject));
    };
    let now = clock.now();
    let Ok(mut customer) = customers.get_mut(entity) else {
        return Err(unknown_customer(EventKind::ServiceStart, entity));
    };
    ensure_live(&customer, EventKind::ServiceStart)?;
    if customer.current_stage() != Some(resource) {
        return Err(SimError::invariant(format!(
            "customer {} requested {resource:?} but its current stage is {:?}",
            customer.id,
            customer.current_stage()
        )));
    }

    customer.state = CustomerState::Queued(resource);
    customer.queued_since = now;
    let mut floor = Floor {
        clock: &mut clock,
        pools: &mut pools,
        streams: &mut streams,
        urns: &mut urns,
        shelf: &mut shelf,
        config: &config,
    };
    request_stage(entity, &mut customer, resource, now, &mut floor)
}
