use bevy_ecs::prelude::{Commands, Query, Res, ResMut};
use log::{debug, trace};

use crate::clock::{CurrentEvent, EventKind, EventSubject, SimulationClock};
use crate::ecs::{Customer, CustomerState, Outcome};
use crate::equipment::{CoffeeUrns, PickupShelf};
use crate::error::{SimError, SimResult};
use crate::pools::ResourcePools;
use crate::rng::RandomStreams;
use crate::scenario::SimConfig;
use crate::telemetry::{MetricsSink, OutcomeRecord, SimTelemetry};

use super::{free_shelf_slot, unknown_customer, wrong_subject, Floor};

/// Patience timer of a mobile customer. The customer abandons only if still
/// waiting for their first stage; once any service began the timer is moot.
/// Coffee already poured for the order is discarded and a reserved shelf slot
/// goes to the next order waiting for one.
#[allow(clippy::too_many_arguments)]
pub fn renege_system(
    event: Res<CurrentEvent>,
    mut clock: ResMut<SimulationClock>,
    mut commands: Commands,
    mut pools: ResMut<ResourcePools>,
    mut streams: ResMut<RandomStreams>,
    mut urns: ResMut<CoffeeUrns>,
    mut shelf: ResMut<PickupShelf>,
    config: Res<SimConfig>,
    mut telemetry: ResMut<SimTelemetry>,
    mut customers: Query<&mut Customer>,
) -> SimResult<()> {
    let EventSubject::Customer(entity) = event.0.subject else {
        return Err(wrong_subject(EventKind::Renege, event.0.subject));
    };
    let now = clock.now();
    let held_slot = {
        let Ok(mut customer) = customers.get_mut(entity) else {
            return Err(unknown_customer(EventKind::Renege, entity));
        };
        if !customer.renege_timer_pending {
            return Err(SimError::invariant(format!(
                "renege timer fired twice for customer {}",
                customer.id
            )));
        }
        customer.renege_timer_pending = false;

        let state = customer.state;
        match state {
            CustomerState::Terminal(outcome) => {
                trace!(
                    "dropping customer {} ({outcome:?}) at expired patience",
                    customer.id
                );
                commands.entity(entity).despawn();
                return Ok(());
            }
            CustomerState::Queued(resource) if !customer.has_started_service() => {
                let left_queue = urns.withdraw(entity)
                    || shelf.withdraw(entity)
                    || pools.get_mut(resource).withdraw(entity);
                if !left_queue {
                    return Err(SimError::invariant(format!(
                        "customer {} waiting for {resource:?} is missing from its queue",
                        customer.id
                    )));
                }
                if customer.coffee_poured {
                    urns.discard(customer.order.coffee_portions);
                }
                customer.wait_ms = customer
                    .wait_ms
                    .saturating_add(now.saturating_sub(customer.queued_since));
                let record = OutcomeRecord::abandoned(&customer, Outcome::Reneged, now);
                debug!(
                    "customer {} ({:?}) reneged at {now} ms after waiting {} ms",
                    customer.id, customer.channel, record.wait_ms
                );
                telemetry.record(&record);
                commands.entity(entity).despawn();
                customer.shelf_slot
            }
            _ => {
                trace!(
                    "patience of customer {} expired after service began",
                    customer.id
                );
                return Ok(());
            }
        }
    };

    if held_slot {
        let mut floor = Floor {
            clock: &mut clock,
            pools: &mut pools,
            streams: &mut streams,
            urns: &mut urns,
            shelf: &mut shelf,
            config: &config,
        };
        free_shelf_slot(now, &mut floor, &mut customers, EventKind::Renege)?;
    }
    Ok(())
}
