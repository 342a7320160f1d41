use bevy_ecs::prelude::{Query, Res, ResMut};
use log::trace;

use crate::clock::{CurrentEvent, EventKind, EventSubject, SimulationClock};
use crate::ecs::{Customer, CustomerState};
use crate::error::{SimError, SimResult};
use crate::pools::ResourcePools;
use crate::rng::RandomStreams;
use crate::scenario::SimConfig;

use super::{begin_service, ensure_live, unknown_customer, wrong_subject};

/// Ends a stage: the freed unit goes straight to the head of the queue, and
/// the finishing customer moves on to the next stage at the same instant.
/// After the last stage the customer departs once the channel's pickup lag
/// has passed.
pub fn service_complete_system(
    event: Res<CurrentEvent>,
    mut clock: ResMut<SimulationClock>,
    mut pools: ResMut<ResourcePools>,
    mut streams: ResMut<RandomStreams>,
    config: Res<SimConfig>,
    mut customers: Query<&mut Customer>,
) -> SimResult<()> {
    let EventSubject::Stage(entity, resource) = event.0.subject else {
        return Err(wrong_subject(EventKind::ServiceComplete, event.0.subject));
    };
    let now = clock.now();

    let (finished_id, next_step) = {
        let Ok(mut customer) = customers.get_mut(entity) else {
            return Err(unknown_customer(EventKind::ServiceComplete, entity));
        };
        ensure_live(&customer, EventKind::ServiceComplete)?;
        if customer.state != CustomerState::InService(resource) {
            return Err(SimError::invariant(format!(
                "customer {} finished {resource:?} while {:?}",
                customer.id, customer.state
            )));
        }
        customer.next_stage += 1;
        let next_step = match customer.current_stage() {
            Some(next) => {
                customer.state = CustomerState::Queued(next);
                customer.queued_since = now;
                (
                    now,
                    EventKind::ServiceStart,
                    EventSubject::Stage(entity, next),
                )
            }
            None => {
                let lag_ms = config
                    .channel(customer.channel)
                    .pickup_lag
                    .sample_ms(streams.pickup());
                customer.pickup_ms = lag_ms;
                customer.state = CustomerState::Departing;
                (
                    now.saturating_add(lag_ms),
                    EventKind::Departure,
                    EventSubject::Customer(entity),
                )
            }
        };
        (customer.id, next_step)
    };

    if let Some(waiter) = pools.get_mut(resource).release(now)? {
        let Ok(mut next_customer) = customers.get_mut(waiter) else {
            return Err(unknown_customer(EventKind::ServiceComplete, waiter));
        };
        ensure_live(&next_customer, EventKind::ServiceComplete)?;
        trace!(
            "{resource:?} handed from customer {finished_id} to customer {} at {now} ms",
            next_customer.id
        );
        begin_service(
            waiter,
            &mut next_customer,
            resource,
            now,
            &mut clock,
            &mut streams,
            &config.service,
        )?;
    }

    let (at, kind, subject) = next_step;
    clock.schedule(at, kind, subject)?;
    Ok(())
}
