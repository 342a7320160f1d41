use bevy_ecs::prelude::{Commands, Query, Res, ResMut};
use log::debug;

use crate::clock::{CurrentEvent, EventKind, EventSubject, SimulationClock};
use crate::ecs::{Customer, CustomerState, Outcome};
use crate::equipment::{CoffeeUrns, PickupShelf};
use crate::error::{SimError, SimResult};
use crate::pools::ResourcePools;
use crate::rng::RandomStreams;
use crate::scenario::SimConfig;
use crate::telemetry::{MetricsSink, OutcomeRecord, SimTelemetry};

use super::{ensure_live, free_shelf_slot, unknown_customer, wrong_subject, Floor};

/// The customer collects the order. Its shelf slot is freed and handed to
/// the next order waiting to be packed.
#[allow(clippy::too_many_arguments)]
pub fn departure_system(
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
        return Err(wrong_subject(EventKind::Departure, event.0.subject));
    };
    let now = clock.now();
    let held_slot = {
        let Ok(mut customer) = customers.get_mut(entity) else {
            return Err(unknown_customer(EventKind::Departure, entity));
        };
        ensure_live(&customer, EventKind::Departure)?;
        if customer.state != CustomerState::Departing {
            return Err(SimError::invariant(format!(
                "customer {} departed while {:?}",
                customer.id, customer.state
            )));
        }

        let record = OutcomeRecord::completed(&customer, now);
        debug!(
            "customer {} ({:?}) completed at {now} ms: waited {} ms, paid {:.2}",
            customer.id, customer.channel, record.wait_ms, record.revenue
        );
        telemetry.record(&record);

        let held_slot = std::mem::take(&mut customer.shelf_slot);
        if customer.renege_timer_pending {
            // The renege timer still references this entity.
            customer.state = CustomerState::Terminal(Outcome::Completed);
        } else {
            commands.entity(entity).despawn();
        }
        held_slot
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
        free_shelf_slot(now, &mut floor, &mut customers, EventKind::Departure)?;
    }
    Ok(())
}
