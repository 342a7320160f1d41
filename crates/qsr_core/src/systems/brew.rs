use bevy_ecs::prelude::{Query, Res, ResMut};
use log::debug;

use crate::clock::{CurrentEvent, EventKind, EventSubject, SimulationClock};
use crate::ecs::Customer;
use crate::equipment::{CoffeeUrns, PickupShelf};
use crate::error::SimResult;
use crate::pools::ResourcePools;
use crate::rng::RandomStreams;
use crate::scenario::SimConfig;

use super::{resume_request, start_brew, wrong_subject, Floor, Unblocked};

/// A brew finished: one urn is refilled and the orders waiting for coffee are
/// poured in arrival order until the stock runs short. Another brew starts
/// right away if anyone is still waiting.
#[allow(clippy::too_many_arguments)]
pub fn brew_complete_system(
    event: Res<CurrentEvent>,
    mut clock: ResMut<SimulationClock>,
    mut pools: ResMut<ResourcePools>,
    mut streams: ResMut<RandomStreams>,
    mut urns: ResMut<CoffeeUrns>,
    mut shelf: ResMut<PickupShelf>,
    config: Res<SimConfig>,
    mut customers: Query<&mut Customer>,
) -> SimResult<()> {
    if event.0.subject != EventSubject::CoffeeUrns {
        return Err(wrong_subject(EventKind::BrewComplete, event.0.subject));
    }
    let now = clock.now();
    let served = urns.finish_brew()?;
    debug!(
        "coffee brew done at {now} ms: {} orders poured, {} portions left, {} waiting",
        served.len(),
        urns.portions(),
        urns.waiting_len()
    );

    let mut floor = Floor {
        clock: &mut clock,
        pools: &mut pools,
        streams: &mut streams,
        urns: &mut urns,
        shelf: &mut shelf,
        config: &config,
    };
    for waiter in served {
        resume_request(
            waiter,
            Unblocked::CoffeePoured,
            now,
            &mut floor,
            &mut customers,
            EventKind::BrewComplete,
        )?;
    }
    start_brew(now, &mut floor)
}
