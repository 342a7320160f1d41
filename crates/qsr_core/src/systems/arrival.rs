use bevy_ecs::prelude::{Commands, Res, ResMut};
use log::debug;

use crate::arrivals::ArrivalGenerators;
use crate::clock::{CurrentEvent, EventKind, EventSubject, SimulationClock};
use crate::ecs::{AbandonmentPolicy, Channel, Customer, Outcome};
use crate::error::SimResult;
use crate::menu::{stage_route, Menu};
use crate::pools::{ResourcePool, ResourcePools};
use crate::rng::RandomStreams;
use crate::scenario::{BalkRule, SimConfig};
use crate::telemetry::{MetricsSink, OutcomeRecord, SimTelemetry};

use super::wrong_subject;

/// Whether an arriving customer refuses to join, judged on the first-stage
/// pool as it is at the arrival instant.
pub fn balks(rule: BalkRule, pool: &ResourcePool, mean_service_minutes: f64) -> bool {
    match rule {
        BalkRule::QueueLength { max_waiting } => pool.waiting_len() >= max_waiting as usize,
        BalkRule::EstimatedWait { max_minutes } => {
            if pool.busy() < pool.capacity() {
                return false;
            }
            let expected = (pool.waiting_len() + 1) as f64 * mean_service_minutes
                / f64::from(pool.capacity());
            expected > max_minutes
        }
    }
}

#[allow(clippy::too_many_arguments)]
pub fn arrival_system(
    event: Res<CurrentEvent>,
    mut commands: Commands,
    mut clock: ResMut<SimulationClock>,
    mut generators: ResMut<ArrivalGenerators>,
    mut streams: ResMut<RandomStreams>,
    menu: Res<Menu>,
    config: Res<SimConfig>,
    pools: Res<ResourcePools>,
    mut telemetry: ResMut<SimTelemetry>,
) -> SimResult<()> {
    let EventSubject::Channel(channel) = event.0.subject else {
        return Err(wrong_subject(EventKind::Arrival, event.0.subject));
    };
    let now = clock.now();

    let sampled = menu.sample_order(streams.orders());
    let stages = stage_route(config.channel(channel), &sampled.requires);
    let policy = match channel {
        Channel::WalkIn => AbandonmentPolicy::Never,
        Channel::DriveThru => AbandonmentPolicy::Balk(config.drive_thru_balk),
        Channel::Mobile => AbandonmentPolicy::Renege {
            patience_ms: config.mobile_patience.sample_ms(streams.patience()),
        },
    };
    let id = generators.next_customer_id();
    let mut customer = Customer::new(id, channel, now, sampled.order, stages, policy);

    let refused = match (policy, customer.current_stage()) {
        (AbandonmentPolicy::Balk(rule), Some(first)) => balks(
            rule,
            pools.get(first),
            config.service.get(first).mean_minutes(),
        ),
        _ => false,
    };

    if refused {
        let record = OutcomeRecord::abandoned(&customer, Outcome::Balked, now);
        debug!(
            "customer {id} ({channel:?}) balked at {now} ms, lost {:.2}",
            record.lost_revenue
        );
        telemetry.record(&record);
    } else {
        let entity = commands.spawn_empty().id();
        // The stage request goes in before the renege timer so that equal
        // timestamps resolve in favour of an immediate grant.
        match customer.current_stage() {
            Some(first) => clock.schedule(
                now,
                EventKind::ServiceStart,
                EventSubject::Stage(entity, first),
            )?,
            None => clock.schedule(now, EventKind::Departure, EventSubject::Customer(entity))?,
        }
        if let AbandonmentPolicy::Renege { patience_ms } = policy {
            clock.schedule(
                now.saturating_add(patience_ms),
                EventKind::Renege,
                EventSubject::Customer(entity),
            )?;
            customer.renege_timer_pending = true;
        }
        debug!(
            "customer {id} ({channel:?}) arrived at {now} ms, route {:?}",
            customer.stages
        );
        commands.entity(entity).insert(customer);
    }

    if let Some(at) = generators.next_arrival(channel, now, streams.arrivals(channel)) {
        clock.schedule(at, EventKind::Arrival, EventSubject::Channel(channel))?;
    }
    Ok(())
}
