//! Arrival generators: one lazy source per channel.
//!
//! Only the next arrival of each channel is ever in the event queue. Processing
//! an arrival asks its generator for the successor; nothing is scheduled past
//! closing time.

use bevy_ecs::prelude::Resource;
use rand::rngs::StdRng;

use crate::clock::{minutes_to_ms, EventKind, EventSubject, SimulationClock};
use crate::distributions::{FixedInterArrival, InterArrivalDistribution, PoissonInterArrival};
use crate::ecs::Channel;
use crate::error::SimResult;
use crate::rng::RandomStreams;
use crate::scenario::{ArrivalProcess, SimConfig};

#[derive(Debug)]
enum ArrivalSource {
    Off,
    Sampled(Box<dyn InterArrivalDistribution>),
    /// Absolute arrival instants in ms, consumed front to back.
    Scripted { at_ms: Vec<u64>, next: usize },
}

impl ArrivalSource {
    fn from_process(process: &ArrivalProcess, opening_ms: u64) -> Self {
        match process {
            ArrivalProcess::Off => ArrivalSource::Off,
            ArrivalProcess::Poisson {
                per_hour,
                hourly_multipliers,
            } => ArrivalSource::Sampled(Box::new(
                PoissonInterArrival::new(*per_hour)
                    .with_hourly_multipliers(hourly_multipliers.clone()),
            )),
            ArrivalProcess::Fixed { every_minutes } => {
                ArrivalSource::Sampled(Box::new(FixedInterArrival::every_minutes(*every_minutes)))
            }
            ArrivalProcess::Scripted { at_minutes } => ArrivalSource::Scripted {
                at_ms: at_minutes
                    .iter()
                    .map(|&minutes| opening_ms + minutes_to_ms(minutes))
                    .collect(),
                next: 0,
            },
        }
    }
}

#[derive(Debug)]
struct ChannelArrivals {
    source: ArrivalSource,
    generated: u64,
}

#[derive(Debug, Resource)]
pub struct ArrivalGenerators {
    opening_ms: u64,
    closing_ms: u64,
    channels: [ChannelArrivals; 3],
    next_customer_id: u64,
}

impl ArrivalGenerators {
    pub fn from_config(config: &SimConfig) -> Self {
        let opening_ms = minutes_to_ms(config.opening_minutes);
        Self {
            opening_ms,
            closing_ms: minutes_to_ms(config.closing_minutes),
            channels: Channel::ALL.map(|channel| ChannelArrivals {
                source: ArrivalSource::from_process(&config.channel(channel).arrivals, opening_ms),
                generated: 0,
            }),
            next_customer_id: 1,
        }
    }

    pub fn closing_ms(&self) -> u64 {
        self.closing_ms
    }

    /// Arrivals drawn so far for `channel` (including ones still queued).
    pub fn generated(&self, channel: Channel) -> u64 {
        self.channels[channel.index()].generated
    }

    /// Next arrival of `channel` after `now`, or `None` once the channel is
    /// exhausted or the next draw would land after closing.
    pub fn next_arrival(&mut self, channel: Channel, now: u64, rng: &mut StdRng) -> Option<u64> {
        let elapsed = now.saturating_sub(self.opening_ms);
        let closing_ms = self.closing_ms;
        let state = &mut self.channels[channel.index()];
        let at = match &mut state.source {
            ArrivalSource::Off => None,
            ArrivalSource::Sampled(distribution) => distribution
                .sample_ms(rng, elapsed)
                .map(|gap| now.saturating_add(gap)),
            ArrivalSource::Scripted { at_ms, next } => {
                // Instants already behind the clock are skipped.
                while at_ms.get(*next).is_some_and(|&t| t < now) {
                    *next += 1;
                }
                let at = at_ms.get(*next).copied();
                *next += 1;
                at
            }
        }
        .filter(|&at| at <= closing_ms)?;
        state.generated += 1;
        Some(at)
    }

    /// Sequential customer ids, starting at 1.
    pub fn next_customer_id(&mut self) -> u64 {
        let id = self.next_customer_id;
        self.next_customer_id += 1;
        id
    }
}

/// Seeds the event queue with the first arrival of every channel.
pub fn schedule_first_arrivals(
    clock: &mut SimulationClock,
    generators: &mut ArrivalGenerators,
    streams: &mut RandomStreams,
) -> SimResult<()> {
    let now = clock.now();
    for channel in Channel::ALL {
        if let Some(at) = generators.next_arrival(channel, now, streams.arrivals(channel)) {
            clock.schedule(at, EventKind::Arrival, EventSubject::Channel(channel))?;
        }
    }
    Ok(())
}
