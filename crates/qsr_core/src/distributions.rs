//! Probability distributions for inter-arrival gaps, service durations and
//! customer patience.
//!
//! Configured values are in minutes; samplers return simulation milliseconds.

use rand::Rng;
use rand_distr::{Distribution, Exp, Normal};
use serde::{Deserialize, Serialize};

use crate::clock::{minutes_to_ms, ONE_MIN_MS};
use crate::error::ConfigError;

const ONE_HOUR_MS: u64 = 60 * ONE_MIN_MS;

/// Trait for sampling inter-arrival gaps (in milliseconds).
pub trait InterArrivalDistribution: Send + Sync + std::fmt::Debug {
    /// Sample the next gap. `elapsed_ms` is the time since opening, used by
    /// time-of-day profiles. `None` means no further arrivals.
    fn sample_ms(&self, rng: &mut dyn rand::RngCore, elapsed_ms: u64) -> Option<u64>;
}

/// Constant inter-arrival time.
#[derive(Debug, Clone)]
pub struct FixedInterArrival {
    pub interval_ms: u64,
}

impl FixedInterArrival {
    pub fn every_minutes(minutes: f64) -> Self {
        Self {
            interval_ms: minutes_to_ms(minutes),
        }
    }
}

impl InterArrivalDistribution for FixedInterArrival {
    fn sample_ms(&self, _rng: &mut dyn rand::RngCore, _elapsed_ms: u64) -> Option<u64> {
        Some(self.interval_ms)
    }
}

/// Poisson arrivals: exponential gaps, optionally scaled by an hourly profile.
#[derive(Debug, Clone)]
pub struct PoissonInterArrival {
    pub rate_per_hour: f64,
    /// Rate multipliers per hour since opening; hours past the end reuse the
    /// last entry. Empty means a flat profile.
    pub hourly_multipliers: Vec<f64>,
}

impl PoissonInterArrival {
    pub fn new(rate_per_hour: f64) -> Self {
        Self {
            rate_per_hour: rate_per_hour.max(0.0),
            hourly_multipliers: Vec::new(),
        }
    }

    pub fn with_hourly_multipliers(mut self, multipliers: Vec<f64>) -> Self {
        self.hourly_multipliers = multipliers;
        self
    }

    fn multiplier(&self, hour: usize) -> f64 {
        self.hourly_multipliers
            .get(hour)
            .or(self.hourly_multipliers.last())
            .copied()
            .unwrap_or(1.0)
            .max(0.0)
    }

    /// First hour at or after `hour` with a positive rate. Hours past the
    /// profile repeat its last entry, so the search stops there.
    fn first_active_hour(&self, hour: usize) -> Option<usize> {
        if self.rate_per_hour <= 0.0 {
            return None;
        }
        let last = self.hourly_multipliers.len().saturating_sub(1);
        (hour..=hour.max(last)).find(|&h| self.multiplier(h) > 0.0)
    }
}

impl InterArrivalDistribution for PoissonInterArrival {
    /// Piecewise-constant rate per hour. A draw that would cross into the
    /// next profile hour is redrawn from that hour's start, and quiet hours
    /// are skipped entirely.
    fn sample_ms(&self, rng: &mut dyn rand::RngCore, elapsed_ms: u64) -> Option<u64> {
        let last_profiled = self.hourly_multipliers.len().saturating_sub(1);
        let mut from_ms = elapsed_ms;
        loop {
            let hour = (from_ms / ONE_HOUR_MS) as usize;
            let active = self.first_active_hour(hour)?;
            let start_ms = from_ms.max(active as u64 * ONE_HOUR_MS);
            let rate_per_min = self.rate_per_hour * self.multiplier(active) / 60.0;
            let exp = Exp::new(rate_per_min).ok()?;
            let gap_minutes: f64 = exp.sample(rng);
            let at_ms = start_ms.saturating_add(minutes_to_ms(gap_minutes));
            let hour_end_ms = (active as u64 + 1) * ONE_HOUR_MS;
            if active >= last_profiled || at_ms < hour_end_ms {
                return Some(at_ms - elapsed_ms);
            }
            from_ms = hour_end_ms;
        }
    }
}

/// Configurable duration distribution (minutes) used for service times and
/// mobile patience.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DurationDistribution {
    Fixed { minutes: f64 },
    Exponential { mean_minutes: f64 },
    /// Normal, truncated below at `floor_minutes`.
    Normal {
        mean_minutes: f64,
        std_minutes: f64,
        floor_minutes: f64,
    },
    Uniform { min_minutes: f64, max_minutes: f64 },
}

impl DurationDistribution {
    pub fn fixed(minutes: f64) -> Self {
        DurationDistribution::Fixed { minutes }
    }

    pub fn exponential(mean_minutes: f64) -> Self {
        DurationDistribution::Exponential { mean_minutes }
    }

    pub fn validate(&self, what: &str) -> Result<(), ConfigError> {
        let malformed = |reason: &str| ConfigError::MalformedDistribution {
            what: what.to_string(),
            reason: reason.to_string(),
        };
        let finite_non_negative = |x: f64| x.is_finite() && x >= 0.0;
        match *self {
            DurationDistribution::Fixed { minutes } => {
                if !finite_non_negative(minutes) {
                    return Err(malformed("fixed duration must be finite and >= 0"));
                }
            }
            DurationDistribution::Exponential { mean_minutes } => {
                if !(mean_minutes.is_finite() && mean_minutes > 0.0) {
                    return Err(malformed("exponential mean must be finite and > 0"));
                }
            }
            DurationDistribution::Normal {
                mean_minutes,
                std_minutes,
                floor_minutes,
            } => {
                if !finite_non_negative(mean_minutes)
                    || !finite_non_negative(std_minutes)
                    || !finite_non_negative(floor_minutes)
                {
                    return Err(malformed("normal parameters must be finite and >= 0"));
                }
            }
            DurationDistribution::Uniform {
                min_minutes,
                max_minutes,
            } => {
                if !finite_non_negative(min_minutes) || !finite_non_negative(max_minutes) {
                    return Err(malformed("uniform bounds must be finite and >= 0"));
                }
                if min_minutes > max_minutes {
                    return Err(malformed("uniform min exceeds max"));
                }
            }
        }
        Ok(())
    }

    pub fn mean_minutes(&self) -> f64 {
        match *self {
            DurationDistribution::Fixed { minutes } => minutes,
            DurationDistribution::Exponential { mean_minutes } => mean_minutes,
            DurationDistribution::Normal {
                mean_minutes,
                floor_minutes,
                ..
            } => mean_minutes.max(floor_minutes),
            DurationDistribution::Uniform {
                min_minutes,
                max_minutes,
            } => (min_minutes + max_minutes) / 2.0,
        }
    }

    /// Draws a duration in milliseconds. Assumes [Self::validate] passed.
    pub fn sample_ms<R: Rng + ?Sized>(&self, rng: &mut R) -> u64 {
        let minutes = match *self {
            DurationDistribution::Fixed { minutes } => minutes,
            DurationDistribution::Exponential { mean_minutes } => Exp::new(1.0 / mean_minutes)
                .map(|exp| exp.sample(rng))
                .unwrap_or(mean_minutes),
            DurationDistribution::Normal {
                mean_minutes,
                std_minutes,
                floor_minutes,
            } => Normal::new(mean_minutes, std_minutes)
                .map(|normal| normal.sample(rng))
                .unwrap_or(mean_minutes)
                .max(floor_minutes),
            DurationDistribution::Uniform {
                min_minutes,
                max_minutes,
            } => {
                if min_minutes == max_minutes {
                    min_minutes
                } else {
                    rng.gen_range(min_minutes..max_minutes)
                }
            }
        };
        minutes_to_ms(minutes)
    }
}
