//! Daily profit and service-level summary computed from a metrics stream.

use serde::Serialize;

use crate::clock::{minutes_to_ms, ONE_MIN_MS};
use crate::ecs::{Channel, Outcome, ResourceKind};
use crate::runner::{MetricsStream, RunEnd, WasteTally};
use crate::scenario::SimConfig;
use crate::telemetry::OutcomeCounts;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct WaitStats {
    pub customers: usize,
    pub avg_minutes: f64,
    pub median_minutes: f64,
    pub p95_minutes: f64,
}

impl WaitStats {
    fn from_waits(waits: &[u64]) -> Self {
        if waits.is_empty() {
            return Self::default();
        }
        let mut sorted = waits.to_vec();
        sorted.sort_unstable();
        let n = sorted.len();
        let avg = sorted.iter().sum::<u64>() as f64 / n as f64;
        let median = if n % 2 == 0 {
            (sorted[n / 2 - 1] + sorted[n / 2]) as f64 / 2.0
        } else {
            sorted[n / 2] as f64
        };
        let p95_idx = ((n - 1) as f64 * 0.95) as usize;
        let p95 = sorted[p95_idx.min(n - 1)] as f64;
        Self {
            customers: n,
            avg_minutes: avg / ONE_MIN_MS as f64,
            median_minutes: median / ONE_MIN_MS as f64,
            p95_minutes: p95 / ONE_MIN_MS as f64,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChannelSummary {
    pub channel: Channel,
    pub counts: OutcomeCounts,
    pub revenue: f64,
    pub lost_revenue: f64,
    /// Waits of completed customers only.
    pub wait: WaitStats,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Utilization {
    pub resource: ResourceKind,
    pub capacity: u32,
    pub peak_busy: u32,
    /// Busy unit-time over capacity × elapsed day time, in `[0, 1]`.
    pub utilization: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DaySummary {
    pub seed: u64,
    pub end: RunEnd,
    pub in_flight: usize,
    pub counts: OutcomeCounts,
    pub revenue: f64,
    pub lost_revenue: f64,
    pub material_cost: f64,
    pub labor_cost: f64,
    pub balk_penalties: f64,
    pub renege_penalties: f64,
    pub wasted_coffee_portions: u64,
    pub wasted_items: u64,
    /// Discarded coffee at portion cost plus unfinished items at the waste penalty.
    pub waste_cost: f64,
    pub net_profit: f64,
    pub channels: Vec<ChannelSummary>,
    pub utilization: Vec<Utilization>,
}

impl DaySummary {
    pub fn from_stream(stream: &MetricsStream, config: &SimConfig) -> Self {
        let revenue: f64 = stream.records.iter().map(|r| r.revenue).sum();
        let lost_revenue: f64 = stream.records.iter().map(|r| r.lost_revenue).sum();
        let material_cost: f64 = stream.records.iter().map(|r| r.material_cost).sum();
        let labor_cost = f64::from(config.staffing.staff_count())
            * config.costs.hourly_wage
            * config.open_hours();
        let balk_penalties = stream.counts.balked as f64 * config.costs.balk_penalty;
        let renege_penalties = stream.counts.reneged as f64 * config.costs.renege_penalty;
        let WasteTally {
            coffee_portions,
            unfinished_items,
        } = stream.waste;
        let waste_cost = coffee_portions as f64 * config.coffee.portion_cost
            + unfinished_items as f64 * config.costs.waste_penalty;
        let net_profit = revenue
            - material_cost
            - labor_cost
            - balk_penalties
            - renege_penalties
            - waste_cost;

        let channels = Channel::ALL
            .into_iter()
            .map(|channel| {
                let mut summary = ChannelSummary {
                    channel,
                    counts: OutcomeCounts::default(),
                    revenue: 0.0,
                    lost_revenue: 0.0,
                    wait: WaitStats::default(),
                };
                let mut waits = Vec::new();
                for record in stream.records.iter().filter(|r| r.channel == channel) {
                    match record.outcome {
                        Outcome::Completed => {
                            summary.counts.completed += 1;
                            waits.push(record.wait_ms);
                        }
                        Outcome::Balked => summary.counts.balked += 1,
                        Outcome::Reneged => summary.counts.reneged += 1,
                    }
                    summary.revenue += record.revenue;
                    summary.lost_revenue += record.lost_revenue;
                }
                summary.wait = WaitStats::from_waits(&waits);
                summary
            })
            .collect();

        let elapsed_ms = stream
            .ended_at_ms
            .saturating_sub(minutes_to_ms(config.opening_minutes));
        let utilization = stream
            .pool_stats
            .iter()
            .map(|stats| {
                let available = u64::from(stats.capacity) * elapsed_ms;
                Utilization {
                    resource: stats.resource,
                    capacity: stats.capacity,
                    peak_busy: stats.peak_busy,
                    utilization: if available == 0 {
                        0.0
                    } else {
                        stats.busy_ms as f64 / available as f64
                    },
                }
            })
            .collect();

        Self {
            seed: stream.seed,
            end: stream.end,
            in_flight: stream.in_flight,
            counts: stream.counts,
            revenue,
            lost_revenue,
            material_cost,
            labor_cost,
            balk_penalties,
            renege_penalties,
            wasted_coffee_portions: coffee_portions,
            wasted_items: unfinished_items,
            waste_cost,
            net_profit,
            channels,
            utilization,
        }
    }

    pub fn channel(&self, channel: Channel) -> Option<&ChannelSummary> {
        self.channels.iter().find(|c| c.channel == channel)
    }
}
