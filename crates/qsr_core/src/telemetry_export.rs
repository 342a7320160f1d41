//! Parquet export of a run's outcome records and pool usage.

use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use arrow::array::{ArrayRef, Float64Array, UInt32Array, UInt64Array, UInt8Array};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;

use crate::ecs::{Channel, Outcome, ResourceKind};
use crate::error::{SimError, SimResult};
use crate::pools::PoolStats;
use crate::telemetry::OutcomeRecord;

pub fn channel_code(channel: Channel) -> u8 {
    match channel {
        Channel::WalkIn => 0,
        Channel::DriveThru => 1,
        Channel::Mobile => 2,
    }
}

pub fn outcome_code(outcome: Outcome) -> u8 {
    match outcome {
        Outcome::Completed => 0,
        Outcome::Balked => 1,
        Outcome::Reneged => 2,
    }
}

pub fn resource_code(resource: ResourceKind) -> u8 {
    resource.index() as u8
}

fn u64_field(name: &'static str) -> Field {
    Field::new(name, DataType::UInt64, false)
}

fn u32_field(name: &'static str) -> Field {
    Field::new(name, DataType::UInt32, false)
}

fn u8_field(name: &'static str) -> Field {
    Field::new(name, DataType::UInt8, false)
}

fn f64_field(name: &'static str) -> Field {
    Field::new(name, DataType::Float64, false)
}

fn export_error(err: impl std::fmt::Display) -> SimError {
    SimError::Export(err.to_string())
}

fn write_record_batch<P: AsRef<Path>>(
    path: P,
    schema: Schema,
    arrays: Vec<ArrayRef>,
) -> SimResult<()> {
    let schema = Arc::new(schema);
    let batch = RecordBatch::try_new(schema.clone(), arrays).map_err(export_error)?;
    let file = File::create(path).map_err(export_error)?;
    let mut writer = ArrowWriter::try_new(file, schema, None).map_err(export_error)?;
    writer.write(&batch).map_err(export_error)?;
    writer.close().map_err(export_error)?;
    Ok(())
}

/// One row per outcome record; per-stage holds are folded into `hold_ms`
/// and `stages`.
pub fn write_outcomes_parquet<P: AsRef<Path>>(path: P, records: &[OutcomeRecord]) -> SimResult<()> {
    let n = records.len();
    let mut customer_id = Vec::with_capacity(n);
    let mut channel = Vec::with_capacity(n);
    let mut outcome = Vec::with_capacity(n);
    let mut arrival_ms = Vec::with_capacity(n);
    let mut end_ms = Vec::with_capacity(n);
    let mut wait_ms = Vec::with_capacity(n);
    let mut hold_ms = Vec::with_capacity(n);
    let mut pickup_ms = Vec::with_capacity(n);
    let mut stages = Vec::with_capacity(n);
    let mut items = Vec::with_capacity(n);
    let mut revenue = Vec::with_capacity(n);
    let mut lost_revenue = Vec::with_capacity(n);
    let mut material_cost = Vec::with_capacity(n);

    for record in records {
        customer_id.push(record.customer_id);
        channel.push(channel_code(record.channel));
        outcome.push(outcome_code(record.outcome));
        arrival_ms.push(record.arrival_ms);
        end_ms.push(record.end_ms);
        wait_ms.push(record.wait_ms);
        hold_ms.push(record.total_hold_ms());
        pickup_ms.push(record.pickup_ms);
        stages.push(record.holds.len() as u32);
        items.push(record.items.len() as u32);
        revenue.push(record.revenue);
        lost_revenue.push(record.lost_revenue);
        material_cost.push(record.material_cost);
    }

    let schema = Schema::new(vec![
        u64_field("customer_id"),
        u8_field("channel"),
        u8_field("outcome"),
        u64_field("arrival_ms"),
        u64_field("end_ms"),
        u64_field("wait_ms"),
        u64_field("hold_ms"),
        u64_field("pickup_ms"),
        u32_field("stages"),
        u32_field("items"),
        f64_field("revenue"),
        f64_field("lost_revenue"),
        f64_field("material_cost"),
    ]);

    let arrays: Vec<ArrayRef> = vec![
        Arc::new(UInt64Array::from(customer_id)),
        Arc::new(UInt8Array::from(channel)),
        Arc::new(UInt8Array::from(outcome)),
        Arc::new(UInt64Array::from(arrival_ms)),
        Arc::new(UInt64Array::from(end_ms)),
        Arc::new(UInt64Array::from(wait_ms)),
        Arc::new(UInt64Array::from(hold_ms)),
        Arc::new(UInt64Array::from(pickup_ms)),
        Arc::new(UInt32Array::from(stages)),
        Arc::new(UInt32Array::from(items)),
        Arc::new(Float64Array::from(revenue)),
        Arc::new(Float64Array::from(lost_revenue)),
        Arc::new(Float64Array::from(material_cost)),
    ];

    write_record_batch(path, schema, arrays)
}

/// One row per resource pool.
pub fn write_pool_stats_parquet<P: AsRef<Path>>(path: P, stats: &[PoolStats]) -> SimResult<()> {
    let schema = Schema::new(vec![
        u8_field("resource"),
        u32_field("capacity"),
        u32_field("peak_busy"),
        u64_field("busy_ms"),
        u64_field("still_waiting"),
    ]);

    let arrays: Vec<ArrayRef> = vec![
        Arc::new(UInt8Array::from(
            stats.iter().map(|s| resource_code(s.resource)).collect::<Vec<_>>(),
        )),
        Arc::new(UInt32Array::from(
            stats.iter().map(|s| s.capacity).collect::<Vec<_>>(),
        )),
        Arc::new(UInt32Array::from(
            stats.iter().map(|s| s.peak_busy).collect::<Vec<_>>(),
        )),
        Arc::new(UInt64Array::from(
            stats.iter().map(|s| s.busy_ms).collect::<Vec<_>>(),
        )),
        Arc::new(UInt64Array::from(
            stats.iter().map(|s| s.still_waiting as u64).collect::<Vec<_>>(),
        )),
    ];

    write_record_batch(path, schema, arrays)
}
