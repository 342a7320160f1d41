//! Run one trading day with the default configuration and print its summary.
//!
//! Run with: cargo run -p qsr_core --example day_run -- [seed] [outcomes.parquet]
//! Set RUST_LOG=debug to follow every event.

use qsr_core::summary::DaySummary;
use qsr_core::telemetry_export::{write_outcomes_parquet, write_pool_stats_parquet};
use qsr_core::SimConfig;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut args = std::env::args().skip(1);
    let seed = match args.next() {
        Some(raw) => raw.parse::<u64>()?,
        None => 123,
    };
    let export_path = args.next();

    let config = SimConfig::default();
    let stream = qsr_core::run(&config, seed)?;
    let summary = DaySummary::from_stream(&stream, &config);

    println!("--- Day run (seed {seed}) ---");
    println!("{}", serde_json::to_string_pretty(&summary)?);

    if let Some(path) = export_path {
        write_outcomes_parquet(&path, &stream.records)?;
        let pools_path = format!("{path}.pools.parquet");
        write_pool_stats_parquet(&pools_path, &stream.pool_stats)?;
        println!(
            "Wrote {} outcome rows to {path} and pool stats to {pools_path}",
            stream.records.len()
        );
    }
    Ok(())
}
