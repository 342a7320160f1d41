pub mod arrivals;
pub mod clock;
pub mod distributions;
pub mod ecs;
pub mod equipment;
pub mod error;
pub mod menu;
pub mod pools;
pub mod rng;
pub mod runner;
pub mod scenario;
pub mod summary;
pub mod systems;
pub mod telemetry;
pub mod telemetry_export;

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers;

pub use error::{ConfigError, SimError, SimResult};
pub use runner::{run, run_with_sink, MetricsStream, RunEnd};
pub use scenario::SimConfig;
