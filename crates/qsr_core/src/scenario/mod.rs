//! Day configuration: staffing, channels, service times, menu and costs, and
//! the world setup that turns a configuration into a runnable simulation.

mod build;
mod params;

pub use build::build_simulation;
pub use params::{
    ArrivalProcess, BalkRule, ChannelConfig, CoffeeService, CostModel, ItemsPerOrder, MenuItem,
    ServiceTimes, SimConfig, SimulationHorizonMs, Staffing,
};
