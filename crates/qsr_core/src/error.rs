//! Error taxonomy for the simulation core.
//!
//! Balking and reneging are not errors: they are ordinary terminal outcomes
//! recorded in the metrics stream. Everything here aborts the run.

use thiserror::Error;

use crate::clock::Event;
use crate::ecs::ResourceKind;

/// Invalid configuration, reported before the simulation starts.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("{resource:?} capacity must be at least 1, got {capacity}")]
    InvalidCapacity { resource: ResourceKind, capacity: u32 },

    #[error("invalid time window: {0}")]
    InvalidHorizon(String),

    #[error("malformed distribution for {what}: {reason}")]
    MalformedDistribution { what: String, reason: String },

    #[error("invalid menu: {0}")]
    InvalidMenu(String),

    #[error("invalid balk rule: {0}")]
    InvalidBalkRule(String),

    #[error("invalid equipment: {0}")]
    InvalidEquipment(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ClockError {
    #[error("cannot schedule event at {requested} ms: clock is already at {now} ms")]
    InvalidTime { requested: u64, now: u64 },
}

#[derive(Debug, Error)]
pub enum SimError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("clock error: {0}")]
    Clock(#[from] ClockError),

    #[error("invariant violated at {at_ms} ms: {message} (last {} events in trace)", .trace.len())]
    Invariant {
        message: String,
        at_ms: u64,
        trace: Vec<Event>,
    },

    #[error("export failed: {0}")]
    Export(String),
}

impl SimError {
    /// An invariant violation without trace context; the runner attaches the
    /// time and the recent event trace before surfacing it.
    pub fn invariant(message: impl Into<String>) -> Self {
        SimError::Invariant {
            message: message.into(),
            at_ms: 0,
            trace: Vec::new(),
        }
    }

    pub fn is_invariant_violation(&self) -> bool {
        matches!(self, SimError::Invariant { .. } | SimError::Clock(_))
    }
}

pub type SimResult<T> = Result<T, SimError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_errors_convert_into_sim_errors() {
        let err: SimError = ConfigError::InvalidCapacity {
            resource: ResourceKind::Cook,
            capacity: 0,
        }
        .into();
        assert!(matches!(err, SimError::Config(_)));
        assert!(!err.is_invariant_violation());
        assert_eq!(
            err.to_string(),
            "configuration error: Cook capacity must be at least 1, got 0"
        );
    }

    #[test]
    fn clock_errors_count_as_invariant_violations() {
        let err: SimError = ClockError::InvalidTime {
            requested: 1,
            now: 2,
        }
        .into();
        assert!(err.is_invariant_violation());
    }
}
