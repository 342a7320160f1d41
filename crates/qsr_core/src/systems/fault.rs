use bevy_ecs::prelude::{In, ResMut, Resource};

use crate::error::{SimError, SimResult};

/// First error raised by a handler during the current run.
#[derive(Debug, Default, Resource)]
pub struct RunFault(pub Option<SimError>);

/// Piped after every handler; keeps the first fault, later ones are dropped.
pub fn capture_fault(In(result): In<SimResult<()>>, mut fault: ResMut<RunFault>) {
    if let Err(err) = result {
        if fault.0.is_none() {
            fault.0 = Some(err);
        }
    }
}
