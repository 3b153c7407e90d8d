use bevy::prelude::*;

use crate::params::SignalParams;
use crate::phases::SignalPhases;

use super::{update_junction, JunctionSignalState, TrafficSignalJunction};

/// Step every junction's controller by one tick.
pub fn update_junction_states(
    params: Res<SignalParams>,
    mut junctions: Query<(
        &TrafficSignalJunction,
        &mut SignalPhases,
        &mut JunctionSignalState,
    )>,
) {
    let params: &SignalParams = &params;
    junctions
        .par_iter_mut()
        .for_each(|(junction, mut phases, mut signal)| {
            update_junction(junction.mode, &mut phases, &mut signal, params);
        });
}
