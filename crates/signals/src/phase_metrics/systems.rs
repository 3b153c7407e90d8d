use bevy::prelude::*;

use crate::params::SignalParams;
use crate::phases::SignalPhases;

use super::{aggregate_phase_metrics, LaneSamples};

/// Aggregate lane samples into phase counters for every junction.
///
/// Junctions own their phase buffers exclusively, so the pass runs in
/// parallel across junctions.
pub fn update_phase_metrics(
    params: Res<SignalParams>,
    mut junctions: Query<(&LaneSamples, &mut SignalPhases)>,
) {
    let params: &SignalParams = &params;
    junctions
        .par_iter_mut()
        .for_each(|(lanes, mut phases)| {
            aggregate_phase_metrics(&mut phases, &lanes.lanes, params);
        });
}
