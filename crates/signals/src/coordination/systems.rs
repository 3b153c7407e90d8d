use std::collections::BTreeMap;

use bevy::prelude::*;

use crate::ids::JunctionId;
use crate::junction_control::{JunctionSignalState, TrafficSignalJunction};
use crate::phases::SignalPhases;

use super::{coordinate_follower, leader_heading, JunctionLayout, NetworkLayout, SignalGroupRegistry};

/// Snapshot positions and phase durations of every junction.
pub fn collect_layout<'a>(
    junctions: impl Iterator<Item = (&'a JunctionId, &'a TrafficSignalJunction, &'a SignalPhases)>,
) -> NetworkLayout {
    junctions
        .map(|(&id, junction, phases)| {
            (
                id,
                JunctionLayout {
                    position: junction.position,
                    max_durations: phases.phases.iter().map(|p| p.max_duration).collect(),
                },
            )
        })
        .collect()
}

/// Group-ordered coordination pass, run after every junction has updated
/// its own controller this tick.
///
/// A leader whose junction is gone is replaced first. Then, for each
/// coordinated group: refresh offsets from the current layout,
/// propagate a leader phase/state change to followers in range, otherwise
/// correct follower drift, then advance the group cycle timer.
pub fn apply_group_coordination(
    mut registry: ResMut<SignalGroupRegistry>,
    mut junctions: Query<(
        Entity,
        &JunctionId,
        &TrafficSignalJunction,
        &SignalPhases,
        &mut JunctionSignalState,
    )>,
) {
    if registry.is_empty() {
        return;
    }

    let layout = collect_layout(
        junctions
            .iter()
            .map(|(_, id, junction, phases, _)| (id, junction, phases)),
    );
    let entities: BTreeMap<JunctionId, Entity> = junctions
        .iter()
        .map(|(entity, &id, ..)| (id, entity))
        .collect();

    registry.replace_missing_leaders(|id| entities.contains_key(&id));
    registry.refresh(&layout);

    for group in registry.groups_mut() {
        if !group.is_coordinated {
            continue;
        }
        group.advance_cycle_timer();

        let Some(leader_entity) = group.leader().and_then(|id| entities.get(&id)) else {
            continue;
        };
        let Ok((.., leader_signal)) = junctions.get(*leader_entity) else {
            continue;
        };
        let leader = *leader_signal;

        let seen = (leader.state, leader_heading(&leader));
        let leader_changed = group.last_leader_signal != Some(seen);
        group.last_leader_signal = Some(seen);

        for member in group.followers() {
            if member.distance_to_leader > group.max_coordination_distance {
                continue;
            }
            let Some(&entity) = entities.get(&member.junction) else {
                continue;
            };
            let Ok((_, _, _, phases, mut signal)) = junctions.get_mut(entity) else {
                continue;
            };
            let phase_count = phases.len();
            coordinate_follower(
                member.junction,
                &mut signal,
                &leader,
                member.phase_offset,
                phase_count,
                leader_changed,
            );
        }
    }
}
