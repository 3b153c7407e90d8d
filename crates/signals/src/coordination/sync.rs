use bevy::log::debug;

use crate::config::MAX_SYNC_TIMER;
use crate::ids::JunctionId;
use crate::junction_control::{JunctionSignalState, SignalState};
use crate::signal_delay::effective_timer;

/// Follower phase (1-based) matching `leader_phase` shifted by `offset`,
/// wrapped into the follower's `phase_count`. Returns 0 when either side has
/// no phase.
pub fn target_phase(leader_phase: u8, offset: i32, phase_count: usize) -> u8 {
    if leader_phase == 0 || phase_count == 0 {
        return 0;
    }
    let count = phase_count as i64;
    let shifted = (leader_phase as i64 + offset as i64 - 1).rem_euclid(count) + 1;
    shifted as u8
}

/// Phase the leader is running or heading into.
pub fn leader_heading(leader: &JunctionSignalState) -> u8 {
    match leader.state {
        SignalState::Ending | SignalState::Changing | SignalState::Beginning
            if leader.next_phase > 0 =>
        {
            leader.next_phase
        }
        _ => leader.current_phase,
    }
}

/// Steer a follower toward `target` without cutting its current phase short
/// of a clearance. Returns `true` if the follower was changed.
pub fn nudge_follower(follower: &mut JunctionSignalState, target: u8) -> bool {
    if target == 0 {
        return false;
    }
    match follower.state {
        SignalState::Ongoing => {
            if follower.current_phase == target {
                return false;
            }
            follower.next_phase = target;
            follower.transition_timer = 0;
            follower.state = SignalState::Ending;
            true
        }
        SignalState::Ending | SignalState::Changing | SignalState::Beginning => {
            if follower.next_phase == target {
                return false;
            }
            follower.next_phase = target;
            true
        }
        SignalState::None | SignalState::Extending | SignalState::Extended => false,
    }
}

/// Distance, in phases, from the expected follower phase to the actual one.
pub fn phase_drift(actual: u8, expected: u8, phase_count: usize) -> usize {
    if phase_count == 0 || actual == 0 || expected == 0 {
        return 0;
    }
    (actual as i64 - expected as i64).rem_euclid(phase_count as i64) as usize
}

/// Drift correction applies when the follower is more than one phase off in
/// either direction.
pub fn drift_needs_correction(drift: usize, phase_count: usize) -> bool {
    drift > 1 && drift + 1 < phase_count
}

/// Copy the leader's controller state onto a follower: state, offset-adjusted
/// current and next phase, and the leader timer shifted by the follower's own
/// open delay, clamped to `MAX_SYNC_TIMER`.
pub fn force_sync(
    follower: &mut JunctionSignalState,
    leader: &JunctionSignalState,
    offset: i32,
    phase_count: usize,
    open_delay: i32,
) {
    if phase_count == 0 {
        follower.fault();
        return;
    }
    follower.state = leader.state;
    follower.current_phase = target_phase(leader.current_phase, offset, phase_count);
    follower.next_phase = target_phase(leader.next_phase, offset, phase_count);
    follower.timer = effective_timer(leader.timer, open_delay).min(MAX_SYNC_TIMER);
    follower.transition_timer = leader.transition_timer;
}

/// Propagate a leader change, or correct drift, for one follower.
/// Returns `true` if the follower was nudged.
pub fn coordinate_follower(
    junction: JunctionId,
    follower: &mut JunctionSignalState,
    leader: &JunctionSignalState,
    offset: i32,
    phase_count: usize,
    leader_changed: bool,
) -> bool {
    if leader_changed {
        let target = target_phase(leader_heading(leader), offset, phase_count);
        let nudged = nudge_follower(follower, target);
        if nudged {
            debug!(
                "Junction {} follows leader toward phase {} ({:?})",
                junction, target, follower.state
            );
        }
        return nudged;
    }

    if leader.state != SignalState::Ongoing || follower.state != SignalState::Ongoing {
        return false;
    }
    let expected = target_phase(leader.current_phase, offset, phase_count);
    let drift = phase_drift(follower.current_phase, expected, phase_count);
    if !drift_needs_correction(drift, phase_count) {
        return false;
    }
    debug!(
        "Junction {} drifted {} phases from leader, nudging toward phase {}",
        junction, drift, expected
    );
    nudge_follower(follower, expected)
}
