use crate::config::{DEFAULT_CYCLE_LENGTH, MAX_SIGNAL_DELAY};

use super::{GroupMember, OffsetParams};

/// Cycle length of a leader: the sum of its maximum phase durations, or
/// `DEFAULT_CYCLE_LENGTH` when that sum is zero.
pub fn leader_cycle_length(max_durations: &[u16]) -> u16 {
    let total: u32 = max_durations.iter().map(|&d| d as u32).sum();
    if total == 0 {
        DEFAULT_CYCLE_LENGTH
    } else {
        total.min(u16::MAX as u32) as u16
    }
}

/// Travel time from the leader, in ticks, shifted by the group offset.
pub fn travel_ticks(distance: f32, speed: f32, offset: f32) -> f32 {
    if speed.is_nan() || speed <= 0.0 || !distance.is_finite() {
        return offset.max(0.0);
    }
    distance / speed + offset
}

/// `round(distance / speed + offset)`, floored at zero.
pub fn green_wave_offset(distance: f32, speed: f32, offset: f32) -> i32 {
    let ticks = travel_ticks(distance, speed, offset).round();
    if ticks.is_finite() {
        ticks.clamp(0.0, i32::MAX as f32) as i32
    } else {
        0
    }
}

/// Follower phase offset for the enhanced green wave.
///
/// Time on the leader's cycle is measured from the start of `main_phase`
/// (1-based). A vehicle leaving then arrives `travel` ticks later; the
/// arrival point, as a fraction of the leader's cycle, is scaled to the
/// follower's own phase count.
pub fn enhanced_offset(
    travel: f32,
    leader_durations: &[u16],
    main_phase: u8,
    follower_phase_count: usize,
) -> i32 {
    if follower_phase_count == 0
        || leader_durations.is_empty()
        || !travel.is_finite()
        || travel <= 0.0
    {
        return 0;
    }

    let cycle = leader_cycle_length(leader_durations) as f32;
    let main = (main_phase as usize).saturating_sub(1) % leader_durations.len();
    let time_to_main: f32 = leader_durations[..main].iter().map(|&d| d as f32).sum();
    let arrival = (time_to_main + travel) % cycle;
    let count = follower_phase_count as f32;
    ((arrival / cycle * count).round() % count) as i32
}

/// Phase offset of a follower.
///
/// A manual signal delay wins. Otherwise offsets are only derived from
/// distance while the green wave is enabled.
pub fn member_offset(
    params: &OffsetParams,
    member: &GroupMember,
    leader_durations: &[u16],
    follower_phase_count: usize,
) -> i32 {
    if member.signal_delay != 0 {
        return member.signal_delay.clamp(0, MAX_SIGNAL_DELAY);
    }
    if !params.green_wave_enabled {
        return 0;
    }
    if params.use_enhanced_offsets && !leader_durations.is_empty() {
        let travel = travel_ticks(
            member.distance_to_leader,
            params.green_wave_speed,
            params.green_wave_offset,
        );
        return enhanced_offset(
            travel,
            leader_durations,
            params.main_phase,
            follower_phase_count,
        );
    }
    green_wave_offset(
        member.distance_to_leader,
        params.green_wave_speed,
        params.green_wave_offset,
    )
}
