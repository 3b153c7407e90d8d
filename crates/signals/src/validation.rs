//! Periodic self-healing pass over junction controllers and signal groups.
//!
//! Runs every slow-tick cycle in `SignalSet::Report`. Nothing here is fatal:
//! every inconsistency is repaired in place, logged with `warn!`, and counted
//! in [`RepairReport`] as "N of M entities affected".
//!
//! Checked:
//! 1. **Phase bounds**: `min_duration <= max_duration`, else reset to the
//!    repair bounds.
//! 2. **Mask buffers**: one edge group mask per phase.
//! 3. **Phase delays**: per-class open/close delays within range.
//! 4. **State indices**: current/next phase exist; a running state has a phase.
//! 5. **Manual overrides**: the requested phase exists.
//! 6. **Group parameters**: positive finite speed, non-zero cycle length,
//!    non-negative coordination distance.
//! 7. **Member parameters**: non-negative distances and offsets.
//! 8. **Leaders**: exactly one per non-empty group.
//! 9. **Dangling members**: members whose junction no longer exists.

use std::collections::BTreeSet;
use std::fmt;

use bevy::prelude::*;

use crate::config::{
    DEFAULT_CYCLE_LENGTH, DEFAULT_GREEN_WAVE_SPEED, DEFAULT_MAX_COORDINATION_DISTANCE,
    REPAIR_MAX_DURATION, REPAIR_MIN_DURATION,
};
use crate::coordination::{SignalGroup, SignalGroupRegistry};
use crate::ids::JunctionId;
use crate::junction_control::{JunctionSignalState, SignalState};
use crate::phases::SignalPhases;
use crate::SlowTickTimer;

/// "N of M entities affected" for one repair category.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RepairCount {
    pub affected: u32,
    pub checked: u32,
}

impl RepairCount {
    fn record(&mut self, repaired: bool) {
        self.checked += 1;
        if repaired {
            self.affected += 1;
        }
    }
}

impl fmt::Display for RepairCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} of {}", self.affected, self.checked)
    }
}

/// Outcome of the most recent validation pass.
#[derive(Resource, Debug, Clone, Default, PartialEq, Eq)]
pub struct RepairReport {
    /// Number of validation passes run so far.
    pub passes: u32,
    pub phase_bounds: RepairCount,
    pub mask_buffers: RepairCount,
    pub phase_delays: RepairCount,
    pub state_indices: RepairCount,
    pub manual_overrides: RepairCount,
    pub group_params: RepairCount,
    pub member_params: RepairCount,
    pub leaders: RepairCount,
    pub dangling_members: RepairCount,
}

impl RepairReport {
    /// Flat list of categories, in check order.
    pub fn entries(&self) -> [(&'static str, RepairCount); 9] {
        [
            ("phase_bounds", self.phase_bounds),
            ("mask_buffers", self.mask_buffers),
            ("phase_delays", self.phase_delays),
            ("state_indices", self.state_indices),
            ("manual_overrides", self.manual_overrides),
            ("group_params", self.group_params),
            ("member_params", self.member_params),
            ("leaders", self.leaders),
            ("dangling_members", self.dangling_members),
        ]
    }

    pub fn total_affected(&self) -> u32 {
        self.entries().iter().map(|(_, count)| count.affected).sum()
    }

    fn reset_counts(&mut self) {
        let passes = self.passes;
        *self = Self {
            passes,
            ..Default::default()
        };
    }
}

// ---------------------------------------------------------------------------
// Junction repairs
// ---------------------------------------------------------------------------

/// Repair one junction's phase list. Returns the number of phases whose
/// bounds were reset and whose delays were clamped, and whether the mask
/// buffer had to be resized.
pub fn repair_phases(junction: JunctionId, phases: &mut SignalPhases) -> PhaseRepairs {
    let mut repairs = PhaseRepairs {
        masks_resized: phases.sync_masks(),
        ..Default::default()
    };
    if repairs.masks_resized {
        warn!(
            "Junction {}: edge group masks out of sync with {} phases. Resized.",
            junction,
            phases.len()
        );
    }

    for (index, phase) in phases.phases.iter_mut().enumerate() {
        let bad_bounds = phase.min_duration > phase.max_duration;
        if bad_bounds {
            warn!(
                "Junction {} phase {}: min duration {} exceeds max {}. Resetting to {}/{}.",
                junction,
                index + 1,
                phase.min_duration,
                phase.max_duration,
                REPAIR_MIN_DURATION,
                REPAIR_MAX_DURATION
            );
            phase.repair_bounds();
        }
        repairs.bounds.push(bad_bounds);
    }

    for (index, mask) in phases.masks.iter_mut().enumerate() {
        let open = mask.open_delay.clamp_all();
        let close = mask.close_delay.clamp_all();
        if open || close {
            warn!(
                "Junction {} phase {}: signal delays out of range. Clamped.",
                junction,
                index + 1
            );
        }
        repairs.delays.push(open || close);
    }

    repairs
}

/// Per-phase outcome of [`repair_phases`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PhaseRepairs {
    pub masks_resized: bool,
    pub bounds: Vec<bool>,
    pub delays: Vec<bool>,
}

/// Repair the controller's phase references. Returns
/// `(state_faulted, override_cleared)`.
pub fn repair_signal(
    junction: JunctionId,
    signal: &mut JunctionSignalState,
    phase_count: usize,
) -> (bool, bool) {
    let count = phase_count.min(u8::MAX as usize) as u8;
    let running = !matches!(signal.state, SignalState::None);
    let dangling = signal.current_phase > count
        || signal.next_phase > count
        || (running && signal.current_phase == 0 && signal.next_phase == 0);
    if dangling {
        warn!(
            "Junction {}: state {:?} refers to phase {}/{} of {}. Resetting controller.",
            junction, signal.state, signal.current_phase, signal.next_phase, phase_count
        );
        signal.fault();
    }

    let stale_override = signal.manual_override_phase > count;
    if stale_override {
        warn!(
            "Junction {}: manual override to missing phase {}. Cleared.",
            junction, signal.manual_override_phase
        );
        signal.manual_override_phase = 0;
    }

    (dangling, stale_override)
}

// ---------------------------------------------------------------------------
// Group repairs
// ---------------------------------------------------------------------------

/// Restore invalid group parameters to their defaults. Returns `true` if the
/// group itself was touched, plus one flag per member.
pub fn repair_group_params(group: &mut SignalGroup) -> (bool, Vec<bool>) {
    let mut touched = false;

    if !group.green_wave_speed.is_finite() || group.green_wave_speed <= 0.0 {
        warn!(
            "Signal group {}: green wave speed {} invalid. Reset to {}.",
            group.id, group.green_wave_speed, DEFAULT_GREEN_WAVE_SPEED
        );
        group.green_wave_speed = DEFAULT_GREEN_WAVE_SPEED;
        touched = true;
    }
    if !group.green_wave_offset.is_finite() {
        warn!("Signal group {}: green wave offset not finite. Reset to 0.", group.id);
        group.green_wave_offset = 0.0;
        touched = true;
    }
    if group.cycle_length == 0 {
        warn!(
            "Signal group {}: zero cycle length. Reset to {}.",
            group.id, DEFAULT_CYCLE_LENGTH
        );
        group.cycle_length = DEFAULT_CYCLE_LENGTH;
        touched = true;
    }
    if group.cycle_timer >= group.cycle_length {
        group.cycle_timer %= group.cycle_length;
        touched = true;
    }
    if !group.max_coordination_distance.is_finite() || group.max_coordination_distance < 0.0 {
        warn!(
            "Signal group {}: max coordination distance {} invalid. Reset to {}.",
            group.id, group.max_coordination_distance, DEFAULT_MAX_COORDINATION_DISTANCE
        );
        group.max_coordination_distance = DEFAULT_MAX_COORDINATION_DISTANCE;
        touched = true;
    }

    let id = group.id;
    let members = group
        .members
        .iter_mut()
        .map(|member| {
            let mut fixed = false;
            if !member.distance_to_leader.is_finite() || member.distance_to_leader < 0.0 {
                member.distance_to_leader = 0.0;
                fixed = true;
            }
            if member.phase_offset < 0 {
                member.phase_offset = 0;
                fixed = true;
            }
            if fixed {
                warn!(
                    "Signal group {} member {}: negative distance or offset. Clamped to 0.",
                    id, member.junction
                );
            }
            fixed
        })
        .collect();

    (touched, members)
}

// ---------------------------------------------------------------------------
// System: validate_signal_state
// ---------------------------------------------------------------------------

pub fn validate_signal_state(
    slow_tick: Res<SlowTickTimer>,
    mut report: ResMut<RepairReport>,
    mut registry: ResMut<SignalGroupRegistry>,
    mut junctions: Query<(&JunctionId, &mut SignalPhases, &mut JunctionSignalState)>,
) {
    if !slow_tick.should_run() {
        return;
    }

    report.reset_counts();
    report.passes += 1;

    let mut existing = BTreeSet::new();
    for (&id, mut phases, mut signal) in &mut junctions {
        existing.insert(id);

        let repairs = repair_phases(id, &mut phases);
        report.mask_buffers.record(repairs.masks_resized);
        for repaired in repairs.bounds {
            report.phase_bounds.record(repaired);
        }
        for repaired in repairs.delays {
            report.phase_delays.record(repaired);
        }

        let (faulted, cleared) = repair_signal(id, &mut signal, phases.len());
        report.state_indices.record(faulted);
        report.manual_overrides.record(cleared);
    }

    for group in registry.groups_mut() {
        let (touched, members) = repair_group_params(group);
        report.group_params.record(touched);
        for fixed in members {
            report.member_params.record(fixed);
        }
    }

    let members_before: usize = registry.groups().map(|g| g.len()).sum();
    let groups_before = registry.len();
    let housekeeping = registry.housekeeping(|junction| existing.contains(&junction));
    report.dangling_members = RepairCount {
        affected: housekeeping.dangling_members,
        checked: members_before as u32,
    };
    report.leaders = RepairCount {
        affected: housekeeping.leaders_elected,
        checked: groups_before as u32,
    };

    if report.total_affected() > 0 {
        info!(
            "Signal validation pass {}: {} repairs",
            report.passes,
            report.total_affected()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::phases::{Phase, VehicleClass};

    #[test]
    fn test_reversed_bounds_reset_to_repair_defaults() {
        let mut phases = SignalPhases::new(vec![Phase::with_durations(2, 10), Phase::default()]);
        phases.phases[1].min_duration = 40;
        phases.phases[1].max_duration = 5;

        let repairs = repair_phases(JunctionId(1), &mut phases);
        assert_eq!(repairs.bounds, vec![false, true]);
        assert_eq!(phases.phases[1].min_duration, REPAIR_MIN_DURATION);
        assert_eq!(phases.phases[1].max_duration, REPAIR_MAX_DURATION);
        assert_eq!(phases.phases[0].max_duration, 10);
    }

    #[test]
    fn test_mask_buffer_resynced_and_delays_clamped() {
        let mut phases = SignalPhases::new(vec![Phase::default(), Phase::default()]);
        phases.masks.truncate(1);
        phases.masks[0].open_delay.car = 900;

        let repairs = repair_phases(JunctionId(1), &mut phases);
        assert!(repairs.masks_resized);
        assert_eq!(phases.masks.len(), 2);
        assert_eq!(repairs.delays, vec![true, false]);
        assert_eq!(phases.masks[0].open_delay.get(VehicleClass::Car), 300);
    }

    #[test]
    fn test_dangling_phase_reference_faults() {
        let mut signal = JunctionSignalState {
            state: SignalState::Ongoing,
            current_phase: 4,
            timer: 7,
            manual_override_phase: 9,
            ..Default::default()
        };
        let (faulted, cleared) = repair_signal(JunctionId(2), &mut signal, 3);
        assert!(faulted);
        assert!(cleared);
        assert_eq!(signal.state, SignalState::None);
        assert_eq!(signal.current_phase, 0);
        assert_eq!(signal.timer, 0);
        assert_eq!(signal.manual_override_phase, 0);
    }

    #[test]
    fn test_valid_signal_untouched() {
        let mut signal = JunctionSignalState {
            state: SignalState::Ending,
            current_phase: 1,
            next_phase: 3,
            manual_override_phase: 2,
            ..Default::default()
        };
        let before = signal;
        assert_eq!(repair_signal(JunctionId(2), &mut signal, 3), (false, false));
        assert_eq!(signal, before);
    }

    #[test]
    fn test_group_params_restored() {
        let mut group = SignalGroup::new(crate::ids::GroupId(0));
        group.push_member(JunctionId(1));
        group.push_member(JunctionId(2));
        group.green_wave_speed = -3.0;
        group.cycle_length = 0;
        group.max_coordination_distance = f32::NAN;
        group.members[1].phase_offset = -4;

        let (touched, members) = repair_group_params(&mut group);
        assert!(touched);
        assert_eq!(members, vec![false, true]);
        assert_eq!(group.green_wave_speed, DEFAULT_GREEN_WAVE_SPEED);
        assert_eq!(group.cycle_length, DEFAULT_CYCLE_LENGTH);
        assert_eq!(group.max_coordination_distance, DEFAULT_MAX_COORDINATION_DISTANCE);
        assert_eq!(group.members[1].phase_offset, 0);
    }

    #[test]
    fn test_report_formats_counts() {
        let count = RepairCount {
            affected: 2,
            checked: 7,
        };
        assert_eq!(count.to_string(), "2 of 7");
        let report = RepairReport {
            phase_bounds: count,
            leaders: RepairCount {
                affected: 1,
                checked: 1,
            },
            ..Default::default()
        };
        assert_eq!(report.total_affected(), 3);
    }
}
