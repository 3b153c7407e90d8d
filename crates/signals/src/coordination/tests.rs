use bevy::math::Vec2;

use super::*;
use crate::commands::CommandError;
use crate::ids::{GroupId, JunctionId};
use crate::junction_control::{JunctionSignalState, SignalState};
use crate::Saveable;

fn layout(entries: Vec<(u32, f32, Vec<u16>)>) -> NetworkLayout {
    entries
        .into_iter()
        .map(|(id, x, max_durations)| {
            (
                JunctionId(id),
                JunctionLayout {
                    position: Vec2::new(x, 0.0),
                    max_durations,
                },
            )
        })
        .collect()
}

fn ongoing(phase: u8) -> JunctionSignalState {
    JunctionSignalState {
        state: SignalState::Ongoing,
        current_phase: phase,
        timer: 3,
        ..Default::default()
    }
}

// ---------------------------------------------------------------------------
// Offsets
// ---------------------------------------------------------------------------

#[test]
fn test_green_wave_offset_from_distance_and_speed() {
    assert_eq!(green_wave_offset(100.0, 10.0, 0.0), 10);
    assert_eq!(green_wave_offset(104.0, 10.0, 0.5), 11);
    assert_eq!(green_wave_offset(0.0, 10.0, -4.0), 0);
}

#[test]
fn test_manual_delay_wins_and_disabled_wave_gives_zero() {
    let mut params = OffsetParams {
        green_wave_enabled: true,
        green_wave_speed: 10.0,
        green_wave_offset: 0.0,
        use_enhanced_offsets: false,
        main_phase: 1,
    };
    let mut member = GroupMember::new(JunctionId(1), 1);
    member.distance_to_leader = 100.0;
    assert_eq!(member_offset(&params, &member, &[], 4), 10);

    member.signal_delay = 3;
    assert_eq!(member_offset(&params, &member, &[], 4), 3);

    member.signal_delay = 0;
    params.green_wave_enabled = false;
    assert_eq!(member_offset(&params, &member, &[], 4), 0);
}

#[test]
fn test_enhanced_offset_scales_arrival_to_follower_phases() {
    // Leader cycle 40; arrival halfway through it lands on the middle of
    // a four-phase follower.
    assert_eq!(enhanced_offset(20.0, &[10, 30], 1, 4), 2);
    // Measured from the start of the main phase.
    assert_eq!(enhanced_offset(20.0, &[10, 30], 2, 4), 3);
    // Wraps at the leader cycle.
    assert_eq!(enhanced_offset(40.0, &[10, 10, 10], 1, 3), 1);
    // A full cycle of travel lands back on the first phase.
    assert_eq!(enhanced_offset(30.0, &[10, 10, 10], 1, 3), 0);
    assert_eq!(enhanced_offset(12.0, &[], 1, 4), 0);
    assert_eq!(enhanced_offset(12.0, &[10, 10], 1, 0), 0);
    assert_eq!(enhanced_offset(-3.0, &[10, 10], 1, 4), 0);
}

#[test]
fn test_enhanced_offset_uses_follower_phase_count() {
    // Same leader schedule, followers with different phase counts.
    let mut registry = SignalGroupRegistry::default();
    let id = registry
        .create_group(&[JunctionId(1), JunctionId(2), JunctionId(3)])
        .expect("group created");
    registry
        .set_green_wave(id, true, 10.0, 0.0)
        .expect("green wave set");
    registry
        .set_enhanced_offsets(id, true, 1)
        .expect("enhanced offsets set");

    let network = layout(vec![
        (1, 0.0, vec![10, 30]),
        (2, 200.0, vec![5, 5, 5, 5]),
        (3, 200.0, vec![5, 5]),
    ]);
    registry.refresh(&network);
    let group = registry.group(id).expect("group exists");
    assert_eq!(group.member(JunctionId(2)).map(|m| m.phase_offset), Some(2));
    assert_eq!(group.member(JunctionId(3)).map(|m| m.phase_offset), Some(1));
}

#[test]
fn test_cycle_length_defaults_when_leader_has_no_time() {
    assert_eq!(leader_cycle_length(&[10, 20]), 30);
    assert_eq!(leader_cycle_length(&[]), 16);
    assert_eq!(leader_cycle_length(&[0, 0]), 16);
}

// ---------------------------------------------------------------------------
// Registry lifecycle
// ---------------------------------------------------------------------------

#[test]
fn test_first_member_leads_new_group() {
    let mut registry = SignalGroupRegistry::default();
    let id = registry
        .create_group(&[JunctionId(1), JunctionId(2), JunctionId(1)])
        .expect("group created");
    let group = registry.group(id).expect("group exists");
    assert_eq!(group.len(), 2);
    assert_eq!(group.leader(), Some(JunctionId(1)));
    assert_eq!(registry.group_of(JunctionId(2)), Some(id));
}

#[test]
fn test_membership_errors() {
    let mut registry = SignalGroupRegistry::default();
    assert!(matches!(
        registry.create_group(&[]),
        Err(CommandError::InvalidParameter(_))
    ));
    let id = registry
        .create_group(&[JunctionId(1)])
        .expect("group created");
    assert_eq!(
        registry.create_group(&[JunctionId(1)]),
        Err(CommandError::AlreadyMember)
    );
    assert_eq!(
        registry.add_member(id, JunctionId(1)),
        Err(CommandError::AlreadyMember)
    );
    assert_eq!(
        registry.add_member(GroupId(99), JunctionId(2)),
        Err(CommandError::NotFound)
    );
    assert_eq!(
        registry.set_leader(id, JunctionId(7)),
        Err(CommandError::NotMember)
    );
    assert_eq!(
        registry.remove_member(JunctionId(7)),
        Err(CommandError::NotMember)
    );
    assert_eq!(registry.join_groups(id, id), Err(CommandError::SameGroup));
}

#[test]
fn test_set_leader_demotes_previous() {
    let mut registry = SignalGroupRegistry::default();
    let id = registry
        .create_group(&[JunctionId(1), JunctionId(2), JunctionId(3)])
        .expect("group created");
    registry
        .set_leader(id, JunctionId(3))
        .expect("leader changed");
    let group = registry.group(id).expect("group exists");
    assert_eq!(group.leader(), Some(JunctionId(3)));
    assert_eq!(group.members.iter().filter(|m| m.is_leader).count(), 1);
}

#[test]
fn test_removing_leader_elects_new_one_and_recomputes_offsets() {
    let mut registry = SignalGroupRegistry::default();
    let id = registry
        .create_group(&[JunctionId(1), JunctionId(2), JunctionId(3)])
        .expect("group created");
    registry
        .set_green_wave(id, true, 10.0, 0.0)
        .expect("green wave set");

    let network = layout(vec![
        (1, 0.0, vec![10, 10]),
        (2, 100.0, vec![8, 9]),
        (3, 300.0, vec![10, 10]),
    ]);
    registry.refresh(&network);
    let group = registry.group(id).expect("group exists");
    assert_eq!(group.member(JunctionId(2)).map(|m| m.phase_offset), Some(10));
    assert_eq!(group.member(JunctionId(3)).map(|m| m.phase_offset), Some(30));

    registry.remove_member(JunctionId(1)).expect("removed");
    registry.refresh(&network);
    let group = registry.group(id).expect("group survives");
    assert_eq!(group.leader(), Some(JunctionId(2)));
    assert_eq!(group.cycle_length, 17);
    let follower = group.member(JunctionId(3)).expect("follower stays");
    assert_eq!(follower.group_index, 1);
    assert!((follower.distance_to_leader - 200.0).abs() < 1e-3);
    assert_eq!(follower.phase_offset, 20);
    assert_eq!(group.member(JunctionId(2)).map(|m| m.phase_offset), Some(0));
}

#[test]
fn test_removing_last_member_deletes_group() {
    let mut registry = SignalGroupRegistry::default();
    let id = registry
        .create_group(&[JunctionId(4)])
        .expect("group created");
    registry.remove_member(JunctionId(4)).expect("removed");
    assert!(registry.group(id).is_none());
    assert!(registry.is_empty());
}

#[test]
fn test_join_groups_averages_by_member_count() {
    let mut registry = SignalGroupRegistry::default();
    let a = registry
        .create_group(&[JunctionId(1), JunctionId(2), JunctionId(3)])
        .expect("group a");
    let b = registry
        .create_group(&[JunctionId(4)])
        .expect("group b");
    registry.set_green_wave(a, true, 40.0, 0.0).expect("a wave");
    registry.set_green_wave(b, true, 80.0, 4.0).expect("b wave");

    registry.join_groups(a, b).expect("joined");
    assert!(registry.group(b).is_none());
    let group = registry.group(a).expect("target survives");
    assert_eq!(group.len(), 4);
    assert!((group.green_wave_speed - 50.0).abs() < 1e-4);
    assert!((group.green_wave_offset - 1.0).abs() < 1e-4);
    assert_eq!(group.leader(), Some(JunctionId(1)));
    let absorbed = group.member(JunctionId(4)).expect("absorbed member");
    assert!(!absorbed.is_leader);
    assert_eq!(absorbed.group_index, 3);
    assert_eq!(registry.group_of(JunctionId(4)), Some(a));
}

#[test]
fn test_parameter_validation() {
    let mut registry = SignalGroupRegistry::default();
    let id = registry
        .create_group(&[JunctionId(1)])
        .expect("group created");
    assert!(registry.set_green_wave(id, true, 0.0, 0.0).is_err());
    assert!(registry.set_green_wave(id, true, f32::NAN, 0.0).is_err());
    assert!(registry.set_max_coordination_distance(id, -1.0).is_err());
    assert!(registry.set_enhanced_offsets(id, true, 0).is_err());
    assert_eq!(
        registry.set_member_signal_delay(JunctionId(1), 999),
        Ok(300)
    );
}

#[test]
fn test_housekeeping_drops_dangling_members() {
    let mut registry = SignalGroupRegistry::default();
    let a = registry
        .create_group(&[JunctionId(1), JunctionId(2)])
        .expect("group a");
    let b = registry
        .create_group(&[JunctionId(3)])
        .expect("group b");

    let report = registry.housekeeping(|j| j != JunctionId(1) && j != JunctionId(3));
    assert_eq!(report.dangling_members, 2);
    assert_eq!(report.deleted_groups, 1);
    assert_eq!(report.leaders_elected, 1);
    assert!(registry.group(b).is_none());
    let group = registry.group(a).expect("group a survives");
    assert_eq!(group.leader(), Some(JunctionId(2)));
    assert_eq!(group.members[0].group_index, 0);
    assert_eq!(registry.group_of(JunctionId(1)), None);
}

#[test]
fn test_missing_leaders_replaced_in_group_order() {
    let mut registry = SignalGroupRegistry::default();
    let a = registry
        .create_group(&[JunctionId(1), JunctionId(2), JunctionId(3)])
        .expect("group a");
    let b = registry
        .create_group(&[JunctionId(4)])
        .expect("group b");

    // Leader 1 and its successor 2 are both gone.
    let replaced =
        registry.replace_missing_leaders(|j| ![1, 2, 4].contains(&j.0));
    assert_eq!(replaced, 2);
    assert!(registry.group(b).is_none());
    let group = registry.group(a).expect("group a survives");
    assert_eq!(group.leader(), Some(JunctionId(3)));
    assert_eq!(group.members[0].group_index, 0);
    assert_eq!(registry.group_of(JunctionId(1)), None);
    assert_eq!(registry.group_of(JunctionId(2)), None);
    assert_eq!(registry.group_of(JunctionId(3)), Some(a));

    assert_eq!(registry.replace_missing_leaders(|_| true), 0);
}

#[test]
fn test_registry_save_roundtrip() {
    let mut registry = SignalGroupRegistry::default();
    assert!(registry.save_to_bytes().is_none());

    let id = registry
        .create_group(&[JunctionId(1), JunctionId(2)])
        .expect("group created");
    registry
        .set_green_wave(id, true, 25.0, 1.0)
        .expect("green wave set");
    let bytes = registry.save_to_bytes().expect("non-empty registry saves");

    let mut restored = SignalGroupRegistry::load_from_bytes(&bytes);
    assert_eq!(restored.group_of(JunctionId(2)), Some(id));
    let group = restored.group(id).expect("group restored");
    assert_eq!(group.green_wave_speed, 25.0);
    assert_eq!(group.leader(), Some(JunctionId(1)));

    let next = restored
        .create_group(&[JunctionId(9)])
        .expect("new group");
    assert_ne!(next, id);
}

// ---------------------------------------------------------------------------
// Follower synchronization
// ---------------------------------------------------------------------------

#[test]
fn test_target_phase_wraps_offset() {
    assert_eq!(target_phase(1, 0, 4), 1);
    assert_eq!(target_phase(3, 2, 4), 1);
    assert_eq!(target_phase(1, -1, 4), 4);
    assert_eq!(target_phase(2, 10, 3), 3);
    assert_eq!(target_phase(0, 1, 4), 0);
    assert_eq!(target_phase(2, 1, 0), 0);
}

#[test]
fn test_nudge_moves_ongoing_follower_to_ending() {
    let mut follower = ongoing(1);
    assert!(nudge_follower(&mut follower, 2));
    assert_eq!(follower.state, SignalState::Ending);
    assert_eq!(follower.next_phase, 2);
    assert_eq!(follower.current_phase, 1);

    let mut follower = ongoing(2);
    assert!(!nudge_follower(&mut follower, 2));
    assert_eq!(follower.state, SignalState::Ongoing);
}

#[test]
fn test_nudge_retargets_clearance_and_ignores_idle() {
    let mut follower = JunctionSignalState {
        state: SignalState::Changing,
        current_phase: 1,
        next_phase: 2,
        ..Default::default()
    };
    assert!(nudge_follower(&mut follower, 3));
    assert_eq!(follower.state, SignalState::Changing);
    assert_eq!(follower.next_phase, 3);

    let mut idle = JunctionSignalState::default();
    assert!(!nudge_follower(&mut idle, 1));
    assert_eq!(idle.state, SignalState::None);
}

#[test]
fn test_drift_correction_window() {
    assert!(!drift_needs_correction(phase_drift(2, 1, 2), 2));
    assert!(!drift_needs_correction(phase_drift(2, 1, 4), 4));
    assert!(drift_needs_correction(phase_drift(3, 1, 4), 4));
    assert!(!drift_needs_correction(phase_drift(4, 1, 4), 4));
    assert_eq!(phase_drift(1, 3, 4), 2);
}

#[test]
fn test_force_sync_copies_offset_state_and_clamps_timer() {
    let leader = JunctionSignalState {
        state: SignalState::Ending,
        current_phase: 2,
        next_phase: 3,
        timer: 400,
        transition_timer: 1,
        manual_override_phase: 0,
    };
    let mut follower = ongoing(1);
    force_sync(&mut follower, &leader, 1, 3, 0);
    assert_eq!(follower.state, SignalState::Ending);
    assert_eq!(follower.current_phase, 3);
    assert_eq!(follower.next_phase, 1);
    assert_eq!(follower.timer, 255);
    assert_eq!(follower.transition_timer, 1);

    let leader = JunctionSignalState {
        timer: 10,
        ..ongoing(1)
    };
    force_sync(&mut follower, &leader, 0, 3, 4);
    assert_eq!(follower.timer, 6);
}

#[test]
fn test_leader_change_propagates_heading_phase() {
    let leader = JunctionSignalState {
        state: SignalState::Ending,
        current_phase: 1,
        next_phase: 2,
        ..Default::default()
    };
    let mut follower = ongoing(1);
    assert!(coordinate_follower(JunctionId(2), &mut follower, &leader, 1, 4, true));
    assert_eq!(follower.next_phase, 3);
    assert_eq!(follower.state, SignalState::Ending);
}

#[test]
fn test_cycle_timer_wraps() {
    let mut group = SignalGroup::new(GroupId(0));
    group.cycle_length = 3;
    for _ in 0..4 {
        group.advance_cycle_timer();
    }
    assert_eq!(group.cycle_timer, 1);
}
