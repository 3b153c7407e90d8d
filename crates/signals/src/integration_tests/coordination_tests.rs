use bevy::prelude::*;

use crate::commands::{CommandResult, SignalCommand};
use crate::ids::{GroupId, JunctionId};
use crate::junction_control::SignalState;
use crate::phase_selector::SignalMode;
use crate::phases::Phase;
use crate::test_harness::TestNetwork;

use super::scenario_tests::tick_until;

fn fixed_pair() -> Vec<Phase> {
    vec![Phase::with_durations(2, 10), Phase::with_durations(2, 10)]
}

fn group_id(net: &TestNetwork, junction: u32) -> GroupId {
    net.group_of(junction).expect("junction is grouped")
}

fn offset_of(net: &TestNetwork, junction: u32) -> i32 {
    let group = net
        .registry()
        .group(group_id(net, junction))
        .expect("group exists");
    group
        .member(JunctionId(junction))
        .expect("member exists")
        .phase_offset
}

// ---------------------------------------------------------------------------
// Offsets
// ---------------------------------------------------------------------------

#[test]
fn test_green_wave_offset_from_distance() {
    let mut net = TestNetwork::new()
        .with_corridor(1, 2, 100.0, SignalMode::FixedTimed, fixed_pair())
        .with_group(&[1, 2]);
    let group = group_id(&net, 1);

    let result = net.execute(SignalCommand::SetGreenWave {
        group,
        enabled: true,
        speed: 10.0,
        offset: 0.0,
    });
    assert_eq!(result, CommandResult::Success);
    assert_eq!(offset_of(&net, 1), 0);
    assert_eq!(offset_of(&net, 2), 10);

    let member = net
        .registry()
        .group(group)
        .and_then(|g| g.member(JunctionId(2)).cloned())
        .expect("member");
    assert_eq!(member.distance_to_leader, 100.0);
}

#[test]
fn test_offsets_zero_while_green_wave_disabled() {
    let mut net = TestNetwork::new()
        .with_corridor(1, 3, 100.0, SignalMode::FixedTimed, fixed_pair())
        .with_group(&[1, 2, 3]);
    net.tick(1);
    assert_eq!(offset_of(&net, 2), 0);
    assert_eq!(offset_of(&net, 3), 0);
}

#[test]
fn test_removing_leader_recomputes_offsets() {
    let mut net = TestNetwork::new()
        .with_corridor(1, 3, 100.0, SignalMode::FixedTimed, fixed_pair())
        .with_group(&[1, 2, 3]);
    let group = group_id(&net, 1);
    net.execute(SignalCommand::SetGreenWave {
        group,
        enabled: true,
        speed: 10.0,
        offset: 0.0,
    });
    assert_eq!(offset_of(&net, 3), 20);

    let result = net.execute(SignalCommand::RemoveMember {
        junction: JunctionId(1),
    });
    assert!(result.is_success());
    assert_eq!(net.group_of(1), None);

    let leader = net.registry().group(group).and_then(|g| g.leader());
    assert_eq!(leader, Some(JunctionId(2)));
    assert_eq!(offset_of(&net, 2), 0);
    assert_eq!(offset_of(&net, 3), 10);
    net.assert_single_leader_per_group();
}

#[test]
fn test_despawned_leader_replaced_on_next_tick() {
    let mut net = TestNetwork::new()
        .with_corridor(1, 3, 100.0, SignalMode::FixedTimed, fixed_pair())
        .with_group(&[1, 2, 3]);
    let group = group_id(&net, 1);
    net.execute(SignalCommand::SetGreenWave {
        group,
        enabled: true,
        speed: 10.0,
        offset: 0.0,
    });
    let entity = net.entity(1).expect("junction 1");
    net.world_mut().despawn(entity);

    net.tick(1);
    let leader = net.registry().group(group).and_then(|g| g.leader());
    assert_eq!(leader, Some(JunctionId(2)));
    assert_eq!(net.group_of(1), None);
    assert_eq!(net.registry().group(group).map(|g| g.len()), Some(2));
    assert_eq!(offset_of(&net, 3), 10);
    net.assert_single_leader_per_group();
}

#[test]
fn test_cycle_length_follows_leader_durations() {
    let mut net = TestNetwork::new()
        .with_junction(
            1,
            SignalMode::FixedTimed,
            Vec2::ZERO,
            vec![Phase::with_durations(2, 8), Phase::with_durations(2, 9)],
        )
        .with_junction(2, SignalMode::FixedTimed, Vec2::new(50.0, 0.0), fixed_pair())
        .with_group(&[1, 2]);
    net.tick(1);
    let group = net.registry().group(group_id(&net, 1)).cloned().expect("group");
    assert_eq!(group.cycle_length, 17);
    assert_eq!(group.cycle_timer, 1);

    net.tick(20);
    let group = net.registry().group(group_id(&net, 1)).cloned().expect("group");
    assert_eq!(group.cycle_timer, 21 % 17);
}

// ---------------------------------------------------------------------------
// Propagation and drift
// ---------------------------------------------------------------------------

#[test]
fn test_follower_converges_on_leader_phase_change() {
    // The follower's long phases never end on their own, so every phase
    // change it makes comes from the leader.
    let mut net = TestNetwork::new()
        .with_junction(1, SignalMode::FixedTimed, Vec2::ZERO, fixed_pair())
        .with_junction(
            2,
            SignalMode::FixedTimed,
            Vec2::new(100.0, 0.0),
            vec![Phase::with_durations(2, 60), Phase::with_durations(2, 60)],
        )
        .with_group(&[1, 2]);

    tick_until(&mut net, 1, 5, |s| {
        s.state == SignalState::Ongoing && s.current_phase == 1
    });
    net.edit_signal(2, |s| {
        s.state = SignalState::Ongoing;
        s.current_phase = 2;
        s.timer = 0;
    });

    // Leader: phase 1 ends, phase 2 runs, then heads back to phase 1.
    tick_until(&mut net, 1, 40, |s| {
        s.state == SignalState::Ending && s.next_phase == 1
    });
    let follower = net.signal(2);
    assert_eq!(follower.state, SignalState::Ending);
    assert_eq!(follower.next_phase, 1);

    tick_until(&mut net, 1, 10, |s| {
        s.state == SignalState::Ongoing && s.current_phase == 1
    });
    net.assert_state(2, SignalState::Ongoing);
    net.assert_current_phase(2, 1);
}

#[test]
fn test_drift_corrected_without_leader_change() {
    let four = vec![Phase::with_durations(2, 50); 4];
    let mut net = TestNetwork::new()
        .with_junction(1, SignalMode::FixedTimed, Vec2::ZERO, four.clone())
        .with_junction(2, SignalMode::FixedTimed, Vec2::new(10.0, 0.0), four)
        .with_group(&[1, 2]);

    tick_until(&mut net, 1, 5, |s| s.state == SignalState::Ongoing);
    // Two phases ahead of the leader.
    net.edit_signal(2, |s| {
        s.state = SignalState::Ongoing;
        s.current_phase = 3;
    });

    net.tick(1);
    let follower = net.signal(2);
    assert_eq!(follower.state, SignalState::Ending);
    assert_eq!(follower.next_phase, 1);

    net.tick(3);
    net.assert_current_phase(2, 1);
}

#[test]
fn test_follower_out_of_range_is_independent() {
    let mut net = TestNetwork::new()
        .with_junction(1, SignalMode::FixedTimed, Vec2::ZERO, fixed_pair())
        .with_junction(
            2,
            SignalMode::FixedTimed,
            Vec2::new(800.0, 0.0),
            vec![Phase::with_durations(2, 60), Phase::with_durations(2, 60)],
        )
        .with_group(&[1, 2]);

    tick_until(&mut net, 1, 5, |s| s.state == SignalState::Ongoing);
    net.edit_signal(2, |s| {
        s.state = SignalState::Ongoing;
        s.current_phase = 2;
        s.timer = 0;
    });
    tick_until(&mut net, 1, 40, |s| {
        s.state == SignalState::Ending && s.next_phase == 1
    });

    // 800 > 500 default range: no nudge.
    net.assert_state(2, SignalState::Ongoing);
    net.assert_current_phase(2, 2);
}

#[test]
fn test_uncoordinated_group_leaves_followers_alone() {
    let mut net = TestNetwork::new()
        .with_corridor(1, 2, 50.0, SignalMode::FixedTimed, fixed_pair())
        .with_group(&[1, 2]);
    let group = group_id(&net, 1);
    net.execute(SignalCommand::SetCoordination {
        group,
        coordinated: false,
    });
    tick_until(&mut net, 1, 5, |s| s.state == SignalState::Ongoing);
    net.edit_signal(2, |s| s.current_phase = 2);

    tick_until(&mut net, 1, 20, |s| s.state == SignalState::Ending);
    assert_ne!(net.signal(2).next_phase, 2);
    assert_eq!(
        net.registry().group(group).map(|g| g.cycle_timer),
        Some(0)
    );
}

// ---------------------------------------------------------------------------
// Force sync
// ---------------------------------------------------------------------------

#[test]
fn test_force_sync_copies_leader_state() {
    let mut net = TestNetwork::new()
        .with_corridor(1, 3, 100.0, SignalMode::FixedTimed, fixed_pair())
        .with_group(&[1, 2, 3]);
    let group = group_id(&net, 1);

    net.tick(6);
    net.edit_signal(2, |s| {
        s.state = SignalState::Ending;
        s.current_phase = 2;
        s.next_phase = 1;
    });
    net.edit_signal(3, |s| s.fault());

    let result = net.execute(SignalCommand::ForceSyncGroup { group });
    assert_eq!(result, CommandResult::Success);
    let leader = net.signal(1);
    assert_eq!(net.signal(2), leader);
    assert_eq!(net.signal(3), leader);

    for _ in 0..40 {
        net.tick(1);
        let leader = net.signal(1);
        assert_eq!(net.signal(2), leader);
        assert_eq!(net.signal(3), leader);
    }
}

#[test]
fn test_force_sync_shifts_timer_by_open_delay() {
    let mut net = TestNetwork::new()
        .with_corridor(1, 2, 100.0, SignalMode::FixedTimed, fixed_pair())
        .with_group(&[1, 2]);
    let group = group_id(&net, 1);
    tick_until(&mut net, 1, 5, |s| s.state == SignalState::Ongoing);
    net.tick(6);
    net.edit_phases(2, |phases| {
        if let Some(mask) = phases.mask_mut(0) {
            mask.open_delay.car = 3;
        }
    });

    // Sync happens in Input; Control then advances both timers by one.
    net.execute(SignalCommand::ForceSyncGroup { group });
    let leader = net.signal(1);
    let follower = net.signal(2);
    assert_eq!(leader.current_phase, 1);
    assert_eq!(follower.current_phase, 1);
    assert_eq!(follower.timer + 3, leader.timer);
}

#[test]
fn test_force_sync_uses_offsets_from_same_batch() {
    let mut net = TestNetwork::new()
        .with_corridor(
            1,
            3,
            100.0,
            SignalMode::FixedTimed,
            vec![Phase::with_durations(2, 50); 4],
        )
        .with_group(&[1, 2, 3]);
    let group = group_id(&net, 1);
    tick_until(&mut net, 1, 5, |s| s.state == SignalState::Ongoing);
    net.edit_signal(3, |s| {
        s.state = SignalState::Ongoing;
        s.current_phase = 4;
        s.timer = 0;
    });

    // Leader change, green wave and sync all land in one tick.
    net.queue(SignalCommand::SetGreenWave {
        group,
        enabled: true,
        speed: 100.0,
        offset: 0.0,
    });
    net.queue(SignalCommand::SetLeader {
        group,
        junction: JunctionId(3),
    });
    net.queue(SignalCommand::ForceSyncGroup { group });
    net.tick(1);

    assert_eq!(net.last_result(), Some(&CommandResult::Success));
    assert_eq!(offset_of(&net, 1), 2);
    assert_eq!(offset_of(&net, 2), 1);
    net.assert_current_phase(3, 4);
    net.assert_current_phase(1, 2);
    net.assert_current_phase(2, 1);
    net.assert_state(1, SignalState::Ongoing);
}
