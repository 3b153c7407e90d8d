use super::*;
use crate::phases::{ChangeMetric, Phase, PhaseOptions};

fn phase(priority: i32, weighted_waiting: f32) -> Phase {
    Phase {
        priority,
        weighted_waiting,
        ..Default::default()
    }
}

fn linked(mut phase: Phase) -> Phase {
    phase.options.insert(PhaseOptions::LINKED_WITH_NEXT);
    phase
}

/// Optional fixed-timed step (zero minimum) with explicit flow/wait.
fn step(metric: ChangeMetric, flow: f32, wait: f32) -> Phase {
    let mut phase = Phase::with_durations(0, 10).with_metric(metric);
    phase.current_flow = flow;
    phase.current_wait = wait;
    phase
}

fn next_index(selection: Selection) -> usize {
    match selection {
        Selection::Next(choice) => choice.index,
        other => panic!("expected a next phase, got {other:?}"),
    }
}

// ---------------------------------------------------------------------------
// Dynamic ranking
// ---------------------------------------------------------------------------

#[test]
fn test_highest_priority_is_ranked_first() {
    let phases = vec![phase(0, 0.0), phase(0, 0.0), phase(5, 0.0)];
    assert_eq!(rank_phases(&phases), Some(2));
    let selection = select_next_phase(&phases, Some(0), 0, SignalMode::Dynamic);
    assert_eq!(next_index(selection), 2);
}

#[test]
fn test_priority_tie_breaks_on_weighted_waiting() {
    let phases = vec![phase(3, 1.0), phase(3, 4.0), phase(3, 2.0)];
    assert_eq!(rank_phases(&phases), Some(1));
}

#[test]
fn test_zero_priorities_fall_through_to_weighted_waiting() {
    let phases = vec![phase(0, 0.5), phase(0, 0.0), phase(0, 9.0)];
    assert_eq!(rank_phases(&phases), Some(2));
}

#[test]
fn test_full_tie_keeps_lowest_index() {
    let phases = vec![phase(1, 1.0), phase(1, 1.0)];
    assert_eq!(rank_phases(&phases), Some(0));
    assert_eq!(rank_phases(&[]), None);
}

#[test]
fn test_manual_override_always_wins() {
    let phases = vec![phase(0, 0.0), phase(9, 9.0), phase(0, 0.0)];
    let selection = select_next_phase(&phases, Some(1), 3, SignalMode::Dynamic);
    assert_eq!(
        selection,
        Selection::Next(PhaseChoice {
            index: 2,
            linked: false
        })
    );
    let selection = select_next_phase(&phases, Some(1), 1, SignalMode::FixedTimed);
    assert_eq!(next_index(selection), 0);
}

#[test]
fn test_out_of_range_override_is_ignored() {
    let phases = vec![phase(0, 0.0), phase(9, 0.0)];
    let selection = select_next_phase(&phases, Some(0), 7, SignalMode::Dynamic);
    assert_eq!(next_index(selection), 1);
}

#[test]
fn test_empty_phase_list_selects_nothing() {
    assert_eq!(
        select_next_phase(&[], None, 0, SignalMode::Dynamic),
        Selection::NoPhase
    );
    assert_eq!(
        select_next_phase(&[], Some(0), 2, SignalMode::FixedTimed),
        Selection::NoPhase
    );
}

// ---------------------------------------------------------------------------
// Linked phases
// ---------------------------------------------------------------------------

#[test]
fn test_linked_successor_beats_equal_ranked_candidate() {
    // 0 is running and linked to 1; 1 ties the globally ranked phase 3.
    let phases = vec![
        linked(phase(2, 0.0)),
        phase(6, 0.0),
        phase(1, 0.0),
        phase(6, 5.0),
    ];
    let selection = select_next_phase(&phases, Some(0), 0, SignalMode::Dynamic);
    assert_eq!(
        selection,
        Selection::Next(PhaseChoice {
            index: 1,
            linked: true
        })
    );
}

#[test]
fn test_linked_successor_below_ranked_candidate_is_skipped() {
    let phases = vec![linked(phase(2, 0.0)), phase(3, 0.0), phase(8, 0.0)];
    let selection = select_next_phase(&phases, Some(0), 0, SignalMode::Dynamic);
    assert_eq!(
        selection,
        Selection::Next(PhaseChoice {
            index: 2,
            linked: false
        })
    );
}

#[test]
fn test_linked_successor_without_demand_is_skipped() {
    let phases = vec![linked(phase(0, 0.0)), phase(0, 0.0), phase(0, 3.0)];
    let selection = select_next_phase(&phases, Some(0), 0, SignalMode::Dynamic);
    assert_eq!(next_index(selection), 2);
}

#[test]
fn test_linked_chain_continues_to_strongest_member() {
    let phases = vec![
        linked(phase(1, 0.0)),
        linked(phase(2, 0.0)),
        phase(7, 0.0),
        phase(7, 0.0),
    ];
    assert_eq!(linked_continuation(&phases, 0, 7), Some(2));
    let selection = select_next_phase(&phases, Some(0), 0, SignalMode::Dynamic);
    assert_eq!(
        selection,
        Selection::Next(PhaseChoice {
            index: 2,
            linked: true
        })
    );
}

#[test]
fn test_ranked_candidate_is_pulled_to_chain_start() {
    // Phases 1 -> 2 -> 3 form a chain; 3 ranks highest.
    let phases = vec![
        phase(0, 0.0),
        linked(phase(2, 0.0)),
        linked(phase(1, 0.0)),
        phase(9, 0.0),
    ];
    let selection = select_next_phase(&phases, Some(0), 0, SignalMode::Dynamic);
    assert_eq!(next_index(selection), 1);
}

#[test]
fn test_chain_start_stops_at_phase_without_demand() {
    let phases = vec![
        phase(0, 0.0),
        linked(phase(0, 0.0)),
        linked(phase(1, 0.0)),
        phase(9, 0.0),
    ];
    assert_eq!(chain_start(&phases, 3, Some(0)), 2);
}

#[test]
fn test_chain_start_never_moves_onto_current() {
    let phases = vec![linked(phase(4, 0.0)), phase(9, 0.0)];
    assert_eq!(chain_start(&phases, 1, Some(0)), 1);
}

#[test]
fn test_fully_linked_ring_terminates() {
    let phases = vec![
        linked(phase(1, 0.0)),
        linked(phase(1, 0.0)),
        linked(phase(1, 0.0)),
    ];
    assert_eq!(chain_start(&phases, 1, None), 2);
    assert_eq!(linked_continuation(&phases, 0, 1), Some(1));
}

// ---------------------------------------------------------------------------
// Fixed-timed stepping
// ---------------------------------------------------------------------------

#[test]
fn test_get_metric_by_kind() {
    assert_eq!(get_metric(ChangeMetric::FirstFlow, 3.0, 1.0), 3.0);
    assert_eq!(get_metric(ChangeMetric::FirstFlow, 0.0, 1.0), f32::NEG_INFINITY);
    assert_eq!(get_metric(ChangeMetric::FirstWait, 0.0, 2.0), 2.0);
    assert_eq!(get_metric(ChangeMetric::FirstWait, 5.0, 0.0), f32::NEG_INFINITY);
    assert_eq!(get_metric(ChangeMetric::NoFlow, 0.0, 2.0), 1.0);
    assert_eq!(get_metric(ChangeMetric::NoFlow, 1.0, 2.0), f32::NEG_INFINITY);
    assert_eq!(get_metric(ChangeMetric::NoWait, 4.0, 0.0), 1.0);
    assert_eq!(get_metric(ChangeMetric::NoWait, 4.0, 1.0), f32::NEG_INFINITY);
    assert_eq!(get_metric(ChangeMetric::Default, 4.0, 1.5), 2.5);
    assert_eq!(get_metric(ChangeMetric::Default, f32::NAN, 1.0), f32::NEG_INFINITY);
}

#[test]
fn test_should_change_by_metric() {
    assert!(should_change_by_metric(ChangeMetric::FirstFlow, 1.0, 0.0));
    assert!(!should_change_by_metric(ChangeMetric::FirstFlow, 0.0, 9.0));
    assert!(should_change_by_metric(ChangeMetric::FirstWait, 0.0, 1.0));
    assert!(should_change_by_metric(ChangeMetric::NoFlow, 0.0, 1.0));
    assert!(should_change_by_metric(ChangeMetric::NoWait, 3.0, 0.0));
    assert!(should_change_by_metric(ChangeMetric::Default, 1.0, 2.0));
    assert!(!should_change_by_metric(ChangeMetric::Default, 0.0, 0.0));
}

#[test]
fn test_mandatory_successor_short_circuits() {
    let phases = vec![
        step(ChangeMetric::Default, 0.0, 0.0),
        Phase::with_durations(5, 10),
        step(ChangeMetric::Default, 50.0, 0.0),
    ];
    assert_eq!(calculate_best_next_step(&phases, 0), StepDecision::Advance(1));
}

#[test]
fn test_metric_boundary_short_circuits() {
    let phases = vec![
        step(ChangeMetric::Default, 0.0, 0.0),
        step(ChangeMetric::FirstFlow, 0.0, 0.0),
        step(ChangeMetric::Default, 50.0, 0.0),
    ];
    assert_eq!(calculate_best_next_step(&phases, 0), StepDecision::Advance(1));
}

#[test]
fn test_best_optional_step_wins() {
    let phases = vec![
        step(ChangeMetric::FirstFlow, 1.0, 0.0),
        step(ChangeMetric::FirstFlow, 2.0, 0.0),
        step(ChangeMetric::FirstFlow, 7.0, 0.0),
        step(ChangeMetric::FirstFlow, 3.0, 0.0),
    ];
    assert_eq!(calculate_best_next_step(&phases, 0), StepDecision::Advance(2));
}

#[test]
fn test_scan_stops_at_mandatory_step() {
    let phases = vec![
        step(ChangeMetric::FirstFlow, 1.0, 0.0),
        step(ChangeMetric::FirstFlow, 2.0, 0.0),
        Phase::with_durations(4, 10).with_metric(ChangeMetric::FirstFlow),
        step(ChangeMetric::FirstFlow, 99.0, 0.0),
    ];
    assert_eq!(calculate_best_next_step(&phases, 0), StepDecision::Advance(1));
}

#[test]
fn test_mandatory_step_chosen_when_nothing_eligible() {
    let phases = vec![
        step(ChangeMetric::FirstFlow, 0.0, 0.0),
        step(ChangeMetric::FirstFlow, 0.0, 0.0),
        Phase::with_durations(4, 10).with_metric(ChangeMetric::FirstFlow),
    ];
    assert_eq!(calculate_best_next_step(&phases, 0), StepDecision::Advance(2));
}

#[test]
fn test_current_phase_best_restarts() {
    let phases = vec![
        step(ChangeMetric::FirstFlow, 9.0, 0.0),
        step(ChangeMetric::FirstFlow, 2.0, 0.0),
        step(ChangeMetric::FirstFlow, 0.0, 0.0),
    ];
    assert_eq!(
        calculate_best_next_step(&phases, 0),
        StepDecision::RestartCurrent
    );
    assert_eq!(
        select_next_phase(&phases, Some(0), 0, SignalMode::FixedTimed),
        Selection::RestartCurrent
    );
}

#[test]
fn test_full_ring_scan_wraps_back_to_start() {
    // All optional with one metric: the scan covers every other phase,
    // including those before `current`.
    let phases = vec![
        step(ChangeMetric::Default, 8.0, 0.0),
        step(ChangeMetric::Default, 1.0, 0.0),
        step(ChangeMetric::Default, 0.0, 0.0),
        step(ChangeMetric::Default, 2.0, 0.0),
    ];
    assert_eq!(calculate_best_next_step(&phases, 2), StepDecision::Advance(0));
}

#[test]
fn test_fixed_timed_start_goes_to_first_phase() {
    let phases = vec![Phase::default(), Phase::default()];
    assert_eq!(
        next_index(select_next_phase(&phases, None, 0, SignalMode::FixedTimed)),
        0
    );
}

#[test]
fn test_selection_is_deterministic() {
    let phases = vec![
        linked(phase(3, 1.0)),
        phase(3, 2.0),
        phase(1, 8.0),
        phase(3, 2.0),
    ];
    let first = select_next_phase(&phases, Some(2), 0, SignalMode::Dynamic);
    for _ in 0..50 {
        assert_eq!(select_next_phase(&phases, Some(2), 0, SignalMode::Dynamic), first);
    }
}
