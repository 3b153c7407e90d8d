use crate::config::{TARGET_DURATION_SCALE, TRACK_FLOW_WEIGHT};
use crate::params::SignalParams;
use crate::phase_selector::{select_next_phase, should_change_by_metric, Selection, SignalMode};
use crate::phases::{Phase, PhaseOptions, SignalPhases};

use super::{JunctionSignalState, SignalState};

/// Advance one junction's controller by one tick.
pub fn update_junction(
    mode: SignalMode,
    phases: &mut SignalPhases,
    signal: &mut JunctionSignalState,
    params: &SignalParams,
) {
    match signal.state {
        SignalState::None | SignalState::Extending | SignalState::Extended => {
            begin_cycle(mode, phases, signal);
        }
        SignalState::Beginning => enter_next_phase(phases, signal),
        SignalState::Ongoing => run_phase(mode, phases, signal, params),
        SignalState::Ending => {
            if clearance_elapsed(signal, params.ending_ticks) {
                signal.state = SignalState::Changing;
            }
        }
        SignalState::Changing => {
            if clearance_elapsed(signal, params.changing_ticks) {
                signal.state = SignalState::Beginning;
            }
        }
    }
}

fn clearance_elapsed(signal: &mut JunctionSignalState, ticks: u8) -> bool {
    signal.transition_timer = signal.transition_timer.saturating_add(1);
    if signal.transition_timer >= ticks.max(1) {
        signal.transition_timer = 0;
        true
    } else {
        false
    }
}

/// `None` (and legacy states): pick the first phase and move to `Beginning`.
fn begin_cycle(mode: SignalMode, phases: &SignalPhases, signal: &mut JunctionSignalState) {
    signal.fault();
    if phases.is_empty() {
        return;
    }
    if let Selection::Next(choice) = select_next_phase(
        &phases.phases,
        None,
        signal.manual_override_phase,
        mode,
    ) {
        signal.next_phase = (choice.index + 1) as u8;
    }
    signal.state = SignalState::Beginning;
}

/// `Beginning`: commit `next_phase` and start running it.
fn enter_next_phase(phases: &mut SignalPhases, signal: &mut JunctionSignalState) {
    let Some(entered) = signal.next_index().filter(|&i| i < phases.len()) else {
        signal.fault();
        return;
    };

    signal.current_phase = signal.next_phase;
    signal.next_phase = 0;
    signal.timer = 0;
    signal.transition_timer = 0;

    for (index, phase) in phases.phases.iter_mut().enumerate() {
        if index == entered {
            phase.mark_started();
        } else {
            phase.turns_since_last_run = phase.turns_since_last_run.saturating_add(1);
        }
        phase.options.remove(PhaseOptions::END_PREMATURELY);
    }
    signal.state = SignalState::Ongoing;
}

/// `Ongoing`: count the tick and decide whether to hand over to another phase.
fn run_phase(
    mode: SignalMode,
    phases: &mut SignalPhases,
    signal: &mut JunctionSignalState,
    params: &SignalParams,
) {
    signal.timer = signal.timer.saturating_add(1);

    let Some(index) = signal.current_index().filter(|&i| i < phases.len()) else {
        signal.fault();
        return;
    };

    let change_due = match mode {
        SignalMode::FixedTimed => fixed_change_due(&phases.phases[index], signal.timer),
        SignalMode::Dynamic => dynamic_change_due(phases, index, signal.timer, params),
    };
    let forced =
        phases.phases[index].options.end_prematurely() || signal.pending_override(phases.len());
    if !change_due && !forced {
        return;
    }

    match select_next_phase(
        &phases.phases,
        Some(index),
        signal.manual_override_phase,
        mode,
    ) {
        Selection::Next(choice) if choice.index != index => {
            if choice.linked {
                reset_skipped_span(&mut phases.phases, index, choice.index);
            }
            signal.next_phase = (choice.index + 1) as u8;
            signal.transition_timer = 0;
            signal.state = SignalState::Ending;
        }
        Selection::Next(_) | Selection::RestartCurrent => {
            let phase = &mut phases.phases[index];
            phase.options.remove(PhaseOptions::END_PREMATURELY);
            phase.reset_starvation();
            if mode == SignalMode::FixedTimed {
                signal.timer = 0;
            }
        }
        Selection::NoPhase => signal.fault(),
    }
}

/// Fixed-timed: forced at `max_duration`, metric-driven once past `min_duration`.
pub fn fixed_change_due(phase: &Phase, timer: u16) -> bool {
    if timer >= phase.max_duration {
        return true;
    }
    timer >= phase.min_duration
        && should_change_by_metric(phase.change_metric, phase.current_flow, phase.current_wait)
}

/// Dynamic: forced at `max_duration`; past the flow-derived target duration the
/// phase yields after a grace period that depends on how its priority compares
/// with the other phases. Updates the phase's display target and starvation
/// counters.
pub fn dynamic_change_due(
    phases: &mut SignalPhases,
    index: usize,
    timer: u16,
    params: &SignalParams,
) -> bool {
    let max_priority = phases.max_priority();
    let at_max = phases
        .phases
        .iter()
        .filter(|p| p.priority == max_priority)
        .count();

    let phase = &mut phases.phases[index];
    phase.target_duration = TARGET_DURATION_SCALE
        * (phase.average_car_flow + phase.occupancy.track as f32 * TRACK_FLOW_WEIGHT)
        * params.target_duration_multiplier;

    if timer < phase.min_duration {
        phase.reset_starvation();
        return false;
    }
    if timer >= phase.max_duration {
        return true;
    }
    if (timer as f32) < phase.target_duration {
        return false;
    }

    if phase.priority < max_priority {
        phase.low_priority_timer = phase.low_priority_timer.saturating_add(1);
        phase.low_priority_timer > params.low_priority_grace_ticks
    } else if at_max > 1 {
        true
    } else {
        phase.low_flow_timer = phase.low_flow_timer.saturating_add(1);
        phase.low_flow_timer > params.low_flow_grace_ticks
    }
}

/// Clear staleness for phases strictly between `from` and `to` around the ring.
fn reset_skipped_span(phases: &mut [Phase], from: usize, to: usize) {
    let n = phases.len();
    if n == 0 {
        return;
    }
    let mut index = (from + 1) % n;
    while index != to && index != from {
        phases[index].turns_since_last_run = 0;
        index = (index + 1) % n;
    }
}
