use crate::phases::{ChangeMetric, Phase};

/// Outcome of fixed-timed stepping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepDecision {
    Advance(usize),
    /// The current phase scored best; keep running it.
    RestartCurrent,
}

/// Score of a phase under `metric`; `-∞` means "not eligible".
pub fn get_metric(metric: ChangeMetric, flow: f32, wait: f32) -> f32 {
    let value = match metric {
        ChangeMetric::FirstFlow => {
            if flow > 0.0 {
                flow
            } else {
                f32::NEG_INFINITY
            }
        }
        ChangeMetric::FirstWait => {
            if wait > 0.0 {
                wait
            } else {
                f32::NEG_INFINITY
            }
        }
        ChangeMetric::NoFlow => {
            if flow <= 0.0 {
                1.0
            } else {
                f32::NEG_INFINITY
            }
        }
        ChangeMetric::NoWait => {
            if wait <= 0.0 {
                1.0
            } else {
                f32::NEG_INFINITY
            }
        }
        ChangeMetric::Default => flow - wait,
    };
    if value.is_nan() {
        f32::NEG_INFINITY
    } else {
        value
    }
}

/// Whether a running fixed-timed phase past its minimum should end now.
pub fn should_change_by_metric(metric: ChangeMetric, flow: f32, wait: f32) -> bool {
    match metric {
        ChangeMetric::FirstFlow => flow > 0.0,
        ChangeMetric::FirstWait => wait > 0.0,
        ChangeMetric::NoFlow => flow <= 0.0,
        ChangeMetric::NoWait => wait <= 0.0,
        ChangeMetric::Default => flow < wait,
    }
}

fn phase_metric(phase: &Phase, metric: ChangeMetric) -> f32 {
    get_metric(metric, phase.current_flow, phase.current_wait)
}

/// Choose the step after `current` in a fixed-timed ring.
///
/// The plain successor is returned straight away when it is a mandatory step
/// (positive minimum duration) or uses a different change metric. Otherwise
/// the optional steps that follow are scored, starting from the current
/// phase's own score, and the best one wins. The scan stops at a mandatory
/// step or a metric boundary; that boundary phase is chosen only when nothing
/// scanned so far was eligible. When every phase is optional and shares the
/// metric, the scan covers the whole ring and ends back at `current`.
pub fn calculate_best_next_step(phases: &[Phase], current: usize) -> StepDecision {
    let n = phases.len();
    if n == 0 || current >= n {
        return StepDecision::Advance(0);
    }

    let successor = (current + 1) % n;
    let metric = phases[current].change_metric;
    if phases[successor].min_duration > 0 || phases[successor].change_metric != metric {
        return StepDecision::Advance(successor);
    }

    let mut best_index = current;
    let mut best_value = phase_metric(&phases[current], metric);

    let mut check = successor;
    while check != current {
        let phase = &phases[check];
        if phase.min_duration > 0 || phase.change_metric != metric {
            if best_value == f32::NEG_INFINITY {
                best_index = check;
            }
            break;
        }
        let value = phase_metric(phase, metric);
        if value > best_value {
            best_value = value;
            best_index = check;
        }
        check = (check + 1) % n;
    }

    if best_index == current {
        StepDecision::RestartCurrent
    } else {
        StepDecision::Advance(best_index)
    }
}
