//! Next-phase selection.
//!
//! Dynamic junctions rank phases by priority, breaking ties on weighted
//! waiting, and treat runs of `LINKED_WITH_NEXT` phases as one schedulable
//! unit. Fixed-timed junctions step through the phase ring in order, using the
//! phases' change metrics to pick among optional (zero minimum duration) steps.

mod dynamic;
mod fixed_timed;

#[cfg(test)]
mod tests;

pub use dynamic::{chain_start, linked_continuation, rank_phases};
pub use fixed_timed::{calculate_best_next_step, get_metric, should_change_by_metric, StepDecision};

use serde::{Deserialize, Serialize};

use crate::phases::Phase;

/// Operating mode of a junction controller.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    bitcode::Encode,
    bitcode::Decode,
)]
pub enum SignalMode {
    /// Demand-responsive: priority and weighted waiting decide.
    #[default]
    Dynamic,
    /// Sequential steps bounded by durations and change metrics.
    FixedTimed,
}

/// A phase picked to run next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseChoice {
    /// Index into the phase list.
    pub index: usize,
    /// Reached by continuing a linked chain; the phases skipped between the
    /// current phase and `index` should not be charged staleness.
    pub linked: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    Next(PhaseChoice),
    /// Keep running the current phase instead of re-entering it.
    RestartCurrent,
    /// The phase list is empty.
    NoPhase,
}

/// Pick the phase that should follow `current` (a phase index, `None` when no
/// phase runs yet). A valid manual override phase number (1-based) always wins.
pub fn select_next_phase(
    phases: &[Phase],
    current: Option<usize>,
    manual_override: u8,
    mode: SignalMode,
) -> Selection {
    if phases.is_empty() {
        return Selection::NoPhase;
    }

    let override_index = manual_override as usize;
    if override_index > 0 && override_index <= phases.len() {
        return Selection::Next(PhaseChoice {
            index: override_index - 1,
            linked: false,
        });
    }

    let current = current.filter(|&index| index < phases.len());
    match mode {
        SignalMode::Dynamic => Selection::Next(select_dynamic(phases, current)),
        SignalMode::FixedTimed => match current {
            None => Selection::Next(PhaseChoice {
                index: 0,
                linked: false,
            }),
            Some(index) => match calculate_best_next_step(phases, index) {
                StepDecision::Advance(next) => Selection::Next(PhaseChoice {
                    index: next,
                    linked: false,
                }),
                StepDecision::RestartCurrent => Selection::RestartCurrent,
            },
        },
    }
}

fn select_dynamic(phases: &[Phase], current: Option<usize>) -> PhaseChoice {
    // Non-empty list always ranks a phase.
    let ranked = rank_phases(phases).unwrap_or(0);

    if let Some(current) = current {
        if let Some(index) = linked_continuation(phases, current, phases[ranked].priority) {
            return PhaseChoice {
                index,
                linked: true,
            };
        }
    }

    PhaseChoice {
        index: chain_start(phases, ranked, current),
        linked: false,
    }
}
