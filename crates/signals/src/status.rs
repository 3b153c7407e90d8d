//! Read-only snapshot of a junction's controller for display consumers.

use serde::{Deserialize, Serialize};

use crate::junction_control::{JunctionSignalState, SignalState};
use crate::phases::SignalPhases;
use crate::signal_delay::{current_open_delay, effective_timer, EdgeSignalDelays};

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SignalStatus {
    pub state: SignalState,
    pub current_phase: u8,
    pub next_phase: u8,
    pub timer: u16,
    /// Timer shifted back by the running phase's open delay.
    pub effective_timer: u16,
    /// Dynamic-mode target of the running phase, 0 when none runs.
    pub target_duration: f32,
}

impl SignalStatus {
    pub fn capture(
        signal: &JunctionSignalState,
        phases: &SignalPhases,
        overrides: Option<&EdgeSignalDelays>,
    ) -> Self {
        let delay = current_open_delay(phases, overrides, signal);
        let target_duration = signal
            .current_index()
            .and_then(|index| phases.get(index))
            .map(|phase| phase.target_duration)
            .unwrap_or(0.0);
        Self {
            state: signal.state,
            current_phase: signal.current_phase,
            next_phase: signal.next_phase,
            timer: signal.timer,
            effective_timer: effective_timer(signal.timer, delay),
            target_duration,
        }
    }

    /// `true` while a phase is being served (not idle and not in clearance).
    pub fn is_serving(&self) -> bool {
        self.current_phase > 0 && matches!(self.state, SignalState::Ongoing)
    }
}
