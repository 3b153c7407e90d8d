use bevy::prelude::*;
use bitcode::{Decode, Encode};
use serde::{Deserialize, Serialize};

use crate::phase_selector::SignalMode;

/// Controller state of one junction.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Encode, Decode,
)]
pub enum SignalState {
    #[default]
    None,
    Beginning,
    Ongoing,
    Ending,
    Changing,
    /// Legacy state from older saves; handled like `None`.
    Extending,
    /// Legacy state from older saves; handled like `None`.
    Extended,
}

/// A signalized junction under phase-based control.
#[derive(Component, Debug, Clone, Copy, Default, PartialEq)]
pub struct TrafficSignalJunction {
    pub mode: SignalMode,
    /// World position, used for coordination distances.
    pub position: Vec2,
}

impl TrafficSignalJunction {
    pub fn new(mode: SignalMode, position: Vec2) -> Self {
        Self { mode, position }
    }
}

/// Runtime state of one junction's controller.
///
/// Phase numbers are 1-based; 0 means "no phase".
#[derive(Component, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JunctionSignalState {
    pub state: SignalState,
    pub current_phase: u8,
    pub next_phase: u8,
    /// Ticks since the current phase started.
    pub timer: u16,
    /// Ticks spent in the current clearance state.
    pub transition_timer: u8,
    pub manual_override_phase: u8,
}

impl JunctionSignalState {
    /// Index into the phase list of the running phase.
    pub fn current_index(&self) -> Option<usize> {
        (self.current_phase as usize).checked_sub(1)
    }

    pub fn next_index(&self) -> Option<usize> {
        (self.next_phase as usize).checked_sub(1)
    }

    /// Drop back to the idle state.
    pub fn fault(&mut self) {
        self.state = SignalState::None;
        self.current_phase = 0;
        self.next_phase = 0;
        self.timer = 0;
        self.transition_timer = 0;
    }

    /// Manual override that asks for a phase other than the running one.
    pub fn pending_override(&self, phase_count: usize) -> bool {
        let requested = self.manual_override_phase;
        requested > 0 && requested as usize <= phase_count && requested != self.current_phase
    }
}
