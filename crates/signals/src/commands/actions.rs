use serde::{Deserialize, Serialize};

use crate::ids::{EdgeId, GroupId, JunctionId};
use crate::phase_selector::SignalMode;
use crate::phases::{ChangeMetric, VehicleClass};

/// A single field change on one phase.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub enum PhaseUpdate {
    MinDuration(u16),
    MaxDuration(u16),
    /// Replace the whole option bitset.
    Options(u8),
    /// Set or clear one option bit.
    Option { bit: u8, enabled: bool },
    ChangeMetric(ChangeMetric),
}

/// Edits to signal configuration and coordination groups, applied at the
/// start of a tick. Phase indices are 0-based; `phase` numbers are 1-based
/// with 0 meaning "none".
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum SignalCommand {
    AddPhase {
        junction: JunctionId,
        min_duration: u16,
        max_duration: u16,
    },
    RemovePhase {
        junction: JunctionId,
        index: usize,
    },
    SwapPhases {
        junction: JunctionId,
        a: usize,
        b: usize,
    },
    UpdatePhase {
        junction: JunctionId,
        index: usize,
        update: PhaseUpdate,
    },
    SetMode {
        junction: JunctionId,
        mode: SignalMode,
    },
    SetManualOverride {
        junction: JunctionId,
        phase: u8,
    },
    EndPhasePrematurely {
        junction: JunctionId,
    },
    CreateGroup {
        members: Vec<JunctionId>,
    },
    DeleteGroup {
        group: GroupId,
    },
    AddMember {
        group: GroupId,
        junction: JunctionId,
    },
    RemoveMember {
        junction: JunctionId,
    },
    SetLeader {
        group: GroupId,
        junction: JunctionId,
    },
    JoinGroups {
        target: GroupId,
        absorbed: GroupId,
    },
    SetCoordination {
        group: GroupId,
        coordinated: bool,
    },
    SetGreenWave {
        group: GroupId,
        enabled: bool,
        speed: f32,
        offset: f32,
    },
    SetMaxCoordinationDistance {
        group: GroupId,
        distance: f32,
    },
    SetEnhancedOffsets {
        group: GroupId,
        enabled: bool,
        main_phase: u8,
    },
    SetMemberSignalDelay {
        junction: JunctionId,
        ticks: i32,
    },
    SetEdgeDelay {
        junction: JunctionId,
        edge: EdgeId,
        open_delay: i32,
        close_delay: i32,
        enabled: bool,
    },
    SetPhaseDelay {
        junction: JunctionId,
        index: usize,
        class: VehicleClass,
        open_delay: i32,
        close_delay: i32,
    },
    ApplyTemplate {
        junction: JunctionId,
        template: String,
    },
    ForceSyncGroup {
        group: GroupId,
    },
}
