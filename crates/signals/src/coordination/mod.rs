//! Leader/follower coordination across groups of junctions.
//!
//! Groups live in [`SignalGroupRegistry`]; members refer to junctions by
//! [`JunctionId`](crate::ids::JunctionId) and the leader is re-resolved from
//! the member list on every access. Each tick, after all junctions have run
//! their own controllers, [`apply_group_coordination`] refreshes offsets from
//! the current geometry and nudges followers toward their offset-adjusted
//! leader phase.

mod offsets;
mod registry;
mod save;
mod sync;
mod systems;
mod types;

#[cfg(test)]
mod tests;

pub use offsets::{enhanced_offset, green_wave_offset, leader_cycle_length, member_offset, travel_ticks};
pub use registry::{HousekeepingReport, SignalGroupRegistry};
pub use sync::{
    coordinate_follower, drift_needs_correction, force_sync, leader_heading, nudge_follower,
    phase_drift, target_phase,
};
pub use systems::{apply_group_coordination, collect_layout};
pub use types::{GroupMember, JunctionLayout, NetworkLayout, OffsetParams, SignalGroup};
