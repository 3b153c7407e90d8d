use std::collections::BTreeMap;

use bevy::prelude::*;
use bitcode::{Decode, Encode};
use serde::{Deserialize, Serialize};

use crate::config::{
    DEFAULT_CYCLE_LENGTH, DEFAULT_GREEN_WAVE_SPEED, DEFAULT_MAX_COORDINATION_DISTANCE,
};
use crate::ids::{GroupId, JunctionId};
use crate::junction_control::SignalState;

use super::offsets::{leader_cycle_length, member_offset};

/// One junction's membership in a coordination group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Encode, Decode)]
pub struct GroupMember {
    pub junction: JunctionId,
    /// Dense position within the group, `0..members.len()`.
    pub group_index: u16,
    pub is_leader: bool,
    pub distance_to_leader: f32,
    /// Phase offset relative to the leader, in phases.
    pub phase_offset: i32,
    /// Manual offset; 0 means "derive from distance".
    pub signal_delay: i32,
}

impl GroupMember {
    pub fn new(junction: JunctionId, group_index: u16) -> Self {
        Self {
            junction,
            group_index,
            is_leader: false,
            distance_to_leader: 0.0,
            phase_offset: 0,
            signal_delay: 0,
        }
    }
}

/// Geometry and timing of one junction, as seen by the coordinator.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JunctionLayout {
    pub position: Vec2,
    /// Maximum duration of every phase, in phase order.
    pub max_durations: Vec<u16>,
}

/// Per-junction layout snapshot, rebuilt from the world each coordination pass.
pub type NetworkLayout = BTreeMap<JunctionId, JunctionLayout>;

/// A set of junctions whose phases follow a common leader.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalGroup {
    pub id: GroupId,
    pub is_coordinated: bool,
    pub green_wave_enabled: bool,
    /// Travel speed used for distance-derived offsets. Always `> 0`.
    pub green_wave_speed: f32,
    pub green_wave_offset: f32,
    /// Followers farther than this from the leader run independently.
    pub max_coordination_distance: f32,
    /// Sum of the leader's maximum phase durations. Always `> 0`.
    pub cycle_length: u16,
    pub cycle_timer: u16,
    /// Map travel time onto the leader's phase schedule instead of the plain
    /// distance/speed formula.
    pub use_enhanced_offsets: bool,
    /// Leader phase (1-based) that enhanced offsets are measured from.
    pub main_phase: u8,
    pub members: Vec<GroupMember>,
    /// Leader `(state, phase)` seen on the previous coordination pass.
    #[serde(skip)]
    pub last_leader_signal: Option<(SignalState, u8)>,
}

impl SignalGroup {
    pub fn new(id: GroupId) -> Self {
        Self {
            id,
            is_coordinated: true,
            green_wave_enabled: false,
            green_wave_speed: DEFAULT_GREEN_WAVE_SPEED,
            green_wave_offset: 0.0,
            max_coordination_distance: DEFAULT_MAX_COORDINATION_DISTANCE,
            cycle_length: DEFAULT_CYCLE_LENGTH,
            cycle_timer: 0,
            use_enhanced_offsets: false,
            main_phase: 1,
            members: Vec::new(),
            last_leader_signal: None,
        }
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn leader(&self) -> Option<JunctionId> {
        self.members
            .iter()
            .find(|m| m.is_leader)
            .map(|m| m.junction)
    }

    pub fn member(&self, junction: JunctionId) -> Option<&GroupMember> {
        self.members.iter().find(|m| m.junction == junction)
    }

    pub fn member_mut(&mut self, junction: JunctionId) -> Option<&mut GroupMember> {
        self.members.iter_mut().find(|m| m.junction == junction)
    }

    pub fn contains(&self, junction: JunctionId) -> bool {
        self.member(junction).is_some()
    }

    /// Followers in group order.
    pub fn followers(&self) -> impl Iterator<Item = &GroupMember> {
        self.members.iter().filter(|m| !m.is_leader)
    }

    /// Append a member at the end of the group order. The first member of an
    /// empty group becomes the leader.
    pub(crate) fn push_member(&mut self, junction: JunctionId) {
        let mut member = GroupMember::new(junction, self.members.len() as u16);
        member.is_leader = self.members.is_empty();
        self.members.push(member);
    }

    /// Remove a member and renumber the rest. Removing the leader promotes the
    /// member with the lowest remaining group index.
    pub(crate) fn take_member(&mut self, junction: JunctionId) -> Option<GroupMember> {
        let position = self.members.iter().position(|m| m.junction == junction)?;
        let removed = self.members.remove(position);
        self.reindex();
        if removed.is_leader {
            self.ensure_single_leader();
        }
        Some(removed)
    }

    /// Make `junction` the only leader. Returns `false` if it is not a member.
    pub(crate) fn promote(&mut self, junction: JunctionId) -> bool {
        if !self.contains(junction) {
            return false;
        }
        for member in &mut self.members {
            member.is_leader = member.junction == junction;
        }
        self.last_leader_signal = None;
        true
    }

    /// Restore exactly one leader: keep the first flagged member, or promote
    /// the member with the lowest group index. Returns `true` if anything changed.
    pub fn ensure_single_leader(&mut self) -> bool {
        if self.members.is_empty() {
            return false;
        }
        let leaders = self.members.iter().filter(|m| m.is_leader).count();
        if leaders == 1 {
            return false;
        }
        let keep = self
            .members
            .iter()
            .find(|m| m.is_leader)
            .or_else(|| self.members.iter().min_by_key(|m| m.group_index))
            .map(|m| m.junction);
        match keep {
            Some(junction) => self.promote(junction),
            None => false,
        }
    }

    /// Renumber members densely in their current order.
    /// Returns `true` if any index changed.
    pub fn reindex(&mut self) -> bool {
        let mut changed = false;
        for (index, member) in self.members.iter_mut().enumerate() {
            if member.group_index != index as u16 {
                member.group_index = index as u16;
                changed = true;
            }
        }
        changed
    }

    /// Recompute leader distances, phase offsets and the cycle length from
    /// the current layout. Members missing from the layout keep distance 0.
    pub fn refresh(&mut self, layout: &NetworkLayout) {
        let leader = self.leader().and_then(|id| layout.get(&id));
        let leader_position = leader.map(|l| l.position);
        let leader_durations: &[u16] = leader.map(|l| l.max_durations.as_slice()).unwrap_or(&[]);

        self.cycle_length = leader_cycle_length(leader_durations);
        if self.cycle_timer >= self.cycle_length {
            self.cycle_timer %= self.cycle_length;
        }

        let params = self.offset_params();
        for member in &mut self.members {
            if member.is_leader {
                member.distance_to_leader = 0.0;
                member.phase_offset = 0;
                continue;
            }
            let own = layout.get(&member.junction);
            member.distance_to_leader = match (leader_position, own) {
                (Some(origin), Some(own)) => origin.distance(own.position),
                _ => 0.0,
            };
            let phase_count = own.map_or(0, |own| own.max_durations.len());
            member.phase_offset = member_offset(&params, member, leader_durations, phase_count);
        }
    }

    /// Advance the group cycle timer by one tick.
    pub fn advance_cycle_timer(&mut self) {
        let length = self.cycle_length.max(1);
        self.cycle_timer = (self.cycle_timer % length + 1) % length;
    }

    pub fn offset_params(&self) -> OffsetParams {
        OffsetParams {
            green_wave_enabled: self.green_wave_enabled,
            green_wave_speed: self.green_wave_speed,
            green_wave_offset: self.green_wave_offset,
            use_enhanced_offsets: self.use_enhanced_offsets,
            main_phase: self.main_phase,
        }
    }
}

/// Group settings that feed the offset calculation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OffsetParams {
    pub green_wave_enabled: bool,
    pub green_wave_speed: f32,
    pub green_wave_offset: f32,
    pub use_enhanced_offsets: bool,
    pub main_phase: u8,
}
