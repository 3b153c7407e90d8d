use std::collections::BTreeMap;

use bevy::prelude::*;

use crate::commands::CommandError;
use crate::config::MAX_SIGNAL_DELAY;
use crate::ids::{GroupId, JunctionId};

use super::{NetworkLayout, SignalGroup};

/// All coordination groups plus the junction → group membership index.
#[derive(Resource, Debug, Clone, Default, PartialEq)]
pub struct SignalGroupRegistry {
    pub(crate) groups: BTreeMap<GroupId, SignalGroup>,
    pub(crate) membership: BTreeMap<JunctionId, GroupId>,
    pub(crate) next_id: u32,
}

/// Counts from one housekeeping pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HousekeepingReport {
    pub dangling_members: u32,
    pub deleted_groups: u32,
    pub leaders_elected: u32,
    pub reindexed_groups: u32,
}

impl SignalGroupRegistry {
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn group(&self, id: GroupId) -> Option<&SignalGroup> {
        self.groups.get(&id)
    }

    pub fn group_mut(&mut self, id: GroupId) -> Option<&mut SignalGroup> {
        self.groups.get_mut(&id)
    }

    pub fn groups(&self) -> impl Iterator<Item = &SignalGroup> {
        self.groups.values()
    }

    pub fn groups_mut(&mut self) -> impl Iterator<Item = &mut SignalGroup> {
        self.groups.values_mut()
    }

    pub fn group_of(&self, junction: JunctionId) -> Option<GroupId> {
        self.membership.get(&junction).copied()
    }

    fn group_or_err(&mut self, id: GroupId) -> Result<&mut SignalGroup, CommandError> {
        self.groups.get_mut(&id).ok_or(CommandError::NotFound)
    }

    /// Create a group from `members`; the first one leads.
    pub fn create_group(&mut self, members: &[JunctionId]) -> Result<GroupId, CommandError> {
        if members.is_empty() {
            return Err(CommandError::InvalidParameter(
                "a group needs at least one member".to_string(),
            ));
        }
        if members.iter().any(|j| self.membership.contains_key(j)) {
            return Err(CommandError::AlreadyMember);
        }

        let id = GroupId(self.next_id);
        self.next_id = self.next_id.wrapping_add(1);
        let mut group = SignalGroup::new(id);
        for &junction in members {
            if group.contains(junction) {
                continue;
            }
            group.push_member(junction);
            self.membership.insert(junction, id);
        }
        info!(
            "Created signal group {} with {} members, leader {:?}",
            id,
            group.len(),
            group.leader()
        );
        self.groups.insert(id, group);
        Ok(id)
    }

    pub fn delete_group(&mut self, id: GroupId) -> Result<(), CommandError> {
        let group = self.groups.remove(&id).ok_or(CommandError::NotFound)?;
        for member in &group.members {
            self.membership.remove(&member.junction);
        }
        info!("Deleted signal group {}", id);
        Ok(())
    }

    pub fn add_member(&mut self, id: GroupId, junction: JunctionId) -> Result<(), CommandError> {
        if self.membership.contains_key(&junction) {
            return Err(CommandError::AlreadyMember);
        }
        self.group_or_err(id)?.push_member(junction);
        self.membership.insert(junction, id);
        info!("Junction {} joined signal group {}", junction, id);
        Ok(())
    }

    /// Remove a junction from whatever group holds it. A group left empty is
    /// deleted; a removed leader is replaced.
    pub fn remove_member(&mut self, junction: JunctionId) -> Result<(), CommandError> {
        let id = self
            .membership
            .remove(&junction)
            .ok_or(CommandError::NotMember)?;
        let Some(group) = self.groups.get_mut(&id) else {
            return Ok(());
        };
        let removed = group.take_member(junction);
        if group.is_empty() {
            self.groups.remove(&id);
            info!("Signal group {} deleted after its last member left", id);
        } else if removed.is_some_and(|m| m.is_leader) {
            info!(
                "Junction {} left signal group {}, new leader {:?}",
                junction,
                id,
                group.leader()
            );
        }
        Ok(())
    }

    pub fn set_leader(&mut self, id: GroupId, junction: JunctionId) -> Result<(), CommandError> {
        let group = self.group_or_err(id)?;
        if !group.promote(junction) {
            return Err(CommandError::NotMember);
        }
        info!("Junction {} now leads signal group {}", junction, id);
        Ok(())
    }

    /// Merge `absorbed` into `target`. Numeric parameters become member-count
    /// weighted averages; absorbed members follow the target's leader.
    pub fn join_groups(&mut self, target: GroupId, absorbed: GroupId) -> Result<(), CommandError> {
        if target == absorbed {
            return Err(CommandError::SameGroup);
        }
        if !self.groups.contains_key(&target) {
            return Err(CommandError::NotFound);
        }
        let other = self.groups.remove(&absorbed).ok_or(CommandError::NotFound)?;
        let Some(group) = self.groups.get_mut(&target) else {
            return Err(CommandError::NotFound);
        };

        let own_weight = group.len() as f32;
        let other_weight = other.len() as f32;
        let total = own_weight + other_weight;
        if total > 0.0 {
            let blend = |a: f32, b: f32| (a * own_weight + b * other_weight) / total;
            group.green_wave_speed = blend(group.green_wave_speed, other.green_wave_speed);
            group.green_wave_offset = blend(group.green_wave_offset, other.green_wave_offset);
            group.max_coordination_distance = blend(
                group.max_coordination_distance,
                other.max_coordination_distance,
            );
        }

        let had_leader = group.leader().is_some();
        for mut member in other.members {
            member.is_leader = false;
            member.group_index = group.members.len() as u16;
            group.members.push(member);
        }
        if !had_leader {
            group.ensure_single_leader();
        }
        group.reindex();

        for member in &group.members {
            self.membership.insert(member.junction, target);
        }
        info!("Joined signal group {} into {}", absorbed, target);
        Ok(())
    }

    pub fn set_coordination(&mut self, id: GroupId, coordinated: bool) -> Result<(), CommandError> {
        let group = self.group_or_err(id)?;
        group.is_coordinated = coordinated;
        group.last_leader_signal = None;
        Ok(())
    }

    pub fn set_green_wave(
        &mut self,
        id: GroupId,
        enabled: bool,
        speed: f32,
        offset: f32,
    ) -> Result<(), CommandError> {
        if !(speed.is_finite() && speed > 0.0) {
            return Err(CommandError::InvalidParameter(format!(
                "green wave speed must be positive, got {speed}"
            )));
        }
        if !offset.is_finite() {
            return Err(CommandError::InvalidParameter(
                "green wave offset must be finite".to_string(),
            ));
        }
        let group = self.group_or_err(id)?;
        group.green_wave_enabled = enabled;
        group.green_wave_speed = speed;
        group.green_wave_offset = offset;
        Ok(())
    }

    pub fn set_max_coordination_distance(
        &mut self,
        id: GroupId,
        distance: f32,
    ) -> Result<(), CommandError> {
        if !(distance.is_finite() && distance > 0.0) {
            return Err(CommandError::InvalidParameter(format!(
                "coordination distance must be positive, got {distance}"
            )));
        }
        self.group_or_err(id)?.max_coordination_distance = distance;
        Ok(())
    }

    pub fn set_enhanced_offsets(
        &mut self,
        id: GroupId,
        enabled: bool,
        main_phase: u8,
    ) -> Result<(), CommandError> {
        if enabled && main_phase == 0 {
            return Err(CommandError::InvalidParameter(
                "main phase numbers start at 1".to_string(),
            ));
        }
        let group = self.group_or_err(id)?;
        group.use_enhanced_offsets = enabled;
        group.main_phase = main_phase.max(1);
        Ok(())
    }

    /// Set a member's manual offset. Returns the stored (clamped) value.
    pub fn set_member_signal_delay(
        &mut self,
        junction: JunctionId,
        ticks: i32,
    ) -> Result<i32, CommandError> {
        let id = self.group_of(junction).ok_or(CommandError::NotMember)?;
        let member = self
            .group_or_err(id)?
            .member_mut(junction)
            .ok_or(CommandError::NotMember)?;
        member.signal_delay = ticks.clamp(0, MAX_SIGNAL_DELAY);
        Ok(member.signal_delay)
    }

    /// Recompute distances, offsets and cycle lengths of every group.
    pub fn refresh(&mut self, layout: &NetworkLayout) {
        for group in self.groups.values_mut() {
            group.refresh(layout);
        }
    }

    /// Remove leaders whose junction no longer exists and promote the next
    /// member in group order. Groups left empty are deleted. Returns the
    /// number of groups that lost their leader.
    pub fn replace_missing_leaders(&mut self, exists: impl Fn(JunctionId) -> bool) -> u32 {
        let mut replaced = 0;
        for group in self.groups.values_mut() {
            let mut lost = false;
            while let Some(leader) = group.leader().filter(|&id| !exists(id)) {
                group.take_member(leader);
                self.membership.remove(&leader);
                lost = true;
            }
            if lost {
                replaced += 1;
                warn!(
                    "Signal group {}: leader junction no longer exists, new leader {:?}",
                    group.id,
                    group.leader()
                );
            }
        }
        self.groups.retain(|_, group| !group.is_empty());
        replaced
    }

    /// Drop members whose junction no longer exists, delete empty groups,
    /// restore one leader per group and dense indices, and rebuild the
    /// membership index.
    pub fn housekeeping(&mut self, exists: impl Fn(JunctionId) -> bool) -> HousekeepingReport {
        let mut report = HousekeepingReport::default();

        for group in self.groups.values_mut() {
            let before = group.members.len();
            group.members.retain(|m| exists(m.junction));
            let dropped = before - group.members.len();
            if dropped > 0 {
                warn!(
                    "Signal group {}: removed {} members whose junction no longer exists",
                    group.id, dropped
                );
                report.dangling_members += dropped as u32;
            }
            if group.ensure_single_leader() {
                report.leaders_elected += 1;
            }
            if group.reindex() {
                report.reindexed_groups += 1;
            }
        }

        let empty: Vec<GroupId> = self
            .groups
            .iter()
            .filter(|(_, group)| group.is_empty())
            .map(|(&id, _)| id)
            .collect();
        for id in empty {
            self.groups.remove(&id);
            info!("Signal group {} deleted: no members left", id);
            report.deleted_groups += 1;
        }

        self.rebuild_membership();
        report
    }

    /// Rebuild the junction → group index from the group member lists. A
    /// junction listed in several groups stays only in the first.
    pub(crate) fn rebuild_membership(&mut self) -> u32 {
        self.membership.clear();
        let mut duplicates = 0;
        for group in self.groups.values_mut() {
            let id = group.id;
            let membership = &mut self.membership;
            group.members.retain(|m| {
                if membership.contains_key(&m.junction) {
                    duplicates += 1;
                    false
                } else {
                    membership.insert(m.junction, id);
                    true
                }
            });
            group.ensure_single_leader();
            group.reindex();
        }
        self.groups.retain(|_, group| !group.is_empty());
        duplicates
    }
}
